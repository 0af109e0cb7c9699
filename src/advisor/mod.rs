pub mod agent;
pub mod listing;

pub use agent::{AdvisoryAgent, AdvisoryOverride};
pub use listing::{generate_listing_copy, ListingCopy, ListingCopyRequest};

use async_trait::async_trait;

use crate::catalog::Product;
use crate::error::Result;
use crate::evaluator::projector::Projection;

/// The advisory collaborator seam: something that can look at a candidate
/// and its projection and return a refinement. The pipeline treats it as a
/// black box that is allowed to fail.
#[async_trait]
pub trait Advisor: Send + Sync {
    async fn evaluate_candidate(
        &self,
        product: &Product,
        projection: &Projection,
        directions: &[String],
    ) -> Result<AdvisoryOverride>;
}
