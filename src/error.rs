use thiserror::Error;
use std::io;

#[derive(Error, Debug)]
pub enum MekikiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Advisory error: {0}")]
    Advisory(String),

    #[error("Trend source error: {0}")]
    TrendSource(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl MekikiError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn search_error(msg: impl Into<String>) -> Self {
        Self::Search(msg.into())
    }

    pub fn advisory_error(msg: impl Into<String>) -> Self {
        Self::Advisory(msg.into())
    }

    pub fn trend_source_error(msg: impl Into<String>) -> Self {
        Self::TrendSource(msg.into())
    }

    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn validation_error(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, MekikiError>;

/// Outcome of a fetch that is allowed to fall back to canned data.
///
/// External collaborators (1688 search, trend ranking pages) never hard-fail
/// the pipeline; when they break we substitute a static dataset. Callers get
/// to see that substitution here instead of relying on a caught exception
/// somewhere below them.
#[derive(Debug, Clone)]
pub enum Sourced<T> {
    /// Data came from the live collaborator.
    Fresh(T),
    /// The collaborator failed or returned nothing usable; `data` is the
    /// fallback and `reason` says why.
    Degraded { data: T, reason: String },
}

impl<T> Sourced<T> {
    pub fn degraded(data: T, reason: impl Into<String>) -> Self {
        Self::Degraded {
            data,
            reason: reason.into(),
        }
    }

    pub fn data(&self) -> &T {
        match self {
            Self::Fresh(data) => data,
            Self::Degraded { data, .. } => data,
        }
    }

    pub fn into_data(self) -> T {
        match self {
            Self::Fresh(data) => data,
            Self::Degraded { data, .. } => data,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Fresh(_) => None,
            Self::Degraded { reason, .. } => Some(reason.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sourced_exposes_fallback_reason() {
        let fresh = Sourced::Fresh(vec![1, 2]);
        assert!(!fresh.is_degraded());
        assert_eq!(fresh.reason(), None);

        let degraded = Sourced::degraded(vec![3], "network down");
        assert!(degraded.is_degraded());
        assert_eq!(degraded.reason(), Some("network down"));
        assert_eq!(degraded.data(), &vec![3]);
    }
}
