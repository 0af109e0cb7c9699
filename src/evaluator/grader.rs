//! Grade classification.
//!
//! Two policies coexist on purpose. The full pipeline has a risk pass and a
//! score breakdown, so it grades on (total, margin, penalty); the quick
//! keyword screen has only a relevance score and a margin. They answer
//! different questions and are kept as separate named functions rather than
//! merged behind defaults.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::A => write!(f, "A"),
            Grade::B => write!(f, "B"),
            Grade::C => write!(f, "C"),
        }
    }
}

impl std::str::FromStr for Grade {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Grade::A),
            "B" | "b" => Ok(Grade::B),
            "C" | "c" => Ok(Grade::C),
            _ => Err(()),
        }
    }
}

/// Penalty at or above which a candidate is disqualified outright.
pub const DISQUALIFYING_PENALTY: f64 = 0.7;

/// Grades a fully evaluated candidate. First match wins:
/// denylist-level risk or a sub-10% margin is an automatic C; A needs both
/// a strong total and a 25%+ margin; a middling total earns B.
pub fn grade_candidate(total_score: f64, margin_rate: f64, risk_penalty: f64) -> Grade {
    if risk_penalty >= DISQUALIFYING_PENALTY {
        return Grade::C;
    }
    if margin_rate < 0.1 {
        return Grade::C;
    }
    if total_score >= 0.7 && margin_rate >= 0.25 {
        return Grade::A;
    }
    if total_score >= 0.5 {
        return Grade::B;
    }
    Grade::C
}

/// Grades a quick-screen candidate where no risk pass has run: thin margin
/// or near-zero relevance is a C, strong relevance with a healthy margin an
/// A, everything else a B.
pub fn grade_screen(score: f64, margin_rate: f64) -> Grade {
    if margin_rate < 0.1 || score < 0.3 {
        return Grade::C;
    }
    if score >= 0.7 && margin_rate >= 0.25 {
        return Grade::A;
    }
    Grade::B
}
