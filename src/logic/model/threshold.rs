//! Decision threshold
//!
//! Probability in, binary prediction and human-readable verdict out.

use serde::Serialize;

/// Scores strictly above this are planets
pub const DECISION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Planet,
    NotPlanet,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Planet => "PLANET",
            Verdict::NotPlanet => "NOT_PLANET",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholded result for one row
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Decision {
    pub probability: f64,
    pub prediction: u8,
    pub verdict: Verdict,
}

impl Decision {
    /// NaN never clears the threshold
    pub fn from_probability(probability: f64) -> Self {
        let prediction = u8::from(probability > DECISION_THRESHOLD);
        let verdict = if prediction == 1 {
            Verdict::Planet
        } else {
            Verdict::NotPlanet
        };

        Self {
            probability,
            prediction,
            verdict,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
