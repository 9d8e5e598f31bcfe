//! The `result` block of a statement

use super::language::Extensions;
use super::time::IsoDuration;
use serde::{Deserialize, Serialize};
use serde_json::Number;

/// A score achieved on an activity.
///
/// Values are kept as JSON numbers so `8` is written back as `8`, not `8.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Score {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaled: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Number>,
}

impl Score {
    /// Score with only a raw value
    pub fn with_raw(raw: impl Into<Number>) -> Self {
        Self {
            raw: Some(raw.into()),
            ..Default::default()
        }
    }

    /// Score with only a scaled value; `None` when `scaled` is not finite
    pub fn with_scaled(scaled: f64) -> Option<Self> {
        Number::from_f64(scaled).map(|scaled| Self {
            scaled: Some(scaled),
            ..Default::default()
        })
    }
}

/// Measured outcome of a statement (`result` on the wire)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<IsoDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Extensions>,
}
