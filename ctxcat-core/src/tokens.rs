use std::str::FromStr;

use strum::{Display, EnumString};

use crate::error::CoreError;

/// How to combine the word-based and character-based token estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum EstimateMethod {
    Average,
    Words,
    Chars,
    Max,
    Min,
}

impl EstimateMethod {
    /// Parses a method name. The empty string selects the default (`max`).
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if s.is_empty() {
            return Ok(Self::Max);
        }
        Self::from_str(s).map_err(|_| CoreError::InvalidMethod(s.to_string()))
    }
}

/// Estimates the number of tokens in `text`.
///
/// The word estimate assumes ~0.75 words per token, the character estimate
/// ~4 characters per token. The result is truncated, not rounded. Pure and
/// deterministic, so workers can call it without coordination.
pub fn estimate(text: &str, method: EstimateMethod) -> usize {
    let word_est = text.split_whitespace().count() as f64 / 0.75;
    let char_est = text.len() as f64 / 4.0;

    let tokens = match method {
        EstimateMethod::Average => (word_est + char_est) / 2.0,
        EstimateMethod::Words => word_est,
        EstimateMethod::Chars => char_est,
        EstimateMethod::Max => word_est.max(char_est),
        EstimateMethod::Min => word_est.min(char_est),
    };

    tokens as usize
}
