//! Tunable probabilities of the grammar engine.

use serde::{Deserialize, Serialize};

use crate::error::{GeneratorResult, GrammarError};

/// Default chance that one `cat` call enters torture mode.
pub const DEFAULT_TORTURE_PROBABILITY: f64 = 1.0 / 1700.0;

/// Default chance that a dispatch takes the escape hatch.
pub const DEFAULT_ESCAPE_HATCH_PROBABILITY: f64 = 1.0 / 500.0;

/// Default chance of a noise token around each fragment.
pub const DEFAULT_NOISE_PROBABILITY: f64 = 1.0 / 900.0 + 1.0 / 400.0;

/// Default chance that an identifier site reuses an in-scope binding.
pub const DEFAULT_REUSE_BINDING_PROBABILITY: f64 = 1.0 / 3.0;

/// Dispatches per generation after which only terminals are chosen.
pub const DEFAULT_MAX_CALLS: u64 = 100_000;

/// Options controlling a grammar engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarOptions {
    /// Probability per `cat` call of torture mode
    pub torture_probability: f64,
    /// Probability per dispatch of substituting a random generator
    pub escape_hatch_probability: f64,
    /// Probability of a noise token before and after each fragment
    pub noise_probability: f64,
    /// Probability that an identifier site reuses an existing binding
    pub reuse_binding_probability: f64,
    /// Depth at or below which only terminal productions are eligible
    pub depth_floor: i32,
    /// Dispatch budget per generation; beyond it only terminals are chosen
    pub max_calls: u64,
}

impl Default for GrammarOptions {
    fn default() -> Self {
        Self {
            torture_probability: DEFAULT_TORTURE_PROBABILITY,
            escape_hatch_probability: DEFAULT_ESCAPE_HATCH_PROBABILITY,
            noise_probability: DEFAULT_NOISE_PROBABILITY,
            reuse_binding_probability: DEFAULT_REUSE_BINDING_PROBABILITY,
            depth_floor: 0,
            max_calls: DEFAULT_MAX_CALLS,
        }
    }
}

impl GrammarOptions {
    /// Options with noise, torture and the escape hatch turned off.
    pub fn quiet() -> Self {
        Self {
            torture_probability: 0.0,
            escape_hatch_probability: 0.0,
            noise_probability: 0.0,
            ..Self::default()
        }
    }

    /// Check that every probability lies in `[0, 1]`.
    pub fn validate(&self) -> GeneratorResult<()> {
        let probabilities = [
            ("torture_probability", self.torture_probability),
            ("escape_hatch_probability", self.escape_hatch_probability),
            ("noise_probability", self.noise_probability),
            ("reuse_binding_probability", self.reuse_binding_probability),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(GrammarError::InvalidOption {
                    name,
                    reason: format!("{value} is not a probability"),
                });
            }
        }
        if self.max_calls == 0 {
            return Err(GrammarError::InvalidOption {
                name: "max_calls",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(GrammarOptions::default().validate().is_ok());
        assert!(GrammarOptions::quiet().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range() {
        let options = GrammarOptions {
            noise_probability: 1.5,
            ..GrammarOptions::default()
        };
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("noise_probability"));

        let options = GrammarOptions {
            torture_probability: f64::NAN,
            ..GrammarOptions::default()
        };
        assert!(options.validate().is_err());
    }
}
