use std::{collections::HashMap, fs, num::NonZeroUsize, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainErr};

/// The options of an `NnetTrainer`. Every field is optional when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Fraction of the previous update blended into the next one.
    pub momentum: f32,
    /// The maximum norm of a single parameter update, `0.0` disables the limit.
    pub max_param_change: f32,
    pub zero_component_stats: bool,
    pub store_component_stats: bool,
    /// Whether to multiply the output derivatives by the examples' derivative weights.
    pub apply_deriv_weights: bool,
    /// Whether to train the `<output>-reg` regularizer nodes.
    pub add_regularizer: bool,
    /// Minibatches per statistics phase.
    pub print_interval: NonZeroUsize,
    /// Per output objective scales, as in `output:2.0:output-reg:0.5`.
    pub objective_scales: String,
}

const DEFAULT_PRINT_INTERVAL: NonZeroUsize = match NonZeroUsize::new(100) {
    Some(n) => n,
    None => unreachable!(),
};

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            momentum: 0.0,
            max_param_change: 2.0,
            zero_component_stats: true,
            store_component_stats: true,
            apply_deriv_weights: true,
            add_regularizer: false,
            print_interval: DEFAULT_PRINT_INTERVAL,
            objective_scales: String::new(),
        }
    }
}

impl TrainerConfig {
    /// Parses a configuration from its json representation.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a json configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Checks the numeric options are in range.
    pub fn validate(&self) -> Result<()> {
        if !self.momentum.is_finite() || self.momentum < 0.0 {
            return Err(TrainErr::InvalidConfig(format!(
                "momentum must be non negative, got {}",
                self.momentum
            )));
        }

        if !self.max_param_change.is_finite() || self.max_param_change < 0.0 {
            return Err(TrainErr::InvalidConfig(format!(
                "max-param-change must be non negative, got {}",
                self.max_param_change
            )));
        }

        Ok(())
    }
}

/// The immutable output name to objective scale mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectiveScales {
    scales: HashMap<String, f32>,
}

impl ObjectiveScales {
    /// The scale of `output`, `1.0` if it has none.
    pub fn scale(&self, output: &str) -> f32 {
        self.scales.get(output).copied().unwrap_or(1.0)
    }

    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }
}

impl FromStr for ObjectiveScales {
    type Err = TrainErr;

    /// Parses a colon separated list of `name:scale` pairs. An empty string has no scales.
    fn from_str(s: &str) -> Result<Self> {
        let malformed = |reason: String| TrainErr::ObjectiveScales {
            config: s.to_string(),
            reason,
        };

        if s.is_empty() {
            return Ok(Self::default());
        }

        let tokens: Vec<&str> = s.split(':').collect();
        if tokens.len() % 2 != 0 {
            return Err(malformed(format!(
                "expected name:scale pairs, got {} tokens",
                tokens.len()
            )));
        }

        let mut scales = HashMap::with_capacity(tokens.len() / 2);
        for pair in tokens.chunks_exact(2) {
            let (name, value) = (pair[0], pair[1]);

            if name.is_empty() {
                return Err(malformed("empty output name".to_string()));
            }

            let scale = value
                .trim()
                .parse::<f32>()
                .map_err(|_| malformed(format!("could not convert '{value}' to float")))?;

            scales.insert(name.to_string(), scale);
        }

        Ok(Self { scales })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_scale_pairs() {
        let scales: ObjectiveScales = "out1:2.0:out2:0.5".parse().unwrap();

        assert_eq!(scales.len(), 2);
        assert_eq!(scales.scale("out1"), 2.0);
        assert_eq!(scales.scale("out2"), 0.5);
    }

    #[test]
    fn missing_outputs_default_to_one() {
        let scales: ObjectiveScales = "out1:2.0".parse().unwrap();
        assert_eq!(scales.scale("out3"), 1.0);

        let empty: ObjectiveScales = "".parse().unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.scale("out1"), 1.0);
    }

    #[test]
    fn odd_token_count_is_rejected() {
        let err = "out1:2.0:out2".parse::<ObjectiveScales>().unwrap_err();
        assert!(matches!(err, TrainErr::ObjectiveScales { config, .. } if config == "out1:2.0:out2"));
    }

    #[test]
    fn non_numeric_scale_is_rejected() {
        let err = "out1:two".parse::<ObjectiveScales>().unwrap_err();
        assert!(matches!(err, TrainErr::ObjectiveScales { reason, .. } if reason.contains("'two'")));
    }

    #[test]
    fn empty_names_are_rejected() {
        assert!("out1:1.0::2.0".parse::<ObjectiveScales>().is_err());
        assert!(":".parse::<ObjectiveScales>().is_err());
    }

    #[test]
    fn later_entries_override_earlier_ones() {
        let scales: ObjectiveScales = "out1:2.0:out1:3.0".parse().unwrap();
        assert_eq!(scales.scale("out1"), 3.0);
    }

    #[test]
    fn config_fields_default_when_missing() {
        let config = TrainerConfig::from_json(r#"{ "momentum": 0.5, "print_interval": 10 }"#).unwrap();

        assert_eq!(config.momentum, 0.5);
        assert_eq!(config.print_interval.get(), 10);
        assert_eq!(config.max_param_change, 2.0);
        assert!(config.apply_deriv_weights);
        assert!(!config.add_regularizer);
        assert!(config.objective_scales.is_empty());

        let config = TrainerConfig::from_json("{}").unwrap();
        assert_eq!(config.print_interval.get(), 100);
        assert_eq!(config, TrainerConfig::default());
    }

    #[test]
    fn zero_print_interval_is_rejected() {
        assert!(TrainerConfig::from_json(r#"{ "print_interval": 0 }"#).is_err());
    }

    #[test]
    fn negative_values_fail_validation() {
        let config = TrainerConfig {
            momentum: -0.1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(TrainErr::InvalidConfig(_))));

        let config = TrainerConfig {
            max_param_change: f32::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(TrainerConfig::default().validate().is_ok());
    }
}
