use crate::range::{RowOrder, DEFAULT_MAX_AGE, DEFAULT_MIN_AGE};
use crate::scale::ScaleConfig;
use crate::PyramidError;
use serde::{Deserialize, Serialize};

/// Everything that shapes a rendered pyramid, passed explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PyramidConfig {
    pub min_age: i32,
    pub max_age: i32,
    pub scale: ScaleConfig,
    pub order: RowOrder,
}

impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            min_age: DEFAULT_MIN_AGE,
            max_age: DEFAULT_MAX_AGE,
            scale: ScaleConfig::default(),
            order: RowOrder::Descending,
        }
    }
}

impl PyramidConfig {
    pub fn validate(&self) -> Result<(), PyramidError> {
        if self.min_age < 0 || self.min_age > self.max_age {
            return Err(PyramidError::InvalidConfig(format!(
                "age range {}..={} is empty or negative",
                self.min_age, self.max_age
            )));
        }
        self.scale.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PyramidConfig::default();
        assert_eq!((config.min_age, config.max_age), (15, 80));
        assert_eq!(config.order, RowOrder::Descending);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let config = PyramidConfig {
            min_age: 60,
            max_age: 20,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PyramidError::InvalidConfig(_))));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: PyramidConfig = serde_json::from_str(r#"{"max_age": 65}"#).unwrap();
        assert_eq!(config.min_age, 15);
        assert_eq!(config.max_age, 65);
        assert_eq!(config.scale, ScaleConfig::default());
    }
}
