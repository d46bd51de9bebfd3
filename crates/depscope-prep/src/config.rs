//! Configuration builder for the preprocessing pipeline.

use std::fmt;
use std::str::FromStr;

use crate::error::PrepError;

/// Default name of the binary target column.
pub const DEFAULT_TARGET: &str = "Depression";
/// Default name of the sleep-duration column.
pub const DEFAULT_SLEEP_COLUMN: &str = "Sleep Duration";
/// Default name of the financial-stress column.
pub const DEFAULT_FINANCIAL_STRESS_COLUMN: &str = "Financial Stress";

/// How missing markers are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingStrategy {
    /// Remove every row that contains a missing marker.
    DropRows,
    /// Numeric columns take their mean; categorical columns their mode.
    Mean,
    /// Numeric columns take their median; categorical columns their mode.
    Median,
    /// Every missing marker becomes `0`.
    Zero,
}

impl fmt::Display for MissingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MissingStrategy::DropRows => "drop",
            MissingStrategy::Mean => "mean",
            MissingStrategy::Median => "median",
            MissingStrategy::Zero => "zero",
        };
        f.write_str(name)
    }
}

impl FromStr for MissingStrategy {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop" | "drop-rows" | "drop_rows" => Ok(MissingStrategy::DropRows),
            "mean" => Ok(MissingStrategy::Mean),
            "median" => Ok(MissingStrategy::Median),
            "zero" => Ok(MissingStrategy::Zero),
            other => Err(PrepError::UnknownStrategy {
                name: other.to_string(),
            }),
        }
    }
}

/// Configuration for the preprocessing pipeline.
///
/// Construct via [`PreprocessConfig::new`], then chain `with_*` methods.
/// Steps always run in the order missing values → duplicates → encoding.
///
/// # Defaults
///
/// | Parameter                 | Default              |
/// |---------------------------|----------------------|
/// | `missing`                 | `None` (step off)    |
/// | `remove_duplicates`       | `false`              |
/// | `encode_categorical`      | `false`              |
/// | `target_column`           | `"Depression"`       |
/// | `sleep_column`            | `"Sleep Duration"`   |
/// | `financial_stress_column` | `"Financial Stress"` |
///
/// Setting a domain column to `None` turns its feature-engineering step off;
/// a configured column that is absent from the table is skipped.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub(crate) missing: Option<MissingStrategy>,
    pub(crate) remove_duplicates: bool,
    pub(crate) encode_categorical: bool,
    pub(crate) target_column: String,
    pub(crate) sleep_column: Option<String>,
    pub(crate) financial_stress_column: Option<String>,
}

impl PreprocessConfig {
    /// Create a config with every step disabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            missing: None,
            remove_duplicates: false,
            encode_categorical: false,
            target_column: DEFAULT_TARGET.to_string(),
            sleep_column: Some(DEFAULT_SLEEP_COLUMN.to_string()),
            financial_stress_column: Some(DEFAULT_FINANCIAL_STRESS_COLUMN.to_string()),
        }
    }

    // --- Setters ---

    /// Enable missing-value handling with the given strategy, or disable it with `None`.
    #[must_use]
    pub fn with_missing(mut self, missing: Option<MissingStrategy>) -> Self {
        self.missing = missing;
        self
    }

    /// Enable or disable duplicate-row removal.
    #[must_use]
    pub fn with_remove_duplicates(mut self, remove_duplicates: bool) -> Self {
        self.remove_duplicates = remove_duplicates;
        self
    }

    /// Enable or disable categorical encoding.
    #[must_use]
    pub fn with_encode_categorical(mut self, encode_categorical: bool) -> Self {
        self.encode_categorical = encode_categorical;
        self
    }

    /// Set the target column, which is never label-encoded.
    #[must_use]
    pub fn with_target_column(mut self, target_column: impl Into<String>) -> Self {
        self.target_column = target_column.into();
        self
    }

    /// Set the sleep-duration column name, or `None` to skip the mapping.
    #[must_use]
    pub fn with_sleep_column(mut self, sleep_column: Option<String>) -> Self {
        self.sleep_column = sleep_column;
        self
    }

    /// Set the financial-stress column name, or `None` to skip the coercion.
    #[must_use]
    pub fn with_financial_stress_column(mut self, column: Option<String>) -> Self {
        self.financial_stress_column = column;
        self
    }

    // --- Getters ---

    /// Return the missing-value strategy, if the step is enabled.
    #[must_use]
    pub fn missing(&self) -> Option<MissingStrategy> {
        self.missing
    }

    /// Return whether duplicate removal is enabled.
    #[must_use]
    pub fn remove_duplicates(&self) -> bool {
        self.remove_duplicates
    }

    /// Return whether categorical encoding is enabled.
    #[must_use]
    pub fn encode_categorical(&self) -> bool {
        self.encode_categorical
    }

    /// Return the target column name.
    #[must_use]
    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Return the sleep-duration column name.
    #[must_use]
    pub fn sleep_column(&self) -> Option<&str> {
        self.sleep_column.as_deref()
    }

    /// Return the financial-stress column name.
    #[must_use]
    pub fn financial_stress_column(&self) -> Option<&str> {
        self.financial_stress_column.as_deref()
    }

    /// Number of enabled steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        usize::from(self.missing.is_some())
            + usize::from(self.remove_duplicates)
            + usize::from(self.encode_categorical)
    }
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_disable_every_step() {
        let config = PreprocessConfig::new();
        assert_eq!(config.step_count(), 0);
        assert_eq!(config.target_column(), "Depression");
        assert_eq!(config.sleep_column(), Some("Sleep Duration"));
    }

    #[test]
    fn builder_counts_steps() {
        let config = PreprocessConfig::new()
            .with_missing(Some(MissingStrategy::Median))
            .with_remove_duplicates(true)
            .with_encode_categorical(true);
        assert_eq!(config.step_count(), 3);
        assert_eq!(config.missing(), Some(MissingStrategy::Median));
    }

    #[test]
    fn strategy_parses_cli_names() {
        assert_eq!("drop".parse::<MissingStrategy>().unwrap(), MissingStrategy::DropRows);
        assert_eq!("zero".parse::<MissingStrategy>().unwrap(), MissingStrategy::Zero);
        assert!(matches!(
            "mode".parse::<MissingStrategy>(),
            Err(PrepError::UnknownStrategy { .. })
        ));
    }

    #[test]
    fn deserializes_partial_json() {
        let config: PreprocessConfig =
            serde_json::from_str(r#"{"missing": "drop_rows", "encode_categorical": true}"#).unwrap();
        assert_eq!(config.missing(), Some(MissingStrategy::DropRows));
        assert!(config.encode_categorical());
        assert!(!config.remove_duplicates());
        assert_eq!(config.target_column(), "Depression");
    }
}
