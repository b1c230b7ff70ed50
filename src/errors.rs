use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UwgError {
    #[error("Configuration was considered invalid: {0}")]
    Config(#[from] ConfigError),
    #[error("Could not use the weather file: {0}")]
    Epw(#[from] EpwError),
    #[error("Simulation was cancelled after {completed_hours} completed hours")]
    Cancelled { completed_hours: usize },
    #[error("Operation requires the simulation to be {expected} but it is {found}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },
    #[error("Error identified during UWG calculation: {0}")]
    FailureInCalculation(#[from] UwgCoreError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An error raised by the numerical core that is not attributable to the caller's inputs.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct UwgCoreError {
    error: anyhow::Error,
}

impl UwgCoreError {
    pub(crate) fn new(error: anyhow::Error) -> Self {
        Self { error }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Invalid(ValidationReport),
    #[error("Could not parse configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One offending field, with enough context to fix it without reading engine internals.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldViolation {
    pub field: String,
    pub value: String,
    pub expected: String,
}

impl Display for FieldViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} was {} but must be {}",
            self.field, self.value, self.expected
        )
    }
}

/// Every violation found while validating a run configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationReport {
    violations: Vec<FieldViolation>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push(&mut self, field: impl Into<String>, value: impl Display, expected: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: field.into(),
            value: value.to_string(),
            expected: expected.into(),
        });
    }

    /// Record a violation unless `value` lies within the closed range `[min, max]`.
    pub fn check_range(&mut self, field: impl Into<String>, value: f64, min: f64, max: f64) {
        if !(min..=max).contains(&value) {
            self.push(field, value, format!("within [{min}, {max}]"));
        }
    }

    /// Record a violation unless `value` is strictly greater than zero.
    pub fn check_positive(&mut self, field: impl Into<String>, value: f64) {
        if value.is_nan() || value <= 0. {
            self.push(field, value, "greater than 0");
        }
    }

    pub fn check_non_negative(&mut self, field: impl Into<String>, value: f64) {
        if value.is_nan() || value < 0. {
            self.push(field, value, "at least 0");
        }
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn into_result(self) -> Result<(), ConfigError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(self))
        }
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} invalid field(s):", self.violations.len())?;
        for violation in &self.violations {
            write!(f, "\n  - {violation}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum EpwError {
    #[error("Could not read weather file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Weather file is missing header line {line}")]
    MissingHeader { line: usize },
    #[error("Weather file line {line} is malformed: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("Could not parse weather records: {0}")]
    Csv(#[from] csv::Error),
    #[error("Weather file holds {found} hourly records but the simulation needs {needed}")]
    TooShort { needed: usize, found: usize },
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ElementError {
    #[error("Element '{name}' has no layers")]
    NoLayers { name: String },
    #[error("Element '{name}' has {thicknesses} layer thicknesses but {materials} materials")]
    LengthMismatch {
        name: String,
        thicknesses: usize,
        materials: usize,
    },
    #[error("Layer {layer} of element '{name}' has non-positive {quantity} ({value})")]
    NonPositive {
        name: String,
        layer: usize,
        quantity: &'static str,
        value: f64,
    },
}
