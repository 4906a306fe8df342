use std::fmt;

use serde::Serialize;

/// One rejected request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub description: String,
}

/// Every rule a request broke, collected in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(Vec<FieldViolation>);

impl Violations {
    pub fn new() -> Self { Self::default() }

    /// Record the outcome of a single field rule.
    pub fn check(&mut self, field: &'static str, outcome: Result<(), String>) -> &mut Self {
        if let Err(description) = outcome {
            self.0.push(FieldViolation { field, description });
        }
        self
    }

    pub fn push(&mut self, field: &'static str, description: impl Into<String>) -> &mut Self {
        self.0.push(FieldViolation { field, description: description.into() });
        self
    }

    pub fn fields(&self) -> &[FieldViolation] { &self.0 }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Violations> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 { f.write_str("; ")?; }
            write!(f, "{}: {}", v.field, v.description)?;
        }
        Ok(())
    }
}

impl std::error::Error for Violations {}
