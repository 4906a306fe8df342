//! Storage session seam.
//!
//! The service layer never talks to a column-store driver directly. It issues
//! parameterized, CQL-shaped statements through [`Session`], which is opened
//! once at startup (bound to a keyspace and a consistency level) and then
//! shared by every concurrent request.

use std::{fmt, str::FromStr, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

/// A bound parameter or a column value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Boolean(bool),
    Null,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Boolean(_) => "boolean",
            Value::Null => "null",
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self { Value::Text(v.to_string()) }
}

impl From<String> for Value {
    fn from(v: String) -> Self { Value::Text(v) }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self { Value::Boolean(v) }
}

/// One result row: named columns in projection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self { Self::default() }

    /// Builder-style column setter.
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set(column, value.into());
        self
    }

    /// Set a column, replacing any previous value in place.
    pub fn set(&mut self, column: &str, value: Value) {
        match self.columns.iter_mut().find(|(name, _)| name == column) {
            Some((_, slot)) => *slot = value,
            None => self.columns.push((column.to_string(), value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, v)| (name.as_str(), v))
    }

    /// Read a text column. A null cell reads as the empty string, the way drivers scan into plain strings.
    pub fn text(&self, column: &str) -> Result<String, StorageError> {
        match self.get(column) {
            Some(Value::Text(s)) => Ok(s.clone()),
            Some(Value::Null) => Ok(String::new()),
            Some(other) => Err(StorageError::Decode(format!(
                "column {column}: expected text, found {}",
                other.type_name()
            ))),
            None => Err(StorageError::Decode(format!("column {column} missing from row"))),
        }
    }

    /// Read a boolean column. A null cell reads as `false`.
    pub fn boolean(&self, column: &str) -> Result<bool, StorageError> {
        match self.get(column) {
            Some(Value::Boolean(b)) => Ok(*b),
            Some(Value::Null) => Ok(false),
            Some(other) => Err(StorageError::Decode(format!(
                "column {column}: expected boolean, found {}",
                other.type_name()
            ))),
            None => Err(StorageError::Decode(format!("column {column} missing from row"))),
        }
    }
}

/// Replica acknowledgement level a session was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Consistency {
    One,
    #[default]
    Quorum,
    LocalQuorum,
    All,
}

impl Consistency {
    /// Every supported level.
    pub const LEVELS: [Consistency; 4] = [Consistency::One, Consistency::Quorum, Consistency::LocalQuorum, Consistency::All];

    pub fn as_str(self) -> &'static str {
        match self {
            Consistency::One => "one",
            Consistency::Quorum => "quorum",
            Consistency::LocalQuorum => "local_quorum",
            Consistency::All => "all",
        }
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A consistency name that matches none of [`Consistency::LEVELS`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown consistency level {0:?}, expected one of one, quorum, local_quorum, all")]
pub struct ParseConsistencyError(pub String);

impl FromStr for Consistency {
    type Err = ParseConsistencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Consistency::LEVELS
            .into_iter()
            .find(|level| level.as_str() == name)
            .ok_or(ParseConsistencyError(name))
    }
}

/// Failures reported by a [`Session`]. "No such row" is never an error here:
/// reads report absence as `Ok(None)`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Connectivity or timeout; the store could not be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// The store refused the statement (syntax, schema, write rejection).
    #[error("statement rejected: {0}")]
    Rejected(String),
    /// A returned row did not have the expected shape.
    #[error("row decode failed: {0}")]
    Decode(String),
}

/// An open, keyspace-bound connection to the column store.
///
/// Implementations must be safe to share across concurrently running requests.
#[async_trait]
pub trait Session: Send + Sync {
    /// Run a statement that returns no rows.
    async fn execute(&self, statement: &str, params: &[Value]) -> Result<(), StorageError>;

    /// Run a query and return its first row, if any.
    async fn query_one(&self, statement: &str, params: &[Value]) -> Result<Option<Row>, StorageError>;

    fn keyspace(&self) -> &str;

    fn consistency(&self) -> Consistency;
}

#[async_trait]
impl<S: Session + ?Sized> Session for Arc<S> {
    async fn execute(&self, statement: &str, params: &[Value]) -> Result<(), StorageError> {
        (**self).execute(statement, params).await
    }

    async fn query_one(&self, statement: &str, params: &[Value]) -> Result<Option<Row>, StorageError> {
        (**self).query_one(statement, params).await
    }

    fn keyspace(&self) -> &str { (**self).keyspace() }

    fn consistency(&self) -> Consistency { (**self).consistency() }
}
