//! In-process [`Session`] over a small CQL subset.
//!
//! Rows live in per-table vectors in insertion order, so a query that matches
//! several rows always returns the earliest inserted one first. Write
//! semantics follow the column store: `INSERT` and plain `UPDATE` are upserts
//! on the partition key, while `UPDATE ... IF EXISTS` leaves absent keys alone.

mod statement;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::db::{Consistency, Row, Session, StorageError, Value};
use statement::{Connective, Expr, Filter, Prepared, Projection, Statement, TableRef};

#[derive(Debug)]
struct Table {
    key_column: String,
    rows: Vec<Row>,
}

impl Table {
    fn position(&self, key: &Value) -> Option<usize> {
        self.rows.iter().position(|r| r.get(&self.key_column) == Some(key))
    }
}

/// Concurrency-safe in-memory column store session.
#[derive(Debug)]
pub struct MemorySession {
    keyspace: String,
    consistency: Consistency,
    tables: RwLock<HashMap<String, Table>>,
    unavailable: AtomicBool,
}

impl MemorySession {
    pub fn new(keyspace: impl Into<String>, consistency: Consistency) -> Self {
        Self {
            keyspace: keyspace.into(),
            consistency,
            tables: RwLock::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Declare a table and its partition key column. Statements against
    /// undeclared tables are rejected.
    pub fn with_table(mut self, name: &str, key_column: &str) -> Self {
        let table = Table { key_column: key_column.to_ascii_lowercase(), rows: Vec::new() };
        self.tables.get_mut().entry(name.to_ascii_lowercase()).or_insert(table);
        self
    }

    /// Simulate losing every replica: all statements fail with `Unavailable` until reset.
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    /// Number of rows currently held in `table`.
    pub async fn row_count(&self, table: &str) -> usize {
        let tables = self.tables.read().await;
        tables.get(&table.to_ascii_lowercase()).map_or(0, |t| t.rows.len())
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!(
                "cannot achieve consistency level {}: no replicas reachable",
                self.consistency
            )));
        }
        Ok(())
    }

    fn prepare(&self, statement: &str, params: &[Value]) -> Result<Statement, StorageError> {
        let Prepared { statement: parsed, arity } = statement::parse(statement)?;
        if arity != params.len() {
            return Err(StorageError::Rejected(format!(
                "expected {arity} bound values, got {}",
                params.len()
            )));
        }
        Ok(parsed)
    }

    fn table_name<'a>(&self, table: &'a TableRef) -> Result<&'a str, StorageError> {
        match &table.keyspace {
            Some(ks) if !ks.eq_ignore_ascii_case(&self.keyspace) => Err(StorageError::Rejected(format!(
                "keyspace {ks} does not match session keyspace {}",
                self.keyspace
            ))),
            _ => Ok(&table.name),
        }
    }

    async fn write(&self, statement: Statement, params: &[Value]) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        match statement {
            Statement::Insert { table, columns, values } => {
                let name = self.table_name(&table)?;
                let t = lookup_mut(&mut tables, name)?;
                let key_idx = columns
                    .iter()
                    .position(|c| *c == t.key_column)
                    .ok_or_else(|| StorageError::Rejected(format!("missing partition key column {}", t.key_column)))?;
                let key = values[key_idx].bind(params);
                if key == Value::Null {
                    return Err(StorageError::Rejected("partition key may not be null".into()));
                }
                let idx = match t.position(&key) {
                    Some(i) => i,
                    None => {
                        t.rows.push(Row::new());
                        t.rows.len() - 1
                    }
                };
                for (column, expr) in columns.iter().zip(values.iter()) {
                    t.rows[idx].set(column, expr.bind(params));
                }
                trace!(table = name, "row inserted");
                Ok(())
            }
            Statement::Update { table, assignments, key_column, key, if_exists } => {
                let name = self.table_name(&table)?;
                let t = lookup_mut(&mut tables, name)?;
                if key_column != t.key_column {
                    return Err(StorageError::Rejected(format!(
                        "UPDATE must restrict on partition key {}",
                        t.key_column
                    )));
                }
                if assignments.iter().any(|(c, _)| *c == t.key_column) {
                    return Err(StorageError::Rejected("partition key columns cannot be updated".into()));
                }
                let key = key.bind(params);
                let idx = match t.position(&key) {
                    Some(i) => i,
                    None if if_exists => {
                        debug!(table = name, "conditional update not applied: row absent");
                        return Ok(());
                    }
                    None => {
                        let row = Row::new().with(&t.key_column, key);
                        t.rows.push(row);
                        t.rows.len() - 1
                    }
                };
                for (column, expr) in &assignments {
                    t.rows[idx].set(column, expr.bind(params));
                }
                trace!(table = name, "row updated");
                Ok(())
            }
            Statement::Select { .. } => Err(StorageError::Rejected("SELECT returns rows; use query_one".into())),
        }
    }

    async fn read(&self, statement: Statement, params: &[Value]) -> Result<Option<Row>, StorageError> {
        let Statement::Select { table, projection, filter, limit } = statement else {
            return Err(StorageError::Rejected("statement does not return rows".into()));
        };
        let tables = self.tables.read().await;
        let name = self.table_name(&table)?;
        let t = tables
            .get(name)
            .ok_or_else(|| StorageError::Rejected(format!("unconfigured table {name}")))?;
        let found = t
            .rows
            .iter()
            .filter(|row| row_matches(row, filter.as_ref(), params))
            .take(limit.unwrap_or(usize::MAX))
            .next();
        Ok(found.map(|row| project(row, &projection)))
    }
}

fn lookup_mut<'a>(tables: &'a mut HashMap<String, Table>, name: &str) -> Result<&'a mut Table, StorageError> {
    tables
        .get_mut(name)
        .ok_or_else(|| StorageError::Rejected(format!("unconfigured table {name}")))
}

fn row_matches(row: &Row, filter: Option<&Filter>, params: &[Value]) -> bool {
    let Some(filter) = filter else { return true };
    let mut hits = filter.conditions.iter().map(|(column, expr): &(String, Expr)| {
        row.get(column).unwrap_or(&Value::Null) == &expr.bind(params)
    });
    match filter.connective {
        Connective::And => hits.all(|h| h),
        Connective::Or => hits.any(|h| h),
    }
}

fn project(row: &Row, projection: &Projection) -> Row {
    match projection {
        Projection::All => row.clone(),
        Projection::Columns(columns) => columns.iter().fold(Row::new(), |acc, c| {
            acc.with(c, row.get(c).cloned().unwrap_or(Value::Null))
        }),
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn execute(&self, statement: &str, params: &[Value]) -> Result<(), StorageError> {
        self.check_available()?;
        let parsed = self.prepare(statement, params)?;
        self.write(parsed, params).await
    }

    async fn query_one(&self, statement: &str, params: &[Value]) -> Result<Option<Row>, StorageError> {
        self.check_available()?;
        let parsed = self.prepare(statement, params)?;
        self.read(parsed, params).await
    }

    fn keyspace(&self) -> &str { &self.keyspace }

    fn consistency(&self) -> Consistency { self.consistency }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> MemorySession {
        MemorySession::new("ks", Consistency::Quorum).with_table("people", "id")
    }

    #[tokio::test]
    async fn insert_then_select_by_key() -> anyhow::Result<()> {
        let s = session();
        s.execute("INSERT INTO people (id, name, active) VALUES (?, ?, ?)", &["1".into(), "Ann".into(), true.into()]).await?;
        let row = s.query_one("SELECT name, active FROM people WHERE id = ?", &["1".into()]).await?.unwrap();
        assert_eq!(row.text("name")?, "Ann");
        assert!(row.boolean("active")?);
        assert!(s.query_one("SELECT * FROM people WHERE id = ?", &["2".into()]).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn conditional_update_skips_absent_rows() -> anyhow::Result<()> {
        let s = session();
        s.execute("UPDATE people SET name = ? WHERE id = ? IF EXISTS", &["Bob".into(), "9".into()]).await?;
        assert_eq!(s.row_count("people").await, 0);

        // Without the condition the write is an upsert.
        s.execute("UPDATE people SET name = ? WHERE id = ?", &["Bob".into(), "9".into()]).await?;
        assert_eq!(s.row_count("people").await, 1);
        let row = s.query_one("SELECT id, name FROM people WHERE id = ?", &["9".into()]).await?.unwrap();
        assert_eq!(row.text("name")?, "Bob");
        Ok(())
    }

    #[tokio::test]
    async fn or_filter_returns_first_inserted_match() -> anyhow::Result<()> {
        let s = session();
        s.execute("INSERT INTO people (id, phone, mail) VALUES (?, ?, ?)", &["a".into(), "+1".into(), "a@x.io".into()]).await?;
        s.execute("INSERT INTO people (id, phone, mail) VALUES (?, ?, ?)", &["b".into(), "+2".into(), "b@x.io".into()]).await?;
        let row = s
            .query_one("SELECT id FROM people WHERE phone = ? OR mail = ? LIMIT 1", &["+2".into(), "a@x.io".into()])
            .await?
            .unwrap();
        assert_eq!(row.text("id")?, "a");
        Ok(())
    }

    #[tokio::test]
    async fn rejects_arity_mismatch_and_unknown_tables() {
        let s = session();
        let err = s.execute("INSERT INTO people (id) VALUES (?)", &[]).await.unwrap_err();
        assert!(matches!(err, StorageError::Rejected(_)));
        let err = s.query_one("SELECT * FROM ghosts WHERE id = ?", &["1".into()]).await.unwrap_err();
        assert!(matches!(err, StorageError::Rejected(_)));
        let err = s.query_one("SELECT * FROM other.people WHERE id = ?", &["1".into()]).await.unwrap_err();
        assert!(matches!(err, StorageError::Rejected(_)));
    }

    #[tokio::test]
    async fn unavailable_session_fails_every_statement() {
        let s = session();
        s.set_unavailable(true);
        let err = s.query_one("SELECT * FROM people WHERE id = ?", &["1".into()]).await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
        s.set_unavailable(false);
        assert!(s.query_one("SELECT * FROM people WHERE id = ?", &["1".into()]).await.unwrap().is_none());
    }
}
