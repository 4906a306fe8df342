//! Lowers the CQL subset understood by [`super::MemorySession`] from
//! sqlparser's AST into a small evaluable form.
//!
//! Supported shapes:
//! - `INSERT INTO t (c, ...) VALUES (expr, ...)`
//! - `UPDATE t SET c = expr, ... WHERE key = expr [IF EXISTS]`
//! - `SELECT * | c, ... FROM t [WHERE c = expr {AND|OR} ...] [LIMIT n]`
//!
//! where `expr` is `?`, a single-quoted string, `true`, `false` or `null`.
//! The lightweight-transaction suffix `IF EXISTS` is not SQL; it is split off
//! before parsing and kept as a flag.

use sqlparser::ast::{
    self, AssignmentTarget, BinaryOperator, Expr as SqlExpr, LimitClause, ObjectName, ObjectNamePart, SelectItem,
    SetExpr, TableFactor, TableObject,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::db::{StorageError, Value};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Param(usize),
    Literal(Value),
}

impl Expr {
    pub(crate) fn bind(&self, params: &[Value]) -> Value {
        match self {
            // arity is checked against params before any statement runs
            Expr::Param(i) => params.get(*i).cloned().unwrap_or(Value::Null),
            Expr::Literal(v) => v.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Connective {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Projection {
    All,
    Columns(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Filter {
    pub connective: Connective,
    pub conditions: Vec<(String, Expr)>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Statement {
    Insert {
        table: TableRef,
        columns: Vec<String>,
        values: Vec<Expr>,
    },
    Update {
        table: TableRef,
        assignments: Vec<(String, Expr)>,
        key_column: String,
        key: Expr,
        if_exists: bool,
    },
    Select {
        table: TableRef,
        projection: Projection,
        filter: Option<Filter>,
        limit: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TableRef {
    pub keyspace: Option<String>,
    pub name: String,
}

/// Lowered statement plus the number of `?` placeholders it carries.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Prepared {
    pub statement: Statement,
    pub arity: usize,
}

pub(crate) fn parse(input: &str) -> Result<Prepared, StorageError> {
    let (sql, if_exists) = split_condition(input);
    let mut statements = Parser::parse_sql(&GenericDialect {}, sql).map_err(|e| rejected(e.to_string()))?;
    if statements.len() != 1 {
        return Err(rejected(format!("expected exactly one statement, got {}", statements.len())));
    }

    let mut lowering = Lowering { params: 0 };
    let statement = match statements.remove(0) {
        ast::Statement::Update(update) => lowering.update(update, if_exists)?,
        _ if if_exists => return Err(rejected("IF EXISTS only applies to UPDATE")),
        ast::Statement::Insert(insert) => lowering.insert(insert)?,
        ast::Statement::Query(query) => lowering.select(*query)?,
        other => return Err(rejected(format!("unsupported statement: {other}"))),
    };
    Ok(Prepared { statement, arity: lowering.params })
}

fn rejected(msg: impl Into<String>) -> StorageError {
    StorageError::Rejected(msg.into())
}

/// Split a trailing `IF EXISTS` off the statement text.
fn split_condition(input: &str) -> (&str, bool) {
    let sql = input.trim().trim_end_matches(';').trim_end();
    // ASCII uppercasing keeps byte offsets
    let upper = sql.to_ascii_uppercase();
    if let Some(head) = upper.strip_suffix("EXISTS") {
        let head = head.trim_end();
        if let Some(rest) = head.strip_suffix("IF") {
            if rest.ends_with(char::is_whitespace) {
                return (sql[..rest.len()].trim_end(), true);
            }
        }
    }
    (sql, false)
}

fn column(ident: &ast::Ident) -> String {
    ident.value.to_ascii_lowercase()
}

fn name_parts(name: &ObjectName) -> Result<Vec<String>, StorageError> {
    name.0
        .iter()
        .map(|part| match part {
            ObjectNamePart::Identifier(ident) => Ok(column(ident)),
            #[allow(unreachable_patterns)]
            _ => Err(rejected(format!("unsupported name {name}"))),
        })
        .collect()
}

fn table_ref(name: &ObjectName) -> Result<TableRef, StorageError> {
    match name_parts(name)?.as_slice() {
        [table] => Ok(TableRef { keyspace: None, name: table.clone() }),
        [keyspace, table] => Ok(TableRef { keyspace: Some(keyspace.clone()), name: table.clone() }),
        _ => Err(rejected(format!("malformed table name {name}"))),
    }
}

fn relation(factor: &TableFactor) -> Result<TableRef, StorageError> {
    match factor {
        TableFactor::Table { name, .. } => table_ref(name),
        other => Err(rejected(format!("expected a table, found {other}"))),
    }
}

fn limit_count(expr: &SqlExpr) -> Result<usize, StorageError> {
    let SqlExpr::Value(v) = expr else {
        return Err(rejected(format!("expected LIMIT count, found {expr}")));
    };
    match &v.value {
        ast::Value::Number(n, _) => match n.parse::<usize>() {
            Ok(0) => Err(rejected("LIMIT must be strictly positive")),
            Ok(count) => Ok(count),
            Err(_) => Err(rejected(format!("invalid LIMIT count {n}"))),
        },
        other => Err(rejected(format!("expected LIMIT count, found {other}"))),
    }
}

/// Walks an AST in source order, numbering `?` placeholders as it meets them.
struct Lowering {
    params: usize,
}

impl Lowering {
    fn value(&mut self, expr: SqlExpr) -> Result<Expr, StorageError> {
        let v = match expr {
            SqlExpr::Value(v) => v,
            other => return Err(rejected(format!("expected a value, found {other}"))),
        };
        match v.value {
            ast::Value::Placeholder(p) if p == "?" => {
                let idx = self.params;
                self.params += 1;
                Ok(Expr::Param(idx))
            }
            ast::Value::SingleQuotedString(s) => Ok(Expr::Literal(Value::Text(s))),
            ast::Value::Boolean(b) => Ok(Expr::Literal(Value::Boolean(b))),
            ast::Value::Null => Ok(Expr::Literal(Value::Null)),
            other => Err(rejected(format!("unsupported value {other}"))),
        }
    }

    fn insert(&mut self, insert: ast::Insert) -> Result<Statement, StorageError> {
        let table = match &insert.table {
            TableObject::TableName(name) => table_ref(name)?,
            #[allow(unreachable_patterns)]
            _ => return Err(rejected("INSERT target must be a table name")),
        };
        let columns: Vec<String> = insert.columns.iter().map(column).collect();
        let source = insert.source.ok_or_else(|| rejected("INSERT requires a VALUES clause"))?;
        let SetExpr::Values(rows) = *source.body else {
            return Err(rejected("INSERT source must be a VALUES list"));
        };
        if rows.rows.len() != 1 {
            return Err(rejected("INSERT takes exactly one VALUES row"));
        }
        let values = rows
            .rows
            .into_iter()
            .flatten()
            .map(|e| self.value(e))
            .collect::<Result<Vec<_>, _>>()?;
        if columns.len() != values.len() {
            return Err(rejected(format!(
                "INSERT lists {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        Ok(Statement::Insert { table, columns, values })
    }

    fn update(&mut self, update: ast::Update, if_exists: bool) -> Result<Statement, StorageError> {
        if !update.table.joins.is_empty() {
            return Err(rejected("UPDATE does not support joins"));
        }
        let table = relation(&update.table.relation)?;

        let mut assignments = Vec::with_capacity(update.assignments.len());
        for assignment in update.assignments {
            let target = match &assignment.target {
                AssignmentTarget::ColumnName(name) => match name_parts(name)?.as_slice() {
                    [col] => col.clone(),
                    _ => return Err(rejected(format!("qualified column {name} in SET"))),
                },
                _ => return Err(rejected("tuple assignments are not supported")),
            };
            assignments.push((target, self.value(assignment.value)?));
        }

        let selection = update
            .selection
            .ok_or_else(|| rejected("UPDATE requires a WHERE clause on the partition key"))?;
        let filter = self.filter(selection)?;
        let [(key_column, key)] = <[(String, Expr); 1]>::try_from(filter.conditions)
            .map_err(|_| rejected("UPDATE must restrict on exactly one key column"))?;
        Ok(Statement::Update { table, assignments, key_column, key, if_exists })
    }

    fn select(&mut self, query: ast::Query) -> Result<Statement, StorageError> {
        let limit = match &query.limit_clause {
            None => None,
            Some(LimitClause::LimitOffset { limit, offset: None, limit_by, .. }) if limit_by.is_empty() => {
                limit.as_ref().map(limit_count).transpose()?
            }
            Some(_) => return Err(rejected("only LIMIT <n> is supported")),
        };

        let SetExpr::Select(select) = *query.body else {
            return Err(rejected("only plain SELECT queries are supported"));
        };
        let select = *select;
        let table = match select.from.as_slice() {
            [from] if from.joins.is_empty() => relation(&from.relation)?,
            _ => return Err(rejected("SELECT reads exactly one table")),
        };
        let projection = match select.projection.as_slice() {
            [SelectItem::Wildcard(_)] => Projection::All,
            items => Projection::Columns(
                items
                    .iter()
                    .map(|item| match item {
                        SelectItem::UnnamedExpr(SqlExpr::Identifier(ident)) => Ok(column(ident)),
                        other => Err(rejected(format!("projection must list plain columns, found {other}"))),
                    })
                    .collect::<Result<_, _>>()?,
            ),
        };
        let filter = select.selection.map(|e| self.filter(e)).transpose()?;
        Ok(Statement::Select { table, projection, filter, limit })
    }

    fn filter(&mut self, expr: SqlExpr) -> Result<Filter, StorageError> {
        let mut connective = None;
        let mut conditions = Vec::new();
        self.conditions(expr, &mut connective, &mut conditions)?;
        Ok(Filter { connective: connective.unwrap_or(Connective::And), conditions })
    }

    fn conditions(
        &mut self,
        expr: SqlExpr,
        connective: &mut Option<Connective>,
        out: &mut Vec<(String, Expr)>,
    ) -> Result<(), StorageError> {
        let (left, right, this) = match expr {
            SqlExpr::Nested(inner) => return self.conditions(*inner, connective, out),
            SqlExpr::BinaryOp { left, op: BinaryOperator::Eq, right } => {
                let ident = match *left {
                    SqlExpr::Identifier(ident) => ident,
                    other => return Err(rejected(format!("expected a column left of =, found {other}"))),
                };
                out.push((column(&ident), self.value(*right)?));
                return Ok(());
            }
            SqlExpr::BinaryOp { left, op: BinaryOperator::And, right } => (left, right, Connective::And),
            SqlExpr::BinaryOp { left, op: BinaryOperator::Or, right } => (left, right, Connective::Or),
            other => return Err(rejected(format!("unsupported condition {other}"))),
        };
        if connective.is_some_and(|c| c != this) {
            return Err(rejected("mixing AND and OR in one WHERE clause is not supported"));
        }
        *connective = Some(this);
        self.conditions(*left, connective, out)?;
        self.conditions(*right, connective, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_insert_with_placeholders() {
        let p = parse("INSERT INTO users (id, is_blocked) VALUES (?, false)").unwrap();
        assert_eq!(p.arity, 1);
        match p.statement {
            Statement::Insert { table, columns, values } => {
                assert_eq!(table.name, "users");
                assert_eq!(columns, vec!["id", "is_blocked"]);
                assert_eq!(values[0], Expr::Param(0));
                assert_eq!(values[1], Expr::Literal(Value::Boolean(false)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_conditional_update() {
        let p = parse("UPDATE ks.users SET email = ?, phone_number = ? WHERE id = ? IF EXISTS;").unwrap();
        assert_eq!(p.arity, 3);
        match p.statement {
            Statement::Update { table, assignments, key_column, key, if_exists } => {
                assert_eq!(table.keyspace.as_deref(), Some("ks"));
                assert_eq!(assignments[0], ("email".to_string(), Expr::Param(0)));
                assert_eq!(key_column, "id");
                assert_eq!(key, Expr::Param(2));
                assert!(if_exists);
            }
            other => panic!("unexpected {other:?}"),
        }
        let p = parse("UPDATE users SET is_blocked = true WHERE id = ?").unwrap();
        assert!(matches!(p.statement, Statement::Update { if_exists: false, .. }));
    }

    #[test]
    fn parses_select_with_or_and_limit() {
        let p = parse("select id, email from users where phone_number = ? or email = 'a''b' limit 1").unwrap();
        assert_eq!(p.arity, 1);
        match p.statement {
            Statement::Select { projection, filter, limit, .. } => {
                assert_eq!(projection, Projection::Columns(vec!["id".into(), "email".into()]));
                let filter = filter.unwrap();
                assert_eq!(filter.connective, Connective::Or);
                assert_eq!(filter.conditions[0], ("phone_number".to_string(), Expr::Param(0)));
                assert_eq!(filter.conditions[1].1, Expr::Literal(Value::Text("a'b".into())));
                assert_eq!(limit, Some(1));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn splits_only_a_trailing_condition() {
        assert_eq!(split_condition("UPDATE t SET a = ? WHERE id = ? if  exists ;"), ("UPDATE t SET a = ? WHERE id = ?", true));
        assert_eq!(split_condition("SELECT * FROM t"), ("SELECT * FROM t", false));
        assert_eq!(split_condition("SELECT * FROM notexists"), ("SELECT * FROM notexists", false));
    }

    #[test]
    fn rejects_unsupported_statements() {
        for bad in [
            "DELETE FROM users WHERE id = ?",
            "INSERT INTO users (id, email) VALUES (?)",
            "SELECT * FROM users WHERE a = ? AND b = ? OR c = ?",
            "SELECT * FROM users LIMIT 0",
            "SELECT * FROM users IF EXISTS",
            "UPDATE users SET a = ? WHERE id = ? extra",
            "UPDATE users SET a = ? WHERE id = ? AND b = ?",
            "SELECT * FROM users WHERE email = 'open",
        ] {
            assert!(matches!(parse(bad), Err(StorageError::Rejected(_))), "{bad} should be rejected");
        }
    }
}
