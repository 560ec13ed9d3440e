//! Test doubles for the database and logger capabilities.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use oauth2_store::{Database, Logger, Row, StorageError, StorageResult, Value};

// =============================================================================
// Logger
// =============================================================================

/// Logger that keeps every message in memory.
#[derive(Default)]
pub struct MemoryLogger {
    lines: Mutex<Vec<String>>,
}

impl MemoryLogger {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl Logger for MemoryLogger {
    fn printf(&self, args: fmt::Arguments<'_>) {
        self.lines.lock().unwrap().push(args.to_string());
    }
}

// =============================================================================
// Recording Database
// =============================================================================

/// How [`RecordingDatabase::execute`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecBehavior {
    Succeed,
    NoRows,
    Fail,
    Panic,
    Hang,
}

/// Database that records statements and answers with a fixed behavior.
pub struct RecordingDatabase {
    statements: Mutex<Vec<String>>,
    exec: Mutex<ExecBehavior>,
    select: Mutex<Option<Row>>,
    deletes: AtomicUsize,
}

impl RecordingDatabase {
    pub fn new() -> Self {
        Self::with_behavior(ExecBehavior::Succeed)
    }

    pub fn with_behavior(exec: ExecBehavior) -> Self {
        Self {
            statements: Mutex::new(Vec::new()),
            exec: Mutex::new(exec),
            select: Mutex::new(None),
            deletes: AtomicUsize::new(0),
        }
    }

    pub fn set_behavior(&self, exec: ExecBehavior) {
        *self.exec.lock().unwrap() = exec;
    }

    /// Row returned by every select; `None` answers `NoRows`.
    pub fn set_select_row(&self, row: Option<Row>) {
        *self.select.lock().unwrap() = row;
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Database for RecordingDatabase {
    async fn execute(&self, statement: &str, _params: &[Value]) -> StorageResult<()> {
        self.statements.lock().unwrap().push(statement.to_string());
        if statement.starts_with("DELETE FROM") {
            self.deletes.fetch_add(1, Ordering::SeqCst);
        }

        let behavior = *self.exec.lock().unwrap();
        match behavior {
            ExecBehavior::Succeed => Ok(()),
            ExecBehavior::NoRows => Err(StorageError::NoRows),
            ExecBehavior::Fail => Err(StorageError::database("connection refused")),
            ExecBehavior::Panic => panic!("driver bug"),
            ExecBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }

    async fn select_one(&self, statement: &str, _params: &[Value]) -> StorageResult<Row> {
        self.statements.lock().unwrap().push(statement.to_string());
        self.select.lock().unwrap().clone().ok_or(StorageError::NoRows)
    }
}

// =============================================================================
// Fake Database
// =============================================================================

/// In-memory database understanding the statement shapes the stores issue:
/// `CREATE ...`, `INSERT INTO t (cols) VALUES (...)`,
/// `SELECT cols FROM t WHERE col = $1`, `DELETE FROM t WHERE col = $1` and
/// `DELETE FROM t WHERE col <= $1`.
#[derive(Default)]
pub struct FakeDatabase {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    next_id: AtomicUsize,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .map_or(0, Vec::len)
    }

    fn insert(&self, statement: &str, params: &[Value]) -> StorageResult<()> {
        let table = word_after(statement, "INTO")?;
        let open = statement.find('(').ok_or_else(|| unsupported(statement))?;
        let close = statement.find(')').ok_or_else(|| unsupported(statement))?;
        let columns: Vec<&str> = statement[open + 1..close]
            .split(',')
            .map(str::trim)
            .collect();

        let mut row = Row::new();
        if !columns.contains(&"id") {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
            row.push("id", id);
        }
        for (column, value) in columns.iter().zip(params) {
            row.push(*column, value.clone());
        }

        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table).or_default();
        if columns.contains(&"id") && rows.iter().any(|r| r.get("id") == row.get("id")) {
            return Err(StorageError::database(
                "duplicate key value violates unique constraint",
            ));
        }
        rows.push(row);
        Ok(())
    }

    fn delete(&self, statement: &str, params: &[Value]) -> StorageResult<()> {
        let table = word_after(statement, "FROM")?;
        let (column, op) = predicate(statement)?;
        let param = params.first().ok_or_else(|| unsupported(statement))?;

        let mut tables = self.tables.lock().unwrap();
        if let Some(rows) = tables.get_mut(&table) {
            rows.retain(|row| !matches(row, &column, &op, param));
        }
        Ok(())
    }
}

#[async_trait]
impl Database for FakeDatabase {
    async fn execute(&self, statement: &str, params: &[Value]) -> StorageResult<()> {
        let statement = statement.trim_start();
        if statement.starts_with("CREATE") {
            Ok(())
        } else if statement.starts_with("INSERT INTO") {
            self.insert(statement, params)
        } else if statement.starts_with("DELETE FROM") {
            self.delete(statement, params)
        } else {
            Err(unsupported(statement))
        }
    }

    async fn select_one(&self, statement: &str, params: &[Value]) -> StorageResult<Row> {
        let table = word_after(statement, "FROM")?;
        let (column, op) = predicate(statement)?;
        let param = params.first().ok_or_else(|| unsupported(statement))?;

        let tables = self.tables.lock().unwrap();
        tables
            .get(&table)
            .and_then(|rows| rows.iter().find(|row| matches(row, &column, &op, param)))
            .cloned()
            .ok_or(StorageError::NoRows)
    }
}

fn unsupported(statement: &str) -> StorageError {
    StorageError::database(format!("unsupported statement: {statement}"))
}

fn word_after(statement: &str, keyword: &str) -> StorageResult<String> {
    let mut words = statement.split_whitespace();
    words
        .find(|w| *w == keyword)
        .and_then(|_| words.next())
        .map(str::to_string)
        .ok_or_else(|| unsupported(statement))
}

fn predicate(statement: &str) -> StorageResult<(String, String)> {
    let mut words = statement.split_whitespace();
    words.find(|w| *w == "WHERE").ok_or_else(|| unsupported(statement))?;
    let column = words.next().ok_or_else(|| unsupported(statement))?;
    let op = words.next().ok_or_else(|| unsupported(statement))?;
    Ok((column.to_string(), op.to_string()))
}

fn matches(row: &Row, column: &str, op: &str, param: &Value) -> bool {
    match (op, row.get(column), param) {
        ("=", Some(value), _) => value == param,
        ("<=", Some(Value::Timestamp(at)), Value::Timestamp(cutoff)) => at <= cutoff,
        _ => false,
    }
}
