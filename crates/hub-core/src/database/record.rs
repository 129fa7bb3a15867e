//! Generic row persistence over schema descriptors.

use super::pk::SEQUENCE;
use super::query::{Query, SqlValue};
use crate::error::{HubError, Result};
use crate::schema::Table;
use rusqlite::types::Value as SqliteValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A model persisted as one row of a keyed table.
pub trait Record: Sized {
    /// Backing table.
    fn table() -> &'static Table;

    fn id(&self) -> u64;

    fn set_id(&mut self, id: u64);

    /// Build from a `SELECT *` row.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Column values other than the primary key.
    fn values(&self) -> Result<Vec<(&'static str, SqliteValue)>>;

    /// Called before insert with the current time.
    fn stamp(&mut self, _now: &str) {}
}

/// Insert `record`, assigning or reserving its id.
pub fn create<R: Record>(conn: &Connection, record: &mut R) -> Result<()> {
    create_with(conn, record, &[])
}

/// Insert `record` with some column values replaced by `overrides`.
pub fn create_with<R: Record>(
    conn: &Connection,
    record: &mut R,
    overrides: &[(&str, SqliteValue)],
) -> Result<()> {
    let id = SEQUENCE.assign(conn, R::table(), record.id())?;
    record.set_id(id);
    record.stamp(&super::now());
    insert(conn, record, overrides)
}

/// Insert each record in order.
pub fn create_all<R: Record>(conn: &Connection, records: &mut [R]) -> Result<()> {
    for record in records.iter_mut() {
        create(conn, record)?;
    }
    Ok(())
}

fn insert<R: Record>(conn: &Connection, record: &R, overrides: &[(&str, SqliteValue)]) -> Result<()> {
    let table = R::table();
    let mut values = record.values()?;
    for (column, value) in overrides {
        if let Some(slot) = values.iter_mut().find(|(name, _)| *name == *column) {
            slot.1 = value.clone();
        }
    }
    let mut columns = vec![primary_key(table)?];
    columns.extend(values.iter().map(|(name, _)| *name));
    let marks = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.name,
        columns.join(", "),
        marks
    );
    let mut binds = vec![SqliteValue::Integer(record.id() as i64)];
    binds.extend(values.into_iter().map(|(_, v)| v));
    conn.execute(&sql, params_from_iter(binds.iter()))?;
    Ok(())
}

/// Update every column of an existing row.
pub fn update<R: Record>(conn: &Connection, record: &R) -> Result<()> {
    let table = R::table();
    let values = record.values()?;
    let assignments: Vec<String> = values.iter().map(|(name, _)| format!("{} = ?", name)).collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table.name,
        assignments.join(", "),
        primary_key(table)?
    );
    let mut binds: Vec<SqliteValue> = values.into_iter().map(|(_, v)| v).collect();
    binds.push(SqliteValue::Integer(record.id() as i64));
    let changed = conn.execute(&sql, params_from_iter(binds.iter()))?;
    if changed == 0 {
        return Err(HubError::not_found(table.name, record.id()));
    }
    Ok(())
}

/// Create when new (or unknown id); update otherwise.
pub fn save<R: Record>(conn: &Connection, record: &mut R) -> Result<()> {
    if record.id() != 0 && exists::<R>(conn, record.id())? {
        update(conn, record)
    } else {
        create(conn, record)
    }
}

/// Fetch by id.
pub fn find<R: Record>(conn: &Connection, id: u64) -> Result<Option<R>> {
    let table = R::table();
    let sql = format!("SELECT * FROM {} WHERE {} = ?1", table.name, primary_key(table)?);
    Ok(conn
        .query_row(&sql, params![id as i64], |row| R::from_row(row))
        .optional()?)
}

/// Fetch by id; missing rows are `NotFound`.
pub fn get<R: Record>(conn: &Connection, id: u64) -> Result<R> {
    find(conn, id)?.ok_or_else(|| HubError::not_found(R::table().name, id))
}

pub fn exists<R: Record>(conn: &Connection, id: u64) -> Result<bool> {
    let table = R::table();
    let sql = format!("SELECT 1 FROM {} WHERE {} = ?1", table.name, primary_key(table)?);
    Ok(conn
        .query_row(&sql, params![id as i64], |_| Ok(()))
        .optional()?
        .is_some())
}

/// First row matching a WHERE fragment.
pub fn first<R: Record>(conn: &Connection, sql: &str, binds: Vec<SqlValue>) -> Result<Option<R>> {
    let query = Query::select(R::table().name).filter(sql, binds).order_by("id").limit(1);
    Ok(list::<R>(conn, &query)?.into_iter().next())
}

/// Rows selected by `query`.
pub fn list<R: Record>(conn: &Connection, query: &Query) -> Result<Vec<R>> {
    let (sql, binds) = query.to_sql();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(binds.iter()), |row| R::from_row(row))?;
    Ok(rows.collect::<rusqlite::Result<Vec<R>>>()?)
}

/// All rows ordered by id.
pub fn list_all<R: Record>(conn: &Connection) -> Result<Vec<R>> {
    list(conn, &Query::select(R::table().name).order_by("id"))
}

/// Rows whose id is in `ids`, ordered by id.
pub fn list_ids<R: Record>(conn: &Connection, ids: &[u64]) -> Result<Vec<R>> {
    let ids: Vec<SqlValue> = ids.iter().map(|id| SqlValue::from(*id)).collect();
    let query = Query::select(R::table().name)
        .filter("id IN ?", vec![SqlValue::List(ids)])
        .order_by("id");
    list(conn, &query)
}

/// Row count selected by `query`.
pub fn count(conn: &Connection, query: &Query) -> Result<u64> {
    let (sql, binds) = query.count_sql();
    let n: i64 = conn.query_row(&sql, params_from_iter(binds.iter()), |row| row.get(0))?;
    Ok(n.max(0) as u64)
}

/// Delete by id; returns false when no row existed.
pub fn delete<R: Record>(conn: &Connection, id: u64) -> Result<bool> {
    let table = R::table();
    let sql = format!("DELETE FROM {} WHERE {} = ?1", table.name, primary_key(table)?);
    Ok(conn.execute(&sql, params![id as i64])? > 0)
}

fn primary_key(table: &Table) -> Result<&'static str> {
    table
        .primary_key
        .ok_or_else(|| HubError::association(format!("PK (field) not found on {}.", table.name)))
}

// ========================================
// Column codecs
// ========================================

/// Optional id column value.
pub fn id_value(id: Option<u64>) -> SqliteValue {
    match id {
        Some(id) if id > 0 => SqliteValue::Integer(id as i64),
        _ => SqliteValue::Null,
    }
}

pub fn text(value: &str) -> SqliteValue {
    SqliteValue::Text(value.to_string())
}

pub fn opt_text(value: &Option<String>) -> SqliteValue {
    value
        .as_ref()
        .map_or(SqliteValue::Null, |v| SqliteValue::Text(v.clone()))
}

pub fn boolean(value: bool) -> SqliteValue {
    SqliteValue::Integer(i64::from(value))
}

/// JSON-encoded column value.
pub fn json<T: Serialize>(value: &T) -> Result<SqliteValue> {
    Ok(SqliteValue::Text(serde_json::to_string(value)?))
}

/// Read an optional id column.
pub fn get_id(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<u64>> {
    let id: Option<i64> = row.get(column)?;
    Ok(id.filter(|n| *n > 0).map(|n| n as u64))
}

/// Read the primary key column.
pub fn get_pk(row: &Row<'_>) -> rusqlite::Result<u64> {
    let id: i64 = row.get("id")?;
    Ok(id.max(0) as u64)
}

/// Read a JSON column; NULL yields the default.
pub fn get_json<T: DeserializeOwned + Default>(row: &Row<'_>, column: &str) -> rusqlite::Result<T> {
    let raw: Option<String> = row.get(column)?;
    match raw {
        None => Ok(T::default()),
        Some(s) if s.is_empty() => Ok(T::default()),
        Some(s) => serde_json::from_str(&s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        }),
    }
}

/// Read a text column; NULL yields empty.
pub fn get_text(row: &Row<'_>, column: &str) -> rusqlite::Result<String> {
    let value: Option<String> = row.get(column)?;
    Ok(value.unwrap_or_default())
}
