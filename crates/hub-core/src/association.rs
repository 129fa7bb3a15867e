//! Association replacement.
//!
//! Replaces the member set of a named relation for one owner row without
//! touching the related rows beyond their foreign key. Each replacement runs
//! inside its own savepoint so a failure leaves the relation as it was.

use crate::database::record::{self, Record};
use crate::database::{savepoint, SqlValue};
use crate::error::{HubError, Result};
use crate::schema::{self, Relation, RelationKind, Table};
use rusqlite::types::Value as SqliteValue;
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

/// Extra join columns that scope a many-to-many replacement
/// (e.g. `application_tags.source`).
pub type Scope<'a> = &'a [(&'static str, SqlValue)];

fn relation(table: &Table, name: &str) -> Result<&'static Relation> {
    table
        .relation(name)
        .ok_or_else(|| HubError::association(format!("Association not found: {}.{}", table.name, name)))
}

fn related_table(relation: &Relation) -> Result<&'static Table> {
    schema::table(relation.related)
        .ok_or_else(|| HubError::association(format!("Related table not found: {}", relation.related)))
}

fn join_table(name: &str) -> Result<&'static Table> {
    schema::table(name).ok_or_else(|| HubError::association(format!("Join table not found: {}", name)))
}

fn primary_key(table: &Table) -> Result<&'static str> {
    table
        .primary_key
        .ok_or_else(|| HubError::association(format!("PK (field) not found: {}", table.name)))
}

fn dedup(ids: &[u64]) -> Vec<u64> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Replace the members of `relation` on `owner` with `related` ids.
pub fn replace_ids(conn: &Connection, table: &Table, name: &str, owner: u64, related: &[u64]) -> Result<()> {
    replace_scoped(conn, table, name, owner, related, &[])
}

/// Like [`replace_ids`], restricted to join rows matching `scope`; inserted
/// join rows carry the scope values.
pub fn replace_scoped(
    conn: &Connection,
    table: &Table,
    name: &str,
    owner: u64,
    related: &[u64],
    scope: Scope<'_>,
) -> Result<()> {
    let relation = relation(table, name)?;
    let related = dedup(related);
    debug!(
        "Replace association: {}.{} owner={} count={}",
        table.name,
        relation.name,
        owner,
        related.len()
    );
    savepoint(conn, "association", |conn| match relation.kind {
        RelationKind::ManyToMany {
            join_table: join,
            owner_fk,
            related_fk,
        } => {
            let join = join_table(join)?;
            for (column, _) in scope {
                if join.column(column).is_none() {
                    return Err(HubError::association(format!(
                        "Column {} not found on {}.",
                        column, join.name
                    )));
                }
            }
            replace_many_to_many(conn, join.name, owner_fk, related_fk, owner, &related, scope)
        }
        RelationKind::HasMany { fk, owner: true } => {
            if !scope.is_empty() {
                return Err(HubError::association("Association (kind) not supported."));
            }
            let child = related_table(relation)?;
            // Owned children cannot be re-created from ids alone; move the
            // listed rows and drop the rest.
            let pk = primary_key(child)?;
            let keep = SqlValue::from(related.clone());
            let mut query = crate::database::Query::select(child.name)
                .filter(format!("{} = ?", fk), vec![owner.into()]);
            if !related.is_empty() {
                query = query.filter(format!("{} NOT IN ?", pk), vec![keep]);
            }
            let (clause, binds) = query.where_sql();
            conn.execute(
                &format!("DELETE FROM {}{}", child.name, clause),
                params_from_iter(binds.iter()),
            )?;
            set_fk(conn, child, fk, owner, &related)
        }
        RelationKind::HasMany { fk, owner: false } => {
            if !scope.is_empty() {
                return Err(HubError::association("Association (kind) not supported."));
            }
            let child = related_table(relation)?;
            conn.execute(
                &format!("UPDATE {} SET {} = NULL WHERE {} = ?1", child.name, fk, fk),
                [owner as i64],
            )?;
            set_fk(conn, child, fk, owner, &related)
        }
    })
}

fn replace_many_to_many(
    conn: &Connection,
    join: &str,
    owner_fk: &str,
    related_fk: &str,
    owner: u64,
    related: &[u64],
    scope: Scope<'_>,
) -> Result<()> {
    let mut clause = format!("{} = ?", owner_fk);
    let mut binds = vec![SqliteValue::Integer(owner as i64)];
    for (column, value) in scope {
        clause.push_str(&format!(" AND {} = ?", column));
        binds.push(sqlite_value(value)?);
    }
    conn.execute(
        &format!("DELETE FROM {} WHERE {}", join, clause),
        params_from_iter(binds.iter()),
    )?;

    let mut columns = vec![owner_fk, related_fk];
    columns.extend(scope.iter().map(|(c, _)| *c));
    let marks = vec!["?"; columns.len()].join(", ");
    let sql = format!("INSERT INTO {} ({}) VALUES ({})", join, columns.join(", "), marks);
    let mut stmt = conn.prepare(&sql)?;
    for id in related {
        let mut row = vec![
            SqliteValue::Integer(owner as i64),
            SqliteValue::Integer(*id as i64),
        ];
        for (_, value) in scope {
            row.push(sqlite_value(value)?);
        }
        stmt.execute(params_from_iter(row.iter()))?;
    }
    Ok(())
}

fn set_fk(conn: &Connection, child: &Table, fk: &str, owner: u64, related: &[u64]) -> Result<()> {
    let pk = primary_key(child)?;
    let sql = format!("UPDATE {} SET {} = ?1 WHERE {} = ?2", child.name, fk, pk);
    let mut stmt = conn.prepare(&sql)?;
    for id in related {
        if stmt.execute([owner as i64, *id as i64])? == 0 {
            return Err(HubError::not_found(child.name, id));
        }
    }
    Ok(())
}

fn sqlite_value(value: &SqlValue) -> Result<SqliteValue> {
    Ok(match value {
        SqlValue::Null => SqliteValue::Null,
        SqlValue::Integer(n) => SqliteValue::Integer(*n),
        SqlValue::Boolean(b) => SqliteValue::Integer(i64::from(*b)),
        SqlValue::Text(s) => SqliteValue::Text(s.clone()),
        SqlValue::List(_) => return Err(HubError::association_input("Scope value must be scalar.")),
    })
}

/// Replace the owned children of a has-many relation with new rows.
///
/// Existing children are deleted; each entry of `children` gets the owner's
/// id in its foreign key column and is inserted.
pub fn replace<O: Record, R: Record>(conn: &Connection, owner: &O, name: &str, children: &mut [R]) -> Result<()> {
    let relation = relation(O::table(), name)?;
    match relation.kind {
        RelationKind::HasMany { fk, owner: true } => {
            if relation.related != R::table().name {
                return Err(HubError::association(format!(
                    "Association {} relates {}, not {}.",
                    relation.name,
                    relation.related,
                    R::table().name
                )));
            }
            savepoint(conn, "association", |conn| {
                conn.execute(
                    &format!("DELETE FROM {} WHERE {} = ?1", R::table().name, fk),
                    [owner.id() as i64],
                )?;
                for child in children.iter_mut() {
                    child.set_id(0);
                    record::create_with(conn, child, &[(fk, SqliteValue::Integer(owner.id() as i64))])?;
                }
                Ok(())
            })
        }
        _ => {
            let ids: Vec<u64> = children.iter().map(|c| c.id()).collect();
            if ids.contains(&0) {
                return Err(HubError::association_input("PK (value) not set."));
            }
            replace_ids(conn, O::table(), name, owner.id(), &ids)
        }
    }
}

/// Replace from a JSON document: an array of ids or of `{"id": n}` objects.
pub fn replace_value(
    conn: &Connection,
    table: &Table,
    name: &str,
    owner: u64,
    value: &serde_json::Value,
) -> Result<()> {
    let ids = ids_of(value)?;
    replace_ids(conn, table, name, owner, &ids)
}

/// Ids listed by a JSON array of ids or `{"id": n}` objects.
pub fn ids_of(value: &serde_json::Value) -> Result<Vec<u64>> {
    let items = value
        .as_array()
        .ok_or_else(|| HubError::association_input("Must be SLICE."))?;
    items
        .iter()
        .map(|item| {
            let id = match item {
                serde_json::Value::Object(map) => map.get("id").and_then(|v| v.as_u64()),
                other => other.as_u64(),
            };
            id.ok_or_else(|| HubError::association_input("PK (type) not supported."))
        })
        .collect()
}

/// Member ids of `relation` on `owner`, ordered by id.
pub fn related_ids(conn: &Connection, table: &Table, name: &str, owner: u64) -> Result<Vec<u64>> {
    related_ids_scoped(conn, table, name, owner, &[])
}

/// Like [`related_ids`], restricted to join rows matching `scope`.
pub fn related_ids_scoped(
    conn: &Connection,
    table: &Table,
    name: &str,
    owner: u64,
    scope: Scope<'_>,
) -> Result<Vec<u64>> {
    let relation = relation(table, name)?;
    let (sql, mut binds) = match relation.kind {
        RelationKind::ManyToMany {
            join_table: join,
            owner_fk,
            related_fk,
        } => {
            let join = join_table(join)?;
            (
                format!(
                    "SELECT DISTINCT {} FROM {} WHERE {} = ?",
                    related_fk, join.name, owner_fk
                ),
                vec![SqliteValue::Integer(owner as i64)],
            )
        }
        RelationKind::HasMany { fk, .. } => {
            let child = related_table(relation)?;
            (
                format!("SELECT {} FROM {} WHERE {} = ?", primary_key(child)?, child.name, fk),
                vec![SqliteValue::Integer(owner as i64)],
            )
        }
    };
    let mut sql = sql;
    for (column, value) in scope {
        sql.push_str(&format!(" AND {} = ?", column));
        binds.push(sqlite_value(value)?);
    }
    sql.push_str(" ORDER BY 1");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(binds.iter()), |row| row.get::<_, i64>(0))?;
    let ids = rows.collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids.into_iter().map(|id| id.max(0) as u64).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::record::{create, create_all, list_all};
    use crate::database::Database;
    use crate::model::{Application, Archetype, MigrationWave, Tag, TagCategory, TargetProfile};

    fn setup(tx: &Connection) -> Result<(Vec<Tag>, Application)> {
        let mut category = TagCategory {
            name: "Language".into(),
            ..Default::default()
        };
        create(tx, &mut category)?;
        let mut tags = vec![
            Tag::new("Java", category.id),
            Tag::new("Go", category.id),
            Tag::new("Rust", category.id),
        ];
        create_all(tx, &mut tags)?;
        let mut app = Application {
            name: "app".into(),
            ..Default::default()
        };
        create(tx, &mut app)?;
        Ok((tags, app))
    }

    #[test]
    fn test_many_to_many_replace() {
        let db = Database::open_in_memory().unwrap();
        db.write(|tx| {
            let (tags, app) = setup(tx)?;
            replace_ids(tx, &schema::APPLICATION, "tags", app.id, &[tags[0].id, tags[1].id])?;
            replace_ids(tx, &schema::APPLICATION, "tags", app.id, &[tags[2].id, tags[1].id, tags[2].id])?;
            let ids = related_ids(tx, &schema::APPLICATION, "tags", app.id)?;
            assert_eq!(ids, vec![tags[1].id, tags[2].id]);
            // Related rows are untouched.
            assert_eq!(list_all::<Tag>(tx)?.len(), 3);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_scoped_replace_keeps_other_sources() {
        let db = Database::open_in_memory().unwrap();
        db.write(|tx| {
            let (tags, app) = setup(tx)?;
            let analysis = [("source", SqlValue::from("analysis"))];
            let user = [("source", SqlValue::from(""))];
            replace_scoped(tx, &schema::APPLICATION, "tags", app.id, &[tags[0].id], &analysis)?;
            replace_scoped(tx, &schema::APPLICATION, "tags", app.id, &[tags[1].id], &user)?;
            replace_scoped(tx, &schema::APPLICATION, "tags", app.id, &[tags[2].id], &user)?;
            let all = related_ids(tx, &schema::APPLICATION, "tags", app.id)?;
            assert_eq!(all, vec![tags[0].id, tags[2].id]);
            let only = related_ids_scoped(tx, &schema::APPLICATION, "tags", app.id, &user)?;
            assert_eq!(only, vec![tags[2].id]);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_has_many_reference_replace() {
        let db = Database::open_in_memory().unwrap();
        db.write(|tx| {
            let mut wave = MigrationWave {
                name: "w1".into(),
                ..Default::default()
            };
            create(tx, &mut wave)?;
            let mut apps: Vec<Application> = (1..=3)
                .map(|n| Application {
                    name: format!("a{}", n),
                    ..Default::default()
                })
                .collect();
            create_all(tx, &mut apps)?;
            replace_ids(tx, &schema::MIGRATION_WAVE, "applications", wave.id, &[apps[0].id, apps[1].id])?;
            replace_ids(tx, &schema::MIGRATION_WAVE, "applications", wave.id, &[apps[2].id])?;
            let ids = related_ids(tx, &schema::MIGRATION_WAVE, "applications", wave.id)?;
            assert_eq!(ids, vec![apps[2].id]);
            // Released children still exist with a cleared reference.
            let loaded = list_all::<Application>(tx)?;
            assert_eq!(loaded.len(), 3);
            assert_eq!(loaded[0].migration_wave_id, None);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_has_many_owner_replace() {
        let db = Database::open_in_memory().unwrap();
        db.write(|tx| {
            let mut archetype = Archetype {
                name: "web".into(),
                ..Default::default()
            };
            create(tx, &mut archetype)?;
            let mut first = vec![TargetProfile {
                name: "old".into(),
                ..Default::default()
            }];
            replace(tx, &archetype, "profiles", &mut first)?;
            let mut second = vec![
                TargetProfile {
                    name: "a".into(),
                    ..Default::default()
                },
                TargetProfile {
                    name: "b".into(),
                    ..Default::default()
                },
            ];
            replace(tx, &archetype, "profiles", &mut second)?;
            let profiles = list_all::<TargetProfile>(tx)?;
            let names: Vec<&str> = profiles.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, vec!["a", "b"]);
            assert!(profiles.iter().all(|p| p.archetype_id == Some(archetype.id)));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_errors() {
        let db = Database::open_in_memory().unwrap();
        db.write(|tx| {
            let (_, app) = setup(tx)?;
            let err = replace_ids(tx, &schema::APPLICATION, "nope", app.id, &[]).unwrap_err();
            assert_eq!(err.status_code(), 500);
            let err = replace_value(tx, &schema::APPLICATION, "tags", app.id, &serde_json::json!({"id": 1}))
                .unwrap_err();
            assert!(err.to_string().contains("Must be SLICE."));
            assert_eq!(err.status_code(), 400);
            assert_eq!(ids_of(&serde_json::json!([1, {"id": 2}]))?, vec![1, 2]);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_failed_replace_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        db.write(|tx| {
            let (tags, app) = setup(tx)?;
            replace_ids(tx, &schema::APPLICATION, "tags", app.id, &[tags[0].id])?;
            // Unknown tag id violates the foreign key.
            assert!(replace_ids(tx, &schema::APPLICATION, "tags", app.id, &[tags[1].id, 999]).is_err());
            let ids = related_ids(tx, &schema::APPLICATION, "tags", app.id)?;
            assert_eq!(ids, vec![tags[0].id]);
            Ok(())
        })
        .unwrap();
    }
}
