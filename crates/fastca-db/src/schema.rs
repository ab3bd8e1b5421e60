//! # Schema Snapshot
//!
//! Reads the logical shape of the on-disk schema and compares it with the
//! schema this build expects.
//!
//! ## What Is Compared
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Per-table snapshot                                 │
//! │                                                                         │
//! │  columns       pragma_table_info        name, type, not null,          │
//! │                                         default, pk position           │
//! │  foreign keys  pragma_foreign_key_list  parent, from, to, actions      │
//! │  indices       pragma_index_list/info   name, unique, columns          │
//! │                (origin 'c' only: implicit sqlite_autoindex_* are       │
//! │                 skipped, their names depend on table history)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A database upgraded through the migration chain and a database created
//! fresh at the current version must produce equal snapshots.

use std::collections::BTreeMap;
use std::fmt;

use sqlx::{Row, SqliteConnection};

use crate::error::{DbError, DbResult};

// =============================================================================
// Snapshot Types
// =============================================================================

/// One column as reported by `pragma_table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub type_name: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    /// 1-based position in the primary key, 0 when not part of it.
    pub primary_key_position: i64,
}

/// One foreign key as reported by `pragma_foreign_key_list`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ForeignKeyInfo {
    pub parent_table: String,
    pub from: String,
    pub to: String,
    pub on_update: String,
    pub on_delete: String,
}

/// One explicitly created index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct IndexInfo {
    pub name: String,
    pub unique: bool,
    pub columns: Vec<String>,
}

/// Logical description of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
    pub indices: Vec<IndexInfo>,
}

impl fmt::Display for TableInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let mut s = format!("{} {}", c.name, c.type_name);
                if c.not_null {
                    s.push_str(" NOT NULL");
                }
                if let Some(default) = &c.default_value {
                    s.push_str(&format!(" DEFAULT {}", default));
                }
                if c.primary_key_position > 0 {
                    s.push_str(" PK");
                }
                s
            })
            .collect();
        write!(f, "{}({})", self.name, columns.join(", "))?;
        for fk in &self.foreign_keys {
            write!(
                f,
                " FK {}->{}.{} ON DELETE {}",
                fk.from, fk.parent_table, fk.to, fk.on_delete
            )?;
        }
        for index in &self.indices {
            write!(f, " INDEX {}({})", index.name, index.columns.join(", "))?;
        }
        Ok(())
    }
}

/// All user tables of a database, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaSnapshot {
    pub tables: BTreeMap<String, TableInfo>,
}

// =============================================================================
// Reading
// =============================================================================

impl SchemaSnapshot {
    /// Reads the snapshot of every user table.
    ///
    /// SQLite internal tables (`sqlite_*`) are skipped.
    pub async fn read(conn: &mut SqliteConnection) -> DbResult<Self> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )
        .fetch_all(&mut *conn)
        .await?;

        let mut tables = BTreeMap::new();
        for name in names {
            let table = read_table(conn, &name).await?;
            tables.insert(name, table);
        }

        Ok(SchemaSnapshot { tables })
    }

    /// Returns the table with the given name, if present.
    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.get(name)
    }

    /// Checks that every table of `expected` exists here with the same shape.
    ///
    /// Extra tables are tolerated.
    ///
    /// ## Returns
    /// * `Ok(())` - Schema matches
    /// * `Err(DbError::SchemaMismatch)` - First table that differs
    pub fn verify(&self, expected: &SchemaSnapshot) -> DbResult<()> {
        for (name, want) in &expected.tables {
            match self.tables.get(name) {
                Some(found) if found == want => {}
                Some(found) => {
                    return Err(DbError::SchemaMismatch {
                        table: name.clone(),
                        expected: want.to_string(),
                        found: found.to_string(),
                    })
                }
                None => {
                    return Err(DbError::SchemaMismatch {
                        table: name.clone(),
                        expected: want.to_string(),
                        found: "<missing>".to_string(),
                    })
                }
            }
        }
        Ok(())
    }
}

async fn read_table(conn: &mut SqliteConnection, table: &str) -> DbResult<TableInfo> {
    let columns = sqlx::query(
        r#"SELECT name, type, "notnull", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid"#,
    )
    .bind(table)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|row| {
        Ok(ColumnInfo {
            name: row.try_get("name")?,
            type_name: row.try_get("type")?,
            not_null: row.try_get::<i64, _>("notnull")? != 0,
            default_value: row.try_get("dflt_value")?,
            primary_key_position: row.try_get("pk")?,
        })
    })
    .collect::<Result<Vec<_>, sqlx::Error>>()?;

    let mut foreign_keys = sqlx::query(
        r#"SELECT "table", "from", "to", on_update, on_delete FROM pragma_foreign_key_list(?1)"#,
    )
    .bind(table)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|row| {
        Ok(ForeignKeyInfo {
            parent_table: row.try_get("table")?,
            from: row.try_get("from")?,
            to: row.try_get::<Option<String>, _>("to")?.unwrap_or_default(),
            on_update: row.try_get("on_update")?,
            on_delete: row.try_get("on_delete")?,
        })
    })
    .collect::<Result<Vec<_>, sqlx::Error>>()?;
    foreign_keys.sort();

    let index_rows = sqlx::query(r#"SELECT name, "unique" FROM pragma_index_list(?1) WHERE origin = 'c'"#)
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;

    let mut indices = Vec::with_capacity(index_rows.len());
    for row in index_rows {
        let name: String = row.try_get("name")?;
        let unique = row.try_get::<i64, _>("unique")? != 0;
        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")
                .bind(&name)
                .fetch_all(&mut *conn)
                .await?;
        indices.push(IndexInfo {
            name,
            unique,
            columns,
        });
    }
    indices.sort();

    Ok(TableInfo {
        name: table.to_string(),
        columns,
        foreign_keys,
        indices,
    })
}

// =============================================================================
// Expected Schema
// =============================================================================

fn column(name: &str, type_name: &str, default_value: Option<&str>, pk: i64) -> ColumnInfo {
    ColumnInfo {
        name: name.to_string(),
        type_name: type_name.to_string(),
        not_null: true,
        default_value: default_value.map(str::to_string),
        primary_key_position: pk,
    }
}

/// The schema of the current version.
///
/// ```text
/// items         id TEXT PK
/// measurements  id TEXT PK, owner_id → items(id) ON DELETE CASCADE,
///               name, length, width, count, created_at
///               INDEX index_measurements_owner_id(owner_id)
/// ```
pub fn expected() -> SchemaSnapshot {
    let items = TableInfo {
        name: "items".to_string(),
        columns: vec![column("id", "TEXT", None, 1)],
        foreign_keys: Vec::new(),
        indices: Vec::new(),
    };

    let measurements = TableInfo {
        name: "measurements".to_string(),
        columns: vec![
            column("id", "TEXT", None, 1),
            column("owner_id", "TEXT", None, 0),
            column("name", "TEXT", Some("''"), 0),
            column("length", "REAL", Some("0"), 0),
            column("width", "REAL", Some("0"), 0),
            column("count", "INTEGER", Some("1"), 0),
            column("created_at", "INTEGER", Some("0"), 0),
        ],
        foreign_keys: vec![ForeignKeyInfo {
            parent_table: "items".to_string(),
            from: "owner_id".to_string(),
            to: "id".to_string(),
            on_update: "NO ACTION".to_string(),
            on_delete: "CASCADE".to_string(),
        }],
        indices: vec![IndexInfo {
            name: "index_measurements_owner_id".to_string(),
            unique: false,
            columns: vec!["owner_id".to_string()],
        }],
    };

    let mut tables = BTreeMap::new();
    tables.insert(items.name.clone(), items);
    tables.insert(measurements.name.clone(), measurements);
    SchemaSnapshot { tables }
}

// =============================================================================
// Unit Tests
// =============================================================================
