use log::warn;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

pub const DB_FILE: &str = "sims.sqlite3";

pub fn open(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS storage(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Record keys are namespaced per account: `students` for account `7`
/// lives under `students_7`. Global keys (`user`, `users`, `setup.*`)
/// skip the suffix.
pub fn scoped_key(key: &str, user_id: &str) -> String {
    format!("{}_{}", key, user_id)
}

fn read_raw(conn: &Connection, full_key: &str) -> Option<String> {
    match conn
        .query_row("SELECT value FROM storage WHERE key = ?", [full_key], |r| {
            r.get::<_, String>(0)
        })
        .optional()
    {
        Ok(v) => v,
        Err(e) => {
            warn!("storage read failed for {}: {}", full_key, e);
            None
        }
    }
}

fn write_raw(conn: &Connection, full_key: &str, value: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO storage(key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        (full_key, value),
    )?;
    Ok(())
}

/// Reads one account's value. Missing keys and malformed stored JSON
/// both fall back to `default`; reads never fail outward.
pub fn get<T: DeserializeOwned>(conn: &Connection, key: &str, user_id: &str, default: T) -> T {
    get_full(conn, &scoped_key(key, user_id), default)
}

pub fn get_global<T: DeserializeOwned>(conn: &Connection, key: &str, default: T) -> T {
    get_full(conn, key, default)
}

fn get_full<T: DeserializeOwned>(conn: &Connection, full_key: &str, default: T) -> T {
    let Some(text) = read_raw(conn, full_key) else {
        return default;
    };
    match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            warn!("discarding malformed value under {}: {}", full_key, e);
            default
        }
    }
}

pub fn set<T: Serialize>(
    conn: &Connection,
    key: &str,
    user_id: &str,
    value: &T,
) -> anyhow::Result<()> {
    set_full(conn, &scoped_key(key, user_id), value)
}

pub fn set_global<T: Serialize>(conn: &Connection, key: &str, value: &T) -> anyhow::Result<()> {
    set_full(conn, key, value)
}

fn set_full<T: Serialize>(conn: &Connection, full_key: &str, value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string(value)?;
    write_raw(conn, full_key, &text)
}

pub fn has(conn: &Connection, key: &str, user_id: &str) -> bool {
    read_raw(conn, &scoped_key(key, user_id)).is_some()
}

#[allow(dead_code)]
pub fn remove(conn: &Connection, key: &str, user_id: &str) -> anyhow::Result<()> {
    remove_full(conn, &scoped_key(key, user_id))
}

pub fn remove_global(conn: &Connection, key: &str) -> anyhow::Result<()> {
    remove_full(conn, key)
}

fn remove_full(conn: &Connection, full_key: &str) -> anyhow::Result<()> {
    conn.execute("DELETE FROM storage WHERE key = ?", [full_key])?;
    Ok(())
}
