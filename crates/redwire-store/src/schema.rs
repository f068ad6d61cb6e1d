use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    // Small WAL: a world is saved whole on every flush.
    conn.pragma_update(None, "wal_autocheckpoint", 100)?;

    // Non-fatal: in-memory and fresh databases legitimately fail this.
    if conn
        .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
        .is_ok()
    {
        tracing::debug!("startup WAL checkpoint complete");
    }

    // `connections` holds a JSON array of positions. Peers are not foreign
    // keys: a record may name a chain that is saved later or never.
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chain_nodes (
            x                  INTEGER NOT NULL,
            y                  INTEGER NOT NULL,
            z                  INTEGER NOT NULL,
            connections        TEXT NOT NULL DEFAULT '[]',
            cached_signal      INTEGER NOT NULL DEFAULT 0,
            pending_loss_ticks INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (x, y, z)
        );

        CREATE TABLE IF NOT EXISTS sources (
            x     INTEGER NOT NULL,
            y     INTEGER NOT NULL,
            z     INTEGER NOT NULL,
            power INTEGER NOT NULL,
            PRIMARY KEY (x, y, z)
        );
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}
