//! Connection PRAGMAs for the analysis store and the report database

use rusqlite::Connection;

/// Read-side tuning: large page cache, memory-mapped reads, in-memory temp
/// B-trees for GROUP BY / ORDER BY, and `query_only` last so nothing after
/// it can write.
pub fn apply_read_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "cache_size", -65_536)?;
    conn.pragma_update(None, "mmap_size", 268_435_456_i64)?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    conn.pragma_update(None, "query_only", "ON")?;
    Ok(())
}

/// Write-side settings for the report database
pub fn apply_write_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    log::debug!("📊 Report database journal_mode={}", mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_pragmas_block_writes() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (x INTEGER)", []).unwrap();
        apply_read_pragmas(&conn).unwrap();

        assert!(conn.execute("INSERT INTO t (x) VALUES (1)", []).is_err());
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(n, 0);
    }
}
