//! Database schema and migrations.

use anyhow::Result;
use rusqlite::Connection;

/// Run all pending migrations.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS maintenance_windows (
            id TEXT PRIMARY KEY,
            start_date TEXT NOT NULL,
            duration_days REAL NOT NULL DEFAULT 1,
            status TEXT,
            window_type TEXT,
            description TEXT
        );

        CREATE TABLE IF NOT EXISTS import_batches (
            id TEXT PRIMARY KEY,
            filename TEXT NOT NULL,
            total_records INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'completed',
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS anomalies (
            id TEXT PRIMARY KEY,
            status TEXT NOT NULL DEFAULT 'new'
                CHECK (status IN ('new', 'in_progress', 'treated', 'closed')),
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            equipment_id TEXT NOT NULL,
            description TEXT,
            system_id TEXT,
            service TEXT,
            source TEXT,
            final_fiabilite_integrite REAL,
            final_disponibilite REAL,
            final_process_safety REAL,
            user_fiabilite_integrite REAL,
            user_disponibilite REAL,
            user_process_safety REAL,
            use_user_scores INTEGER NOT NULL DEFAULT 0,
            estimated_hours REAL,
            maintenance_window_id TEXT REFERENCES maintenance_windows(id),
            import_batch_id TEXT REFERENCES import_batches(id)
        );

        CREATE TABLE IF NOT EXISTS chat_conversations (
            id TEXT PRIMARY KEY,
            message TEXT NOT NULL,
            response TEXT NOT NULL,
            context TEXT,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS profiles (
            email TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            phone TEXT,
            department TEXT NOT NULL DEFAULT '',
            role TEXT NOT NULL DEFAULT '',
            avatar TEXT,
            last_login TEXT,
            updated_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_anomalies_created ON anomalies(created_at);
        CREATE INDEX IF NOT EXISTS idx_anomalies_status ON anomalies(status);
        CREATE INDEX IF NOT EXISTS idx_anomalies_equipment ON anomalies(equipment_id);
        CREATE INDEX IF NOT EXISTS idx_windows_start ON maintenance_windows(start_date);
        CREATE INDEX IF NOT EXISTS idx_chat_created ON chat_conversations(created_at);

        INSERT OR IGNORE INTO schema_version (version) VALUES (1);",
    )?;

    Ok(())
}
