//! Database schema initialization

use rusqlite::{params, OptionalExtension};

use super::{Store, StoreError, SCHEMA_VERSION};

impl Store {
    /// Create tables if missing and record the schema version
    pub(super) fn init_schema(&self) -> Result<(), StoreError> {
        let has_version_table: bool = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version')",
            [],
            |row| row.get(0),
        )?;
        let found: Option<i32> = if has_version_table {
            self.conn
                .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                    row.get(0)
                })
                .optional()?
        } else {
            None
        };

        if let Some(found) = found {
            if found > SCHEMA_VERSION {
                return Err(StoreError::SchemaTooNew {
                    found,
                    supported: SCHEMA_VERSION,
                });
            }
        }

        self.conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Short ID mappings (PREFIX@N), never reused
            CREATE TABLE IF NOT EXISTS short_ids (
                short_id TEXT PRIMARY KEY,
                entity_id TEXT NOT NULL UNIQUE,
                prefix TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_short_ids_prefix ON short_ids(prefix);

            CREATE TABLE IF NOT EXISTS short_id_counters (
                prefix TEXT PRIMARY KEY,
                next_id INTEGER NOT NULL DEFAULT 1
            );

            -- Seeded catalogs
            CREATE TABLE IF NOT EXISTS frameworks (
                id TEXT PRIMARY KEY,
                code TEXT NOT NULL UNIQUE COLLATE NOCASE,
                name TEXT NOT NULL,
                version TEXT NOT NULL,
                publisher TEXT,
                description TEXT,
                content_hash TEXT NOT NULL,
                seeded_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS clauses (
                id TEXT PRIMARY KEY,
                framework_id TEXT NOT NULL REFERENCES frameworks(id) ON DELETE CASCADE,
                parent_id TEXT REFERENCES clauses(id) ON DELETE CASCADE,
                ref TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                position INTEGER NOT NULL,
                UNIQUE (framework_id, ref)
            );
            CREATE INDEX IF NOT EXISTS idx_clauses_parent ON clauses(parent_id);

            CREATE TABLE IF NOT EXISTS controls (
                id TEXT PRIMARY KEY,
                framework_id TEXT NOT NULL REFERENCES frameworks(id) ON DELETE CASCADE,
                clause_id TEXT NOT NULL REFERENCES clauses(id) ON DELETE CASCADE,
                ref TEXT NOT NULL,
                title TEXT NOT NULL,
                objective TEXT,
                guidance TEXT,
                position INTEGER NOT NULL,
                UNIQUE (framework_id, ref)
            );
            CREATE INDEX IF NOT EXISTS idx_controls_clause ON controls(clause_id);

            -- Organization records
            CREATE TABLE IF NOT EXISTS control_implementations (
                id TEXT PRIMARY KEY,
                control_id TEXT NOT NULL UNIQUE REFERENCES controls(id) ON DELETE CASCADE,
                status TEXT NOT NULL,
                owner TEXT,
                notes TEXT,
                evidence TEXT,
                updated TEXT NOT NULL,
                updated_by TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS risks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                category TEXT,
                likelihood INTEGER NOT NULL CHECK (likelihood BETWEEN 1 AND 5),
                impact INTEGER NOT NULL CHECK (impact BETWEEN 1 AND 5),
                treatment TEXT NOT NULL,
                status TEXT NOT NULL,
                owner TEXT,
                control_id TEXT REFERENCES controls(id) ON DELETE SET NULL,
                created TEXT NOT NULL,
                updated TEXT NOT NULL,
                author TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_risks_status ON risks(status);

            CREATE TABLE IF NOT EXISTS capas (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                capa_type TEXT NOT NULL,
                source TEXT NOT NULL,
                priority TEXT NOT NULL,
                problem_statement TEXT,
                root_cause TEXT,
                status TEXT NOT NULL,
                owner TEXT,
                due_date TEXT,
                risk_id TEXT REFERENCES risks(id) ON DELETE SET NULL,
                control_id TEXT REFERENCES controls(id) ON DELETE SET NULL,
                closed_date TEXT,
                closed_by TEXT,
                created TEXT NOT NULL,
                updated TEXT NOT NULL,
                author TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_capas_status ON capas(status);

            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                status TEXT NOT NULL,
                priority TEXT NOT NULL,
                assignee TEXT,
                due_date TEXT,
                control_id TEXT REFERENCES controls(id) ON DELETE SET NULL,
                risk_id TEXT REFERENCES risks(id) ON DELETE SET NULL,
                capa_id TEXT REFERENCES capas(id) ON DELETE SET NULL,
                created TEXT NOT NULL,
                updated TEXT NOT NULL,
                author TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
            CREATE INDEX IF NOT EXISTS idx_tasks_assignee ON tasks(assignee);

            CREATE TABLE IF NOT EXISTS training_programs (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                frequency TEXT NOT NULL,
                mandatory INTEGER NOT NULL DEFAULT 0,
                framework_code TEXT,
                status TEXT NOT NULL,
                next_due TEXT,
                last_completed TEXT,
                created TEXT NOT NULL,
                author TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS memberships (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE COLLATE NOCASE,
                email TEXT,
                role TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                created TEXT NOT NULL
            );
            "#,
        )?;

        if found.is_none() {
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;
        } else if found != Some(SCHEMA_VERSION) {
            self.conn.execute(
                "UPDATE schema_version SET version = ?1",
                params![SCHEMA_VERSION],
            )?;
        }

        Ok(())
    }
}
