//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation. Uniqueness of usernames, emails
//! and domain names is enforced by UNIQUE indexes, which are the
//! authoritative tie-break for concurrent duplicate creation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "session_expiry_index",
        sql: SCHEMA_V2,
    },
];

// -----------------------------------------------------------------------
// Schema v1: accounts, domains, messages, sessions, audit log
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Domains
-- =======================================================================
DEFINE TABLE domain SCHEMAFULL;
DEFINE FIELD domain ON TABLE domain TYPE string;
DEFINE FIELD description ON TABLE domain TYPE option<string>;
DEFINE FIELD is_active ON TABLE domain TYPE bool DEFAULT true;
DEFINE FIELD created_by ON TABLE domain TYPE string;
DEFINE FIELD created_at ON TABLE domain TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_domain_name ON TABLE domain COLUMNS domain UNIQUE;

-- =======================================================================
-- Users
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD username ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD first_name ON TABLE user TYPE option<string>;
DEFINE FIELD last_name ON TABLE user TYPE option<string>;
DEFINE FIELD domain_id ON TABLE user TYPE option<string>;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['super_admin', 'admin', 'client'];
DEFINE FIELD is_active ON TABLE user TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD last_login_at ON TABLE user TYPE option<datetime>;
DEFINE INDEX idx_user_username ON TABLE user COLUMNS username UNIQUE;
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;
DEFINE INDEX idx_user_role ON TABLE user COLUMNS role;

-- =======================================================================
-- Messages (owned by a user)
-- =======================================================================
DEFINE TABLE message SCHEMAFULL;
DEFINE FIELD user_id ON TABLE message TYPE string;
DEFINE FIELD sender ON TABLE message TYPE string;
DEFINE FIELD recipient ON TABLE message TYPE string;
DEFINE FIELD subject ON TABLE message TYPE string;
DEFINE FIELD body ON TABLE message TYPE string;
DEFINE FIELD is_read ON TABLE message TYPE bool DEFAULT false;
DEFINE FIELD is_starred ON TABLE message TYPE bool DEFAULT false;
DEFINE FIELD folder ON TABLE message TYPE string \
    ASSERT $value IN ['inbox', 'sent', 'drafts', 'spam', 'trash'];
DEFINE FIELD created_at ON TABLE message TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_message_owner_folder ON TABLE message \
    COLUMNS user_id, folder;

-- =======================================================================
-- Sessions
-- =======================================================================
DEFINE TABLE session SCHEMAFULL;
DEFINE FIELD user_id ON TABLE session TYPE string;
DEFINE FIELD token_hash ON TABLE session TYPE string;
DEFINE FIELD ip_address ON TABLE session TYPE option<string>;
DEFINE FIELD user_agent ON TABLE session TYPE option<string>;
DEFINE FIELD expires_at ON TABLE session TYPE datetime;
DEFINE FIELD created_at ON TABLE session TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_session_token ON TABLE session \
    COLUMNS token_hash UNIQUE;
DEFINE INDEX idx_session_user ON TABLE session COLUMNS user_id;

-- =======================================================================
-- Audit Log (append-only)
-- =======================================================================
DEFINE TABLE audit_log SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD user_id ON TABLE audit_log TYPE string;
DEFINE FIELD action ON TABLE audit_log TYPE string;
DEFINE FIELD target_user_id ON TABLE audit_log TYPE option<string>;
DEFINE FIELD details ON TABLE audit_log TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD created_at ON TABLE audit_log TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_audit_time ON TABLE audit_log COLUMNS created_at;
DEFINE INDEX idx_audit_actor ON TABLE audit_log COLUMNS user_id;
DEFINE INDEX idx_audit_target ON TABLE audit_log COLUMNS target_user_id;
";

// -----------------------------------------------------------------------
// Schema v2: expiry index for the session sweeper
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
DEFINE INDEX idx_session_expire ON TABLE session COLUMNS expires_at;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// Returns the number of migrations applied.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<usize, DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    let mut applied = 0;
    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query(
            "CREATE _migration SET version = $version, \
             name = $name",
        )
        .bind(("version", migration.version))
        .bind(("name", migration.name.to_string()))
        .await?
        .check()
        .map_err(|e| {
            DbError::Migration(format!(
                "Failed to record migration v{}: {}",
                migration.version, e,
            ))
        })?;
        applied += 1;
    }

    if applied == 0 {
        info!(version = current_version, "Schema is up to date");
    }
    Ok(applied)
}

/// Latest schema version known to this build.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}
