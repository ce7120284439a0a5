//! SQLite-backed vault storage.
//!
//! A vault is a single SQLite file with three tables:
//!
//! ```text
//! api_keys   (id, label UNIQUE, iv, ciphertext, created_at)   -- one row per secret
//! users      (id = 1, password_hash)                          -- the unlock hash
//! vault_salt (id = 1, salt BLOB)                              -- the 16-byte KDF salt
//! ```
//!
//! `iv` and `ciphertext` are base64 text, `password_hash` is a PHC
//! string.  The file is tagged with `PRAGMA application_id` so a stray
//! SQLite database is never mistaken for a vault.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{ffi, params, Connection, ErrorCode, OpenFlags, OptionalExtension};

use super::secret::{SecretMetadata, SecretRecord};
use crate::crypto::{PasswordHash, Salt, SealedSecret};
use crate::errors::{RabbitHoleError, Result};

/// `PRAGMA application_id` value for vault files ("RBHT").
const APPLICATION_ID: i64 = 0x5242_4854;

/// Current schema version, stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = "
    CREATE TABLE api_keys (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        label       TEXT UNIQUE NOT NULL,
        iv          TEXT NOT NULL,
        ciphertext  TEXT NOT NULL,
        created_at  TEXT NOT NULL
    );
    CREATE TABLE users (
        id            INTEGER PRIMARY KEY CHECK (id = 1),
        password_hash TEXT NOT NULL
    );
    CREATE TABLE vault_salt (
        id    INTEGER PRIMARY KEY CHECK (id = 1),
        salt  BLOB NOT NULL
    );
";

/// Handle to an open vault database.
pub struct VaultDatabase {
    path: PathBuf,
    conn: Connection,
}

impl VaultDatabase {
    /// Create a new vault database at `path` holding `salt` and `hash`.
    ///
    /// The file must not exist yet.  Header, schema and credentials are
    /// written in one transaction; on failure the file is removed.
    pub fn create(path: &Path, salt: &Salt, hash: &PasswordHash) -> Result<Self> {
        if path.exists() {
            return Err(RabbitHoleError::VaultAlreadyExists(path.to_path_buf()));
        }

        let conn = Connection::open(path)?;
        if let Err(e) = initialize(&conn, salt, hash) {
            drop(conn);
            let _ = std::fs::remove_file(path);
            return Err(e);
        }

        // Set restrictive permissions on the vault file (owner-only).
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        tracing::info!(path = %path.display(), "created vault database");
        Ok(Self {
            path: path.to_path_buf(),
            conn,
        })
    }

    /// Open an existing vault database, checking that it really is one.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RabbitHoleError::VaultNotFound(path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        check_header(&conn)?;

        tracing::info!(path = %path.display(), "opened vault database");
        Ok(Self {
            path: path.to_path_buf(),
            conn,
        })
    }

    // ------------------------------------------------------------------
    // Credentials
    // ------------------------------------------------------------------

    /// Read the KDF salt, if one has been stored.
    pub fn load_salt(&self) -> Result<Option<Salt>> {
        let blob: Option<Vec<u8>> = self
            .conn
            .query_row("SELECT salt FROM vault_salt WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        blob.map(|bytes| Salt::from_slice(&bytes)).transpose()
    }

    /// Read the unlock-password hash, if one has been stored.
    pub fn load_password_hash(&self) -> Result<Option<PasswordHash>> {
        let phc: Option<String> = self
            .conn
            .query_row("SELECT password_hash FROM users WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        Ok(phc.map(PasswordHash::from_phc))
    }

    // ------------------------------------------------------------------
    // Secrets
    // ------------------------------------------------------------------

    /// Insert a new secret.  Labels are unique; an existing label is
    /// rejected rather than overwritten.
    pub fn insert_secret(&self, record: &SecretRecord) -> Result<()> {
        let (iv, ciphertext) = record.sealed.to_base64();
        let result = self.conn.execute(
            "INSERT INTO api_keys (label, iv, ciphertext, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![record.label, iv, ciphertext, record.created_at.to_rfc3339()],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(RabbitHoleError::SecretAlreadyExists(record.label.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a secret by label.
    pub fn find_secret(&self, label: &str) -> Result<Option<SecretRecord>> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT iv, ciphertext, created_at FROM api_keys WHERE label = ?1",
                params![label],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((iv, ciphertext, created_at)) = row else {
            return Ok(None);
        };

        Ok(Some(SecretRecord {
            label: label.to_string(),
            sealed: SealedSecret::from_base64(&iv, &ciphertext)?,
            created_at: parse_timestamp(&created_at)?,
        }))
    }

    /// List metadata for all secrets, sorted by label.
    pub fn list_secrets(&self) -> Result<Vec<SecretMetadata>> {
        let mut stmt = self
            .conn
            .prepare("SELECT label, created_at FROM api_keys ORDER BY label")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut list = Vec::new();
        for row in rows {
            let (label, created_at) = row?;
            list.push(SecretMetadata {
                label,
                created_at: parse_timestamp(&created_at)?,
            });
        }
        Ok(list)
    }

    /// Number of stored secrets.
    pub fn secret_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT count(*) FROM api_keys", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Returns the path to the vault file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Direct access to the connection, for tests that need to corrupt rows.
    #[doc(hidden)]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Write header, schema and credentials into a fresh database.
fn initialize(conn: &Connection, salt: &Salt, hash: &PasswordHash) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.pragma_update(None, "application_id", APPLICATION_ID)?;
    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.execute_batch(SCHEMA)?;
    insert_salt(&tx, salt)?;
    insert_password_hash(&tx, hash)?;
    tx.commit()?;
    Ok(())
}

/// Verify the application id and schema version of an opened file.
fn check_header(conn: &Connection) -> Result<()> {
    let not_a_vault = |e: rusqlite::Error| {
        RabbitHoleError::InvalidVaultFormat(format!("not a RabbitHole vault: {e}"))
    };

    let app_id: i64 = conn
        .pragma_query_value(None, "application_id", |row| row.get(0))
        .map_err(not_a_vault)?;
    if app_id != APPLICATION_ID {
        return Err(RabbitHoleError::InvalidVaultFormat(
            "not a RabbitHole vault (application id mismatch)".into(),
        ));
    }

    let version: i64 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(not_a_vault)?;
    if version != SCHEMA_VERSION {
        return Err(RabbitHoleError::InvalidVaultFormat(format!(
            "unsupported schema version {version}, expected {SCHEMA_VERSION}"
        )));
    }

    Ok(())
}

fn insert_salt(conn: &Connection, salt: &Salt) -> Result<()> {
    conn.execute(
        "INSERT INTO vault_salt (id, salt) VALUES (1, ?1)",
        params![&salt.as_bytes()[..]],
    )
    .map_err(|e| already_set_or(e, "salt"))?;
    Ok(())
}

fn insert_password_hash(conn: &Connection, hash: &PasswordHash) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, password_hash) VALUES (1, ?1)",
        params![hash.as_str()],
    )
    .map_err(|e| already_set_or(e, "password hash"))?;
    Ok(())
}

fn already_set_or(e: rusqlite::Error, what: &'static str) -> RabbitHoleError {
    match e.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => RabbitHoleError::CredentialAlreadySet(what),
        _ => e.into(),
    }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RabbitHoleError::InvalidVaultFormat(format!("bad timestamp '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{encrypt, SymmetricKey};
    use tempfile::TempDir;

    fn test_hash() -> PasswordHash {
        PasswordHash::from_phc("$argon2id$v=19$m=8192,t=1,p=1$c2FsdA$aGFzaA")
    }

    fn create_at(path: &Path) -> VaultDatabase {
        VaultDatabase::create(path, &Salt::from_slice(&[5u8; 16]).unwrap(), &test_hash()).unwrap()
    }

    fn record(label: &str) -> SecretRecord {
        let key = SymmetricKey::new([9u8; 32]);
        SecretRecord {
            label: label.to_string(),
            sealed: encrypt(&key, "value").unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn create_then_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("v.db");
        drop(create_at(&path));
        let db = VaultDatabase::open(&path).unwrap();
        assert_eq!(db.path(), path);
        assert_eq!(db.secret_count().unwrap(), 0);
    }

    #[test]
    fn create_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("v.db");
        std::fs::write(&path, b"").unwrap();
        assert!(matches!(
            VaultDatabase::create(&path, &Salt::generate().unwrap(), &test_hash()),
            Err(RabbitHoleError::VaultAlreadyExists(_))
        ));
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            VaultDatabase::open(&dir.path().join("missing.db")),
            Err(RabbitHoleError::VaultNotFound(_))
        ));
    }

    #[test]
    fn open_rejects_foreign_sqlite_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("other.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE t (x INTEGER);").unwrap();
        drop(conn);

        assert!(matches!(
            VaultDatabase::open(&path),
            Err(RabbitHoleError::InvalidVaultFormat(_))
        ));
    }

    #[test]
    fn open_rejects_non_sqlite_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("junk.db");
        std::fs::write(&path, b"RABBITHOLE_DB_V1\nthis is not sqlite at all, just text").unwrap();

        assert!(VaultDatabase::open(&path).is_err());
    }

    #[test]
    fn create_stores_credentials() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("v.db");
        drop(create_at(&path));

        let db = VaultDatabase::open(&path).unwrap();
        assert_eq!(db.load_salt().unwrap(), Some(Salt::from_slice(&[5u8; 16]).unwrap()));
        assert_eq!(db.load_password_hash().unwrap(), Some(test_hash()));
    }

    #[test]
    fn credentials_are_write_once() {
        let dir = TempDir::new().unwrap();
        let db = create_at(&dir.path().join("v.db"));

        assert!(matches!(
            insert_salt(db.connection(), &Salt::from_slice(&[6u8; 16]).unwrap()),
            Err(RabbitHoleError::CredentialAlreadySet("salt"))
        ));
        assert!(matches!(
            insert_password_hash(db.connection(), &test_hash()),
            Err(RabbitHoleError::CredentialAlreadySet("password hash"))
        ));
    }

    #[test]
    fn failed_initialization_rolls_back_everything() {
        let conn = Connection::open_in_memory().unwrap();
        // A clashing table makes the schema step fail halfway through.
        conn.execute_batch("CREATE TABLE users (x INTEGER);").unwrap();

        assert!(initialize(&conn, &Salt::from_slice(&[5u8; 16]).unwrap(), &test_hash()).is_err());

        let created: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE name IN ('api_keys', 'vault_salt')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(created, 0);
    }

    #[test]
    fn wrong_length_salt_is_invalid_format() {
        let dir = TempDir::new().unwrap();
        let db = create_at(&dir.path().join("v.db"));
        db.connection()
            .execute("UPDATE vault_salt SET salt = ?1 WHERE id = 1", params![vec![0u8; 8]])
            .unwrap();

        assert!(matches!(
            db.load_salt(),
            Err(RabbitHoleError::InvalidVaultFormat(_))
        ));
    }

    #[test]
    fn insert_find_and_list() {
        let dir = TempDir::new().unwrap();
        let db = create_at(&dir.path().join("v.db"));

        db.insert_secret(&record("zeta")).unwrap();
        db.insert_secret(&record("alpha")).unwrap();

        let found = db.find_secret("alpha").unwrap().unwrap();
        assert_eq!(found.label, "alpha");
        assert!(db.find_secret("missing").unwrap().is_none());

        let labels: Vec<String> = db
            .list_secrets()
            .unwrap()
            .into_iter()
            .map(|m| m.label)
            .collect();
        assert_eq!(labels, vec!["alpha", "zeta"]);
        assert_eq!(db.secret_count().unwrap(), 2);
    }

    #[test]
    fn duplicate_label_rejected() {
        let dir = TempDir::new().unwrap();
        let db = create_at(&dir.path().join("v.db"));

        db.insert_secret(&record("openai")).unwrap();
        assert!(matches!(
            db.insert_secret(&record("openai")),
            Err(RabbitHoleError::SecretAlreadyExists(label)) if label == "openai"
        ));
        assert_eq!(db.secret_count().unwrap(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn vault_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("v.db");
        drop(create_at(&path));

        let perms = std::fs::metadata(&path).unwrap().permissions();
        assert_eq!(perms.mode() & 0o777, 0o600, "vault should be owner-only");
    }
}
