//! `SQLite` relationship store.
//!
//! Owns the persistent user records, the set-valued relationship fields
//! (`friends`, `exclusions`), and the pending friend requests. Every method
//! is a single-statement, individually atomic primitive; the lifecycle
//! engine composes them without a cross-record transaction, which is why
//! the set mutations are idempotent (`INSERT OR IGNORE` / plain `DELETE`).
//!
//! # Indexes
//!
//! These are required for correctness, not just speed: the UNIQUE index on
//! `public_id` pins handle stability, and the composite primary key on
//! `(from_id, to_id)` is what turns a duplicate request submission into a
//! clean conflict instead of a second row.

// SQLite operations need to hold the lock for the duration of the operation.
// Dropping the guard earlier would require restructuring all methods.
#![allow(clippy::significant_drop_tightening)]

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use super::error::{FriendError, Result};
use super::types::{FriendRequest, Page, User};

/// Set-valued relationship fields on a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetField {
    /// Symmetric friendship links (symmetric by engine invariant).
    Friends,
    /// Unidirectional exclusion entries (block or avoid, per deployment).
    Exclusions,
}

impl SetField {
    /// Column value used in the `user_links` table.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Friends => "friends",
            Self::Exclusions => "exclusions",
        }
    }
}

/// `SQLite`-based store for users, relationship links, and friend requests.
///
/// Thread-safe wrapper around a single connection. Constructed at startup
/// and passed by reference into the engine; no global state.
pub struct RelationStore {
    conn: Mutex<Connection>,
}

impl RelationStore {
    /// Creates a new store at the given path.
    ///
    /// Creates the database file and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or initialized.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FriendError::Storage(format!("Failed to acquire database lock: {e}")))
    }

    /// Initializes the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock_conn()?;

        conn.execute_batch(
            r"
            -- Registered users. identity_ref resolves the caller; public_id
            -- is the only identifier used in relationship operations.
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                identity_ref TEXT NOT NULL UNIQUE,
                public_id TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL,
                picture TEXT,
                created_at INTEGER NOT NULL
            );

            -- Set-valued fields (friends / exclusions), one row per member.
            -- The composite key makes set-add and set-remove idempotent.
            CREATE TABLE IF NOT EXISTS user_links (
                owner_id TEXT NOT NULL,
                field TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (owner_id, field, value)
            );

            -- Pending friend requests, at most one per ordered pair.
            CREATE TABLE IF NOT EXISTS friend_requests (
                from_id TEXT NOT NULL,
                to_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (from_id, to_id)
            );

            CREATE INDEX IF NOT EXISTS idx_requests_to ON friend_requests(to_id);
            CREATE INDEX IF NOT EXISTS idx_requests_from ON friend_requests(from_id);
            ",
        )?;

        Ok(())
    }

    // ==================== User Operations ====================

    /// Inserts a new user record and returns it with its assigned key.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRegistered` if the `identity_ref` is already bound,
    /// or a database error otherwise.
    pub fn insert_user(
        &self,
        identity_ref: &str,
        public_id: &str,
        display_name: &str,
        picture: Option<&str>,
        created_at: i64,
    ) -> Result<User> {
        let conn = self.lock_conn()?;

        let inserted = conn.execute(
            r"
            INSERT INTO users (identity_ref, public_id, display_name, picture, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![identity_ref, public_id, display_name, picture, created_at],
        );

        match inserted {
            Ok(_) => Ok(User {
                internal_key: conn.last_insert_rowid(),
                identity_ref: identity_ref.to_string(),
                public_id: public_id.to_string(),
                display_name: display_name.to_string(),
                picture: picture.map(ToString::to_string),
                created_at,
            }),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(FriendError::AlreadyRegistered(identity_ref.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Retrieves a user by public id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_user_by_public_id(&self, public_id: &str) -> Result<Option<User>> {
        self.find_user("public_id", public_id)
    }

    /// Retrieves a user by normalized identity reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_user_by_identity_ref(&self, identity_ref: &str) -> Result<Option<User>> {
        self.find_user("identity_ref", identity_ref)
    }

    fn find_user(&self, column: &str, key: &str) -> Result<Option<User>> {
        let conn = self.lock_conn()?;

        let result = conn
            .query_row(
                &format!(
                    "SELECT id, identity_ref, public_id, display_name, picture, created_at
                     FROM users WHERE {column} = ?1"
                ),
                params![key],
                |row| {
                    Ok(User {
                        internal_key: row.get(0)?,
                        identity_ref: row.get(1)?,
                        public_id: row.get(2)?,
                        display_name: row.get(3)?,
                        picture: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()?;

        Ok(result)
    }

    /// Deletes a user row by public id. Returns the number removed (0 or 1).
    ///
    /// Removes the record only; requests and links referencing the user are
    /// the engine's responsibility to drain.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_user(&self, public_id: &str) -> Result<usize> {
        let conn = self.lock_conn()?;
        let removed = conn.execute("DELETE FROM users WHERE public_id = ?1", params![public_id])?;
        Ok(removed)
    }

    // ==================== Request Operations ====================

    /// Conditionally inserts a friend request for an ordered pair.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateRequest` if a request for the same ordered pair
    /// already exists (uniqueness enforced by the primary key), or a
    /// database error otherwise.
    pub fn insert_request(&self, from_id: &str, to_id: &str, created_at: i64) -> Result<FriendRequest> {
        let conn = self.lock_conn()?;

        let inserted = conn.execute(
            "INSERT INTO friend_requests (from_id, to_id, created_at) VALUES (?1, ?2, ?3)",
            params![from_id, to_id, created_at],
        );

        match inserted {
            Ok(_) => Ok(FriendRequest {
                from_id: from_id.to_string(),
                to_id: to_id.to_string(),
                created_at,
            }),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(FriendError::DuplicateRequest {
                    from: from_id.to_string(),
                    to: to_id.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Retrieves a friend request by ordered pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_request(&self, from_id: &str, to_id: &str) -> Result<Option<FriendRequest>> {
        let conn = self.lock_conn()?;

        let result = conn
            .query_row(
                "SELECT from_id, to_id, created_at FROM friend_requests
                 WHERE from_id = ?1 AND to_id = ?2",
                params![from_id, to_id],
                |row| {
                    Ok(FriendRequest {
                        from_id: row.get(0)?,
                        to_id: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(result)
    }

    /// Deletes a friend request by ordered pair. Returns the number removed
    /// (0 or 1). Idempotent: deleting an absent request is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_request(&self, from_id: &str, to_id: &str) -> Result<usize> {
        let conn = self.lock_conn()?;
        let removed = conn.execute(
            "DELETE FROM friend_requests WHERE from_id = ?1 AND to_id = ?2",
            params![from_id, to_id],
        )?;
        Ok(removed)
    }

    /// Lists requests addressed to a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn requests_to(&self, to_id: &str, page: Page) -> Result<Vec<FriendRequest>> {
        self.list_requests("to_id", to_id, page)
    }

    /// Lists requests sent by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn requests_from(&self, from_id: &str, page: Page) -> Result<Vec<FriendRequest>> {
        self.list_requests("from_id", from_id, page)
    }

    fn list_requests(&self, column: &str, key: &str, page: Page) -> Result<Vec<FriendRequest>> {
        let conn = self.lock_conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT from_id, to_id, created_at FROM friend_requests
             WHERE {column} = ?1
             ORDER BY created_at DESC, from_id, to_id
             LIMIT ?2 OFFSET ?3"
        ))?;

        let requests = stmt
            .query_map(
                params![key, i64::from(page.limit()), i64::from(page.offset())],
                |row| {
                    Ok(FriendRequest {
                        from_id: row.get(0)?,
                        to_id: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(requests)
    }

    // ==================== Set Field Operations ====================

    /// Idempotently adds `value` to a user's set field.
    ///
    /// A no-op if the value is already present; safe to retry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn add_link(&self, owner_id: &str, field: SetField, value: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO user_links (owner_id, field, value) VALUES (?1, ?2, ?3)",
            params![owner_id, field.as_str(), value],
        )?;
        Ok(())
    }

    /// Idempotently removes `value` from a user's set field.
    ///
    /// A no-op if the value is absent; safe to retry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn remove_link(&self, owner_id: &str, field: SetField, value: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "DELETE FROM user_links WHERE owner_id = ?1 AND field = ?2 AND value = ?3",
            params![owner_id, field.as_str(), value],
        )?;
        Ok(())
    }

    /// Whether `value` is a member of a user's set field.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn has_link(&self, owner_id: &str, field: SetField, value: &str) -> Result<bool> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM user_links WHERE owner_id = ?1 AND field = ?2 AND value = ?3",
            params![owner_id, field.as_str(), value],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Lists the members of a user's set field, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn links_of(&self, owner_id: &str, field: SetField) -> Result<Vec<String>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT value FROM user_links WHERE owner_id = ?1 AND field = ?2 ORDER BY value",
        )?;
        let values = stmt
            .query_map(params![owner_id, field.as_str()], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(values)
    }
}
