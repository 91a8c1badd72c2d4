//! SQLite-backed chat store
//!
//! Every write that depends on a prior read runs inside a `BEGIN IMMEDIATE`
//! transaction. SQLite admits one such transaction at a time per database,
//! so a guard's count and the insert it authorizes are never interleaved
//! with another writer.

use super::error::{StoreError, StoreResult};
use super::migrations::migrate;
use super::{ChatStore, GroupTransaction};
use crate::config::StoreConfig;
use crate::membership::MembershipRegistry;
use crate::messaging::EditDecision;
use crate::model::{
    Conversation, EditableMessage, Group, GroupId, GroupStats, Membership, MembershipId, MessageId,
    MessageKind, NewMessage, Timestamp, User, UserId, VersionStamp,
};
use crate::summary::TranscriptLine;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, info};

/// SQL-based storage for users, groups, memberships and messages
pub struct ChatSqlStore {
    pool: Pool<SqliteConnectionManager>,
}

impl ChatSqlStore {
    /// Create a new SQL store with the given connection pool
    pub fn new(pool: Pool<SqliteConnectionManager>) -> StoreResult<Self> {
        migrate(&pool)?;

        Ok(Self { pool })
    }

    /// Open (or create) the database file named in `config`
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        // journal_mode is persistent, so one connection is enough to switch it
        {
            let conn = Connection::open(&config.database_path)?;
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            debug!(path = %config.database_path.display(), mode = %mode, "journal mode set");
        }

        let busy_timeout = config.busy_timeout;
        let manager = SqliteConnectionManager::file(&config.database_path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")
        });

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)?;

        info!(
            path = %config.database_path.display(),
            pool_size = config.pool_size,
            "opened chat store"
        );
        Self::new(pool)
    }

    /// Create a new in-memory store.
    ///
    /// Each in-memory SQLite connection is its own database, so the pool
    /// holds exactly one connection.
    pub fn memory() -> StoreResult<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder().max_size(1).build(manager)?;

        Self::new(pool)
    }
}

// ===== Row mapping =====

fn millis(ts: Timestamp) -> i64 {
    ts.as_millis() as i64
}

fn timestamp_at(row: &Row, idx: usize) -> rusqlite::Result<Timestamp> {
    Ok(Timestamp::from_millis(row.get::<_, i64>(idx)?.max(0) as u64))
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId::new(row.get(0)?),
        username: row.get(1)?,
        created_at: timestamp_at(row, 2)?,
    })
}

fn group_from_row(row: &Row) -> rusqlite::Result<Group> {
    Ok(Group {
        id: GroupId::new(row.get(0)?),
        name: row.get(1)?,
        created_by: UserId::new(row.get(2)?),
        created_at: timestamp_at(row, 3)?,
    })
}

fn membership_from_row(row: &Row) -> rusqlite::Result<Membership> {
    Ok(Membership {
        id: MembershipId::new(row.get(0)?),
        group_id: GroupId::new(row.get(1)?),
        user_id: UserId::new(row.get(2)?),
        is_admin: row.get::<_, i64>(3)? != 0,
        joined_at: timestamp_at(row, 4)?,
    })
}

/// Table and conversation-key column for a message kind
fn message_table(kind: MessageKind) -> (&'static str, &'static str) {
    match kind {
        MessageKind::Direct => ("direct_messages", "receiver_id"),
        MessageKind::Group => ("group_messages", "group_id"),
    }
}

/// Expects `id, <key column>, sender_id, content, created_at, version`
fn message_from_row(row: &Row, kind: MessageKind) -> rusqlite::Result<EditableMessage> {
    let key: i64 = row.get(1)?;
    let conversation = match kind {
        MessageKind::Direct => Conversation::Direct {
            receiver_id: UserId::new(key),
        },
        MessageKind::Group => Conversation::Group {
            group_id: GroupId::new(key),
        },
    };

    Ok(EditableMessage {
        id: MessageId::new(row.get(0)?),
        conversation,
        sender_id: UserId::new(row.get(2)?),
        content: row.get(3)?,
        created_at: timestamp_at(row, 4)?,
        version: VersionStamp::new(row.get::<_, i64>(5)?.max(1) as u64),
    })
}

// ===== Queries shared by pooled connections and transactions =====

fn query_user(conn: &Connection, user_id: UserId) -> StoreResult<Option<User>> {
    Ok(conn
        .query_row(
            "SELECT id, username, created_at FROM users WHERE id = ?",
            params![user_id.get()],
            user_from_row,
        )
        .optional()?)
}

fn query_group(conn: &Connection, group_id: GroupId) -> StoreResult<Option<Group>> {
    Ok(conn
        .query_row(
            "SELECT id, name, created_by, created_at FROM groups WHERE id = ?",
            params![group_id.get()],
            group_from_row,
        )
        .optional()?)
}

fn query_membership(
    conn: &Connection,
    group_id: GroupId,
    user_id: UserId,
) -> StoreResult<Option<Membership>> {
    Ok(conn
        .query_row(
            "SELECT id, group_id, user_id, is_admin, joined_at
             FROM group_members WHERE group_id = ? AND user_id = ?",
            params![group_id.get(), user_id.get()],
            membership_from_row,
        )
        .optional()?)
}

fn query_stats(conn: &Connection, group_id: GroupId) -> StoreResult<GroupStats> {
    let (members, admins): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(is_admin), 0) FROM group_members WHERE group_id = ?",
        params![group_id.get()],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(GroupStats {
        group_id,
        members: members.max(0) as u32,
        admins: admins.max(0) as u32,
    })
}

fn query_message(
    conn: &Connection,
    kind: MessageKind,
    message_id: MessageId,
) -> StoreResult<Option<EditableMessage>> {
    let (table, key_column) = message_table(kind);
    let sql = format!(
        "SELECT id, {key_column}, sender_id, content, created_at, version FROM {table} WHERE id = ?"
    );

    Ok(conn
        .query_row(&sql, params![message_id.get()], |row| message_from_row(row, kind))
        .optional()?)
}

/// Membership reads and writes scoped to one open transaction
struct SqlGroupTx<'a> {
    conn: &'a Connection,
}

impl MembershipRegistry for SqlGroupTx<'_> {
    fn find(&self, group_id: GroupId, user_id: UserId) -> StoreResult<Option<Membership>> {
        query_membership(self.conn, group_id, user_id)
    }

    fn count(&self, group_id: GroupId) -> StoreResult<u32> {
        Ok(query_stats(self.conn, group_id)?.members)
    }

    fn admin_count(&self, group_id: GroupId) -> StoreResult<u32> {
        Ok(query_stats(self.conn, group_id)?.admins)
    }

    fn insert(
        &mut self,
        group_id: GroupId,
        user_id: UserId,
        is_admin: bool,
        joined_at: Timestamp,
    ) -> StoreResult<Membership> {
        self.conn.execute(
            "INSERT INTO group_members (group_id, user_id, is_admin, joined_at) VALUES (?, ?, ?, ?)",
            params![group_id.get(), user_id.get(), is_admin as i64, millis(joined_at)],
        )?;

        Ok(Membership {
            id: MembershipId::new(self.conn.last_insert_rowid()),
            group_id,
            user_id,
            is_admin,
            joined_at,
        })
    }

    fn set_admin(&mut self, membership_id: MembershipId) -> StoreResult<()> {
        let updated = self.conn.execute(
            "UPDATE group_members SET is_admin = 1 WHERE id = ?",
            params![membership_id.get()],
        )?;

        if updated == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

impl GroupTransaction for SqlGroupTx<'_> {
    fn find_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        query_user(self.conn, user_id)
    }

    fn find_group(&self, group_id: GroupId) -> StoreResult<Option<Group>> {
        query_group(self.conn, group_id)
    }

    fn insert_group(
        &mut self,
        name: &str,
        created_by: UserId,
        created_at: Timestamp,
    ) -> StoreResult<Group> {
        self.conn.execute(
            "INSERT INTO groups (name, created_by, created_at) VALUES (?, ?, ?)",
            params![name, created_by.get(), millis(created_at)],
        )?;

        Ok(Group {
            id: GroupId::new(self.conn.last_insert_rowid()),
            name: name.to_string(),
            created_by,
            created_at,
        })
    }
}

impl ChatStore for ChatSqlStore {
    fn group_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn GroupTransaction) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self.pool.get().map_err(StoreError::from)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;

        let mut scope = SqlGroupTx { conn: &tx };
        // Dropping `tx` on the error path rolls it back
        let value = f(&mut scope)?;

        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }

    fn insert_user(&self, username: &str, created_at: Timestamp) -> StoreResult<User> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO users (username, created_at) VALUES (?, ?)",
            params![username, millis(created_at)],
        )?;

        Ok(User {
            id: UserId::new(conn.last_insert_rowid()),
            username: username.to_string(),
            created_at,
        })
    }

    fn find_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let conn = self.pool.get()?;
        query_user(&conn, user_id)
    }

    fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let conn = self.pool.get()?;
        Ok(conn
            .query_row(
                "SELECT id, username, created_at FROM users WHERE username = ?",
                params![username],
                user_from_row,
            )
            .optional()?)
    }

    fn find_group(&self, group_id: GroupId) -> StoreResult<Option<Group>> {
        let conn = self.pool.get()?;
        query_group(&conn, group_id)
    }

    fn find_group_by_name(&self, name: &str) -> StoreResult<Option<Group>> {
        let conn = self.pool.get()?;
        Ok(conn
            .query_row(
                "SELECT id, name, created_by, created_at FROM groups WHERE name = ?",
                params![name],
                group_from_row,
            )
            .optional()?)
    }

    fn find_membership(&self, group_id: GroupId, user_id: UserId) -> StoreResult<Option<Membership>> {
        let conn = self.pool.get()?;
        query_membership(&conn, group_id, user_id)
    }

    fn group_stats(&self, group_id: GroupId) -> StoreResult<GroupStats> {
        let conn = self.pool.get()?;
        query_stats(&conn, group_id)
    }

    fn insert_message(&self, message: &NewMessage) -> StoreResult<EditableMessage> {
        let kind = message.conversation.kind();
        let (table, key_column) = message_table(kind);
        let key = match message.conversation {
            Conversation::Direct { receiver_id } => receiver_id.get(),
            Conversation::Group { group_id } => group_id.get(),
        };

        let conn = self.pool.get()?;
        conn.execute(
            &format!(
                "INSERT INTO {table} ({key_column}, sender_id, content, created_at, updated_at, version)
                 VALUES (?, ?, ?, ?, ?, ?)"
            ),
            params![
                key,
                message.sender_id.get(),
                &message.content,
                millis(message.created_at),
                millis(message.created_at),
                VersionStamp::INITIAL.get() as i64,
            ],
        )?;

        Ok(EditableMessage {
            id: MessageId::new(conn.last_insert_rowid()),
            conversation: message.conversation,
            sender_id: message.sender_id,
            content: message.content.clone(),
            created_at: message.created_at,
            version: VersionStamp::INITIAL,
        })
    }

    fn find_message(&self, kind: MessageKind, id: MessageId) -> StoreResult<Option<EditableMessage>> {
        let conn = self.pool.get()?;
        query_message(&conn, kind, id)
    }

    fn commit_edit(
        &self,
        decision: &EditDecision,
        content: &str,
        now: Timestamp,
    ) -> StoreResult<EditableMessage> {
        let (table, _) = message_table(decision.kind);

        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let updated = tx.execute(
            &format!(
                "UPDATE {table} SET content = ?, version = version + 1, updated_at = ?
                 WHERE id = ? AND version = ?"
            ),
            params![
                content,
                millis(now),
                decision.message_id.get(),
                decision.expected.get() as i64,
            ],
        )?;

        if updated == 0 {
            return match query_message(&tx, decision.kind, decision.message_id)? {
                Some(_) => Err(StoreError::VersionConflict),
                None => Err(StoreError::NotFound),
            };
        }

        let message = query_message(&tx, decision.kind, decision.message_id)?
            .ok_or(StoreError::NotFound)?;
        tx.commit()?;

        Ok(message)
    }

    fn recent_group_messages(&self, group_id: GroupId, limit: u32) -> StoreResult<Vec<TranscriptLine>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT u.username, m.content
             FROM group_messages m JOIN users u ON u.id = m.sender_id
             WHERE m.group_id = ?
             ORDER BY m.created_at DESC, m.id DESC
             LIMIT ?",
        )?;

        let mut lines = stmt
            .query_map(params![group_id.get(), limit as i64], |row| {
                Ok(TranscriptLine {
                    sender: row.get(0)?,
                    content: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        lines.reverse();
        Ok(lines)
    }
}
