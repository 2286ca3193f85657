use crate::models::{AccountRow, ConnectionRow, MediaRow, MessageRow};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

fn account_from_row(row: &Row) -> rusqlite::Result<AccountRow> {
    Ok(AccountRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        role: row.get(4)?,
        relation: row.get(5)?,
        birth_date: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn message_from_row(row: &Row) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        recipient_id: row.get(2)?,
        text: row.get(3)?,
        sent_at: row.get(4)?,
        read: row.get(5)?,
    })
}

fn media_from_row(row: &Row) -> rusqlite::Result<MediaRow> {
    Ok(MediaRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        blob_path: row.get(2)?,
        description: row.get(3)?,
        sender_id: row.get(4)?,
        recipient_id: row.get(5)?,
        sent_at: row.get(6)?,
        read: row.get(7)?,
    })
}

const ACCOUNT_COLS: &str = "id, name, email, password, role, relation, birth_date, created_at";
const MESSAGE_COLS: &str = "id, sender_id, recipient_id, text, sent_at, read";
const MEDIA_COLS: &str = "id, kind, blob_path, description, sender_id, recipient_id, sent_at, read";

fn constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl Database {
    // -- Accounts --

    #[allow(clippy::too_many_arguments)]
    pub fn create_account(
        &self,
        id: &str,
        name: &str,
        email: &str,
        password_hash: &str,
        role: &str,
        relation: Option<&str>,
        birth_date: Option<&str>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let res = conn.execute(
                "INSERT INTO accounts (id, name, email, password, role, relation, birth_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![id, name, email, password_hash, role, relation, birth_date],
            );
            match res {
                Ok(_) => Ok(true),
                // UNIQUE(email) lost a race with a concurrent registration
                Err(e) if constraint_violation(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_account_by_email(&self, email: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "email", email))
    }

    pub fn get_account_by_id(&self, id: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "id", id))
    }

    pub fn search_accounts(&self, query: &str) -> Result<Vec<AccountRow>> {
        self.with_conn(|conn| {
            let pattern = format!("%{}%", query);
            let mut stmt = conn.prepare(&format!(
                "SELECT {ACCOUNT_COLS} FROM accounts
                 WHERE name LIKE ?1 OR email LIKE ?1
                 ORDER BY name"
            ))?;
            let rows = stmt
                .query_map([&pattern], account_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Profile fields only. Connection membership is never touched here.
    pub fn update_account(
        &self,
        id: &str,
        name: Option<&str>,
        relation: Option<&str>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE accounts SET
                     name = COALESCE(?2, name),
                     relation = COALESCE(?3, relation)
                 WHERE id = ?1",
                rusqlite::params![id, name, relation],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Connections (the relationship graph) --

    /// Insert the caregiver/observer edge. Returns the stored edge, or None
    /// when the unique pair constraint rejected a duplicate — the caller maps
    /// that to AlreadyConnected. Concurrent connects for the same pair race on
    /// the constraint, so at most one ever wins.
    pub fn insert_connection(
        &self,
        id: &str,
        caregiver_id: &str,
        observer_id: &str,
    ) -> Result<Option<ConnectionRow>> {
        self.with_conn(|conn| {
            let res = conn.execute(
                "INSERT INTO connections (id, caregiver_id, observer_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, caregiver_id, observer_id],
            );
            match res {
                Ok(_) => {}
                Err(e) if constraint_violation(&e) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
            let row = conn.query_row(
                "SELECT id, caregiver_id, observer_id, created_at FROM connections WHERE id = ?1",
                [id],
                |row| {
                    Ok(ConnectionRow {
                        id: row.get(0)?,
                        caregiver_id: row.get(1)?,
                        observer_id: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )?;
            Ok(Some(row))
        })
    }

    /// Symmetric edge-existence test.
    pub fn is_connected(&self, a: &str, b: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM connections
                 WHERE (caregiver_id = ?1 AND observer_id = ?2)
                    OR (caregiver_id = ?2 AND observer_id = ?1)",
                [a, b],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// Accounts on the other end of every edge touching `account_id`.
    pub fn connections_of(&self, account_id: &str) -> Result<Vec<AccountRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM accounts a
                 JOIN connections c
                   ON (c.caregiver_id = ?1 AND c.observer_id = a.id)
                   OR (c.observer_id = ?1 AND c.caregiver_id = a.id)
                 ORDER BY a.name",
                account_cols_prefixed()
            ))?;
            let rows = stmt
                .query_map([account_id], account_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Caregiver side of every edge where `observer_id` is the observer.
    /// Drives media fan-out.
    pub fn connected_caregivers(&self, observer_id: &str) -> Result<Vec<AccountRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM accounts a
                 JOIN connections c ON c.caregiver_id = a.id
                 WHERE c.observer_id = ?1
                 ORDER BY a.name",
                account_cols_prefixed()
            ))?;
            let rows = stmt
                .query_map([observer_id], account_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        sender_id: &str,
        recipient_id: &str,
        text: &str,
        sent_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, sender_id, recipient_id, text, sent_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, sender_id, recipient_id, text, sent_at],
            )?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {MESSAGE_COLS} FROM messages WHERE id = ?1"),
                    [id],
                    message_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Both directions between the pair, oldest first.
    pub fn messages_between(&self, a: &str, b: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLS} FROM messages
                 WHERE (sender_id = ?1 AND recipient_id = ?2)
                    OR (sender_id = ?2 AND recipient_id = ?1)
                 ORDER BY sent_at ASC"
            ))?;
            let rows = stmt
                .query_map([a, b], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Unread messages addressed to `recipient_id`, optionally scoped to one
    /// sender.
    pub fn unread_messages(
        &self,
        recipient_id: &str,
        sender_id: Option<&str>,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLS} FROM messages
                 WHERE recipient_id = ?1
                   AND read = 0
                   AND (?2 IS NULL OR sender_id = ?2)
                 ORDER BY sent_at ASC"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![recipient_id, sender_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Idempotent: marking an already-read message is a no-op that still
    /// returns the row. None only for unknown ids.
    pub fn mark_message_read(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            conn.execute("UPDATE messages SET read = 1 WHERE id = ?1", [id])?;
            let row = conn
                .query_row(
                    &format!("SELECT {MESSAGE_COLS} FROM messages WHERE id = ?1"),
                    [id],
                    message_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Media --

    /// One physical upload, N logical deliveries: a row per recipient, all
    /// sharing kind/path/description/timestamp, inserted in one transaction
    /// so a failed write never leaves a partial fan-out behind.
    pub fn insert_media_fanout(
        &self,
        sender_id: &str,
        kind: &str,
        blob_path: &str,
        description: Option<&str>,
        sent_at: &str,
        deliveries: &[(String, String)], // (media id, recipient id)
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            for (id, recipient_id) in deliveries {
                tx.execute(
                    "INSERT INTO media (id, kind, blob_path, description, sender_id, recipient_id, sent_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    rusqlite::params![id, kind, blob_path, description, sender_id, recipient_id, sent_at],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_media(&self, id: &str) -> Result<Option<MediaRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {MEDIA_COLS} FROM media WHERE id = ?1"),
                    [id],
                    media_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn media_between(&self, a: &str, b: &str) -> Result<Vec<MediaRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MEDIA_COLS} FROM media
                 WHERE (sender_id = ?1 AND recipient_id = ?2)
                    OR (sender_id = ?2 AND recipient_id = ?1)
                 ORDER BY sent_at ASC"
            ))?;
            let rows = stmt
                .query_map([a, b], media_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Media between the pair with `sent_at` at or after the cutoff.
    pub fn media_between_since(&self, a: &str, b: &str, since: &str) -> Result<Vec<MediaRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MEDIA_COLS} FROM media
                 WHERE ((sender_id = ?1 AND recipient_id = ?2)
                     OR (sender_id = ?2 AND recipient_id = ?1))
                   AND sent_at >= ?3
                 ORDER BY sent_at ASC"
            ))?;
            let rows = stmt
                .query_map([a, b, since], media_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// All media addressed to `recipient_id` at or after the cutoff.
    pub fn media_for_since(&self, recipient_id: &str, since: &str) -> Result<Vec<MediaRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MEDIA_COLS} FROM media
                 WHERE recipient_id = ?1 AND sent_at >= ?2
                 ORDER BY sent_at ASC"
            ))?;
            let rows = stmt
                .query_map([recipient_id, since], media_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn mark_media_read(&self, id: &str) -> Result<Option<MediaRow>> {
        self.with_conn(|conn| {
            conn.execute("UPDATE media SET read = 1 WHERE id = ?1", [id])?;
            let row = conn
                .query_row(
                    &format!("SELECT {MEDIA_COLS} FROM media WHERE id = ?1"),
                    [id],
                    media_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }
}

fn query_account(conn: &Connection, column: &str, value: &str) -> Result<Option<AccountRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ACCOUNT_COLS} FROM accounts WHERE {column} = ?1"
    ))?;
    let row = stmt.query_row([value], account_from_row).optional()?;
    Ok(row)
}

fn account_cols_prefixed() -> String {
    ACCOUNT_COLS
        .split(", ")
        .map(|c| format!("a.{}", c))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn add_account(db: &Database, id: &str, email: &str, role: &str) {
        let (relation, birth_date) = if role == "observer" {
            (Some("daughter"), Some("1990-01-01"))
        } else {
            (None, None)
        };
        assert!(db
            .create_account(id, "Test", email, "hash", role, relation, birth_date)
            .unwrap());
    }

    const CG: &str = "00000000-0000-0000-0000-000000000001";
    const OB: &str = "00000000-0000-0000-0000-000000000002";
    const CG2: &str = "00000000-0000-0000-0000-000000000003";

    #[test]
    fn duplicate_email_is_rejected() {
        let db = db();
        add_account(&db, CG, "a@x.com", "caregiver");
        let again = db
            .create_account(OB, "Other", "a@x.com", "hash", "caregiver", None, None)
            .unwrap();
        assert!(!again);
    }

    #[test]
    fn connection_is_symmetric() {
        let db = db();
        add_account(&db, CG, "cg@x.com", "caregiver");
        add_account(&db, OB, "ob@x.com", "observer");

        let edge = db.insert_connection("c1", CG, OB).unwrap();
        assert!(edge.is_some());

        assert!(db.is_connected(CG, OB).unwrap());
        assert!(db.is_connected(OB, CG).unwrap());

        let of_cg = db.connections_of(CG).unwrap();
        let of_ob = db.connections_of(OB).unwrap();
        assert_eq!(of_cg.len(), 1);
        assert_eq!(of_cg[0].id, OB);
        assert_eq!(of_ob.len(), 1);
        assert_eq!(of_ob[0].id, CG);
    }

    #[test]
    fn duplicate_edge_hits_constraint() {
        let db = db();
        add_account(&db, CG, "cg@x.com", "caregiver");
        add_account(&db, OB, "ob@x.com", "observer");

        assert!(db.insert_connection("c1", CG, OB).unwrap().is_some());
        assert!(db.insert_connection("c2", CG, OB).unwrap().is_none());

        // exactly one edge survives
        assert_eq!(db.connections_of(CG).unwrap().len(), 1);
    }

    #[test]
    fn observer_may_have_many_caregivers() {
        let db = db();
        add_account(&db, CG, "cg1@x.com", "caregiver");
        add_account(&db, CG2, "cg2@x.com", "caregiver");
        add_account(&db, OB, "ob@x.com", "observer");

        db.insert_connection("c1", CG, OB).unwrap();
        db.insert_connection("c2", CG2, OB).unwrap();

        let caregivers = db.connected_caregivers(OB).unwrap();
        assert_eq!(caregivers.len(), 2);
    }

    #[test]
    fn messages_between_is_symmetric_and_ordered() {
        let db = db();
        add_account(&db, CG, "cg@x.com", "caregiver");
        add_account(&db, OB, "ob@x.com", "observer");

        db.insert_message("m1", OB, CG, "hi", "2026-01-01T10:00:00+00:00").unwrap();
        db.insert_message("m2", CG, OB, "hello", "2026-01-01T11:00:00+00:00").unwrap();

        let forward = db.messages_between(CG, OB).unwrap();
        let backward = db.messages_between(OB, CG).unwrap();
        assert_eq!(forward.len(), 2);
        assert_eq!(backward.len(), 2);
        assert_eq!(forward[0].id, "m1");
        assert_eq!(forward[1].id, "m2");
    }

    #[test]
    fn unread_scoping() {
        let db = db();
        add_account(&db, CG, "cg@x.com", "caregiver");
        add_account(&db, OB, "ob@x.com", "observer");
        add_account(&db, CG2, "cg2@x.com", "caregiver");

        db.insert_message("m1", OB, CG, "one", "2026-01-01T10:00:00+00:00").unwrap();
        db.insert_message("m2", CG2, CG, "two", "2026-01-01T11:00:00+00:00").unwrap();
        db.mark_message_read("m2").unwrap();

        let all = db.unread_messages(CG, None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "m1");

        let scoped = db.unread_messages(CG, Some(CG2)).unwrap();
        assert!(scoped.is_empty());
    }

    #[test]
    fn mark_read_is_idempotent() {
        let db = db();
        add_account(&db, CG, "cg@x.com", "caregiver");
        add_account(&db, OB, "ob@x.com", "observer");
        db.insert_message("m1", OB, CG, "hi", "2026-01-01T10:00:00+00:00").unwrap();

        let first = db.mark_message_read("m1").unwrap().unwrap();
        assert!(first.read);
        let second = db.mark_message_read("m1").unwrap().unwrap();
        assert!(second.read);

        assert!(db.mark_message_read("nope").unwrap().is_none());
    }

    #[test]
    fn media_fanout_shares_path_and_timestamp() {
        let db = db();
        add_account(&db, CG, "cg1@x.com", "caregiver");
        add_account(&db, CG2, "cg2@x.com", "caregiver");
        add_account(&db, OB, "ob@x.com", "observer");
        db.insert_connection("c1", CG, OB).unwrap();
        db.insert_connection("c2", CG2, OB).unwrap();

        let deliveries = vec![
            ("md1".to_string(), CG.to_string()),
            ("md2".to_string(), CG2.to_string()),
        ];
        db.insert_media_fanout(OB, "photo", "uploads/p1", Some("beach"), "2026-01-01T10:00:00+00:00", &deliveries)
            .unwrap();

        let for_cg1 = db.media_between(OB, CG).unwrap();
        let for_cg2 = db.media_between(OB, CG2).unwrap();
        assert_eq!(for_cg1.len(), 1);
        assert_eq!(for_cg2.len(), 1);
        assert_eq!(for_cg1[0].blob_path, for_cg2[0].blob_path);
        assert_eq!(for_cg1[0].sent_at, for_cg2[0].sent_at);
        assert!(!for_cg1[0].read);

        // read flags are independent
        db.mark_media_read("md1").unwrap().unwrap();
        assert!(db.get_media("md1").unwrap().unwrap().read);
        assert!(!db.get_media("md2").unwrap().unwrap().read);
    }

    #[test]
    fn media_window_filter() {
        let db = db();
        add_account(&db, CG, "cg@x.com", "caregiver");
        add_account(&db, OB, "ob@x.com", "observer");
        db.insert_connection("c1", CG, OB).unwrap();

        db.insert_media_fanout(OB, "photo", "uploads/old", None, "2026-01-01T10:00:00+00:00",
            &[("md1".to_string(), CG.to_string())]).unwrap();
        db.insert_media_fanout(OB, "photo", "uploads/new", None, "2026-02-01T10:00:00+00:00",
            &[("md2".to_string(), CG.to_string())]).unwrap();

        let recent = db.media_for_since(CG, "2026-01-15T00:00:00+00:00").unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, "md2");

        let pair = db
            .media_between_since(CG, OB, "2026-01-15T00:00:00+00:00")
            .unwrap();
        assert_eq!(pair.len(), 1);
        assert_eq!(pair[0].id, "md2");
    }

    #[test]
    fn search_matches_name_or_email() {
        let db = db();
        add_account(&db, CG, "maria@x.com", "caregiver");
        add_account(&db, OB, "joao@y.com", "observer");

        assert_eq!(db.search_accounts("maria").unwrap().len(), 1);
        assert_eq!(db.search_accounts("x.com").unwrap().len(), 1);
        assert_eq!(db.search_accounts("zzz").unwrap().len(), 0);
    }

    #[test]
    fn update_touches_profile_fields_only() {
        let db = db();
        add_account(&db, OB, "ob@x.com", "observer");

        assert!(db.update_account(OB, Some("New Name"), None).unwrap());
        let row = db.get_account_by_id(OB).unwrap().unwrap();
        assert_eq!(row.name, "New Name");
        assert_eq!(row.relation.as_deref(), Some("daughter"));

        assert!(!db.update_account("missing", Some("x"), None).unwrap());
    }
}
