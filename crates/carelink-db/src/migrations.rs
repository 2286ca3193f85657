use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS accounts (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            role        TEXT NOT NULL CHECK (role IN ('caregiver', 'observer')),
            relation    TEXT,
            birth_date  TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- The edge records ARE the relationship graph; connection sets are
        -- derived by query. The unique pair constraint serializes concurrent
        -- connect attempts: at most one insert per pair ever succeeds.
        CREATE TABLE IF NOT EXISTS connections (
            id            TEXT PRIMARY KEY,
            caregiver_id  TEXT NOT NULL REFERENCES accounts(id),
            observer_id   TEXT NOT NULL REFERENCES accounts(id),
            created_at    TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(caregiver_id, observer_id)
        );

        CREATE INDEX IF NOT EXISTS idx_connections_observer
            ON connections(observer_id);

        CREATE TABLE IF NOT EXISTS messages (
            id            TEXT PRIMARY KEY,
            sender_id     TEXT NOT NULL REFERENCES accounts(id),
            recipient_id  TEXT NOT NULL REFERENCES accounts(id),
            text          TEXT NOT NULL,
            sent_at       TEXT NOT NULL,
            read          INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_messages_pair
            ON messages(sender_id, recipient_id, sent_at);

        CREATE INDEX IF NOT EXISTS idx_messages_unread
            ON messages(recipient_id, read);

        CREATE TABLE IF NOT EXISTS media (
            id            TEXT PRIMARY KEY,
            kind          TEXT NOT NULL CHECK (kind IN ('photo', 'video')),
            blob_path     TEXT NOT NULL,
            description   TEXT,
            sender_id     TEXT NOT NULL REFERENCES accounts(id),
            recipient_id  TEXT NOT NULL REFERENCES accounts(id),
            sent_at       TEXT NOT NULL,
            read          INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_media_pair
            ON media(sender_id, recipient_id, sent_at);

        CREATE INDEX IF NOT EXISTS idx_media_recipient
            ON media(recipient_id, sent_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
