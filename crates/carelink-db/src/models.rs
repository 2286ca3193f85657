//! Database row types — these map directly to SQLite rows.
//! Distinct from the carelink-types API models to keep the DB layer
//! independent; conversion into domain types happens here so corrupt
//! rows surface as storage errors instead of defaulted values.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};

use carelink_types::models::{Account, Connection, MediaItem, MediaKind, Message, Role};

pub struct AccountRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub relation: Option<String>,
    pub birth_date: Option<String>,
    pub created_at: String,
}

pub struct ConnectionRow {
    pub id: String,
    pub caregiver_id: String,
    pub observer_id: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub text: String,
    pub sent_at: String,
    pub read: bool,
}

pub struct MediaRow {
    pub id: String,
    pub kind: String,
    pub blob_path: String,
    pub description: Option<String>,
    pub sender_id: String,
    pub recipient_id: String,
    pub sent_at: String,
    pub read: bool,
}

/// SQLite's datetime('now') produces `YYYY-MM-DD HH:MM:SS` without a
/// timezone; timestamps written by the application are RFC 3339. Accept both.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("corrupt timestamp '{}'", raw))
}

impl AccountRow {
    pub fn into_account(self) -> Result<Account> {
        Ok(Account {
            id: self.id.parse().with_context(|| format!("corrupt account id '{}'", self.id))?,
            role: Role::parse(&self.role)
                .with_context(|| format!("corrupt role '{}' on account '{}'", self.role, self.id))?,
            relation: self.relation,
            birth_date: self
                .birth_date
                .map(|d| d.parse::<NaiveDate>().with_context(|| format!("corrupt birth date '{}'", d)))
                .transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
            name: self.name,
            email: self.email,
        })
    }
}

impl ConnectionRow {
    pub fn into_connection(self) -> Result<Connection> {
        Ok(Connection {
            id: self.id.parse().with_context(|| format!("corrupt connection id '{}'", self.id))?,
            caregiver_id: self.caregiver_id.parse().context("corrupt caregiver id")?,
            observer_id: self.observer_id.parse().context("corrupt observer id")?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl MessageRow {
    pub fn into_message(self) -> Result<Message> {
        Ok(Message {
            id: self.id.parse().with_context(|| format!("corrupt message id '{}'", self.id))?,
            sender_id: self.sender_id.parse().context("corrupt sender id")?,
            recipient_id: self.recipient_id.parse().context("corrupt recipient id")?,
            sent_at: parse_timestamp(&self.sent_at)?,
            text: self.text,
            read: self.read,
        })
    }
}

impl MediaRow {
    pub fn into_media_item(self) -> Result<MediaItem> {
        Ok(MediaItem {
            id: self.id.parse().with_context(|| format!("corrupt media id '{}'", self.id))?,
            kind: MediaKind::parse(&self.kind)
                .with_context(|| format!("corrupt media kind '{}' on item '{}'", self.kind, self.id))?,
            sender_id: self.sender_id.parse().context("corrupt sender id")?,
            recipient_id: self.recipient_id.parse().context("corrupt recipient id")?,
            sent_at: parse_timestamp(&self.sent_at)?,
            blob_path: self.blob_path,
            description: self.description,
            read: self.read,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_and_sqlite_timestamps() {
        assert!(parse_timestamp("2026-08-06T12:30:00+00:00").is_ok());
        assert!(parse_timestamp("2026-08-06 12:30:00").is_ok());
        assert!(parse_timestamp("last tuesday").is_err());
    }
}
