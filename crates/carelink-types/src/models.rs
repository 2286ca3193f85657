use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The two account classes. Every connection pairs exactly one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Caregiver,
    Observer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Caregiver => "caregiver",
            Role::Observer => "observer",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "caregiver" => Some(Role::Caregiver),
            "observer" => Some(Role::Observer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<MediaKind> {
        match s {
            "photo" => Some(MediaKind::Photo),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

/// Public view of an account. The password hash never leaves the db layer.
/// `relation` and `birth_date` are populated only for observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// A caregiver/observer edge. The edge record is the single source of truth
/// for the relationship graph; connection sets are derived by query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    pub caregiver_id: Uuid,
    pub observer_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Immutable once stored, except for the read flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub text: String,
    pub sent_at: DateTime<Utc>,
    pub read: bool,
}

/// One logical upload fans out into one of these per connected caregiver.
/// Items in a batch share kind/path/description/timestamp but are tracked
/// as read independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: Uuid,
    pub kind: MediaKind,
    pub blob_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub sent_at: DateTime<Utc>,
    pub read: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_roundtrip() {
        assert_eq!(Role::parse("caregiver"), Some(Role::Caregiver));
        assert_eq!(Role::parse("observer"), Some(Role::Observer));
        assert_eq!(Role::parse("admin"), None);
        assert_eq!(Role::Caregiver.as_str(), "caregiver");
    }

    #[test]
    fn media_kind_roundtrip() {
        assert_eq!(MediaKind::parse("photo"), Some(MediaKind::Photo));
        assert_eq!(MediaKind::parse("video"), Some(MediaKind::Video));
        assert_eq!(MediaKind::parse("audio"), None);
    }

    #[test]
    fn role_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Caregiver).unwrap(), "\"caregiver\"");
        assert_eq!(serde_json::to_string(&MediaKind::Photo).unwrap(), "\"photo\"");
    }
}
