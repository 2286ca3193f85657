use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{MediaKind, Role};

// -- JWT Claims --

/// Session credential payload shared by the issuing side (login/register) and
/// the verifying side (bearer middleware). Canonical definition lives here so
/// the two never drift apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub role: Role,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub relation: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub account_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub account_id: Uuid,
    pub name: String,
    pub role: Role,
    pub token: String,
}

// -- Accounts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub relation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

// -- Connections --

/// The counterpart may be named by email or by account id; the server
/// resolves whichever was sent.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectRequest {
    pub counterpart: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub recipient_id: Uuid,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct UnreadQuery {
    pub contact_id: Option<Uuid>,
}

// -- Media --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadMediaRequest {
    pub kind: MediaKind,
    pub description: Option<String>,
    pub blob_path: String,
}

#[derive(Debug, Deserialize)]
pub struct RecentMediaQuery {
    pub contact_id: Option<Uuid>,
    pub window_days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct BlobResponse {
    pub blob_path: String,
    pub size: u64,
}
