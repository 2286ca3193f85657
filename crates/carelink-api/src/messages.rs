use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use carelink_types::api::{Claims, SendMessageRequest, UnreadQuery};
use carelink_types::models::{Message, Role};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::guard;

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::EmptyText);
    }

    let message_id = Uuid::new_v4();
    let sender_id = claims.sub;
    let recipient_id = req.recipient_id;
    let sent_at = Utc::now();

    let db = state.clone();
    let text = req.text.clone();
    blocking(move || {
        guard::authorize(&db.db, sender_id, recipient_id)?;
        db.db.insert_message(
            &message_id.to_string(),
            &sender_id.to_string(),
            &recipient_id.to_string(),
            &req.text,
            &sent_at.to_rfc3339(),
        )?;
        Ok(())
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(Message {
            id: message_id,
            sender_id,
            recipient_id,
            text,
            sent_at,
            read: false,
        }),
    ))
}

/// Both directions between caller and contact, oldest first. Zero rows is an
/// empty list, not an error.
pub async fn list_messages(
    State(state): State<AppState>,
    Path(contact_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let db = state.clone();
    let messages = blocking(move || {
        guard::authorize(&db.db, claims.sub, contact_id)?;
        let rows = db
            .db
            .messages_between(&claims.sub.to_string(), &contact_id.to_string())?;
        let messages = rows
            .into_iter()
            .map(|row| row.into_message())
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(messages)
    })
    .await?;

    Ok(Json(messages))
}

/// Unread messages addressed to the caller. Caregivers see everything unless
/// they scope to one contact; observers must always scope.
pub async fn list_unread(
    State(state): State<AppState>,
    Query(query): Query<UnreadQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Message>>, ApiError> {
    if claims.role == Role::Observer && query.contact_id.is_none() {
        return Err(ApiError::MissingContactId);
    }

    let db = state.clone();
    let messages = blocking(move || {
        if let Some(contact_id) = query.contact_id {
            guard::authorize(&db.db, claims.sub, contact_id)?;
        }
        let rows = db.db.unread_messages(
            &claims.sub.to_string(),
            query.contact_id.map(|id| id.to_string()).as_deref(),
        )?;
        let messages = rows
            .into_iter()
            .map(|row| row.into_message())
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(messages)
    })
    .await?;

    Ok(Json(messages))
}

/// Idempotent: re-marking an already-read message succeeds unchanged.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Message>, ApiError> {
    let db = state.clone();
    let message = blocking(move || {
        let row = db
            .db
            .get_message(&message_id.to_string())?
            .ok_or(ApiError::NotFound("message"))?;
        if row.recipient_id != claims.sub.to_string() {
            return Err(ApiError::NotRecipient);
        }
        let row = db
            .db
            .mark_message_read(&message_id.to_string())?
            .ok_or(ApiError::NotFound("message"))?;
        Ok(row.into_message()?)
    })
    .await?;

    Ok(Json(message))
}
