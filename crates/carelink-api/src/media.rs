use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use carelink_types::api::{Claims, RecentMediaQuery, UploadMediaRequest};
use carelink_types::models::{MediaItem, Role};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::guard;

/// Default look-back for the recent-media listing.
const DEFAULT_WINDOW_DAYS: i64 = 30;

/// One physical upload, one logical delivery per connected caregiver. This is
/// the broadcast operation: it takes no target, the relationship graph decides
/// who receives.
pub async fn upload_media(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UploadMediaRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.blob_path.trim().is_empty() {
        return Err(ApiError::Validation { field: "blob_path", reason: "must not be empty" });
    }

    let sent_at = Utc::now();

    let db = state.clone();
    let items = blocking(move || {
        let caregivers = db.db.connected_caregivers(&claims.sub.to_string())?;
        if caregivers.is_empty() {
            return Err(ApiError::NoConnections);
        }

        let deliveries: Vec<(String, String)> = caregivers
            .iter()
            .map(|cg| (Uuid::new_v4().to_string(), cg.id.clone()))
            .collect();

        db.db.insert_media_fanout(
            &claims.sub.to_string(),
            req.kind.as_str(),
            &req.blob_path,
            req.description.as_deref(),
            &sent_at.to_rfc3339(),
            &deliveries,
        )?;

        let items = deliveries
            .into_iter()
            .map(|(id, recipient_id)| {
                Ok(MediaItem {
                    id: id.parse()?,
                    kind: req.kind,
                    blob_path: req.blob_path.clone(),
                    description: req.description.clone(),
                    sender_id: claims.sub,
                    recipient_id: recipient_id.parse()?,
                    sent_at,
                    read: false,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(items)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(items)))
}

/// Both directions between caller and contact, oldest first.
pub async fn list_media(
    State(state): State<AppState>,
    Path(contact_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<MediaItem>>, ApiError> {
    let db = state.clone();
    let items = blocking(move || {
        guard::authorize(&db.db, claims.sub, contact_id)?;
        let rows = db
            .db
            .media_between(&claims.sub.to_string(), &contact_id.to_string())?;
        let items = rows
            .into_iter()
            .map(|row| row.into_media_item())
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(items)
    })
    .await?;

    Ok(Json(items))
}

/// Media inside the look-back window. Caregivers may leave the query
/// unscoped to see everything addressed to them; observers must scope to a
/// contact.
pub async fn list_recent(
    State(state): State<AppState>,
    Query(query): Query<RecentMediaQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<MediaItem>>, ApiError> {
    let window_days = query.window_days.unwrap_or(DEFAULT_WINDOW_DAYS);
    if window_days < 1 {
        return Err(ApiError::Validation { field: "window_days", reason: "must be at least 1" });
    }
    if claims.role == Role::Observer && query.contact_id.is_none() {
        return Err(ApiError::MissingContactId);
    }

    let since = (Utc::now() - Duration::days(window_days)).to_rfc3339();

    let db = state.clone();
    let items = blocking(move || {
        let rows = match query.contact_id {
            Some(contact_id) => {
                guard::authorize(&db.db, claims.sub, contact_id)?;
                db.db.media_between_since(
                    &claims.sub.to_string(),
                    &contact_id.to_string(),
                    &since,
                )?
            }
            None => db.db.media_for_since(&claims.sub.to_string(), &since)?,
        };
        let items = rows
            .into_iter()
            .map(|row| row.into_media_item())
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(items)
    })
    .await?;

    Ok(Json(items))
}

/// Idempotent, recipient-only, like the message counterpart.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(media_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MediaItem>, ApiError> {
    let db = state.clone();
    let item = blocking(move || {
        let row = db
            .db
            .get_media(&media_id.to_string())?
            .ok_or(ApiError::NotFound("media item"))?;
        if row.recipient_id != claims.sub.to_string() {
            return Err(ApiError::NotRecipient);
        }
        let row = db
            .db
            .mark_media_read(&media_id.to_string())?
            .ok_or(ApiError::NotFound("media item"))?;
        Ok(row.into_media_item()?)
    })
    .await?;

    Ok(Json(item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use carelink_db::Database;

    /// Register caregiver + observer, connect, upload a photo, watch it fan
    /// out to the one connected caregiver, mark it read, re-list.
    #[test]
    fn photo_delivery_scenario() {
        let db = Database::open_in_memory().unwrap();
        let cg = Uuid::new_v4();
        let fam = Uuid::new_v4();
        db.create_account(&cg.to_string(), "Carlos", "cg@x.com", "hash", "caregiver", None, None)
            .unwrap();
        db.create_account(
            &fam.to_string(),
            "Fernanda",
            "fam@x.com",
            "hash",
            "observer",
            Some("daughter"),
            Some("1990-01-01"),
        )
        .unwrap();

        // unconnected: guarded operations are denied and the broadcast has
        // nobody to deliver to
        assert!(matches!(
            guard::authorize(&db, fam, cg),
            Err(ApiError::NotConnected)
        ));
        assert!(db.connected_caregivers(&fam.to_string()).unwrap().is_empty());

        db.insert_connection(&Uuid::new_v4().to_string(), &cg.to_string(), &fam.to_string())
            .unwrap()
            .unwrap();
        assert!(guard::authorize(&db, fam, cg).is_ok());

        let caregivers = db.connected_caregivers(&fam.to_string()).unwrap();
        assert_eq!(caregivers.len(), 1);

        let sent_at = Utc::now().to_rfc3339();
        let deliveries: Vec<(String, String)> = caregivers
            .iter()
            .map(|c| (Uuid::new_v4().to_string(), c.id.clone()))
            .collect();
        db.insert_media_fanout(&fam.to_string(), "photo", "uploads/beach", Some("praia"), &sent_at, &deliveries)
            .unwrap();

        let listed = db.media_between(&cg.to_string(), &fam.to_string()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].kind, "photo");
        assert!(!listed[0].read);

        db.mark_media_read(&listed[0].id).unwrap().unwrap();
        let listed = db.media_between(&cg.to_string(), &fam.to_string()).unwrap();
        assert!(listed[0].read);
    }
}
