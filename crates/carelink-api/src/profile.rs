use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use uuid::Uuid;

use carelink_types::api::{Claims, SearchQuery, UpdateProfileRequest};
use carelink_types::models::Account;

use crate::auth::AppState;
use crate::error::{ApiError, blocking};

pub async fn get_profile(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<Account>, ApiError> {
    let db = state.clone();
    let account = blocking(move || {
        let row = db
            .db
            .get_account_by_id(&account_id.to_string())?
            .ok_or(ApiError::NotFound("account"))?;
        Ok(row.into_account()?)
    })
    .await?;

    Ok(Json(account))
}

/// Name and relation only. Connections are never mutated through this path.
pub async fn update_profile(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<Account>, ApiError> {
    if claims.sub != account_id {
        return Err(ApiError::NotProfileOwner);
    }
    if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::Validation { field: "name", reason: "must not be empty" });
    }

    let db = state.clone();
    let account = blocking(move || {
        let id = account_id.to_string();
        let changed = db
            .db
            .update_account(&id, req.name.as_deref().map(str::trim), req.relation.as_deref())?;
        if !changed {
            return Err(ApiError::NotFound("account"));
        }
        let row = db.db.get_account_by_id(&id)?.ok_or(ApiError::NotFound("account"))?;
        Ok(row.into_account()?)
    })
    .await?;

    Ok(Json(account))
}

/// Substring search over name and email, returning public profiles.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<Vec<Account>>, ApiError> {
    let db = state.clone();
    let accounts = blocking(move || {
        let rows = db.db.search_accounts(query.q.trim())?;
        let accounts = rows
            .into_iter()
            .map(|row| row.into_account())
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(accounts)
    })
    .await?;

    Ok(Json(accounts))
}
