use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use carelink_db::models::AccountRow;
use carelink_types::api::{Claims, ConnectRequest};
use carelink_types::models::{Account, Role};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};

/// The requester may name the counterpart by account id or by email.
fn resolve_counterpart(
    db: &carelink_db::Database,
    counterpart: &str,
) -> Result<Option<AccountRow>, ApiError> {
    let row = if counterpart.parse::<Uuid>().is_ok() {
        db.get_account_by_id(counterpart)?
    } else {
        db.get_account_by_email(counterpart)?
    };
    Ok(row)
}

/// Orient a pair as (caregiver, observer) regardless of which side asked.
/// Anything other than exactly one of each is a role mismatch.
fn orient<'a>(
    requester: &'a AccountRow,
    counterpart: &'a AccountRow,
) -> Result<(&'a AccountRow, &'a AccountRow), ApiError> {
    match (Role::parse(&requester.role), Role::parse(&counterpart.role)) {
        (Some(Role::Caregiver), Some(Role::Observer)) => Ok((requester, counterpart)),
        (Some(Role::Observer), Some(Role::Caregiver)) => Ok((counterpart, requester)),
        _ => Err(ApiError::InvalidRoles),
    }
}

/// Form the caregiver/observer edge. Works from either side: the requester
/// may be the caregiver or the observer, as long as the pair has exactly one
/// of each.
pub async fn connect(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ConnectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let connection = blocking(move || {
        let requester = db
            .db
            .get_account_by_id(&claims.sub.to_string())?
            .ok_or(ApiError::NotFound("account"))?;
        let counterpart = resolve_counterpart(&db.db, &req.counterpart)?
            .ok_or(ApiError::NotFound("account"))?;

        let (caregiver, observer) = orient(&requester, &counterpart)?;

        if db.db.is_connected(&caregiver.id, &observer.id)? {
            return Err(ApiError::AlreadyConnected);
        }

        let edge_id = Uuid::new_v4();
        let row = db
            .db
            .insert_connection(&edge_id.to_string(), &caregiver.id, &observer.id)?
            // a concurrent connect for the same pair got there first
            .ok_or(ApiError::AlreadyConnected)?;

        Ok(row.into_connection()?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(connection)))
}

/// Contact list, derived from the relationship graph rather than from
/// observed traffic: everyone on the other end of the caller's edges.
pub async fn contacts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Account>>, ApiError> {
    let db = state.clone();
    let contacts = blocking(move || {
        let rows = db.db.connections_of(&claims.sub.to_string())?;
        let accounts = rows
            .into_iter()
            .map(|row| row.into_account())
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(accounts)
    })
    .await?;

    Ok(Json(contacts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(role: &str) -> AccountRow {
        AccountRow {
            id: Uuid::new_v4().to_string(),
            name: "Test".to_string(),
            email: format!("{}@x.com", Uuid::new_v4()),
            password: "hash".to_string(),
            role: role.to_string(),
            relation: None,
            birth_date: None,
            created_at: "2026-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn orients_from_either_side() {
        let cg = row("caregiver");
        let ob = row("observer");

        let (c, o) = orient(&cg, &ob).unwrap();
        assert_eq!(c.id, cg.id);
        assert_eq!(o.id, ob.id);

        let (c, o) = orient(&ob, &cg).unwrap();
        assert_eq!(c.id, cg.id);
        assert_eq!(o.id, ob.id);
    }

    #[test]
    fn same_role_pairs_are_rejected() {
        assert!(matches!(
            orient(&row("caregiver"), &row("caregiver")),
            Err(ApiError::InvalidRoles)
        ));
        assert!(matches!(
            orient(&row("observer"), &row("observer")),
            Err(ApiError::InvalidRoles)
        ));
    }
}
