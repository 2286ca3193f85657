use std::path::PathBuf;
use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use carelink_db::Database;
use carelink_types::api::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use carelink_types::models::Role;

use crate::error::{ApiError, blocking};
use crate::session::SessionAuthority;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub sessions: SessionAuthority,
    pub media_dir: PathBuf,
}

fn valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn validate_registration(req: &RegisterRequest) -> Result<(), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation { field: "name", reason: "must not be empty" });
    }
    if !valid_email(&req.email) {
        return Err(ApiError::Validation { field: "email", reason: "is not a valid address" });
    }
    if req.password.len() < 6 {
        return Err(ApiError::Validation { field: "password", reason: "must be at least 6 characters" });
    }
    if req.role == Role::Observer {
        if req.relation.as_deref().map_or(true, |r| r.trim().is_empty()) {
            return Err(ApiError::Validation { field: "relation", reason: "is required for observers" });
        }
        if req.birth_date.is_none() {
            return Err(ApiError::Validation { field: "birth_date", reason: "is required for observers" });
        }
    }
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_registration(&req)?;

    let account_id = Uuid::new_v4();
    let name = req.name.clone();
    let role = req.role;

    let db = state.clone();
    blocking(move || {
        if db.db.get_account_by_email(&req.email)?.is_some() {
            return Err(ApiError::DuplicateEmail);
        }

        // Always hash-and-compare; plaintext never reaches the store.
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
            .to_string();

        // Relation and birth date only mean something for observers.
        let (relation, birth_date) = match req.role {
            Role::Observer => (
                req.relation.as_deref(),
                req.birth_date.map(|d| d.to_string()),
            ),
            Role::Caregiver => (None, None),
        };

        let created = db.db.create_account(
            &account_id.to_string(),
            req.name.trim(),
            &req.email,
            &password_hash,
            req.role.as_str(),
            relation,
            birth_date.as_deref(),
        )?;
        if !created {
            // lost the unique-email race to a concurrent registration
            return Err(ApiError::DuplicateEmail);
        }
        Ok(())
    })
    .await?;

    let token = state.sessions.issue(account_id, name.trim(), role)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { account_id, token }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let account = blocking(move || {
        let row = db
            .db
            .get_account_by_email(&req.email)?
            // unknown email and wrong password are indistinguishable
            .ok_or(ApiError::InvalidCredentials)?;

        let parsed_hash = PasswordHash::new(&row.password)
            .map_err(|e| anyhow::anyhow!("stored hash is unreadable: {}", e))?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::InvalidCredentials)?;

        Ok(row.into_account()?)
    })
    .await?;

    let token = state.sessions.issue(account.id, &account.name, account.role)?;

    Ok(Json(LoginResponse {
        account_id: account.id,
        name: account.name,
        role: account.role,
        token,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn base_request(role: Role) -> RegisterRequest {
        RegisterRequest {
            name: "Maria".to_string(),
            email: "maria@x.com".to_string(),
            password: "secret1".to_string(),
            role,
            relation: None,
            birth_date: None,
        }
    }

    #[test]
    fn caregiver_needs_no_relation() {
        assert!(validate_registration(&base_request(Role::Caregiver)).is_ok());
    }

    #[test]
    fn observer_requires_relation_and_birth_date() {
        let mut req = base_request(Role::Observer);
        assert!(matches!(
            validate_registration(&req),
            Err(ApiError::Validation { field: "relation", .. })
        ));

        req.relation = Some("daughter".to_string());
        assert!(matches!(
            validate_registration(&req),
            Err(ApiError::Validation { field: "birth_date", .. })
        ));

        req.birth_date = NaiveDate::from_ymd_opt(1990, 1, 1);
        assert!(validate_registration(&req).is_ok());
    }

    #[test]
    fn rejects_bad_inputs() {
        let mut req = base_request(Role::Caregiver);
        req.password = "short".to_string();
        assert!(matches!(
            validate_registration(&req),
            Err(ApiError::Validation { field: "password", .. })
        ));

        let mut req = base_request(Role::Caregiver);
        req.email = "not-an-email".to_string();
        assert!(matches!(
            validate_registration(&req),
            Err(ApiError::Validation { field: "email", .. })
        ));

        let mut req = base_request(Role::Caregiver);
        req.name = "  ".to_string();
        assert!(matches!(
            validate_registration(&req),
            Err(ApiError::Validation { field: "name", .. })
        ));
    }

    #[test]
    fn email_shapes() {
        assert!(valid_email("a@b.com"));
        assert!(!valid_email("a@b"));
        assert!(!valid_email("@b.com"));
        assert!(!valid_email("a@.com"));
        assert!(!valid_email("plain"));
    }
}
