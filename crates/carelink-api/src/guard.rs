use uuid::Uuid;

use carelink_db::Database;

use crate::error::ApiError;

/// Stateless gate in front of every single-target messaging/media operation.
/// Decisions come from the relationship graph as it exists at call time —
/// nothing is cached across requests, since connections can form between
/// calls. The upload broadcast never passes through here; it resolves its
/// recipients from the graph directly.
pub fn authorize(db: &Database, caller: Uuid, target: Uuid) -> Result<(), ApiError> {
    if caller == target {
        return Err(ApiError::SelfTargetForbidden);
    }

    let target_id = target.to_string();
    if db.get_account_by_id(&target_id)?.is_none() {
        return Err(ApiError::NotFound("account"));
    }

    if !db.is_connected(&caller.to_string(), &target_id)? {
        return Err(ApiError::NotConnected);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(db: &Database, id: &str, email: &str, role: &str) {
        let (relation, birth) = if role == "observer" {
            (Some("son"), Some("1985-05-05"))
        } else {
            (None, None)
        };
        db.create_account(id, "Test", email, "hash", role, relation, birth).unwrap();
    }

    #[test]
    fn unconnected_pair_is_denied_until_connected() {
        let db = Database::open_in_memory().unwrap();
        let caregiver = Uuid::new_v4();
        let observer = Uuid::new_v4();
        seed(&db, &caregiver.to_string(), "cg@x.com", "caregiver");
        seed(&db, &observer.to_string(), "ob@x.com", "observer");

        assert!(matches!(
            authorize(&db, observer, caregiver),
            Err(ApiError::NotConnected)
        ));

        db.insert_connection("c1", &caregiver.to_string(), &observer.to_string())
            .unwrap();

        assert!(authorize(&db, observer, caregiver).is_ok());
        assert!(authorize(&db, caregiver, observer).is_ok());
    }

    #[test]
    fn self_target_is_forbidden() {
        let db = Database::open_in_memory().unwrap();
        let id = Uuid::new_v4();
        seed(&db, &id.to_string(), "cg@x.com", "caregiver");

        assert!(matches!(
            authorize(&db, id, id),
            Err(ApiError::SelfTargetForbidden)
        ));
    }

    #[test]
    fn unknown_target_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let caller = Uuid::new_v4();
        seed(&db, &caller.to_string(), "cg@x.com", "caregiver");

        assert!(matches!(
            authorize(&db, caller, Uuid::new_v4()),
            Err(ApiError::NotFound("account"))
        ));
    }
}
