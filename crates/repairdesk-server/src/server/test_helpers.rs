//! Shared test helpers for the service test modules.
//!
//! Provides an in-memory database, seeded users and principals used across
//! `auth_svc_tests`, `request_svc_tests`, `comment_svc_tests`,
//! `stats_svc_tests` and `user_svc_tests`.

use crate::auth::Principal;
use crate::lifecycle::{NewRequest, RequestDraft, today};
use crate::policy::Role;
use crate::storage::{NewUser, RepairDatabase, RepairRequest};

pub async fn test_db() -> RepairDatabase {
    RepairDatabase::open_in_memory().await.unwrap()
}

/// Insert a user with a placeholder hash and return it as a principal.
///
/// Use `insert_user` from `user_svc` instead when the password must verify.
pub async fn seed_user(db: &RepairDatabase, login: &str, name: &str, role: Role) -> Principal {
    let user = db
        .create_user(&NewUser {
            full_name: name,
            phone: "89210563128",
            login,
            password_hash: "unused",
            role,
        })
        .await
        .unwrap();
    Principal::new(user.user_id, user.role, user.full_name)
}

/// A manager, an operator, a technician and two clients.
pub struct Cast {
    pub manager: Principal,
    pub operator: Principal,
    pub master: Principal,
    pub client: Principal,
    pub other_client: Principal,
}

pub async fn seed_cast(db: &RepairDatabase) -> Cast {
    Cast {
        manager: seed_user(db, "kasoo", "Kasoo", Role::Manager).await,
        operator: seed_user(db, "perinaAD", "Perina", Role::Operator).await,
        master: seed_user(db, "murashov123", "Murashov", Role::Master).await,
        client: seed_user(db, "login1", "Alice", Role::Client).await,
        other_client: seed_user(db, "login2", "Bob", Role::Client).await,
    }
}

pub fn fridge_for(client_id: i64) -> NewRequest {
    NewRequest {
        tech_type: Some("Fridge".into()),
        tech_model: Some("X".into()),
        problem_description: Some("noisy".into()),
        client_id: Some(client_id),
        master_id: None,
    }
}

/// Insert a request directly, bypassing policy.
pub async fn seed_request(
    db: &RepairDatabase,
    client_id: i64,
    master_id: Option<i64>,
) -> RepairRequest {
    let draft = RequestDraft {
        tech_type: "Fridge".into(),
        tech_model: "X".into(),
        problem_description: "noisy".into(),
        client_id,
        master_id,
    };
    db.create_request(&draft, today()).await.unwrap()
}
