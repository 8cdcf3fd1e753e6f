//! Tests for `UserService`.

use repairdesk_core::config::BootstrapConfig;

use super::test_helpers::{Cast, seed_cast, seed_request, test_db};
use super::user_svc::{CreateUserRequest, UserService};
use crate::error::ApiError;
use crate::policy::Role;
use crate::storage::RepairDatabase;

async fn setup() -> (UserService, RepairDatabase, Cast) {
    let db = test_db().await;
    let cast = seed_cast(&db).await;
    (UserService::new(db.clone()), db, cast)
}

fn new_user(login: &str, role: Option<&str>) -> CreateUserRequest {
    CreateUserRequest {
        full_name: Some(" Ivanov Ivan ".into()),
        phone: Some("89001234567".into()),
        login: Some(login.into()),
        password: Some("pass".into()),
        role: role.map(Into::into),
    }
}

fn fields(err: ApiError) -> Vec<String> {
    match err {
        ApiError::Validation(v) => v.fields,
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn manager_creates_trimmed_user_defaulting_to_client() {
    let (svc, _db, cast) = setup().await;

    let user = svc.create_user(&cast.manager, new_user("ivan", None)).await.unwrap();
    assert_eq!(user.full_name, "Ivanov Ivan");
    assert_eq!(user.role, Role::Client);

    let tech = svc
        .create_user(&cast.manager, new_user("tech", Some("Master")))
        .await
        .unwrap();
    assert_eq!(tech.role, Role::Master);
}

#[tokio::test]
async fn only_manager_manages_users() {
    let (svc, _db, cast) = setup().await;
    for who in [&cast.operator, &cast.master, &cast.client] {
        assert!(matches!(
            svc.create_user(who, new_user("ivan", None)).await.unwrap_err(),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(svc.list_users(who).await.unwrap_err(), ApiError::Forbidden(_)));
    }
    assert_eq!(svc.list_users(&cast.manager).await.unwrap().len(), 5);
}

#[tokio::test]
async fn duplicate_login_fails_without_mutation() {
    let (svc, db, cast) = setup().await;
    let before = db.count_users().await.unwrap();

    let err = svc
        .create_user(&cast.manager, new_user("kasoo", None))
        .await
        .unwrap_err();
    assert_eq!(fields(err), ["login"]);
    assert_eq!(db.count_users().await.unwrap(), before);
}

#[tokio::test]
async fn field_rules() {
    let (svc, _db, cast) = setup().await;

    let err = svc.create_user(&cast.manager, new_user("ab", None)).await.unwrap_err();
    assert_eq!(fields(err), ["login"]);

    let mut short_pw = new_user("ivan", None);
    short_pw.password = Some(" pw ".into());
    assert_eq!(fields(svc.create_user(&cast.manager, short_pw).await.unwrap_err()), ["password"]);

    let mut blank = new_user("ivan", None);
    blank.phone = Some("  ".into());
    blank.full_name = None;
    assert_eq!(
        fields(svc.create_user(&cast.manager, blank).await.unwrap_err()),
        ["full_name", "phone"]
    );

    let err = svc
        .create_user(&cast.manager, new_user("ivan", Some("Admin")))
        .await
        .unwrap_err();
    assert_eq!(fields(err), ["role"]);
}

#[tokio::test]
async fn masters_visible_to_everyone() {
    let (svc, _db, cast) = setup().await;
    let masters = svc.list_masters(&cast.client).await.unwrap();
    assert_eq!(masters.len(), 1);
    assert_eq!(masters[0].user_id, cast.master.user_id);
}

#[tokio::test]
async fn deleting_users() {
    let (svc, db, cast) = setup().await;
    let req = seed_request(&db, cast.client.user_id, Some(cast.master.user_id)).await;

    assert!(matches!(
        svc.delete_user(&cast.manager, cast.manager.user_id).await.unwrap_err(),
        ApiError::Validation(_)
    ));
    assert!(matches!(
        svc.delete_user(&cast.operator, cast.master.user_id).await.unwrap_err(),
        ApiError::Forbidden(_)
    ));

    svc.delete_user(&cast.manager, cast.master.user_id).await.unwrap();
    assert!(matches!(
        svc.delete_user(&cast.manager, cast.master.user_id).await.unwrap_err(),
        ApiError::NotFound(_)
    ));

    let kept = db.get_request(req.request_id).await.unwrap();
    assert_eq!(kept.master_id, Some(cast.master.user_id));
}

#[tokio::test]
async fn bootstrap_manager_is_created_once() {
    let db = test_db().await;
    let svc = UserService::new(db.clone());
    let bootstrap = BootstrapConfig {
        login: "kasoo".into(),
        password: "root".into(),
        full_name: "Administrator".into(),
        phone: String::new(),
    };

    assert!(svc.ensure_bootstrap_manager(&bootstrap).await.unwrap());
    assert!(!svc.ensure_bootstrap_manager(&bootstrap).await.unwrap());

    let user = db.find_user_by_login("kasoo").await.unwrap().unwrap();
    assert_eq!(user.role, Role::Manager);
    assert_eq!(db.count_users().await.unwrap(), 1);
}
