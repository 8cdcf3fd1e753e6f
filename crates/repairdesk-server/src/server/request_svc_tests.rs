//! Tests for `RequestService`.

use repairdesk_core::config::PaginationConfig;

use super::request_svc::{ListParams, RequestService};
use super::test_helpers::{Cast, fridge_for, seed_cast, seed_request, test_db};
use crate::error::ApiError;
use crate::lifecycle::{RequestPatch, RequestStatus, today};
use crate::storage::RepairDatabase;

async fn setup() -> (RequestService, RepairDatabase, Cast) {
    let db = test_db().await;
    let cast = seed_cast(&db).await;
    let svc = RequestService::new(db.clone(), PaginationConfig::default());
    (svc, db, cast)
}

fn patch(json: &str) -> RequestPatch {
    serde_json::from_str(json).unwrap()
}

#[tokio::test]
async fn manager_creates_new_request() {
    let (svc, _db, cast) = setup().await;

    let created = svc.create(&cast.manager, fridge_for(7)).await.unwrap();
    assert_eq!(created.request_status, RequestStatus::New);
    assert_eq!(created.completion_date, None);
    assert_eq!(created.start_date, today());
    assert_eq!(created.client_id, 7);
}

#[tokio::test]
async fn client_may_open_request_on_behalf_of_another_client() {
    let (svc, _db, cast) = setup().await;

    assert!(svc.create(&cast.client, fridge_for(cast.client.user_id)).await.is_ok());
    let created = svc
        .create(&cast.client, fridge_for(cast.other_client.user_id))
        .await
        .unwrap();
    assert_eq!(created.client_id, cast.other_client.user_id);
    assert_eq!(created.request_status, RequestStatus::New);
}

#[tokio::test]
async fn create_requires_fields() {
    let (svc, _db, cast) = setup().await;
    let mut input = fridge_for(7);
    input.tech_model = None;
    input.client_id = None;

    match svc.create(&cast.operator, input).await.unwrap_err() {
        ApiError::Validation(v) => assert_eq!(v.fields, ["tech_model", "client_id"]),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_request_is_not_found_for_every_role() {
    let (svc, _db, cast) = setup().await;
    for who in [&cast.manager, &cast.operator, &cast.master, &cast.client] {
        assert!(matches!(
            svc.get(who, 99_999).await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }
}

#[tokio::test]
async fn client_cannot_read_foreign_request() {
    let (svc, db, cast) = setup().await;
    let foreign = seed_request(&db, cast.other_client.user_id, None).await;
    let own = seed_request(&db, cast.client.user_id, None).await;

    assert!(matches!(
        svc.get(&cast.client, foreign.request_id).await.unwrap_err(),
        ApiError::Forbidden(_)
    ));
    let view = svc.get(&cast.client, own.request_id).await.unwrap();
    assert_eq!(view.client_name.as_deref(), Some("Alice"));
    assert!(svc.get(&cast.master, foreign.request_id).await.is_ok());
}

#[tokio::test]
async fn client_list_is_own_rows_only() {
    let (svc, db, cast) = setup().await;
    let foreign = seed_request(&db, cast.other_client.user_id, None).await;
    seed_request(&db, cast.client.user_id, None).await;

    let page = svc
        .list(
            &cast.client,
            ListParams {
                search: Some(foreign.request_id.to_string()),
                ..ListParams::default()
            },
        )
        .await
        .unwrap();
    assert!(page.data.is_empty());

    let page = svc.list(&cast.client, ListParams::default()).await.unwrap();
    assert_eq!(page.pagination.total, 1);
    assert!(page.data.iter().all(|r| r.request.client_id == cast.client.user_id));
}

#[tokio::test]
async fn client_without_requests_gets_empty_page() {
    let (svc, db, cast) = setup().await;
    seed_request(&db, cast.other_client.user_id, None).await;

    let page = svc.list(&cast.client, ListParams::default()).await.unwrap();
    assert!(page.data.is_empty());
    assert_eq!(page.pagination.total, 0);
    assert_eq!(page.pagination.pages, 0);
    assert_eq!(page.pagination.page, 1);
    assert_eq!(page.pagination.limit, 50);
}

#[tokio::test]
async fn master_list_is_assigned_rows_only() {
    let (svc, db, cast) = setup().await;
    seed_request(&db, cast.client.user_id, Some(cast.master.user_id)).await;
    seed_request(&db, cast.client.user_id, None).await;

    let page = svc.list(&cast.master, ListParams::default()).await.unwrap();
    assert_eq!(page.pagination.total, 1);
    assert_eq!(page.data[0].master_name.as_deref(), Some("Murashov"));

    let all = svc.list(&cast.operator, ListParams::default()).await.unwrap();
    assert_eq!(all.pagination.total, 2);
}

#[tokio::test]
async fn list_limit_is_capped() {
    let (svc, db, cast) = setup().await;
    seed_request(&db, cast.client.user_id, None).await;

    let page = svc
        .list(
            &cast.manager,
            ListParams {
                page: Some(0),
                limit: Some(10_000),
                ..ListParams::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.pagination.page, 1);
    assert_eq!(page.pagination.limit, 100);
}

#[tokio::test]
async fn list_rejects_unknown_status_filter() {
    let (svc, _db, cast) = setup().await;
    let params = ListParams {
        status: Some("Lost".into()),
        ..ListParams::default()
    };
    assert!(matches!(
        svc.list(&cast.manager, params).await.unwrap_err(),
        ApiError::Validation(_)
    ));
}

#[tokio::test]
async fn completing_twice_keeps_first_date() {
    let (svc, db, cast) = setup().await;
    let req = seed_request(&db, 7, None).await;

    let first = svc
        .update(&cast.manager, req.request_id, patch(r#"{"request_status":"Completed"}"#))
        .await
        .unwrap();
    assert_eq!(first.request.completion_date, Some(today()));

    svc.update(&cast.master, req.request_id, patch(r#"{"completion_date":"2020-01-02"}"#))
        .await
        .unwrap();
    let second = svc
        .update(&cast.manager, req.request_id, patch(r#"{"request_status":"Completed"}"#))
        .await
        .unwrap();
    assert_eq!(
        second.request.completion_date.map(|d| d.to_string()).as_deref(),
        Some("2020-01-02")
    );
}

#[tokio::test]
async fn client_cannot_update() {
    let (svc, db, cast) = setup().await;
    let req = seed_request(&db, cast.client.user_id, None).await;

    let err = svc
        .update(&cast.client, req.request_id, patch(r#"{"repair_parts":"belt"}"#))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));
}

#[tokio::test]
async fn update_role_check_precedes_lookup() {
    let (svc, _db, cast) = setup().await;
    let err = svc
        .update(&cast.client, 99_999, patch("{}"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    let err = svc
        .update(&cast.operator, 99_999, patch("{}"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn invalid_update_leaves_row_untouched() {
    let (svc, db, cast) = setup().await;
    let req = seed_request(&db, 7, None).await;

    let err = svc
        .update(
            &cast.operator,
            req.request_id,
            patch(r#"{"master_id": 3, "request_status": "Teleported"}"#),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(db.get_request(req.request_id).await.unwrap(), req);
}

#[tokio::test]
async fn only_manager_deletes() {
    let (svc, db, cast) = setup().await;
    let req = seed_request(&db, cast.client.user_id, None).await;

    for who in [&cast.operator, &cast.master, &cast.client] {
        assert!(matches!(
            svc.delete(who, req.request_id).await.unwrap_err(),
            ApiError::Forbidden(_)
        ));
    }
    svc.delete(&cast.manager, req.request_id).await.unwrap();
    assert!(matches!(
        svc.delete(&cast.manager, req.request_id).await.unwrap_err(),
        ApiError::NotFound(_)
    ));
}
