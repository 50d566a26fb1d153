//! Shift Assignment Tests
//!
//! Covers assignment, single-shot decline and the notifications both emit.

mod common;

use axum::http::StatusCode;
use common::{app, TestUser};
use serde_json::{json, Value};
use uuid::Uuid;

async fn assign(admin: &TestUser, assignee: Uuid, ward: &str) -> Value {
    let resp = app()
        .await
        .post_json(
            "/v1/shifts",
            json!({
                "user_id": assignee,
                "ward": ward,
                "starts_at": "2030-03-01T07:00:00Z",
                "ends_at": "2030-03-01T19:00:00Z"
            }),
            Some(&admin.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text());
    resp.json()
}

// ===========================================================================
// Assignment
// ===========================================================================

#[tokio::test]
async fn assigning_a_shift_notifies_assignee_with_high_priority() {
    let app = app().await;
    let admin = app.create_admin("shift_assigner").await;
    let nurse = app.create_user("shift_assignee").await;

    let shift = assign(&admin, nurse.id, "Ward 4B").await;
    assert_eq!(shift["status"], "assigned");
    assert_eq!(shift["assigned_by"].as_str().unwrap(), admin.id.to_string());

    let resp = app.get("/v1/notifications", Some(&nurse.access_token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    let item = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["payload"]["shift_id"] == shift["id"])
        .cloned()
        .expect("shift notification missing");

    assert_eq!(item["notification_type"], "shift_assigned");
    assert_eq!(item["priority"], "high");
    assert_eq!(item["presentation"]["requires_interaction"], true);
    assert_eq!(
        item["presentation"]["destination"],
        "/staff-dashboard?tab=schedule"
    );
    let actions: Vec<&str> = item["presentation"]["actions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["view", "decline"]);
}

#[tokio::test]
async fn shift_window_is_validated() {
    let app = app().await;
    let admin = app.create_admin("shift_window_admin").await;
    let nurse = app.create_user("shift_window_nurse").await;

    let resp = app
        .post_json(
            "/v1/shifts",
            json!({
                "user_id": nurse.id,
                "ward": "ICU",
                "starts_at": "2030-03-01T19:00:00Z",
                "ends_at": "2030-03-01T07:00:00Z"
            }),
            Some(&admin.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "shift must end after it starts");

    let resp = app
        .post_json(
            "/v1/shifts",
            json!({
                "user_id": nurse.id,
                "ward": "   ",
                "starts_at": "2030-03-01T07:00:00Z",
                "ends_at": "2030-03-01T19:00:00Z"
            }),
            Some(&admin.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "ward is required");
}

#[tokio::test]
async fn staff_cannot_assign_shifts() {
    let app = app().await;
    let staff = app.create_user("shift_staff_assigner").await;
    let nurse = app.create_user("shift_staff_target").await;

    let resp = app
        .post_json(
            "/v1/shifts",
            json!({
                "user_id": nurse.id,
                "ward": "ER",
                "starts_at": "2030-03-01T07:00:00Z",
                "ends_at": "2030-03-01T19:00:00Z"
            }),
            Some(&staff.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn assigning_to_unknown_user_is_not_found() {
    let app = app().await;
    let admin = app.create_admin("shift_unknown_admin").await;

    let resp = app
        .post_json(
            "/v1/shifts",
            json!({
                "user_id": Uuid::new_v4(),
                "ward": "ER",
                "starts_at": "2030-03-01T07:00:00Z",
                "ends_at": "2030-03-01T19:00:00Z"
            }),
            Some(&admin.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ===========================================================================
// Decline
// ===========================================================================

#[tokio::test]
async fn assignee_declines_once() {
    let app = app().await;
    let admin = app.create_admin("decline_admin").await;
    let nurse = app.create_user("decline_nurse").await;
    let shift = assign(&admin, nurse.id, "Ward 2").await;
    let shift_id = shift["id"].as_str().unwrap();

    let resp = app
        .post_json(
            &format!("/v1/shifts/{}/decline", shift_id),
            json!({}),
            Some(&nurse.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["status"], "declined");

    let resp = app
        .post_json(
            &format!("/v1/shifts/{}/decline", shift_id),
            json!({}),
            Some(&nurse.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);

    let changes = app.notifications_of_type(admin.id, "schedule_change").await;
    assert_eq!(
        changes
            .iter()
            .filter(|n| n["payload"]["shift_id"] == shift_id)
            .count(),
        1
    );
}

#[tokio::test]
async fn only_assignee_may_decline() {
    let app = app().await;
    let admin = app.create_admin("decline_owner_admin").await;
    let nurse = app.create_user("decline_owner_nurse").await;
    let colleague = app.create_user("decline_owner_colleague").await;
    let shift = assign(&admin, nurse.id, "Ward 7").await;

    let resp = app
        .post_json(
            &format!("/v1/shifts/{}/decline", shift["id"].as_str().unwrap()),
            json!({}),
            Some(&colleague.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app.get("/v1/shifts", Some(&nurse.access_token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    let shifts = resp.json();
    assert_eq!(shifts.as_array().unwrap().len(), 1);
    assert_eq!(shifts[0]["status"], "assigned");
}

#[tokio::test]
async fn declining_unknown_shift_is_not_found() {
    let app = app().await;
    let nurse = app.create_user("decline_unknown").await;

    let resp = app
        .post_json(
            &format!("/v1/shifts/{}/decline", Uuid::new_v4()),
            json!({}),
            Some(&nurse.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}
