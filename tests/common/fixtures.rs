use axum::http::{Method, StatusCode};
use axum::Router;
use serde_json::{json, Value};

use super::http::call;

/// Two groups; items 1-3 in group 1, items 3-5 in group 2.
pub fn study_definition(settings: Value) -> Value {
    json!({
        "settings": settings,
        "groups": [
            { "id": 1, "name": "fruit", "displayName": "Fruit" },
            { "id": 2, "name": "veg", "displayName": "Vegetables" }
        ],
        "items": [
            { "id": 1, "name": "apple", "displayName": "Apple", "groupIds": [1] },
            { "id": 2, "name": "pear", "displayName": "Pear", "groupIds": [1] },
            { "id": 3, "name": "tomato", "displayName": "Tomato", "groupIds": [1, 2] },
            { "id": 4, "name": "leek", "displayName": "Leek", "groupIds": [2] },
            { "id": 5, "name": "kale", "displayName": "Kale", "groupIds": [2] }
        ]
    })
}

pub fn plain_settings() -> Value {
    json!({
        "cycleLength": 3,
        "maxCycles": 2,
        "allowSkip": true,
        "allowBack": true,
        "allowTies": true,
        "renderItemPreferencePage": false
    })
}

pub async fn setup_study(app: &Router, settings: Value) {
    let (status, body) = call(
        app,
        Method::PUT,
        "/api/admin/study",
        Some(study_definition(settings)),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK, "study setup failed: {body}");
}

pub fn registration(group_ids: &[u64]) -> Value {
    json!({
        "name": "Ada",
        "email": "ada@example.com",
        "age": 36,
        "country": "UK",
        "answers": { "handedness": "left" },
        "acceptedEthicsAgreement": true,
        "groupIds": group_ids
    })
}

/// Registers a participant and returns `(participant_id, token)`.
pub async fn register(app: &Router, group_ids: &[u64]) -> (u64, String) {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/participants",
        Some(registration(group_ids)),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {body}");
    let participant_id = body["data"]["participantId"].as_u64().expect("participant id");
    let token = body["data"]["token"].as_str().expect("token").to_string();
    (participant_id, token)
}
