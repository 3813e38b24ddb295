#![cfg(feature = "postgres-tests")]

use axum::http::StatusCode;
use locker_server::config::ServerConfig;
use serde_json::json;

mod support;

use support::{parse_id, TestApp};

async fn app_with_admin() -> TestApp {
    let mut config = ServerConfig::default();
    config.sharing.group_admins = vec!["admin@example.com".to_string()];
    TestApp::with_config(config).await
}

#[tokio::test]
async fn only_group_admins_manage_groups() {
    let app = app_with_admin().await;
    let (_admin, admin_token) = app.user("admin@example.com").await;
    let (bob, bob_token) = app.user("bob@example.com").await;

    let (status, _) = app
        .post("/v1/groups", &bob_token, json!({ "name": "Ops" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, group) = app
        .post("/v1/groups", &admin_token, json!({ "name": "Ops" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let group_id = parse_id(&group["id"]);

    let members_path = format!("/v1/groups/{group_id}/members");
    let (status, _) = app
        .post(&members_path, &bob_token, json!({ "user_id": bob.id }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, change) = app
        .post(&members_path, &admin_token, json!({ "user_id": bob.id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(change["changed"], true);

    let (status, change) = app
        .post(&members_path, &admin_token, json!({ "user_id": bob.id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(change["changed"], false);

    let (status, groups) = app.get("/v1/groups", &bob_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(groups["groups"][0]["member_ids"], json!([bob.id]));
}

#[tokio::test]
async fn adding_unknown_user_to_group_is_rejected() {
    let app = app_with_admin().await;
    let (_admin, admin_token) = app.user("admin@example.com").await;
    let (_, group) = app
        .post("/v1/groups", &admin_token, json!({ "name": "Ops" }))
        .await;
    let group_id = parse_id(&group["id"]);

    let (status, body) = app
        .post(
            &format!("/v1/groups/{group_id}/members"),
            &admin_token,
            json!({ "user_id": uuid::Uuid::now_v7() }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "user_not_found");
}

#[tokio::test]
async fn group_share_follows_group_membership() {
    let app = app_with_admin().await;
    let (_admin, admin_token) = app.user("admin@example.com").await;
    let (alice, alice_token) = app.user("alice@example.com").await;
    let (bob, bob_token) = app.user("bob@example.com").await;
    let (carol, carol_token) = app.user("carol@example.com").await;

    let (_, group) = app
        .post("/v1/groups", &admin_token, json!({ "name": "Ops" }))
        .await;
    let group_id = parse_id(&group["id"]);
    for user_id in [alice.id, bob.id] {
        app.post(
            &format!("/v1/groups/{group_id}/members"),
            &admin_token,
            json!({ "user_id": user_id }),
        )
        .await;
    }

    let cipher_id = app.create_cipher(&alice_token, "personal-blob").await;
    let (status, share) = app
        .post(
            "/v1/sharing/ciphers",
            &alice_token,
            json!({
                "cipher_id": cipher_id,
                "data": "team-blob",
                "team_key": "key",
                "groups": [{ "group_id": group_id, "role": "member" }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "share: {share}");
    let team_id = parse_id(&share["team_id"]);

    let (_, invitations) = app.get("/v1/sharing/invitations", &bob_token).await;
    assert_eq!(invitations["invitations"][0]["team_id"], team_id.to_string());

    // Joining the group later brings the share along.
    let (_, change) = app
        .post(
            &format!("/v1/groups/{group_id}/members"),
            &admin_token,
            json!({ "user_id": carol.id }),
        )
        .await;
    assert_eq!(change["team_ids"], json!([team_id]));
    let (_, invitations) = app.get("/v1/sharing/invitations", &carol_token).await;
    assert_eq!(invitations["invitations"][0]["team_id"], team_id.to_string());

    let (status, change) = app
        .delete(
            &format!("/v1/groups/{group_id}/members/{}", carol.id),
            &admin_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(change["changed"], true);
    let (_, invitations) = app.get("/v1/sharing/invitations", &carol_token).await;
    assert_eq!(invitations["invitations"], json!([]));
}

#[tokio::test]
async fn sharing_with_a_group_requires_membership_or_admin() {
    let app = app_with_admin().await;
    let (_admin, admin_token) = app.user("admin@example.com").await;
    let (_mallory, mallory_token) = app.user("mallory@example.com").await;
    let (bob, bob_token) = app.user("bob@example.com").await;

    let (_, group) = app
        .post("/v1/groups", &admin_token, json!({ "name": "Finance" }))
        .await;
    let group_id = parse_id(&group["id"]);
    app.post(
        &format!("/v1/groups/{group_id}/members"),
        &admin_token,
        json!({ "user_id": bob.id }),
    )
    .await;
    let share_body = |cipher_id: uuid::Uuid| {
        json!({
            "cipher_id": cipher_id,
            "data": "team-blob",
            "team_key": "key",
            "groups": [{ "group_id": group_id, "role": "member" }],
        })
    };

    let foreign = app.create_cipher(&mallory_token, "phishing").await;
    let (status, _) = app
        .post("/v1/sharing/ciphers", &mallory_token, share_body(foreign))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, invitations) = app.get("/v1/sharing/invitations", &bob_token).await;
    assert_eq!(invitations["invitations"], json!([]));
    let (_, sync) = app.get("/v1/sync", &mallory_token).await;
    let kept = sync["ciphers"][0].clone();
    assert_eq!(kept["id"], foreign.to_string());
    assert!(kept["team_id"].is_null());

    let own = app.create_cipher(&admin_token, "admin-blob").await;
    let (status, share) = app
        .post("/v1/sharing/ciphers", &admin_token, share_body(own))
        .await;
    assert_eq!(status, StatusCode::CREATED, "share: {share}");
    let (_, invitations) = app.get("/v1/sharing/invitations", &bob_token).await;
    assert_eq!(invitations["invitations"][0]["team_id"], share["team_id"]);
}

#[tokio::test]
async fn devices_register_list_and_delete() {
    let app = TestApp::new().await;
    let (_alice, alice_token) = app.user("alice@example.com").await;
    let (_bob, bob_token) = app.user("bob@example.com").await;

    let (status, device) = app
        .post(
            "/v1/devices",
            &alice_token,
            json!({ "name": "Pixel", "fcm_id": "fcm-registration" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(device["push_enabled"], true);
    let device_id = parse_id(&device["id"]);

    let (_, devices) = app.get("/v1/devices", &bob_token).await;
    assert_eq!(devices["devices"], json!([]));

    let path = format!("/v1/devices/{device_id}");
    let (status, _) = app.delete(&path, &bob_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.delete(&path, &alice_token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, devices) = app.get("/v1/devices", &alice_token).await;
    assert_eq!(devices["devices"], json!([]));
}

#[tokio::test]
async fn public_key_update_rejects_blank() {
    let app = TestApp::new().await;
    let (_alice, alice_token) = app.user("alice@example.com").await;

    let (status, body) = app
        .put(
            "/v1/users/me/public-key",
            &alice_token,
            json!({ "public_key": "  " }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_public_key");

    let (status, _) = app
        .put(
            "/v1/users/me/public-key",
            &alice_token,
            json!({ "public_key": "new-key" }),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, sync) = app.get("/v1/sync", &alice_token).await;
    assert_eq!(sync["profile"]["public_key"], "new-key");
}
