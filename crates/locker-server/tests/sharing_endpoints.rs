#![cfg(feature = "postgres-tests")]

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

mod support;

use support::{parse_id, TestApp};

fn synced_cipher<'a>(sync: &'a Value, cipher_id: Uuid) -> Option<&'a Value> {
    sync["ciphers"]
        .as_array()
        .expect("ciphers array")
        .iter()
        .find(|cipher| cipher["id"] == cipher_id.to_string())
}

#[tokio::test]
async fn protected_routes_require_session_token() {
    let app = TestApp::new().await;

    let (status, _) = app.send(Method::GET, "/v1/sync", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(Method::GET, "/v1/sharing", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.send(Method::GET, "/v1/system/info", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn cipher_share_lifecycle() {
    let app = TestApp::new().await;
    let (_alice, alice_token) = app.user("alice@example.com").await;
    let (bob, bob_token) = app.user("bob@example.com").await;
    let cipher_id = app.create_cipher(&alice_token, "personal-blob").await;

    let (status, share) = app
        .post(
            "/v1/sharing/ciphers",
            &alice_token,
            json!({
                "cipher_id": cipher_id,
                "data": "team-blob",
                "team_key": "team-key-for-alice",
                "members": [{ "email": "Bob@Example.com" }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "share: {share}");
    assert_eq!(share["created"], true);
    let team_id = parse_id(&share["team_id"]);
    let invited = share["invited"].as_array().expect("invited");
    assert_eq!(invited.len(), 1);
    assert_eq!(invited[0]["user_id"], bob.id.to_string());
    assert_eq!(invited[0]["status"], "invited");
    let member_id = parse_id(&invited[0]["member_id"]);

    // Invited members do not see the item yet.
    let (_, sync) = app.get("/v1/sync", &bob_token).await;
    assert!(synced_cipher(&sync, cipher_id).is_none());

    let (status, invitations) = app.get("/v1/sharing/invitations", &bob_token).await;
    assert_eq!(status, StatusCode::OK);
    let invitations = invitations["invitations"].as_array().expect("invitations");
    assert_eq!(invitations.len(), 1);
    assert_eq!(invitations[0]["kind"], "cipher");
    assert_eq!(invitations[0]["owner_email"], "alice@example.com");
    assert_eq!(invitations[0]["cipher_id"], cipher_id.to_string());

    let (status, accepted) = app
        .post(
            &format!("/v1/sharing/invitations/{member_id}"),
            &bob_token,
            json!({ "accept": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["accepted"], true);

    let (status, key) = app
        .get(
            &format!("/v1/sharing/{team_id}/members/{member_id}/public-key"),
            &alice_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(key["public_key"], "pk-bob@example.com");

    let confirm_path = format!("/v1/sharing/{team_id}/members/{member_id}/confirm");
    let (status, confirmed) = app
        .post(&confirm_path, &alice_token, json!({ "key": "team-key-for-bob" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "confirmed");

    let (status, _) = app
        .post(&confirm_path, &alice_token, json!({ "key": "again" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, sync) = app.get("/v1/sync", &bob_token).await;
    let shared = synced_cipher(&sync, cipher_id).expect("shared cipher visible");
    assert_eq!(shared["data"], "team-blob");
    assert_eq!(shared["team_id"], team_id.to_string());
    assert_eq!(shared["view_password"], true);
    assert_eq!(shared["edit"], false);
    let membership = sync["memberships"]
        .as_array()
        .expect("memberships")
        .iter()
        .find(|membership| membership["team_id"] == team_id.to_string())
        .expect("membership");
    assert_eq!(membership["key"], "team-key-for-bob");

    let (status, shares) = app.get("/v1/sharing", &alice_token).await;
    assert_eq!(status, StatusCode::OK);
    let owned = shares["owned"].as_array().expect("owned");
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0]["cipher_ids"], json!([cipher_id]));
    let (_, bob_shares) = app.get("/v1/sharing", &bob_token).await;
    assert_eq!(
        bob_shares["shared_with_me"][0]["team_id"],
        team_id.to_string()
    );

    let stop_body = json!({ "ciphers": [{ "id": cipher_id, "data": "personal-again" }] });
    let (status, _) = app
        .post(&format!("/v1/sharing/{team_id}/stop"), &bob_token, stop_body.clone())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, stopped) = app
        .post(&format!("/v1/sharing/{team_id}/stop"), &alice_token, stop_body)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stopped["cipher_ids"], json!([cipher_id]));
    assert!(stopped["folder_id"].is_null());

    let (_, sync) = app.get("/v1/sync", &bob_token).await;
    assert!(synced_cipher(&sync, cipher_id).is_none());
    let (_, sync) = app.get("/v1/sync", &alice_token).await;
    let restored = synced_cipher(&sync, cipher_id).expect("owner keeps cipher");
    assert_eq!(restored["data"], "personal-again");
    assert!(restored["team_id"].is_null());
}

#[tokio::test]
async fn sharing_someone_elses_cipher_is_not_found() {
    let app = TestApp::new().await;
    let (_alice, alice_token) = app.user("alice@example.com").await;
    let (_mallory, mallory_token) = app.user("mallory@example.com").await;
    let cipher_id = app.create_cipher(&alice_token, "personal-blob").await;

    let (status, _) = app
        .post(
            "/v1/sharing/ciphers",
            &mallory_token,
            json!({
                "cipher_id": cipher_id,
                "data": "stolen",
                "team_key": "key",
                "members": [{ "email": "alice@example.com" }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn share_requires_invitations() {
    let app = TestApp::new().await;
    let (_alice, alice_token) = app.user("alice@example.com").await;
    let cipher_id = app.create_cipher(&alice_token, "personal-blob").await;

    let (status, body) = app
        .post(
            "/v1/sharing/ciphers",
            &alice_token,
            json!({ "cipher_id": cipher_id, "data": "team-blob", "team_key": "key" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn rejected_invitation_removes_membership() {
    let app = TestApp::new().await;
    let (_alice, alice_token) = app.user("alice@example.com").await;
    let (_bob, bob_token) = app.user("bob@example.com").await;
    let cipher_id = app.create_cipher(&alice_token, "personal-blob").await;

    let (_, share) = app
        .post(
            "/v1/sharing/ciphers",
            &alice_token,
            json!({
                "cipher_id": cipher_id,
                "data": "team-blob",
                "team_key": "key",
                "members": [{ "email": "bob@example.com" }],
            }),
        )
        .await;
    let member_id = parse_id(&share["invited"][0]["member_id"]);

    let (status, body) = app
        .post(
            &format!("/v1/sharing/invitations/{member_id}"),
            &bob_token,
            json!({ "accept": false }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], false);

    let (_, invitations) = app.get("/v1/sharing/invitations", &bob_token).await;
    assert_eq!(invitations["invitations"], json!([]));
}

#[tokio::test]
async fn member_can_leave_and_owner_cannot() {
    let app = TestApp::new().await;
    let (alice, alice_token) = app.user("alice@example.com").await;
    let (_bob, bob_token) = app.user("bob@example.com").await;
    let cipher_id = app.create_cipher(&alice_token, "personal-blob").await;

    let (_, share) = app
        .post(
            "/v1/sharing/ciphers",
            &alice_token,
            json!({
                "cipher_id": cipher_id,
                "data": "team-blob",
                "team_key": "key",
                "members": [{ "email": "bob@example.com" }],
            }),
        )
        .await;
    let team_id = parse_id(&share["team_id"]);
    let member_id = parse_id(&share["invited"][0]["member_id"]);
    app.post(
        &format!("/v1/sharing/invitations/{member_id}"),
        &bob_token,
        json!({ "accept": true }),
    )
    .await;

    let (status, _) = app
        .post(&format!("/v1/sharing/{team_id}/leave"), &alice_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(&format!("/v1/sharing/{team_id}/leave"), &bob_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, shares) = app.get("/v1/sharing", &alice_token).await;
    let members = shares["owned"][0]["members"].as_array().expect("members");
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["user_id"], alice.id.to_string());
}

#[tokio::test]
async fn folder_share_and_stop_restores_folder() {
    let app = TestApp::new().await;
    let (_alice, alice_token) = app.user("alice@example.com").await;
    let (_bob, _bob_token) = app.user("bob@example.com").await;

    let (status, folder) = app
        .post("/v1/folders", &alice_token, json!({ "name": "Infra" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let folder_id = parse_id(&folder["id"]);
    let (status, cipher) = app
        .post(
            "/v1/ciphers",
            &alice_token,
            json!({ "cipher_type": "login", "data": "db-password", "folder_id": folder_id }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let cipher_id = parse_id(&cipher["id"]);

    let (status, share) = app
        .post(
            "/v1/sharing/folders",
            &alice_token,
            json!({
                "folder_id": folder_id,
                "folder_name": "Infra",
                "ciphers": [{ "id": cipher_id, "data": "team-db-password" }],
                "team_key": "key",
                "members": [{ "email": "bob@example.com", "role": "manager" }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "share folder: {share}");
    let team_id = parse_id(&share["team_id"]);

    let (_, sync) = app.get("/v1/sync", &alice_token).await;
    assert!(sync["folders"]
        .as_array()
        .expect("folders")
        .iter()
        .all(|folder| folder["id"] != folder_id.to_string()));
    let collections = sync["collections"].as_array().expect("collections");
    assert_eq!(collections.len(), 1);
    assert_eq!(collections[0]["name"], "Infra");
    let shared = synced_cipher(&sync, cipher_id).expect("owner sees shared cipher");
    assert_eq!(shared["collection_ids"], json!([collections[0]["id"]]));

    let (status, stopped) = app
        .post(
            &format!("/v1/sharing/{team_id}/stop"),
            &alice_token,
            json!({
                "ciphers": [{ "id": cipher_id, "data": "db-password" }],
                "folder_name": "Infra",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let restored_folder = parse_id(&stopped["folder_id"]);

    let (_, sync) = app.get("/v1/sync", &alice_token).await;
    let restored = synced_cipher(&sync, cipher_id).expect("cipher restored");
    assert_eq!(restored["folder_id"], restored_folder.to_string());
    assert_eq!(sync["collections"], json!([]));
}

#[tokio::test]
async fn stop_sharing_requires_every_cipher() {
    let app = TestApp::new().await;
    let (_alice, alice_token) = app.user("alice@example.com").await;
    let (_bob, _bob_token) = app.user("bob@example.com").await;
    let cipher_id = app.create_cipher(&alice_token, "personal-blob").await;

    let (_, share) = app
        .post(
            "/v1/sharing/ciphers",
            &alice_token,
            json!({
                "cipher_id": cipher_id,
                "data": "team-blob",
                "team_key": "key",
                "members": [{ "email": "bob@example.com" }],
            }),
        )
        .await;
    let team_id = parse_id(&share["team_id"]);

    let (status, body) = app
        .post(
            &format!("/v1/sharing/{team_id}/stop"),
            &alice_token,
            json!({ "ciphers": [] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "stop_share_ciphers_mismatch");
}

/// Shares a fresh cipher of the owner with the given invitees and returns
/// the team id with each invitee's member id, in request order.
async fn share_new_cipher(app: &TestApp, owner_token: &str, members: Value) -> (Uuid, Vec<Uuid>) {
    let cipher_id = app.create_cipher(owner_token, "personal-blob").await;
    let (status, share) = app
        .post(
            "/v1/sharing/ciphers",
            owner_token,
            json!({
                "cipher_id": cipher_id,
                "data": "team-blob",
                "team_key": "key",
                "members": members,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "share: {share}");
    let member_ids = share["invited"]
        .as_array()
        .expect("invited")
        .iter()
        .map(|invited| parse_id(&invited["member_id"]))
        .collect();
    (parse_id(&share["team_id"]), member_ids)
}

async fn join(app: &TestApp, team_id: Uuid, member_id: Uuid, token: &str, owner_token: &str) {
    let (status, _) = app
        .post(
            &format!("/v1/sharing/invitations/{member_id}"),
            token,
            json!({ "accept": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .post(
            &format!("/v1/sharing/{team_id}/members/{member_id}/confirm"),
            owner_token,
            json!({ "key": "wrapped" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

async fn share_folder_with_bob(app: &TestApp, owner_token: &str) -> (Uuid, Uuid, Uuid) {
    let (_, folder) = app
        .post("/v1/folders", owner_token, json!({ "name": "Infra" }))
        .await;
    let folder_id = parse_id(&folder["id"]);
    let (_, cipher) = app
        .post(
            "/v1/ciphers",
            owner_token,
            json!({ "cipher_type": "login", "data": "db-password", "folder_id": folder_id }),
        )
        .await;
    let cipher_id = parse_id(&cipher["id"]);
    let (status, share) = app
        .post(
            "/v1/sharing/folders",
            owner_token,
            json!({
                "folder_id": folder_id,
                "folder_name": "Infra",
                "ciphers": [{ "id": cipher_id, "data": "team-db-password" }],
                "team_key": "key",
                "members": [{ "email": "bob@example.com" }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "share folder: {share}");
    let team_id = parse_id(&share["team_id"]);
    let (_, shares) = app.get("/v1/sharing", owner_token).await;
    let collection_id = parse_id(&shares["owned"][0]["collection_id"]);
    (team_id, collection_id, cipher_id)
}

#[tokio::test]
async fn member_updates_follow_role_rules() {
    let app = TestApp::new().await;
    let (alice, alice_token) = app.user("alice@example.com").await;
    let (_bob, bob_token) = app.user("bob@example.com").await;
    let (_carol, carol_token) = app.user("carol@example.com").await;
    let (team_id, members) = share_new_cipher(
        &app,
        &alice_token,
        json!([
            { "email": "bob@example.com", "role": "admin" },
            { "email": "carol@example.com" },
        ]),
    )
    .await;
    let (bob_member, carol_member) = (members[0], members[1]);
    join(&app, team_id, bob_member, &bob_token, &alice_token).await;
    join(&app, team_id, carol_member, &carol_token, &alice_token).await;
    let (_, shares) = app.get("/v1/sharing", &alice_token).await;
    let owner_member = shares["owned"][0]["members"]
        .as_array()
        .expect("members")
        .iter()
        .find(|member| member["user_id"] == alice.id.to_string())
        .map(|member| parse_id(&member["id"]))
        .expect("owner member");
    let member_path = |member_id: Uuid| format!("/v1/sharing/{team_id}/members/{member_id}");

    let (status, body) = app
        .put(&member_path(carol_member), &bob_token, json!({ "role": "admin" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "insufficient_role");

    let (status, body) = app
        .put(&member_path(owner_member), &bob_token, json!({ "hide_passwords": true }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "cannot_modify_owner");

    let (status, updated) = app
        .put(
            &member_path(carol_member),
            &bob_token,
            json!({ "role": "manager", "hide_passwords": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["role"], "manager");
    assert_eq!(updated["hide_passwords"], true);

    let (status, _) = app
        .put(&member_path(bob_member), &carol_token, json!({ "role": "member" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .put(&member_path(bob_member), &alice_token, json!({ "role": "member" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["role"], "member");

    // Bob lost the admin role and with it the right to remove members.
    let (status, _) = app.delete(&member_path(carol_member), &bob_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn owner_removes_members_but_not_itself() {
    let app = TestApp::new().await;
    let (_alice, alice_token) = app.user("alice@example.com").await;
    let (_bob, bob_token) = app.user("bob@example.com").await;
    let (team_id, members) =
        share_new_cipher(&app, &alice_token, json!([{ "email": "bob@example.com" }])).await;
    let bob_member = members[0];
    join(&app, team_id, bob_member, &bob_token, &alice_token).await;
    let (_, sync) = app.get("/v1/sync", &bob_token).await;
    assert_eq!(sync["memberships"].as_array().expect("memberships").len(), 1);

    let (status, _) = app
        .delete(&format!("/v1/sharing/{team_id}/members/{bob_member}"), &alice_token)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, sync) = app.get("/v1/sync", &bob_token).await;
    assert_eq!(sync["memberships"], json!([]));
    assert_eq!(sync["ciphers"], json!([]));

    let (status, _) = app
        .delete(&format!("/v1/sharing/{team_id}/members/{bob_member}"), &alice_token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, shares) = app.get("/v1/sharing", &alice_token).await;
    let owner_member = parse_id(&shares["owned"][0]["members"][0]["id"]);
    let (status, body) = app
        .delete(&format!("/v1/sharing/{team_id}/members/{owner_member}"), &alice_token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "cannot_remove_owner");
}

#[tokio::test]
async fn adding_members_to_a_share_is_idempotent() {
    let app = TestApp::new().await;
    let (_alice, alice_token) = app.user("alice@example.com").await;
    let (_bob, bob_token) = app.user("bob@example.com").await;
    let (dave, _dave_token) = app.user("dave@example.com").await;
    let (team_id, _) =
        share_new_cipher(&app, &alice_token, json!([{ "email": "bob@example.com" }])).await;
    let path = format!("/v1/sharing/{team_id}/members");
    let body = json!({ "members": [{ "email": "bob@example.com" }, { "email": "DAVE@example.com" }] });

    let (status, added) = app.post(&path, &alice_token, body.clone()).await;
    assert_eq!(status, StatusCode::OK, "add members: {added}");
    assert_eq!(added["created"], false);
    let outcomes: Vec<(Value, Value)> = added["invited"]
        .as_array()
        .expect("invited")
        .iter()
        .map(|invited| (invited["email"].clone(), invited["outcome"].clone()))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            (json!("bob@example.com"), json!("already_member")),
            (json!("dave@example.com"), json!("created")),
        ]
    );
    assert_eq!(added["invited"][1]["user_id"], dave.id.to_string());

    let (status, again) = app.post(&path, &alice_token, body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(again["invited"]
        .as_array()
        .expect("invited")
        .iter()
        .all(|invited| invited["outcome"] == "already_member"));

    let (_, shares) = app.get("/v1/sharing", &alice_token).await;
    assert_eq!(shares["owned"][0]["members"].as_array().expect("members").len(), 3);

    // Invited members cannot manage the share.
    let (status, _) = app.post(&path, &bob_token, body).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn cipher_collections_stay_within_the_team() {
    let app = TestApp::new().await;
    let (_alice, alice_token) = app.user("alice@example.com").await;
    app.user("bob@example.com").await;
    let (_, collection_id, cipher_id) = share_folder_with_bob(&app, &alice_token).await;
    let path = format!("/v1/ciphers/{cipher_id}/collections");

    let (status, body) = app
        .put(&path, &alice_token, json!({ "collection_ids": [Uuid::now_v7()] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "collection_not_in_team");

    let (status, body) = app
        .put(&path, &alice_token, json!({ "collection_ids": [] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "collections_required");

    let (status, body) = app
        .put(
            &path,
            &alice_token,
            json!({ "collection_ids": [collection_id, collection_id] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["collection_ids"], json!([collection_id]));

    let personal = app.create_cipher(&alice_token, "personal-blob").await;
    let (status, body) = app
        .put(
            &format!("/v1/ciphers/{personal}/collections"),
            &alice_token,
            json!({ "collection_ids": [collection_id] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "cipher_not_shared");
}

#[tokio::test]
async fn owner_adds_cipher_to_shared_folder() {
    let app = TestApp::new().await;
    let (_alice, alice_token) = app.user("alice@example.com").await;
    let (_bob, bob_token) = app.user("bob@example.com").await;
    let (team_id, collection_id, _) = share_folder_with_bob(&app, &alice_token).await;
    let extra = app.create_cipher(&alice_token, "personal-extra").await;
    let path = format!("/v1/sharing/{team_id}/collections/{collection_id}/ciphers");
    let body = json!({ "cipher_id": extra, "data": "team-extra" });

    let (status, _) = app.post(&path, &bob_token, body.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            &format!("/v1/sharing/{team_id}/collections/{}/ciphers", Uuid::now_v7()),
            &alice_token,
            body.clone(),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.post(&path, &alice_token, body.clone()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, sync) = app.get("/v1/sync", &alice_token).await;
    let moved = synced_cipher(&sync, extra).expect("moved cipher");
    assert_eq!(moved["team_id"], team_id.to_string());
    assert_eq!(moved["data"], "team-extra");
    assert_eq!(moved["collection_ids"], json!([collection_id]));

    let (status, body) = app.post(&path, &alice_token, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "cipher_in_organization");
}
