mod common;

use anyhow::Result;
use axum::http::StatusCode;
use clearance_api::auth::AccessLevel;
use clearance_api::security::SecurityStore;
use clearance_api::types::Action;
use common::TestApp;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn grant_then_check_then_revoke() -> Result<()> {
    let app = TestApp::new().await;
    let admin = app.admin();
    let level = app.create_level(&admin, "Confidential", 3).await?;
    let u1 = Uuid::new_v4();

    let granted = app
        .act(&admin, "securityLevelGrant", json!({ "securityLevelId": level, "userId": u1 }))
        .await?;
    assert_eq!(granted.status, StatusCode::CREATED);
    assert_eq!(granted.data()["granted"], true);
    assert_eq!(granted.data()["userId"], json!(u1));
    assert!(granted.data()["mappingId"].is_string());
    assert!(app.has_access(&admin, level, u1).await?);

    let revoked = app
        .act(&admin, "securityLevelRevoke", json!({ "securityLevelId": level, "userId": u1 }))
        .await?;
    assert_eq!(revoked.status, StatusCode::OK);
    assert_eq!(revoked.data()["revoked"], true);
    assert_eq!(revoked.data()["count"], 1);
    assert!(!app.has_access(&admin, level, u1).await?);
    Ok(())
}

#[tokio::test]
async fn duplicate_grant_conflicts() -> Result<()> {
    let app = TestApp::new().await;
    let admin = app.admin();
    let level = app.create_level(&admin, "Restricted", 4).await?;
    let data = json!({ "securityLevelId": level, "userId": Uuid::new_v4() });

    let first = app.act(&admin, "securityLevelGrant", data.clone()).await?;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = app.act(&admin, "securityLevelGrant", data).await?;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.code(), "ENTITY_ALREADY_EXISTS");

    assert_eq!(app.store.active_grants(level).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn concurrent_duplicate_grants_leave_one_active() -> Result<()> {
    let app = Arc::new(TestApp::new().await);
    let admin = app.admin();
    let level = app.create_level(&admin, "Restricted", 4).await?;
    let user = Uuid::new_v4();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = app.clone();
        let token = admin.token.clone();
        handles.push(tokio::spawn(async move {
            let body = json!({
                "action": "securityLevelGrant",
                "data": { "securityLevelId": level, "userId": user }
            });
            app.post_raw(Some(&token), body.to_string()).await
        }));
    }

    let mut created = 0;
    for handle in handles {
        let reply = handle.await??;
        match reply.status {
            StatusCode::CREATED => created += 1,
            StatusCode::CONFLICT => {}
            other => anyhow::bail!("unexpected status {}", other),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(app.store.active_grants(level).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn grant_with_two_recipients_is_invalid() -> Result<()> {
    let app = TestApp::new().await;
    let admin = app.admin();
    let level = app.create_level(&admin, "Internal", 2).await?;

    let reply = app
        .act(
            &admin,
            "securityLevelGrant",
            json!({ "securityLevelId": level, "userId": Uuid::new_v4(), "teamId": Uuid::new_v4() }),
        )
        .await?;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.code(), "INVALID_DATA");
    assert_eq!(app.store.grant_rows().await, 0);
    Ok(())
}

#[tokio::test]
async fn grant_without_recipient_is_missing_data() -> Result<()> {
    let app = TestApp::new().await;
    let admin = app.admin();
    let level = app.create_level(&admin, "Internal", 2).await?;

    let reply = app
        .act(&admin, "securityLevelGrant", json!({ "securityLevelId": level, "userId": "" }))
        .await?;
    assert_eq!(reply.code(), "MISSING_DATA");
    Ok(())
}

#[tokio::test]
async fn grant_on_unknown_level_is_not_found() -> Result<()> {
    let app = TestApp::new().await;
    let reply = app
        .act(
            &app.admin(),
            "securityLevelGrant",
            json!({ "securityLevelId": Uuid::new_v4(), "teamId": Uuid::new_v4() }),
        )
        .await?;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn unknown_level_wins_over_malformed_recipient() -> Result<()> {
    let app = TestApp::new().await;
    let reply = app
        .act(
            &app.admin(),
            "securityLevelGrant",
            json!({ "securityLevelId": Uuid::new_v4(), "userId": "not-a-uuid" }),
        )
        .await?;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.code(), "ENTITY_NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn revoke_without_grant_is_not_found() -> Result<()> {
    let app = TestApp::new().await;
    let admin = app.admin();
    let level = app.create_level(&admin, "Internal", 2).await?;

    let reply = app
        .act(&admin, "securityLevelRevoke", json!({ "securityLevelId": level, "projectRoleId": Uuid::new_v4() }))
        .await?;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.code(), "ENTITY_NOT_FOUND");
    assert_eq!(app.store.grant_rows().await, 0);
    Ok(())
}

#[tokio::test]
async fn editor_may_grant_but_not_create() -> Result<()> {
    let app = TestApp::new().await;
    let level = app.create_level(&app.admin(), "Internal", 2).await?;
    let editor = app.caller(AccessLevel::Edit);

    let grant = app
        .act(&editor, "securityLevelGrant", json!({ "securityLevelId": level, "teamId": Uuid::new_v4() }))
        .await?;
    assert_eq!(grant.status, StatusCode::CREATED);

    let create = app
        .act(&editor, "securityLevelCreate", json!({ "title": "X", "projectId": app.project, "level": 1 }))
        .await?;
    assert_eq!(create.status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn grant_publishes_event() -> Result<()> {
    let app = TestApp::new().await;
    let admin = app.admin();
    let level = app.create_level(&admin, "Internal", 2).await?;
    let mut events = app.notifier.subscribe();
    let team = Uuid::new_v4();

    app.act(&admin, "securityLevelGrant", json!({ "securityLevelId": level, "teamId": team }))
        .await?;

    let event = events.recv().await?;
    assert_eq!(event.action, Action::Grant);
    assert_eq!(event.security_level_id, level);
    assert_eq!(event.payload["teamId"], json!(team));
    Ok(())
}
