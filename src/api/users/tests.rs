use crate::repositories;
use crate::test_support::{self, json_request, read_json, MockReply};
use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn signup_login_refresh_and_logout() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/users",
            None,
            Some(json!({"email": "Ada@Example.com", "password": "analytical-engine"})),
        ))
        .await
        .expect("signup");
    let status = response.status();
    let created = read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {created}");
    assert_eq!(created["success"], 1);
    assert_eq!(created["data"]["user"]["email"], "ada@example.com");
    assert_eq!(created["data"]["user"]["name"], "ada");
    assert_eq!(created["data"]["user"]["role"], "engineer");
    assert!(created["data"]["user"].get("hashedPassword").is_none());

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({"email": "ada@example.com", "password": "analytical-engine"})),
        ))
        .await
        .expect("login");
    assert_eq!(response.status(), StatusCode::OK);
    let login = read_json(response).await;
    let token = login["data"]["token"].as_str().expect("token").to_string();
    let refresh_token = login["data"]["refreshToken"].as_str().expect("refresh").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(Method::GET, "/api/users/me", Some(&token), None))
        .await
        .expect("me");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["data"]["email"], "ada@example.com");

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/users/token/refresh",
            None,
            Some(json!({"refreshToken": refresh_token})),
        ))
        .await
        .expect("refresh");
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = read_json(response).await;
    let rotated_refresh = rotated["data"]["refreshToken"].as_str().expect("rotated").to_string();
    assert_ne!(rotated_refresh, refresh_token);

    // A refresh token is single use.
    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/users/token/refresh",
            None,
            Some(json!({"refresh_token": refresh_token})),
        ))
        .await
        .expect("reuse");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(Method::POST, "/api/users/logout", Some(&token), None))
        .await
        .expect("logout");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .oneshot(json_request(
            Method::POST,
            "/api/users/token/refresh",
            None,
            Some(json!({"refreshToken": rotated_refresh})),
        ))
        .await
        .expect("refresh after logout");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_email_and_wrong_password_are_rejected() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    test_support::insert_user(ctx.state.db(), "grace@example.com", "Grace", "compiler-pass").await;

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/users",
            None,
            Some(json!({"email": "GRACE@example.com", "password": "another-pass"})),
        ))
        .await
        .expect("signup");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        read_json(response).await,
        json!({"success": 0, "message": "User with this email already exists"})
    );

    let response = ctx
        .app
        .oneshot(json_request(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({"email": "grace@example.com", "password": "wrong-password"})),
        ))
        .await
        .expect("login");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(response).await["message"], "Incorrect email or password");
}

#[tokio::test]
async fn update_then_delete_account_cascades() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    let user = test_support::insert_user(ctx.state.db(), "linus@example.com", "Linus", "kernel-pass")
        .await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            Method::PATCH,
            "/api/users/me",
            Some(&token),
            Some(json!({"name": "Linus T.", "role": "student"})),
        ))
        .await
        .expect("update");
    assert_eq!(response.status(), StatusCode::OK);
    let updated = read_json(response).await;
    assert_eq!(updated["data"]["name"], "Linus T.");
    assert_eq!(updated["data"]["role"], "student");

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/sessions",
            Some(&token),
            Some(json!({
                "skillName": "Databases",
                "mode": "explain",
                "inputType": "text",
                "difficulty": "advanced"
            })),
        ))
        .await
        .expect("create session");
    assert_eq!(response.status(), StatusCode::OK);
    let session_id = read_json(response).await["data"]["id"].as_str().expect("id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(Method::DELETE, "/api/users/me", Some(&token), None))
        .await
        .expect("delete");
    assert_eq!(response.status(), StatusCode::OK);

    let session = repositories::sessions::find_by_id(ctx.state.db(), &session_id)
        .await
        .expect("lookup session");
    assert!(session.is_none());

    let response = ctx
        .app
        .oneshot(json_request(Method::GET, "/api/users/me", Some(&token), None))
        .await
        .expect("me after delete");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn overview_and_activity_reflect_evaluations() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    let user = test_support::insert_user(ctx.state.db(), "ken@example.com", "Ken", "unix-pass")
        .await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    ctx.provider.set_reply(MockReply::scores(6.0, 8.0, 7.0, 5.0));

    let mut session_ids = Vec::new();
    for skill in ["Redis", "Databases"] {
        let response = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/sessions",
                Some(&token),
                Some(json!({
                    "skillName": skill,
                    "mode": "explain",
                    "inputType": "text",
                    "difficulty": "beginner"
                })),
            ))
            .await
            .expect("create session");
        session_ids.push(read_json(response).await["data"]["id"].as_str().unwrap().to_string());
    }

    let redis_session = &session_ids[0];
    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/sessions/{redis_session}/answer"),
            Some(&token),
            Some(json!({"rawText": "Redis is an in-memory key-value store."})),
        ))
        .await
        .expect("answer");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/sessions/{redis_session}/evaluate"),
            Some(&token),
            None,
        ))
        .await
        .expect("evaluate");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(Method::GET, "/api/users/me/overview", Some(&token), None))
        .await
        .expect("overview");
    assert_eq!(response.status(), StatusCode::OK);
    let overview = read_json(response).await;
    assert_eq!(overview["data"]["totalSessions"], 2);
    assert_eq!(overview["data"]["totalEvaluations"], 1);
    assert_eq!(overview["data"]["averageScore"], 7.0);
    let skills = overview["data"]["skills"].as_array().expect("skills");
    assert_eq!(skills.len(), 2);
    assert_eq!(skills[0]["skillName"], "Databases");
    assert!(skills[0]["averageScore"].is_null());
    assert_eq!(skills[1]["averageDelivery"], 5.0);

    let response = ctx
        .app
        .oneshot(json_request(Method::GET, "/api/users/me/activity?limit=10", Some(&token), None))
        .await
        .expect("activity");
    assert_eq!(response.status(), StatusCode::OK);
    let activity = read_json(response).await;
    let items = activity["data"].as_array().expect("items");
    assert_eq!(items.len(), 2);
    let by_session = |id: &str| {
        items.iter().find(|item| item["sessionId"] == id).expect("session in activity").clone()
    };
    let redis_item = by_session(redis_session);
    assert_eq!(redis_item["status"], "evaluated");
    assert_eq!(redis_item["score"], 7.0);
    assert_eq!(redis_item["answerCount"], 1);
    let databases_item = by_session(&session_ids[1]);
    assert_eq!(databases_item["status"], "unanswered");
    assert!(databases_item["score"].is_null());
}
