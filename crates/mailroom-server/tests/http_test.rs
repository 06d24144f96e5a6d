//! End-to-end tests of the HTTP surface against in-memory SurrealDB.

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use mailroom_core::models::user::{CreateUser, Role, User};
use mailroom_db::{DbConfig, DbManager};
use mailroom_server::{AppState, ServerConfig, router};
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    app: Router,
    state: AppState,
    root: User,
}

async fn setup() -> TestApp {
    let config = ServerConfig {
        db: DbConfig::in_memory(),
        ..ServerConfig::default()
    };
    let db = DbManager::connect(&config.db).await.unwrap();
    mailroom_db::run_migrations(db.client()).await.unwrap();

    let state = AppState::new(db.client().clone(), &config);
    let root = state
        .users
        .bootstrap_super_admin("root".into(), "root@example.com".into(), "rootpass".into())
        .await
        .unwrap();

    TestApp {
        app: router(state.clone()),
        state,
        root,
    }
}

impl TestApp {
    async fn add_user(&self, username: &str, role: Role) -> User {
        self.state
            .users
            .create_user(
                Some(&self.root),
                CreateUser {
                    username: username.into(),
                    email: format!("{username}@x.com"),
                    first_name: None,
                    last_name: None,
                    role,
                    domain_id: None,
                    temp_password: "secret1".into(),
                },
            )
            .await
            .unwrap()
    }

    async fn call(&self, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, headers, body)
    }

    /// Log in and return the `Cookie` header value for the session.
    async fn login(&self, username: &str, password: &str) -> String {
        let (status, headers, _) = self
            .call(request(
                "POST",
                "/api/login",
                None,
                Some(json!({ "username": username, "password": password })),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        let set_cookie = headers
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }
}

fn request(method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn health_is_public() {
    let t = setup().await;
    let (status, _, body) = t.call(request("GET", "/api/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn login_sets_session_cookie_and_hides_credential() {
    let t = setup().await;
    let (status, headers, body) = t
        .call(request(
            "POST",
            "/api/login",
            None,
            Some(json!({ "username": "root", "password": "rootpass" })),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "root");
    assert_eq!(body["role"], "super_admin");
    assert!(body.get("passwordHash").is_none());

    let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with("mailroom_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
}

#[tokio::test]
async fn login_failures_are_uniform() {
    let t = setup().await;
    let (wrong_pw, _, wrong_body) = t
        .call(request(
            "POST",
            "/api/login",
            None,
            Some(json!({ "username": "root", "password": "not-it-at-all" })),
        ))
        .await;
    let (unknown, _, unknown_body) = t
        .call(request(
            "POST",
            "/api/login",
            None,
            Some(json!({ "username": "nobody", "password": "not-it-at-all" })),
        ))
        .await;

    assert_eq!(wrong_pw, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn malformed_login_is_a_validation_error() {
    let t = setup().await;
    let (status, _, body) = t
        .call(request("POST", "/api/login", None, Some(json!({ "username": "r" }))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn current_user_requires_session() {
    let t = setup().await;
    let (status, _, body) = t.call(request("GET", "/api/user", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Authentication required");

    let cookie = t.login("root", "rootpass").await;
    let (status, _, body) = t
        .call(request("GET", "/api/user", Some(&cookie), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], t.root.id.to_string());
}

#[tokio::test]
async fn garbage_session_cookie_is_unauthenticated() {
    let t = setup().await;
    let (status, _, _) = t
        .call(request(
            "GET",
            "/api/user",
            Some("mailroom_session=not-a-real-token"),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_ends_session_and_clears_cookie() {
    let t = setup().await;
    let cookie = t.login("root", "rootpass").await;

    let (status, headers, _) = t
        .call(request("POST", "/api/logout", Some(&cookie), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    let cleared = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));

    let (status, _, _) = t
        .call(request("GET", "/api/user", Some(&cookie), None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Without any session it still succeeds.
    let (status, _, _) = t.call(request("POST", "/api/logout", None, None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn client_is_forbidden_from_admin_routes() {
    let t = setup().await;
    t.add_user("carol", Role::Client).await;
    let cookie = t.login("carol", "secret1").await;

    for (method, uri, body) in [
        ("GET", "/api/users", None),
        ("GET", "/api/users/stats", None),
        ("GET", "/api/audit-logs", None),
        ("GET", "/api/domains", None),
        (
            "POST",
            "/api/domains",
            Some(json!({ "domain": "x.com" })),
        ),
    ] {
        let (status, _, _) = t.call(request(method, uri, Some(&cookie), body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}");
    }
}

#[tokio::test]
async fn admin_cannot_create_users() {
    let t = setup().await;
    t.add_user("adam", Role::Admin).await;
    let cookie = t.login("adam", "secret1").await;

    let (status, _, _) = t
        .call(request(
            "POST",
            "/api/users",
            Some(&cookie),
            Some(json!({
                "username": "u2",
                "email": "u2@x.com",
                "role": "client",
                "tempPassword": "secret1",
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = t
        .call(request("GET", "/api/users?role=client", Some(&cookie), None))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn authentication_is_checked_before_validation() {
    let t = setup().await;
    let (status, _, _) = t
        .call(request("POST", "/api/users", None, Some(json!({}))))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn super_admin_creates_user_who_can_log_in() {
    let t = setup().await;
    let cookie = t.login("root", "rootpass").await;

    let (status, _, body) = t
        .call(request(
            "POST",
            "/api/users",
            Some(&cookie),
            Some(json!({
                "username": "u1",
                "email": "u1@x.com",
                "role": "client",
                "tempPassword": "secret1",
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "client");

    let user = t.state.auth.authenticate("u1", "secret1").await.unwrap();
    assert_eq!(user.role, Role::Client);

    let (status, _, body) = t
        .call(request(
            "POST",
            "/api/users",
            Some(&cookie),
            Some(json!({
                "username": "u1",
                "email": "other@x.com",
                "role": "client",
                "tempPassword": "secret1",
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn validation_errors_enumerate_every_field() {
    let t = setup().await;
    let cookie = t.login("root", "rootpass").await;

    let (status, _, body) = t
        .call(request(
            "POST",
            "/api/users",
            Some(&cookie),
            Some(json!({
                "username": "",
                "email": "not-an-email",
                "role": "client",
                "tempPassword": "x",
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"username"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"tempPassword"));
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let t = setup().await;
    let cookie = t.login("root", "rootpass").await;
    let req = Request::builder()
        .method("POST")
        .uri("/api/domains")
        .header(header::COOKIE, &cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = t.call(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "body");
}

#[tokio::test]
async fn patching_unknown_user_is_not_found() {
    let t = setup().await;
    let cookie = t.login("root", "rootpass").await;
    let uri = format!("/api/users/{}", uuid::Uuid::new_v4());
    let (status, _, _) = t
        .call(request(
            "PATCH",
            &uri,
            Some(&cookie),
            Some(json!({ "firstName": "Nobody" })),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mail_round_trip_through_http() {
    let t = setup().await;
    t.add_user("carol", Role::Client).await;
    let cookie = t.login("carol", "secret1").await;

    let (status, _, sent) = t
        .call(request(
            "POST",
            "/api/emails",
            Some(&cookie),
            Some(json!({ "recipient": "bob@x.com", "subject": "hi", "body": "hello" })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["folder"], "sent");
    assert_eq!(sent["sender"], "carol@emailserver.com");

    let (status, _, inbox) = t
        .call(request("GET", "/api/emails", Some(&cookie), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(inbox.as_array().unwrap().is_empty());

    let id = sent["id"].as_str().unwrap();
    let (status, _, starred) = t
        .call(request(
            "PATCH",
            &format!("/api/emails/{id}/status"),
            Some(&cookie),
            Some(json!({ "isStarred": true })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(starred["isStarred"], true);

    let (status, _, moved) = t
        .call(request(
            "PATCH",
            &format!("/api/emails/{id}/folder"),
            Some(&cookie),
            Some(json!({ "folder": "trash" })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["folder"], "trash");

    let (status, _, trash) = t
        .call(request("GET", "/api/emails?folder=trash", Some(&cookie), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trash.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn domains_and_audit_log_over_http() {
    let t = setup().await;
    let cookie = t.login("root", "rootpass").await;

    let (status, _, domain) = t
        .call(request(
            "POST",
            "/api/domains",
            Some(&cookie),
            Some(json!({ "domain": "Example.org", "description": "test" })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(domain["domain"], "example.org");

    let id = domain["id"].as_str().unwrap();
    let (status, _, updated) = t
        .call(request(
            "PATCH",
            &format!("/api/domains/{id}/status"),
            Some(&cookie),
            Some(json!({ "isActive": false })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["isActive"], false);

    let (status, _, entries) = t
        .call(request(
            "GET",
            "/api/audit-logs?action=UPDATE_DOMAIN_STATUS",
            Some(&cookie),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["details"]["isActive"], false);

    let (status, _, _) = t
        .call(request("GET", "/api/audit-logs?limit=0", Some(&cookie), None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deactivated_user_loses_session() {
    let t = setup().await;
    let carol = t.add_user("carol", Role::Client).await;
    let carol_cookie = t.login("carol", "secret1").await;
    let root_cookie = t.login("root", "rootpass").await;

    let (status, _, _) = t
        .call(request(
            "PATCH",
            &format!("/api/users/{}", carol.id),
            Some(&root_cookie),
            Some(json!({ "isActive": false })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = t
        .call(request("GET", "/api/user", Some(&carol_cookie), None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
