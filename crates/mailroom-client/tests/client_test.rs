//! Drives a live server on a loopback port through [`ApiClient`].

use mailroom_client::{ApiClient, AuditLogQuery, ClientError};
use mailroom_core::models::domain::CreateDomain;
use mailroom_core::models::message::{CreateMessage, Folder};
use mailroom_core::models::user::{CreateUser, Role, UpdateUser};
use mailroom_db::{DbConfig, DbManager};
use mailroom_server::{AppState, ServerConfig, router};

async fn spawn_server() -> String {
    let config = ServerConfig {
        db: DbConfig::in_memory(),
        ..ServerConfig::default()
    };
    let db = DbManager::connect(&config.db).await.unwrap();
    mailroom_db::run_migrations(db.client()).await.unwrap();

    let state = AppState::new(db.client().clone(), &config);
    state
        .users
        .bootstrap_super_admin("root".into(), "root@example.com".into(), "rootpass".into())
        .await
        .unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

fn new_client(username: &str) -> CreateUser {
    CreateUser {
        username: username.into(),
        email: format!("{username}@x.com"),
        first_name: None,
        last_name: None,
        role: Role::Client,
        domain_id: None,
        temp_password: "secret1".into(),
    }
}

#[tokio::test]
async fn session_follows_login_and_logout() {
    let base = spawn_server().await;
    let client = ApiClient::new(&base).unwrap();

    let err = client.current_user().await.unwrap_err();
    assert_eq!(err.status(), Some(401));

    let user = client.login("root", "rootpass").await.unwrap();
    assert_eq!(user.role, Role::SuperAdmin);
    assert_eq!(client.current_user().await.unwrap().id, user.id);

    client.logout().await.unwrap();
    assert_eq!(client.current_user().await.unwrap_err().status(), Some(401));
}

#[tokio::test]
async fn user_mutations_invalidate_cached_lists() {
    let base = spawn_server().await;
    let client = ApiClient::new(&base).unwrap();
    client.login("root", "rootpass").await.unwrap();

    assert_eq!(client.list_users(None, None).await.unwrap().len(), 1);
    assert_eq!(client.user_stats().await.unwrap().total, 1);
    assert_eq!(client.cache().len(), 2);

    let created = client.create_user(&new_client("u1")).await.unwrap();
    assert!(client.cache().is_empty());
    assert_eq!(client.list_users(None, None).await.unwrap().len(), 2);
    assert_eq!(client.user_stats().await.unwrap().total, 2);

    let patch = UpdateUser {
        first_name: Some("Una".into()),
        ..UpdateUser::default()
    };
    client.update_user(created.id, &patch).await.unwrap();
    let listed = client.list_users(Some(Role::Client), None).await.unwrap();
    assert_eq!(listed[0].first_name.as_deref(), Some("Una"));
}

#[tokio::test]
async fn sending_mail_refreshes_folder_lists() {
    let base = spawn_server().await;
    let client = ApiClient::new(&base).unwrap();
    client.login("root", "rootpass").await.unwrap();

    assert!(client.list_emails(Some(Folder::Sent)).await.unwrap().is_empty());

    let sent = client
        .send_email(&CreateMessage {
            recipient: "bob@x.com".into(),
            subject: "hi".into(),
            body: "hello".into(),
        })
        .await
        .unwrap();
    let listed = client.list_emails(Some(Folder::Sent)).await.unwrap();
    assert_eq!(listed.len(), 1);

    client.move_email(sent.id, Folder::Trash).await.unwrap();
    assert!(client.list_emails(Some(Folder::Sent)).await.unwrap().is_empty());
}

#[tokio::test]
async fn domain_conflict_surfaces_as_api_error() {
    let base = spawn_server().await;
    let client = ApiClient::new(&base).unwrap();
    client.login("root", "rootpass").await.unwrap();

    let input = CreateDomain {
        domain: "example.org".into(),
        description: None,
    };
    let domain = client.create_domain(&input).await.unwrap();
    let err = client.create_domain(&input).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 409, .. }));

    client.set_domain_active(domain.id, false).await.unwrap();
    let domains = client.list_domains().await.unwrap();
    assert!(!domains[0].is_active);

    let entries = client
        .audit_logs(&AuditLogQuery {
            action: Some("CREATE_DOMAIN".into()),
            ..AuditLogQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn validation_errors_carry_fields() {
    let base = spawn_server().await;
    let client = ApiClient::new(&base).unwrap();
    client.login("root", "rootpass").await.unwrap();

    let mut bad = new_client("u2");
    bad.email = "nope".into();
    match client.create_user(&bad).await.unwrap_err() {
        ClientError::Api { status, errors, .. } => {
            assert_eq!(status, 400);
            assert_eq!(errors[0].field, "email");
        }
        other => panic!("unexpected error: {other}"),
    }
}
