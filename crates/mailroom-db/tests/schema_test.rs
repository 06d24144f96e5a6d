//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    let applied = mailroom_db::run_migrations(&db).await.unwrap();
    assert_eq!(applied as u32, mailroom_db::latest_version());

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    for table in ["user", "domain", "message", "session", "audit_log"] {
        assert!(info_str.contains(table), "missing {table} table");
    }
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    mailroom_db::run_migrations(&db).await.unwrap();
    let second = mailroom_db::run_migrations(&db).await.unwrap();
    assert_eq!(second, 0, "nothing should be re-applied");
}

#[tokio::test]
async fn role_assertion_rejects_unknown_role() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    mailroom_db::run_migrations(&db).await.unwrap();

    let result = db
        .query(
            "CREATE user SET username = 'x', email = 'x@example.com', \
             password_hash = 'h', role = 'root'",
        )
        .await
        .unwrap()
        .check();
    assert!(result.is_err());
}
