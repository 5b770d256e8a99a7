//! Session lifecycle tests against a real PostgreSQL container
//!
//! Run with `cargo test -p infra_db -- --ignored` on a host with Docker.

use std::sync::Arc;
use std::time::{Duration, Instant};

use infra_db::schema::Brand;
use infra_db::{DatabaseError, PoolConfig};
use test_utils::{
    insert_brand, insert_category, insert_model, CatalogueFixtures, TestDatabase,
};
use tokio::sync::oneshot;
use uuid::Uuid;

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_committed_write_is_visible_to_next_session() {
    let db = TestDatabase::new().await.unwrap();
    let database = db.database(PoolConfig::default()).unwrap();
    let brand = CatalogueFixtures::brand();

    let inserted = brand.clone();
    database
        .session(true, move |session| {
            Box::pin(async move {
                insert_brand(session.connection().await?, &inserted).await?;
                Ok::<_, DatabaseError>(())
            })
        })
        .await
        .unwrap();

    let id = brand.id;
    let stored = database
        .session(false, move |session| {
            Box::pin(async move {
                let row = sqlx::query_as::<_, Brand>("SELECT id, country, tier FROM brands WHERE id = $1")
                    .bind(id)
                    .fetch_optional(session.connection().await?)
                    .await?;
                row.ok_or_else(|| DatabaseError::not_found("brands", id))
            })
        })
        .await
        .unwrap();

    assert_eq!(stored, brand);
    assert_eq!(database.status().commits, 1);
    database.close().await;
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_failed_work_leaves_no_partial_write() {
    let db = TestDatabase::new().await.unwrap();
    let database = db.database(PoolConfig::default()).unwrap();
    let category = CatalogueFixtures::limited_category();

    let result = database
        .session(true, move |session| {
            Box::pin(async move {
                insert_category(session.connection().await?, &category).await?;
                Err::<(), _>(DatabaseError::QueryFailed("price feed unavailable".to_string()))
            })
        })
        .await;

    assert!(matches!(result, Err(DatabaseError::QueryFailed(_))));
    assert_eq!(db.count_rows("categories").await.unwrap(), 0);

    let status = database.status();
    assert_eq!(status.commits, 0);
    assert_eq!(status.rollbacks, 1);
    assert_eq!(status.active_sessions(), 0);
    database.close().await;
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_foreign_key_violation_is_classified() {
    let db = TestDatabase::new().await.unwrap();
    let database = db.database(PoolConfig::default()).unwrap();
    let orphan = CatalogueFixtures::model(
        &CatalogueFixtures::brand(),
        &CatalogueFixtures::limited_category(),
    );

    let result = database
        .session(true, move |session| {
            Box::pin(async move {
                insert_model(session.connection().await?, &orphan).await?;
                Ok::<_, DatabaseError>(())
            })
        })
        .await;

    let error = result.unwrap_err();
    assert!(error.is_constraint_violation(), "unexpected error: {error}");
    assert_eq!(db.count_rows("models").await.unwrap(), 0);
    database.close().await;
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_failed_commit_rolls_back_and_closes() {
    let db = TestDatabase::new().await.unwrap();
    let mut conn = db.connect().await.unwrap();
    sqlx::query(
        "CREATE TABLE wishlist (model_id UUID REFERENCES models (id) DEFERRABLE INITIALLY DEFERRED)",
    )
    .execute(&mut conn)
    .await
    .unwrap();

    let database = db.database(PoolConfig::default()).unwrap();
    let result = database
        .session(true, |session| {
            Box::pin(async move {
                sqlx::query("INSERT INTO wishlist (model_id) VALUES ($1)")
                    .bind(Uuid::new_v4())
                    .execute(session.connection().await?)
                    .await?;
                Ok::<_, DatabaseError>(())
            })
        })
        .await;

    assert!(matches!(result, Err(DatabaseError::TransactionFailed(_))));
    assert_eq!(db.count_rows("wishlist").await.unwrap(), 0);

    // the failed COMMIT already ended the transaction on the server
    let status = database.status();
    assert_eq!(status.commits, 0);
    assert_eq!(status.rollbacks, 0);
    assert_eq!(status.sessions_closed, 1);
    database.close().await;
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_failed_rollback_on_terminated_backend_still_closes() {
    let db = TestDatabase::new().await.unwrap();
    let mut admin = db.connect().await.unwrap();
    let database = db.database(PoolConfig::default()).unwrap();
    let category = CatalogueFixtures::limited_category();

    let result = database
        .session(true, move |session| {
            Box::pin(async move {
                let conn = session.connection().await?;
                insert_category(&mut *conn, &category).await?;
                let pid: i32 = sqlx::query_scalar("SELECT pg_backend_pid()")
                    .fetch_one(&mut *conn)
                    .await?;

                sqlx::query("SELECT pg_terminate_backend($1)")
                    .bind(pid)
                    .execute(&mut admin)
                    .await?;
                for _ in 0..50 {
                    let alive: i64 =
                        sqlx::query_scalar("SELECT COUNT(*) FROM pg_stat_activity WHERE pid = $1")
                            .bind(pid)
                            .fetch_one(&mut admin)
                            .await?;
                    if alive == 0 {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }

                Err::<(), _>(DatabaseError::QueryFailed("stock sync aborted".to_string()))
            })
        })
        .await;

    match result {
        Err(DatabaseError::QueryFailed(message)) => assert_eq!(message, "stock sync aborted"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(db.count_rows("categories").await.unwrap(), 0);

    let status = database.status();
    assert_eq!(status.rollbacks, 0);
    assert_eq!(status.sessions_closed, 1);
    assert_eq!(status.active_sessions(), 0);
    database.close().await;
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_exhausted_pool_times_out() {
    let db = TestDatabase::new().await.unwrap();
    let pool = PoolConfig::default().pool_timeout(1).pool_size(1).max_overflow(0);
    let database = Arc::new(db.database(pool).unwrap());

    let (held_tx, held_rx) = oneshot::channel::<()>();
    let (release_tx, release_rx) = oneshot::channel::<()>();
    let holder = tokio::spawn({
        let database = Arc::clone(&database);
        async move {
            database
                .session(false, move |session| {
                    Box::pin(async move {
                        sqlx::query("SELECT 1").execute(session.connection().await?).await?;
                        let _ = held_tx.send(());
                        let _ = release_rx.await;
                        Ok::<_, DatabaseError>(())
                    })
                })
                .await
        }
    });
    held_rx.await.unwrap();

    let started = Instant::now();
    let result = database
        .session(false, |session| {
            Box::pin(async move {
                session.connection().await?;
                Ok::<_, DatabaseError>(())
            })
        })
        .await;
    let waited = started.elapsed();

    assert!(matches!(result, Err(DatabaseError::PoolExhausted)));
    assert!(waited >= Duration::from_millis(900), "gave up after {waited:?}");
    assert!(waited < Duration::from_secs(3), "waited {waited:?}");

    release_tx.send(()).unwrap();
    holder.await.unwrap().unwrap();
    assert_eq!(database.status().active_sessions(), 0);
    database.close().await;
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_concurrent_sessions_share_one_bounded_pool() {
    let db = TestDatabase::new().await.unwrap();
    let pool = PoolConfig::default().pool_size(2).max_overflow(1);
    let database = Arc::new(db.database(pool).unwrap());

    let mut handles = Vec::new();
    for _ in 0..20 {
        let database = Arc::clone(&database);
        handles.push(tokio::spawn(async move {
            database
                .session(false, |session| {
                    Box::pin(async move {
                        sqlx::query("SELECT pg_sleep(0.05)")
                            .execute(session.connection().await?)
                            .await?;
                        Ok::<_, DatabaseError>(())
                    })
                })
                .await
        }));
    }

    let mut peak = 0;
    for handle in handles {
        peak = peak.max(database.status().size);
        handle.await.unwrap().unwrap();
    }

    let status = database.status();
    assert!(peak <= 3);
    assert!(status.size <= 3);
    assert_eq!(status.sessions_opened, 20);
    assert_eq!(status.sessions_closed, 20);
    database.close().await;
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_close_releases_connections_and_refuses_sessions() {
    let db = TestDatabase::new().await.unwrap();
    let database = db.database(PoolConfig::default()).unwrap();

    database
        .session(false, |session| {
            Box::pin(async move {
                sqlx::query("SELECT 1").execute(session.connection().await?).await?;
                Ok::<_, DatabaseError>(())
            })
        })
        .await
        .unwrap();
    assert_eq!(database.status().size, 1);

    database.close().await;

    let status = database.status();
    assert!(status.closed);
    assert_eq!(status.size, 0);

    let result = database
        .session(true, |_session| Box::pin(async move { Ok::<_, DatabaseError>(()) }))
        .await;
    assert!(matches!(result, Err(DatabaseError::NotInitialized)));
}
