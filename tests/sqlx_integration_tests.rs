//! Integration tests using SQLx's #[sqlx::test] macro
//!
//! Each test gets an isolated database with ./migrations applied.


use std::sync::Arc;

use chrono::Duration;
use sqlx::PgPool;

use modelgate::application::brute_force::{BruteForceGuard, BruteForceSettings};
use modelgate::application::ports::{
    CounterStore, LoginAttemptRepository, RateLimitLedger, ViolationSink,
};
use modelgate::application::rate_limiting::{CountingBackend, RateLimiter, RateLimitSettings};
use modelgate::domain::entities::{LoginAttempt, ViolationRecord};
use modelgate::domain::value_objects::{ClientContext, RateLimitKey};
use modelgate::infrastructure::clock::SystemClock;
use modelgate::infrastructure::counters::{PostgresCounterStore, PostgresLedger};
use modelgate::infrastructure::persistence::{
    PostgresLoginAttemptRepository, PostgresViolationSink,
};
use test_fixtures::{manual_clock, noon};

#[sqlx::test]
async fn sqlx_test_counter_increments_atomically(pool: PgPool) {
    let store = Arc::new(PostgresCounterStore::new(pool));

    let mut handles = Vec::new();
    for _ in 0..20 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.increment("rate_limit:search:10.0.0.1", 60).await.unwrap()
        }));
    }
    let mut counts = Vec::new();
    for handle in handles {
        counts.push(handle.await.unwrap());
    }
    counts.sort_unstable();
    assert_eq!(counts, (1..=20).collect::<Vec<u64>>());
}

#[sqlx::test]
async fn sqlx_test_expired_counter_restarts(pool: PgPool) {
    let store = PostgresCounterStore::new(pool);
    let key = "rate_limit:search:10.0.0.2";

    assert_eq!(store.increment(key, 3600).await.unwrap(), 1);
    assert_eq!(store.increment(key, 3600).await.unwrap(), 2);
    assert_eq!(store.prune_expired().await.unwrap(), 0);

    store.expire(key, 0).await.unwrap();
    assert_eq!(store.increment(key, 3600).await.unwrap(), 1);
    assert_eq!(store.prune_expired().await.unwrap(), 0);

    store.expire(key, 0).await.unwrap();
    assert_eq!(store.prune_expired().await.unwrap(), 1);
}

#[sqlx::test]
async fn sqlx_test_counter_without_expiry_gets_window(pool: PgPool) {
    let key = "rate_limit:search:10.0.0.4";
    sqlx::query(
        "INSERT INTO rate_limit_counters (rate_key, count, window_start, expires_at) VALUES ($1, 9, NOW(), NULL)",
    )
    .bind(key)
    .execute(&pool)
    .await
    .unwrap();

    let store = PostgresCounterStore::new(pool.clone());
    assert_eq!(store.increment(key, 60).await.unwrap(), 10);

    let (has_expiry,): (bool,) = sqlx::query_as(
        "SELECT expires_at IS NOT NULL AND expires_at > NOW() FROM rate_limit_counters WHERE rate_key = $1",
    )
    .bind(key)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(has_expiry);
}

#[sqlx::test]
async fn sqlx_test_ledger_window(pool: PgPool) {
    let ledger = PostgresLedger::new(pool);
    let key = "rate_limit:login_attempt:10.0.0.3";
    let now = noon();

    for minutes in [0, 2, 4] {
        ledger
            .insert(key, "10.0.0.3", now - Duration::minutes(minutes))
            .await
            .unwrap();
    }
    assert_eq!(ledger.count_since(key, now - Duration::minutes(3)).await.unwrap(), 2);
    assert_eq!(ledger.count_since(key, now - Duration::minutes(4)).await.unwrap(), 3);
    assert_eq!(ledger.count_since("other", now - Duration::hours(1)).await.unwrap(), 0);

    assert_eq!(ledger.delete_older_than(now - Duration::minutes(1)).await.unwrap(), 2);
    assert_eq!(ledger.count_since(key, now - Duration::hours(1)).await.unwrap(), 1);
}

#[sqlx::test]
async fn sqlx_test_violation_sink_round_trip(pool: PgPool) {
    let sink = PostgresViolationSink::new(pool);
    let key = RateLimitKey::new("password_reset", "203.0.113.7").unwrap();

    let older = ViolationRecord::new(&key, "curl/8.5", noon() - Duration::days(40));
    let newer = ViolationRecord::new(&key, "Mozilla/5.0", noon());
    sink.insert(&older).await.unwrap();
    sink.insert(&newer).await.unwrap();

    let recent = sink.recent(10).await.unwrap();
    assert_eq!(recent, vec![newer.clone(), older]);
    assert_eq!(sink.recent(1).await.unwrap(), vec![newer]);

    assert_eq!(sink.purge_older_than(noon() - Duration::days(30)).await.unwrap(), 1);
    assert_eq!(sink.recent(10).await.unwrap().len(), 1);
}

#[sqlx::test]
async fn sqlx_test_login_attempt_repository(pool: PgPool) {
    let repo = PostgresLoginAttemptRepository::new(pool);
    let at = noon();

    for seconds in [0, 10, 20] {
        let attempt = LoginAttempt::failed(
            "ana@example.com",
            "login",
            Some("198.51.100.20".to_string()),
            Some("Mozilla/5.0".to_string()),
            at + Duration::seconds(seconds),
        );
        repo.record(&attempt).await.unwrap();
    }

    assert_eq!(repo.count_since("ana@example.com", "login", at).await.unwrap(), 2);
    assert_eq!(
        repo.count_since("ana@example.com", "login", at - Duration::seconds(1))
            .await
            .unwrap(),
        3
    );
    assert_eq!(
        repo.latest_lock_since("ana@example.com", "login", at - Duration::hours(1))
            .await
            .unwrap(),
        None
    );

    repo.lock_latest("ana@example.com", "login").await.unwrap();
    assert_eq!(
        repo.latest_lock_since("ana@example.com", "login", at - Duration::hours(1))
            .await
            .unwrap(),
        Some(at + Duration::seconds(20))
    );
    assert_eq!(
        repo.latest_lock_since("ana@example.com", "login", at + Duration::seconds(20))
            .await
            .unwrap(),
        None
    );

    assert_eq!(repo.delete_older_than(at + Duration::seconds(5)).await.unwrap(), 1);
    assert_eq!(repo.clear("ana@example.com", "login").await.unwrap(), 2);
}

#[sqlx::test]
async fn sqlx_test_limiter_with_postgres_backends(pool: PgPool) {
    let violations = Arc::new(PostgresViolationSink::new(pool.clone()));
    let limiter = RateLimiter::new(
        CountingBackend::Counter(Arc::new(PostgresCounterStore::new(pool))),
        violations.clone(),
        Arc::new(SystemClock),
        RateLimitSettings::default(),
    );
    let client = ClientContext::new(Some("203.0.113.50".parse().unwrap()));

    for _ in 0..5 {
        assert!(limiter.check("login_attempt", 300, 5, None, &client).await.unwrap());
    }
    assert!(!limiter.check("login_attempt", 300, 5, None, &client).await.unwrap());

    let recent = violations.recent(10).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].rate_key(), "rate_limit:login_attempt:203.0.113.50");
    assert_eq!(recent[0].user_agent(), ClientContext::UNKNOWN_USER_AGENT);
}

#[sqlx::test]
async fn sqlx_test_brute_force_guard_with_postgres(pool: PgPool) {
    let clock = manual_clock();
    let guard = BruteForceGuard::new(
        Arc::new(PostgresLoginAttemptRepository::new(pool)),
        clock.clone(),
        BruteForceSettings::default(),
    );
    let client = ClientContext::default();

    for _ in 0..4 {
        clock.advance(Duration::seconds(1));
        assert!(!guard.register_failure("bob", "login", &client).await.unwrap());
    }
    clock.advance(Duration::seconds(1));
    assert!(guard.register_failure("bob", "login", &client).await.unwrap());
    assert_eq!(guard.remaining_lockout("bob", "login").await.unwrap(), 900);

    clock.advance(Duration::seconds(900));
    assert!(!guard.is_blocked("bob", "login").await.unwrap());
}
