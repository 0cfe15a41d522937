//! End-to-end bootstrap behaviour.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use server_lifecycle::cleanup::{BoxError, ResourceCleaner};
use server_lifecycle::http::{default_routes, StartError};
use server_lifecycle::lifecycle::{manual, Bootstrap, BootstrapError, DataSeeder, ShutdownSignal};
use server_lifecycle::observability::Telemetry;

mod common;

struct FailingSeeder {
    calls: Arc<AtomicUsize>,
}

impl DataSeeder for FailingSeeder {
    fn seed(&self) -> BoxFuture<'_, Result<(), BoxError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), BoxError>("fixtures database unavailable".into()) }.boxed()
    }
}

#[tokio::test]
async fn bind_failure_never_starts_shutdown() {
    let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = common::loopback_config();
    config.port = occupied.local_addr().unwrap().port();

    let cleaner = Arc::new(ResourceCleaner::new());
    let flushed = common::register_counter(&cleaner, "tracer");

    let (_trigger, signals) = manual();
    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        Bootstrap::new(config, default_routes())
            .with_cleaner(Arc::clone(&cleaner))
            .run(signals),
    )
    .await
    .expect("bind failure should return immediately");

    match outcome {
        Err(BootstrapError::Start(StartError::Bind { addr, .. })) => {
            assert_eq!(addr, occupied.local_addr().unwrap());
        }
        other => panic!("expected bind failure, got {other:?}"),
    }
    assert_eq!(flushed.load(Ordering::SeqCst), 0);
    assert_eq!(cleaner.len(), 1, "cleanup must never be called");
}

#[tokio::test]
async fn seeding_failure_is_not_fatal() {
    let cleaner = Arc::new(ResourceCleaner::new());
    let flushed = common::register_counter(&cleaner, "cache");
    let calls = Arc::new(AtomicUsize::new(0));

    let (trigger, signals) = manual();
    trigger.trigger(ShutdownSignal::Terminate);

    let bootstrap = Bootstrap::new(common::loopback_config(), default_routes())
        .with_cleaner(Arc::clone(&cleaner))
        .with_telemetry(Telemetry::disabled())
        .with_seeder(FailingSeeder {
            calls: Arc::clone(&calls),
        });

    let report = tokio::time::timeout(Duration::from_secs(5), bootstrap.run(signals))
        .await
        .expect("bootstrap should finish")
        .expect("bootstrap should succeed");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.signal, ShutdownSignal::Terminate);
    assert!(report.is_clean(), "{:?}", report.cleanup_failures);
    assert_eq!(flushed.load(Ordering::SeqCst), 1);
    assert!(cleaner.is_empty(), "tracer and cache should both have run");
}

#[tokio::test]
async fn bootstrap_registers_tracer_cleanup() {
    let cleaner = Arc::new(ResourceCleaner::new());
    let (trigger, signals) = manual();

    let bootstrap = Bootstrap::new(common::loopback_config(), default_routes())
        .with_cleaner(Arc::clone(&cleaner))
        .with_telemetry(Telemetry::disabled());
    let run = tokio::spawn(bootstrap.run(signals));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while cleaner.names().is_empty() {
        assert!(tokio::time::Instant::now() < deadline, "tracer never registered");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(cleaner.names(), ["tracer"]);

    trigger.trigger(ShutdownSignal::Interrupt);
    let report = run.await.unwrap().unwrap();
    assert!(report.is_clean());
}
