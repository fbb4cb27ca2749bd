use healthcheck::health::{
    async_check, async_check_with_cancellation, probe, AsyncCheck, BoxError, CheckError,
    HealthStatus,
};
use healthcheck::metrics::MetricsRegistry;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_slow_check_does_not_block_readers() {
    init_tracing();

    let check = async_check(
        || {
            std::thread::sleep(Duration::from_millis(50));
            Ok::<(), BoxError>(())
        },
        Duration::from_millis(1),
    );

    // the first run takes 50ms, so nothing is cached yet
    let err = check.check().unwrap_err();
    assert!(err.is_no_data());
    assert_eq!(err.to_string(), "no data yet");

    tokio::time::sleep(Duration::from_millis(100)).await;

    let start = Instant::now();
    assert!(check.check().is_ok());
    assert!(
        start.elapsed() < Duration::from_millis(1),
        "expected check() to return almost immediately"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancelled_check_stops_running() {
    init_tracing();

    let calls = Arc::new(AtomicU64::new(0));
    let counter = calls.clone();
    let token = CancellationToken::new();

    let check = async_check_with_cancellation(
        token.clone(),
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(1));
            Ok::<(), BoxError>(())
        },
        Duration::from_millis(10),
    );

    token.cancel();

    tokio::time::sleep(Duration::from_millis(100)).await;

    let observed = calls.load(Ordering::SeqCst);
    assert!(observed <= 2, "check ran {} times after cancellation", observed);
    assert!(check.is_finished());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_in_flight_run_completes_after_cancel() {
    init_tracing();

    let calls = Arc::new(AtomicU64::new(0));
    let counter = calls.clone();
    let token = CancellationToken::new();

    let check = async_check_with_cancellation(
        token.clone(),
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            Err::<(), _>(io::Error::new(io::ErrorKind::TimedOut, "slow upstream"))
        },
        Duration::from_millis(1),
    );

    tokio::time::sleep(Duration::from_millis(10)).await;
    token.cancel();
    assert!(check.check().unwrap_err().is_no_data());

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(check.runs(), 1);
    assert!(check.is_finished());

    // the run that was in flight at cancellation is still served
    let err = check.check().unwrap_err();
    assert_eq!(
        err.downcast_ref::<io::Error>().map(|e| e.kind()),
        Some(io::ErrorKind::TimedOut)
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_result_is_stable_between_runs() {
    init_tracing();

    let calls = Arc::new(AtomicU64::new(0));
    let counter = calls.clone();

    let check = async_check(
        move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Err::<(), _>(format!("run {}", n))
        },
        Duration::from_secs(3600),
    );

    tokio::time::sleep(Duration::from_millis(50)).await;

    for _ in 0..1_000 {
        assert_eq!(check.check().unwrap_err().to_string(), "run 1");
    }
    assert_eq!(check.runs(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_later_runs_replace_the_result() {
    init_tracing();

    let calls = Arc::new(AtomicU64::new(0));
    let counter = calls.clone();

    let check = async_check(
        move || {
            if counter.fetch_add(1, Ordering::SeqCst) < 3 {
                Err::<(), BoxError>("down".into())
            } else {
                Ok(())
            }
        },
        Duration::from_millis(20),
    );

    let deadline = Instant::now() + Duration::from_secs(1);
    while !check.has_data() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    // three failing runs span at least 40ms of waiting
    assert_eq!(check.check().unwrap_err().to_string(), "down");
    assert_eq!(check.status(), HealthStatus::Unhealthy);

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(check.check().is_ok());
    assert_eq!(check.status(), HealthStatus::Healthy);
    assert!(check.runs() > 3, "only {} runs completed", check.runs());
    assert!(!check.is_finished());

    let seen = check.runs();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(check.runs() > seen);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_runs_never_overlap() {
    init_tracing();

    let in_flight = Arc::new(AtomicBool::new(false));
    let overlapped = Arc::new(AtomicBool::new(false));
    let calls = Arc::new(AtomicU64::new(0));
    let token = CancellationToken::new();

    let (flag, seen, counter) = (in_flight.clone(), overlapped.clone(), calls.clone());
    let _check = async_check_with_cancellation(
        token.clone(),
        move || {
            if flag.swap(true, Ordering::SeqCst) {
                seen.store(true, Ordering::SeqCst);
            }
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            flag.store(false, Ordering::SeqCst);
            Ok::<(), BoxError>(())
        },
        Duration::ZERO,
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    token.cancel();

    assert!(calls.load(Ordering::SeqCst) > 1);
    assert!(!overlapped.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_readers_see_whole_results() {
    init_tracing();

    let calls = Arc::new(AtomicU64::new(0));
    let counter = calls.clone();
    let token = CancellationToken::new();

    let check = async_check_with_cancellation(
        token.clone(),
        move || {
            if counter.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                Ok(())
            } else {
                Err(io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"))
            }
        },
        Duration::ZERO,
    );

    let readers: Vec<_> = (0..16)
        .map(|_| {
            let check = check.clone();
            tokio::spawn(async move {
                for _ in 0..2_000 {
                    match check.check() {
                        Ok(()) | Err(CheckError::NoDataYet) => {}
                        Err(err) => {
                            assert_eq!(err.to_string(), "connection refused");
                            assert!(err.downcast_ref::<io::Error>().is_some());
                        }
                    }
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for result in futures::future::join_all(readers).await {
        result.unwrap();
    }

    token.cancel();
    assert!(calls.load(Ordering::SeqCst) >= 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_instances_do_not_interfere() {
    init_tracing();

    let healthy = async_check(|| Ok::<(), BoxError>(()), Duration::from_millis(5));
    let failing = async_check(|| Err::<(), _>("cache miss storm"), Duration::from_millis(5));

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(healthy.status(), HealthStatus::Healthy);
    assert_eq!(failing.status(), HealthStatus::Unhealthy);
    assert_eq!(failing.check().unwrap_err().to_string(), "cache miss storm");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_async_probe_with_metrics() {
    init_tracing();

    let registry = MetricsRegistry::new().unwrap();
    let token = CancellationToken::new();

    let check = AsyncCheck::builder(probe::from_async(|| async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok::<(), BoxError>(())
    }))
    .name("queue")
    .interval(Duration::from_millis(10))
    .cancel_on(token.clone())
    .metrics(registry.collector())
    .spawn()
    .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    token.cancel();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(check.is_finished());
    assert_eq!(check.status(), HealthStatus::Healthy);

    let runs = registry
        .collector()
        .runs_total
        .with_label_values(&["queue", "healthy"])
        .get();
    assert_eq!(runs, check.runs());

    let text = registry.gather().unwrap();
    assert!(text.contains("healthcheck_run_duration_seconds"));
}
