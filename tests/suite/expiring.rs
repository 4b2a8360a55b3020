//! Idle-expiring lazy handle tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use clipwise_utils::{Eviction, ExpiringLazy, Retire};

/// A resource that counts its own constructions and retirements.
struct Connection {
    serial: usize,
    retired: Arc<AtomicUsize>,
}

impl Retire for Connection {
    type Error = std::convert::Infallible;

    fn retire(&self) -> Result<(), Self::Error> {
        self.retired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Pool {
    built: Arc<AtomicUsize>,
    retired: Arc<AtomicUsize>,
}

impl Pool {
    fn new() -> Self {
        Self {
            built: Arc::new(AtomicUsize::new(0)),
            retired: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn factory(&self) -> impl Fn() -> Result<Connection, String> + Send + Sync + 'static {
        let built = Arc::clone(&self.built);
        let retired = Arc::clone(&self.retired);
        move || {
            let serial = built.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Connection {
                serial,
                retired: Arc::clone(&retired),
            })
        }
    }

    fn built(&self) -> usize {
        self.built.load(Ordering::SeqCst)
    }

    fn retired(&self) -> usize {
        self.retired.load(Ordering::SeqCst)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_tasks_share_one_instance() {
    let pool = Pool::new();
    let handle = Arc::new(ExpiringLazy::new(pool.factory(), Duration::from_secs(60)));

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let handle = Arc::clone(&handle);
            tokio::task::spawn_blocking(move || handle.value().unwrap())
        })
        .collect();

    let mut values = Vec::new();
    for task in tasks {
        values.push(task.await.unwrap());
    }

    assert_eq!(pool.built(), 1);
    assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
}

#[test]
fn eviction_waits_for_in_flight_build() {
    let started = Arc::new(AtomicUsize::new(0));
    let retired = Arc::new(AtomicUsize::new(0));
    let started_in_factory = Arc::clone(&started);
    let retired_in_factory = Arc::clone(&retired);
    let handle: ExpiringLazy<Connection, String> = ExpiringLazy::builder(move || {
        let serial = started_in_factory.fetch_add(1, Ordering::SeqCst) + 1;
        thread::sleep(Duration::from_millis(300));
        Ok(Connection {
            serial,
            retired: Arc::clone(&retired_in_factory),
        })
    })
    .idle_timeout(Duration::from_millis(100))
    .build();

    // Let the idle window lapse before anything is built.
    thread::sleep(Duration::from_millis(150));

    let (outcome, connection) = thread::scope(|scope| {
        let caller = scope.spawn(|| handle.value().unwrap());
        while started.load(Ordering::SeqCst) == 0 {
            thread::yield_now();
        }
        let outcome = handle.evict_if_idle();
        (outcome, caller.join().unwrap())
    });

    assert!(matches!(outcome, Eviction::Fresh | Eviction::Empty));
    assert_eq!(connection.serial, 1);
    assert_eq!(retired.load(Ordering::SeqCst), 0);
    assert!(handle.is_created());
}

#[tokio::test(start_paused = true)]
async fn expired_instance_is_replaced_by_a_new_one() {
    let pool = Pool::new();
    let handle = ExpiringLazy::new(pool.factory(), Duration::from_secs(10));

    let first = handle.value().unwrap();
    let again = handle.value().unwrap();
    assert!(Arc::ptr_eq(&first, &again));

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(pool.retired(), 1);
    assert!(!handle.is_created());

    let second = handle.value().unwrap();
    assert_eq!(pool.built(), 2);
    assert_eq!(second.serial, 2);
    assert!(!Arc::ptr_eq(&first, &second));
}

#[tokio::test(start_paused = true)]
async fn external_scheduler_can_drive_expiry() {
    let pool = Pool::new();
    let handle = ExpiringLazy::builder(pool.factory())
        .idle_timeout(Duration::from_secs(10))
        .build();
    assert!(!handle.has_reaper());

    let mut outcomes = Vec::new();
    let mut ticker = tokio::time::interval(Duration::from_secs(10));
    ticker.tick().await;

    handle.value().unwrap();
    for _ in 0..3 {
        ticker.tick().await;
        outcomes.push(handle.evict_if_idle());
    }

    assert_eq!(
        outcomes,
        vec![Eviction::Fresh, Eviction::Retired, Eviction::Empty]
    );
    assert_eq!(pool.retired(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_stops_reaper_and_retires_once() {
    let pool = Pool::new();
    let handle = ExpiringLazy::new(pool.factory(), Duration::from_secs(10));
    handle.value().unwrap();

    drop(handle);
    assert_eq!(pool.retired(), 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(pool.retired(), 1);
    assert_eq!(pool.built(), 1);
}
