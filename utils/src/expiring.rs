//! Lazily built resources that retire themselves when idle.
//!
//! [`ExpiringLazy`] defers construction of an expensive resource until the
//! first [`ExpiringLazy::value`] call, then keeps handing out the same
//! instance. A reaper task wakes every `idle_timeout`; if nobody has asked for
//! the resource within that window it is retired and the slot emptied. The
//! next `value()` call builds a fresh instance.
//!
//! ```text
//!   empty --value()--> live --idle > timeout--> retire() --> empty
//!                       ^ |
//!                       +-+ value() refreshes last access
//! ```
//!
//! Construction, retirement and the last-access timestamp all live behind a
//! single mutex, so a caller can never observe a half-built or half-retired
//! instance, and the reaper can never retire an instance that a concurrent
//! `value()` call just built or touched.
//!
//! The reaper is optional. [`ExpiringLazyBuilder::spawn`] starts it on the
//! current tokio runtime; [`ExpiringLazyBuilder::build`] leaves the handle
//! passive so an outside scheduler can call [`ExpiringLazy::evict_if_idle`]
//! on its own ticks.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Idle window used when the builder is not given one.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Shortest reaper period. Tokio intervals reject a zero period.
pub const MIN_REAPER_PERIOD: Duration = Duration::from_millis(1);

/// Longest reaper period. Longer idle timeouts are still honoured; the reaper
/// just checks them at least this often.
pub const MAX_REAPER_PERIOD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Teardown contract for resources held by an [`ExpiringLazy`].
///
/// `retire` is called exactly once per constructed instance: either when the
/// reaper finds it idle or when the handle itself is dropped. Callers may
/// still hold `Arc` clones of a retired instance, so implementations must
/// leave it safe to use (if no longer useful) afterwards.
pub trait Retire {
    type Error: fmt::Display;

    fn retire(&self) -> Result<(), Self::Error>;
}

/// Outcome of a single expiry check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eviction {
    /// Nothing was built; the check was a no-op.
    Empty,
    /// The instance was used within the idle window and stays.
    Fresh,
    /// The instance was retired and the slot emptied.
    Retired,
    /// The slot was emptied but `retire()` reported an error.
    RetireFailed,
}

type Factory<T, E> = Box<dyn Fn() -> Result<T, E> + Send + Sync>;
type RetireErrorHook<Err> = Box<dyn Fn(&Err) + Send + Sync>;

struct Slot<T> {
    current: Option<Arc<T>>,
    last_access: Instant,
}

struct Shared<T: Retire, E> {
    factory: Factory<T, E>,
    idle_timeout: Duration,
    slot: Mutex<Slot<T>>,
    on_retire_error: Option<RetireErrorHook<T::Error>>,
}

impl<T: Retire, E> Shared<T, E> {
    fn lock_slot(&self) -> MutexGuard<'_, Slot<T>> {
        // Every critical section replaces `current` in one assignment, so a
        // poisoned guard still holds a consistent slot.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn evict_if_idle(&self) -> Eviction {
        let mut slot = self.lock_slot();
        let idle_for = slot.last_access.elapsed();
        if slot.current.is_some() && idle_for <= self.idle_timeout {
            return Eviction::Fresh;
        }

        let Some(value) = slot.current.take() else {
            return Eviction::Empty;
        };
        tracing::debug!(?idle_for, "Retiring idle resource");
        // Retire while still holding the lock: `value()` must not build a
        // replacement until teardown has finished.
        let outcome = self.retire(&value);
        drop(slot);
        outcome
    }

    fn retire(&self, value: &T) -> Eviction {
        match value.retire() {
            Ok(()) => Eviction::Retired,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to retire idle resource");
                if let Some(hook) = &self.on_retire_error {
                    hook(&err);
                }
                Eviction::RetireFailed
            }
        }
    }
}

impl<T: Retire, E> Drop for Shared<T, E> {
    fn drop(&mut self) {
        let current = self
            .slot
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .take();
        if let Some(value) = current {
            tracing::debug!("Retiring resource on handle drop");
            self.retire(&value);
        }
    }
}

/// A lazily constructed resource that is retired after `idle_timeout` of
/// disuse and rebuilt on demand.
///
/// Share it between threads or tasks behind an `Arc`. Dropping the handle
/// stops its reaper and retires any live instance.
pub struct ExpiringLazy<T: Retire, E> {
    shared: Arc<Shared<T, E>>,
    reaper: Option<JoinHandle<()>>,
}

impl<T: Retire, E> ExpiringLazy<T, E> {
    /// Start configuring a handle around `factory`.
    pub fn builder(
        factory: impl Fn() -> Result<T, E> + Send + Sync + 'static,
    ) -> ExpiringLazyBuilder<T, E> {
        ExpiringLazyBuilder {
            factory: Box::new(factory),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            on_retire_error: None,
        }
    }

    /// Build a handle with a running reaper.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        factory: impl Fn() -> Result<T, E> + Send + Sync + 'static,
        idle_timeout: Duration,
    ) -> Self
    where
        T: Send + Sync + 'static,
        E: 'static,
    {
        Self::builder(factory).idle_timeout(idle_timeout).spawn()
    }

    /// Return the live instance, building it first if the slot is empty.
    ///
    /// At most one factory call runs at a time; concurrent callers wait for
    /// it and receive the same instance. A factory error is returned as-is
    /// and leaves the slot empty, so the next call tries again.
    pub fn value(&self) -> Result<Arc<T>, E> {
        let mut slot = self.shared.lock_slot();
        let value = match slot.current.clone() {
            Some(value) => value,
            None => {
                let value = Arc::new((self.shared.factory)()?);
                tracing::debug!(idle_timeout = ?self.shared.idle_timeout, "Built lazy resource");
                slot.current = Some(Arc::clone(&value));
                value
            }
        };
        slot.last_access = Instant::now();
        Ok(value)
    }

    /// Whether an instance is currently live.
    #[must_use]
    pub fn is_created(&self) -> bool {
        self.shared.lock_slot().current.is_some()
    }

    /// Run one expiry check now.
    ///
    /// This is what the reaper calls on every tick. Handles built without a
    /// reaper rely on the owner calling it. Calling it on an empty handle is
    /// a no-op.
    pub fn evict_if_idle(&self) -> Eviction {
        self.shared.evict_if_idle()
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        self.shared.idle_timeout
    }

    /// Whether this handle owns a reaper task.
    #[must_use]
    pub fn has_reaper(&self) -> bool {
        self.reaper.is_some()
    }
}

impl<T: Retire, E> Drop for ExpiringLazy<T, E> {
    fn drop(&mut self) {
        if let Some(reaper) = self.reaper.take() {
            reaper.abort();
        }
    }
}

impl<T: Retire, E> fmt::Debug for ExpiringLazy<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringLazy")
            .field("idle_timeout", &self.shared.idle_timeout)
            .field("created", &self.is_created())
            .field("reaper", &self.reaper.is_some())
            .finish_non_exhaustive()
    }
}

/// Configuration for an [`ExpiringLazy`].
pub struct ExpiringLazyBuilder<T: Retire, E> {
    factory: Factory<T, E>,
    idle_timeout: Duration,
    on_retire_error: Option<RetireErrorHook<T::Error>>,
}

impl<T: Retire, E> ExpiringLazyBuilder<T, E> {
    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Receive every error returned by [`Retire::retire`].
    ///
    /// Errors are always logged; the hook is for callers that need to count
    /// or forward them.
    pub fn on_retire_error(mut self, hook: impl Fn(&T::Error) + Send + Sync + 'static) -> Self {
        self.on_retire_error = Some(Box::new(hook));
        self
    }

    /// Build a passive handle with no reaper.
    pub fn build(self) -> ExpiringLazy<T, E> {
        ExpiringLazy {
            shared: Arc::new(self.into_shared()),
            reaper: None,
        }
    }

    /// Build the handle and start its reaper on the current tokio runtime.
    ///
    /// The reaper ticks every `idle_timeout`, clamped to
    /// [`MIN_REAPER_PERIOD`]..=[`MAX_REAPER_PERIOD`], the first tick one full
    /// period from now.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn spawn(self) -> ExpiringLazy<T, E>
    where
        T: Send + Sync + 'static,
        E: 'static,
    {
        let period = self.idle_timeout.clamp(MIN_REAPER_PERIOD, MAX_REAPER_PERIOD);
        let shared = Arc::new(self.into_shared());
        let reaper = tokio::spawn(reap(Arc::downgrade(&shared), period));
        ExpiringLazy {
            shared,
            reaper: Some(reaper),
        }
    }

    fn into_shared(self) -> Shared<T, E> {
        Shared {
            factory: self.factory,
            idle_timeout: self.idle_timeout,
            slot: Mutex::new(Slot {
                current: None,
                last_access: Instant::now(),
            }),
            on_retire_error: self.on_retire_error,
        }
    }
}

async fn reap<T: Retire, E>(shared: Weak<Shared<T, E>>, period: Duration) {
    let now = Instant::now();
    let start = now.checked_add(period).unwrap_or_else(|| {
        tracing::warn!(?period, "Reaper deadline overflows the clock; checking immediately");
        now
    });
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(state) = shared.upgrade() else {
            break;
        };
        match state.evict_if_idle() {
            Eviction::Retired => tracing::debug!("Reaper retired idle resource"),
            Eviction::RetireFailed => {
                tracing::debug!("Reaper emptied slot after a failed retire");
            }
            Eviction::Empty | Eviction::Fresh => {}
        }
    }
}
