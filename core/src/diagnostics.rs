//! CPU diagnostics backed by an idle-expiring `sysinfo` probe.
//!
//! Opening a [`System`] and priming its CPU counters is comparatively
//! expensive, and a probe left open keeps per-CPU refresh state around for no
//! reason. [`Diagnostics`] therefore holds the probe in an
//! [`ExpiringLazy`]: the first sample opens it, bursts of samples reuse it,
//! and after the configured idle window the reaper closes it again.

use std::convert::Infallible;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use sysinfo::{MINIMUM_CPU_UPDATE_INTERVAL, System};
use thiserror::Error;

use clipwise_config::DiagnosticsConfig;
use clipwise_utils::{ExpiringLazy, Retire};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("CPU metrics are not supported on this platform")]
    Unsupported,
}

/// One CPU usage reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuSample {
    /// Average usage across all cores, 0-100.
    pub usage_percent: f32,
    pub cores: usize,
}

impl fmt::Display for CpuSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CPU {:.1}% across {} cores",
            self.usage_percent, self.cores
        )
    }
}

struct ProbeState {
    /// `None` once the probe has been retired.
    system: Option<System>,
    last_refresh: Instant,
    samples: u64,
}

/// An open CPU usage counter.
pub struct CpuProbe {
    state: Mutex<ProbeState>,
}

impl CpuProbe {
    pub fn open() -> Result<Self, ProbeError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(ProbeError::Unsupported);
        }

        let system = primed_system();
        tracing::debug!(cores = system.cpus().len(), "Opened CPU probe");

        Ok(Self {
            state: Mutex::new(ProbeState {
                system: Some(system),
                last_refresh: Instant::now(),
                samples: 0,
            }),
        })
    }

    /// Take a reading, blocking until sysinfo's minimum refresh interval has
    /// passed since the previous one.
    ///
    /// A retired probe is reopened first, so callers holding on to an old
    /// instance still get a valid reading.
    pub fn sample(&self) -> CpuSample {
        let mut state = self.lock_state();

        let mut system = match state.system.take() {
            Some(system) => system,
            None => {
                tracing::debug!("Reopening retired CPU probe");
                state.last_refresh = Instant::now();
                primed_system()
            }
        };

        let since_refresh = state.last_refresh.elapsed();
        if since_refresh < MINIMUM_CPU_UPDATE_INTERVAL {
            thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL - since_refresh);
        }

        system.refresh_cpu_usage();
        state.last_refresh = Instant::now();
        state.samples += 1;

        let sample = CpuSample {
            usage_percent: system.global_cpu_usage(),
            cores: system.cpus().len(),
        };
        state.system = Some(system);
        sample
    }

    /// Whether the probe still holds its sysinfo refresh state.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lock_state().system.is_some()
    }

    fn lock_state(&self) -> MutexGuard<'_, ProbeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A `System` with CPU counters primed. Usage is computed between two
/// refreshes, so the first reading needs this baseline.
fn primed_system() -> System {
    let mut system = System::new();
    system.refresh_cpu_usage();
    system
}

impl Retire for CpuProbe {
    type Error = Infallible;

    fn retire(&self) -> Result<(), Infallible> {
        let mut state = self.lock_state();
        if state.system.take().is_some() {
            tracing::debug!(samples = state.samples, "Closed CPU probe");
        }
        Ok(())
    }
}

/// Diagnostics entry point: samples on demand, keeps the probe only while it
/// is in use.
pub struct Diagnostics {
    cpu: ExpiringLazy<CpuProbe, ProbeError>,
}

impl Diagnostics {
    /// Must be called from within a tokio runtime (the probe's reaper is a task).
    #[must_use]
    pub fn start(config: &DiagnosticsConfig) -> Self {
        Self::with_idle_timeout(config.idle_timeout())
    }

    #[must_use]
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        tracing::info!(?idle_timeout, "Starting diagnostics");
        Self {
            cpu: ExpiringLazy::new(CpuProbe::open, idle_timeout),
        }
    }

    pub fn cpu_sample(&self) -> Result<CpuSample, ProbeError> {
        Ok(self.cpu.value()?.sample())
    }

    /// Whether the CPU probe is currently open.
    #[must_use]
    pub fn is_probe_live(&self) -> bool {
        self.cpu.is_created()
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        self.cpu.idle_timeout()
    }
}
