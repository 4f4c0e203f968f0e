//! The periodic scheduler capability that drives every tick.
//!
//! A `Scheduler` runs a callback on a fixed period until the returned
//! `ScheduleHandle` is cancelled. Each callback's future runs to completion
//! before the next one starts, so tick handlers are never re-entered.

use crate::common::{lock, RegistrationId};
use slotmap::SlotMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// The future produced by one tick callback.
pub type TickFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A callback invoked once per tick.
pub type TickCallback = Box<dyn FnMut() -> TickFuture + Send>;

/// Installs periodic tick callbacks.
pub trait Scheduler: Send + Sync {
    /// Starts invoking `callback` every `period`, first after one full period.
    fn schedule(&self, period: Duration, callback: TickCallback) -> ScheduleHandle;

    /// Number of registrations that have not been cancelled.
    fn active_registrations(&self) -> usize;
}

/// Owns one periodic registration. Cancelling is idempotent, and dropping the
/// handle cancels it.
pub struct ScheduleHandle {
    id: RegistrationId,
    canceller: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ScheduleHandle {
    pub fn new(id: RegistrationId, canceller: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id,
            canceller: Some(Box::new(canceller)),
        }
    }

    pub fn id(&self) -> RegistrationId {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.canceller.is_none()
    }

    /// Deregisters the callback. Returns `true` only for the call that actually
    /// performed the deregistration.
    pub fn cancel(&mut self) -> bool {
        match self.canceller.take() {
            Some(canceller) => {
                canceller();
                debug!("Registration {:?} cancelled.", self.id);
                true
            }
            None => false,
        }
    }
}

impl Drop for ScheduleHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for ScheduleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleHandle")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Runs each registration as its own Tokio task paced by `tokio::time::interval`.
///
/// `schedule` must be called from within a Tokio runtime.
#[derive(Clone, Default)]
pub struct TokioScheduler {
    registry: Arc<Mutex<SlotMap<RegistrationId, AbortHandle>>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, period: Duration, mut callback: TickCallback) -> ScheduleHandle {
        let mut ticker = interval_at(Instant::now() + period, period);
        // A late tick is delivered late rather than in a burst.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let task = tokio::spawn(async move {
            loop {
                ticker.tick().await;
                trace!("Scheduler tick.");
                callback().await;
            }
        });

        let id = lock(&self.registry).insert(task.abort_handle());
        debug!("Registration {:?} installed with period {:?}.", id, period);

        let registry = Arc::clone(&self.registry);
        ScheduleHandle::new(id, move || {
            if let Some(abort) = lock(&registry).remove(id) {
                abort.abort();
            }
        })
    }

    fn active_registrations(&self) -> usize {
        lock(&self.registry).len()
    }
}

struct ManualRegistration {
    period: Duration,
    callback: TickCallback,
}

/// A scheduler that ticks only when `fire` is called. Used by tests and by
/// anything that wants to step the engine deterministically.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    registry: Arc<Mutex<SlotMap<RegistrationId, ManualRegistration>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invokes every active callback once, awaiting each in turn.
    /// Returns how many callbacks ran.
    pub async fn fire(&self) -> usize {
        let pending: Vec<TickFuture> = {
            let mut registry = lock(&self.registry);
            registry
                .values_mut()
                .map(|registration| (registration.callback)())
                .collect()
        };
        let count = pending.len();
        for tick in pending {
            tick.await;
        }
        count
    }

    /// Fires `ticks` times in a row.
    pub async fn fire_n(&self, ticks: usize) {
        for _ in 0..ticks {
            self.fire().await;
        }
    }

    /// The period requested by each active registration.
    pub fn periods(&self) -> Vec<Duration> {
        lock(&self.registry)
            .values()
            .map(|registration| registration.period)
            .collect()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, period: Duration, callback: TickCallback) -> ScheduleHandle {
        let id = lock(&self.registry).insert(ManualRegistration { period, callback });
        let registry = Arc::clone(&self.registry);
        ScheduleHandle::new(id, move || {
            lock(&registry).remove(id);
        })
    }

    fn active_registrations(&self) -> usize {
        lock(&self.registry).len()
    }
}
