// ── Polling ──
//
// Two independent cadences: a slow one for lights (and the groups derived
// from them) and a fast one for sensors. Both share one mutual-exclusion
// lock, so at most one pass is ever in flight and listener registration
// can wait for a quiet moment.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use huesync_api::HubClient;

use crate::aggregate::with_derived_state;
use crate::connection::{ConnectionSupervisor, CycleOutcome};
use crate::error::Fault;
use crate::listener::ListenerRegistry;
use crate::model::FullGroup;
use crate::reconcile::reconcile;
use crate::store::DataStore;

const LIGHT_POLL_INITIAL_DELAY: Duration = Duration::from_secs(1);
const SENSOR_POLL_INITIAL_DELAY: Duration = Duration::from_millis(1);

/// Which cadence a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum PollKind {
    Lights,
    Sensors,
}

impl PollKind {
    pub fn initial_delay(self) -> Duration {
        match self {
            Self::Lights => LIGHT_POLL_INITIAL_DELAY,
            Self::Sensors => SENSOR_POLL_INITIAL_DELAY,
        }
    }
}

/// One fetch-and-reconcile pass.
#[async_trait]
pub trait PollingTask: Send + Sync {
    fn kind(&self) -> PollKind;

    async fn run(&self) -> Result<(), Fault>;
}

// ── Tasks ────────────────────────────────────────────────────────────

/// Slow pass: lights, then groups derived from the refreshed light cache.
pub struct LightPoll {
    client: Arc<dyn HubClient>,
    store: Arc<DataStore>,
    listeners: Arc<ListenerRegistry>,
}

impl LightPoll {
    pub fn new(client: Arc<dyn HubClient>, store: Arc<DataStore>, listeners: Arc<ListenerRegistry>) -> Self {
        Self {
            client,
            store,
            listeners,
        }
    }
}

#[async_trait]
impl PollingTask for LightPoll {
    fn kind(&self) -> PollKind {
        PollKind::Lights
    }

    async fn run(&self) -> Result<(), Fault> {
        let lights = self.client.fetch_lights().await?;
        let light_summary = reconcile(&self.store.lights, lights, |event| self.listeners.notify(&event));

        let groups = self.client.fetch_groups().await?;
        let members = self.store.lights.snapshot();
        let groups: Vec<FullGroup> = groups
            .into_iter()
            .map(|group| with_derived_state(group, &members))
            .collect();
        let group_summary = reconcile(&self.store.groups, groups, |event| self.listeners.notify(&event));

        trace!(lights = ?light_summary, groups = ?group_summary, "light pass complete");
        Ok(())
    }
}

/// Fast pass: sensors only.
pub struct SensorPoll {
    client: Arc<dyn HubClient>,
    store: Arc<DataStore>,
    listeners: Arc<ListenerRegistry>,
}

impl SensorPoll {
    pub fn new(client: Arc<dyn HubClient>, store: Arc<DataStore>, listeners: Arc<ListenerRegistry>) -> Self {
        Self {
            client,
            store,
            listeners,
        }
    }
}

#[async_trait]
impl PollingTask for SensorPoll {
    fn kind(&self) -> PollKind {
        PollKind::Sensors
    }

    async fn run(&self) -> Result<(), Fault> {
        let sensors = self.client.fetch_sensors().await?;
        let summary = reconcile(&self.store.sensors, sensors, |event| self.listeners.notify(&event));
        trace!(sensors = ?summary, "sensor pass complete");
        Ok(())
    }
}

// ── Scheduler ────────────────────────────────────────────────────────

struct Cadence {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Runs polling tasks on fixed-delay cadences under a shared lock.
pub struct PollingScheduler {
    lock: Arc<Mutex<()>>,
    supervisor: Arc<ConnectionSupervisor>,
    shutdown: CancellationToken,
    running: Mutex<HashMap<PollKind, Cadence>>,
}

impl PollingScheduler {
    pub fn new(supervisor: Arc<ConnectionSupervisor>) -> Self {
        Self {
            lock: Arc::new(Mutex::new(())),
            supervisor,
            shutdown: CancellationToken::new(),
            running: Mutex::new(HashMap::new()),
        }
    }

    /// The lock every pass holds. Listener registration takes it too.
    pub fn pass_lock(&self) -> &Mutex<()> {
        &self.lock
    }

    /// A shared handle to the pass lock, for writers outside the cadences.
    pub fn shared_pass_lock(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.lock)
    }

    /// Start the cadence for `task`. A no-op returning `false` if that
    /// cadence is already running.
    pub async fn start(&self, task: Arc<dyn PollingTask>, period: Duration) -> bool {
        let kind = task.kind();
        let mut running = self.running.lock().await;
        if running.get(&kind).is_some_and(|c| !c.handle.is_finished()) {
            debug!(%kind, "polling already running");
            return false;
        }

        let cancel = self.shutdown.child_token();
        let handle = tokio::spawn(poll_loop(
            Arc::clone(&self.lock),
            Arc::clone(&self.supervisor),
            task,
            period,
            cancel.clone(),
        ));
        running.insert(kind, Cadence { cancel, handle });
        info!(%kind, ?period, "polling started");
        true
    }

    /// Stop one cadence. An in-flight pass completes before this returns.
    pub async fn stop(&self, kind: PollKind) -> bool {
        let cadence = self.running.lock().await.remove(&kind);
        let Some(cadence) = cadence else {
            return false;
        };
        cadence.cancel.cancel();
        if let Err(e) = cadence.handle.await {
            debug!(%kind, error = %e, "poll loop ended abnormally");
        }
        info!(%kind, "polling stopped");
        true
    }

    pub async fn stop_all(&self) {
        for kind in [PollKind::Lights, PollKind::Sensors] {
            self.stop(kind).await;
        }
    }

    pub async fn is_running(&self, kind: PollKind) -> bool {
        self.running
            .lock()
            .await
            .get(&kind)
            .is_some_and(|c| !c.handle.is_finished())
    }

    /// Run a single supervised pass outside any cadence.
    pub async fn run_once(&self, task: &dyn PollingTask) -> CycleOutcome {
        run_pass(&self.lock, &self.supervisor, task).await
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn poll_loop(
    lock: Arc<Mutex<()>>,
    supervisor: Arc<ConnectionSupervisor>,
    task: Arc<dyn PollingTask>,
    period: Duration,
    cancel: CancellationToken,
) {
    let kind = task.kind();
    let mut ticks = tokio::time::interval_at(Instant::now() + kind.initial_delay(), period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticks.tick() => {
                let outcome = run_pass(&lock, &supervisor, &*task).await;
                trace!(%kind, ?outcome, "poll pass finished");
            }
        }
    }
}

/// One pass under the lock. A panic inside the task is contained and
/// treated as a lost connection.
async fn run_pass(lock: &Mutex<()>, supervisor: &ConnectionSupervisor, task: &dyn PollingTask) -> CycleOutcome {
    let _pass = lock.lock().await;
    let cycle = AssertUnwindSafe(supervisor.run_cycle(|| task.run()))
        .catch_unwind()
        .await;

    cycle.unwrap_or_else(|_| {
        error!(kind = %task.kind(), "poll pass panicked");
        supervisor.report_panic();
        CycleOutcome::Failed(Fault::Connectivity("poll pass panicked".into()))
    })
}
