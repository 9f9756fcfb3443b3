// ── Bridge facade ──
//
// One hub connection: the cache, the listener registry, the connection
// supervisor, both polling cadences, and the command dispatcher, wired
// together behind a cheaply cloneable handle.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use huesync_api::HubClient;

use crate::aggregate::with_derived_state;
use crate::config::BridgeConfig;
use crate::connection::{BridgeHost, BridgeStatus, ConnectionState, ConnectionSupervisor, CycleOutcome};
use crate::dispatch::{CommandDispatcher, CommandHandle, PendingCommand};
use crate::error::CoreError;
use crate::listener::{DiscoveryListener, EntityListener, ListenerRegistry, Routed, deliver};
use crate::model::{
    BridgeProperties, ConfigUpdate, EntityRef, FullGroup, FullLight, FullSensor, StateUpdate,
};
use crate::poll::{LightPoll, PollKind, PollingScheduler, PollingTask, SensorPoll};
use crate::reconcile::EntityEvent;
use crate::store::{DataStore, Stored};

/// Handle to one hub.
///
/// Cheaply cloneable via `Arc<BridgeInner>`. Nothing runs until
/// [`start()`](Self::start) is called.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    config: BridgeConfig,
    client: Arc<dyn HubClient>,
    store: Arc<DataStore>,
    listeners: Arc<ListenerRegistry>,
    supervisor: Arc<ConnectionSupervisor>,
    scheduler: PollingScheduler,
    dispatcher: CommandDispatcher,
    light_poll: Arc<LightPoll>,
    sensor_poll: Arc<SensorPoll>,
}

impl Bridge {
    pub fn new(config: BridgeConfig, client: Arc<dyn HubClient>, host: Arc<dyn BridgeHost>) -> Self {
        let store = Arc::new(DataStore::new());
        let listeners = Arc::new(ListenerRegistry::new());
        let supervisor = Arc::new(ConnectionSupervisor::new(
            Arc::clone(&client),
            host,
            config.device_label.clone(),
            config.credential.clone(),
        ));
        let scheduler = PollingScheduler::new(Arc::clone(&supervisor));
        let dispatcher = CommandDispatcher::new(
            Arc::clone(&client),
            Arc::clone(&supervisor),
            Arc::clone(&store),
            Arc::clone(&listeners),
            scheduler.shared_pass_lock(),
        );
        let light_poll = Arc::new(LightPoll::new(
            Arc::clone(&client),
            Arc::clone(&store),
            Arc::clone(&listeners),
        ));
        let sensor_poll = Arc::new(SensorPoll::new(
            Arc::clone(&client),
            Arc::clone(&store),
            Arc::clone(&listeners),
        ));

        Self {
            inner: Arc::new(BridgeInner {
                config,
                client,
                store,
                listeners,
                supervisor,
                scheduler,
                dispatcher,
                light_poll,
                sensor_poll,
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Start both polling cadences. Calling it again while running is a no-op.
    pub async fn start(&self) {
        let config = &self.inner.config;
        info!(host = %config.host, "starting hub sync");
        let lights: Arc<dyn PollingTask> = self.inner.light_poll.clone();
        let sensors: Arc<dyn PollingTask> = self.inner.sensor_poll.clone();
        self.inner.scheduler.start(lights, config.polling_interval()).await;
        self.inner
            .scheduler
            .start(sensors, config.sensor_polling_interval())
            .await;
    }

    /// Stop both cadences, waiting for an in-flight pass to finish.
    pub async fn stop(&self) {
        self.inner.scheduler.stop_all().await;
        info!(host = %self.inner.config.host, "hub sync stopped");
    }

    pub async fn is_polling(&self, kind: PollKind) -> bool {
        self.inner.scheduler.is_running(kind).await
    }

    /// Run one supervised pass of `kind` right now.
    pub async fn poll_now(&self, kind: PollKind) -> Result<(), CoreError> {
        let task: &dyn PollingTask = match kind {
            PollKind::Lights => &*self.inner.light_poll,
            PollKind::Sensors => &*self.inner.sensor_poll,
        };
        match self.inner.scheduler.run_once(task).await {
            CycleOutcome::Completed => Ok(()),
            CycleOutcome::NotConnected => Err(CoreError::NotConnected),
            CycleOutcome::Failed(fault) => Err(fault.into()),
        }
    }

    // ── Connection ───────────────────────────────────────────────

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.supervisor.subscribe_state()
    }

    pub fn status(&self) -> watch::Receiver<BridgeStatus> {
        self.inner.supervisor.subscribe_status()
    }

    // ── Listeners ────────────────────────────────────────────────
    //
    // Registration waits for any in-flight pass, so a new listener gets
    // the current cache as ADDED events and then every later event, with
    // nothing lost or doubled in between.

    /// Register a global listener for `E`. Returns `false` if it was
    /// already registered.
    pub async fn register_listener<E: Routed + Stored>(&self, listener: Arc<dyn EntityListener<E>>) -> bool {
        let set = self.inner.listeners.set::<E>();
        let _pass = self.inner.scheduler.pass_lock().lock().await;
        if set.contains(&listener) {
            return false;
        }
        self.catch_up(&*listener);
        set.register(listener)
    }

    pub fn unregister_listener<E: Routed>(&self, listener: &Arc<dyn EntityListener<E>>) -> bool {
        self.inner.listeners.set::<E>().unregister(listener)
    }

    /// Register a listener for one entity id, replacing any previous one.
    pub async fn register_listener_for<E: Routed + Stored>(
        &self,
        id: &str,
        listener: Arc<dyn EntityListener<E>>,
    ) -> bool {
        let _pass = self.inner.scheduler.pass_lock().lock().await;
        if self.inner.supervisor.has_connected() {
            if let Some(entity) = E::cache(&self.inner.store).get(id) {
                deliver(&*listener, &EntityEvent::Added(entity));
            }
        }
        self.inner.listeners.set::<E>().register_for(id, listener)
    }

    pub fn unregister_listener_for<E: Routed>(&self, id: &str) -> bool {
        self.inner.listeners.set::<E>().unregister_for(id)
    }

    pub async fn register_light_listener(&self, listener: Arc<dyn EntityListener<FullLight>>) -> bool {
        self.register_listener(listener).await
    }

    pub fn unregister_light_listener(&self, listener: &Arc<dyn EntityListener<FullLight>>) -> bool {
        self.unregister_listener(listener)
    }

    pub async fn register_sensor_listener(&self, listener: Arc<dyn EntityListener<FullSensor>>) -> bool {
        self.register_listener(listener).await
    }

    pub fn unregister_sensor_listener(&self, listener: &Arc<dyn EntityListener<FullSensor>>) -> bool {
        self.unregister_listener(listener)
    }

    pub async fn register_group_listener(&self, listener: Arc<dyn EntityListener<FullGroup>>) -> bool {
        self.register_listener(listener).await
    }

    pub fn unregister_group_listener(&self, listener: &Arc<dyn EntityListener<FullGroup>>) -> bool {
        self.unregister_listener(listener)
    }

    /// Occupy the discovery slot. Returns `false` if it is taken.
    pub async fn register_discovery_listener(&self, listener: Arc<dyn DiscoveryListener>) -> bool {
        let registry = &self.inner.listeners;
        let _pass = self.inner.scheduler.pass_lock().lock().await;
        if registry.discovery().is_some() {
            return false;
        }
        if self.inner.supervisor.has_connected() {
            self.catch_up_discovery::<FullLight>(&*listener);
            self.catch_up_discovery::<FullSensor>(&*listener);
            self.catch_up_discovery::<FullGroup>(&*listener);
        }
        registry.register_discovery(listener)
    }

    pub fn unregister_discovery_listener(&self) -> bool {
        self.inner.listeners.unregister_discovery()
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn light_by_id(&self, id: &str) -> Option<Arc<FullLight>> {
        self.inner.store.light(id)
    }

    pub fn sensor_by_id(&self, id: &str) -> Option<Arc<FullSensor>> {
        self.inner.store.sensor(id)
    }

    pub fn group_by_id(&self, id: &str) -> Option<Arc<FullGroup>> {
        self.inner.store.group(id)
    }

    /// Fetch every light straight from the hub, bypassing the cache.
    /// Empty on any failure.
    pub async fn full_lights(&self) -> Vec<FullLight> {
        let client = &self.inner.client;
        self.inner
            .supervisor
            .with_reauthentication("fetch lights", || client.fetch_lights())
            .await
            .unwrap_or_default()
    }

    pub async fn full_sensors(&self) -> Vec<FullSensor> {
        let client = &self.inner.client;
        self.inner
            .supervisor
            .with_reauthentication("fetch sensors", || client.fetch_sensors())
            .await
            .unwrap_or_default()
    }

    /// Fetch every group, with state derived from the cached lights.
    pub async fn full_groups(&self) -> Vec<FullGroup> {
        let client = &self.inner.client;
        let groups = self
            .inner
            .supervisor
            .with_reauthentication("fetch groups", || client.fetch_groups())
            .await
            .unwrap_or_default();
        let lights = self.inner.store.lights_snapshot();
        groups
            .into_iter()
            .map(|group| with_derived_state(group, &lights))
            .collect()
    }

    pub async fn bridge_properties(&self) -> Result<BridgeProperties, CoreError> {
        let config = self.inner.client.fetch_global_config().await?;
        Ok(BridgeProperties::from_global_config(&config))
    }

    // ── Search ───────────────────────────────────────────────────

    /// Ask the hub to look for new lights.
    pub async fn start_search(&self) -> bool {
        self.start_search_for(&[]).await
    }

    /// Ask the hub to look for the lights with the given serial numbers.
    pub async fn start_search_for(&self, serials: &[String]) -> bool {
        let client = &self.inner.client;
        let started = self
            .inner
            .supervisor
            .with_reauthentication("start search", || client.start_search(serials))
            .await
            .is_some();
        if started {
            info!(serials = serials.len(), "hub search started");
        }
        started
    }

    // ── Commands ─────────────────────────────────────────────────

    pub fn submit_light_state(&self, id: &str, update: StateUpdate) -> CommandHandle {
        self.submit(PendingCommand::state(EntityRef::light(id), update))
    }

    pub fn submit_sensor_state(&self, id: &str, update: StateUpdate) -> CommandHandle {
        self.submit(PendingCommand::state(EntityRef::sensor(id), update))
    }

    pub fn submit_sensor_config(&self, id: &str, update: ConfigUpdate) -> CommandHandle {
        self.submit(PendingCommand::config(EntityRef::sensor(id), update))
    }

    pub fn submit_group_state(&self, id: &str, update: StateUpdate) -> CommandHandle {
        self.submit(PendingCommand::state(EntityRef::group(id), update))
    }

    pub fn submit(&self, command: PendingCommand) -> CommandHandle {
        debug!(entity = %command.entity, "submitting command");
        self.inner.dispatcher.submit(command)
    }

    // ── Private helpers ──────────────────────────────────────────

    fn catch_up<E: Stored>(&self, listener: &dyn EntityListener<E>) {
        if !self.inner.supervisor.has_connected() {
            return;
        }
        for entity in E::cache(&self.inner.store).values() {
            deliver(listener, &EntityEvent::Added(entity));
        }
    }

    fn catch_up_discovery<E: Routed + Stored>(&self, listener: &dyn DiscoveryListener) {
        for entity in E::cache(&self.inner.store).values() {
            E::deliver_to_discovery(listener, &EntityEvent::Added(entity));
        }
    }
}
