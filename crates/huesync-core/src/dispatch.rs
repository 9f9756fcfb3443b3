// ── Command dispatch ──
//
// Writes run asynchronously, one task per command. A light that rejects
// a change because it is off gets switched on and the change retried
// exactly once, unless the change is a pure color-temperature tweak,
// which must never power a light on by itself.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use huesync_api::HubClient;

use crate::connection::{ConnectionState, ConnectionSupervisor};
use crate::error::Fault;
use crate::listener::ListenerRegistry;
use crate::model::{ConfigUpdate, EntityKind, EntityRef, FullGroup, FullLight, FullSensor, StateUpdate};
use crate::reconcile::EntityEvent;
use crate::store::DataStore;

/// The change a command carries.
#[derive(Debug, Clone, PartialEq)]
pub enum Delta {
    State(StateUpdate),
    Config(ConfigUpdate),
}

/// One write addressed to one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCommand {
    pub entity: EntityRef,
    pub delta: Delta,
}

impl PendingCommand {
    pub fn state(entity: EntityRef, update: StateUpdate) -> Self {
        Self {
            entity,
            delta: Delta::State(update),
        }
    }

    pub fn config(entity: EntityRef, update: ConfigUpdate) -> Self {
        Self {
            entity,
            delta: Delta::Config(update),
        }
    }

    fn state_update(&self) -> Option<&StateUpdate> {
        match &self.delta {
            Delta::State(update) => Some(update),
            Delta::Config(_) => None,
        }
    }
}

/// How a command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    /// The light was off; it was switched on and the change re-sent.
    AppliedAfterPowerOn,
    /// The light was off and the change did not justify switching it on.
    Suppressed,
    /// Dropped because the hub was not connected.
    NotConnected,
    Failed(Fault),
}

impl CommandOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied | Self::AppliedAfterPowerOn)
    }
}

/// Handle to a submitted command.
#[derive(Debug)]
pub struct CommandHandle {
    entity: EntityRef,
    task: JoinHandle<CommandOutcome>,
}

impl CommandHandle {
    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    /// Wait for the command to finish.
    pub async fn outcome(self) -> CommandOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => CommandOutcome::Failed(Fault::TransientRace(format!("command task ended early: {e}"))),
        }
    }
}

// ── Phases ───────────────────────────────────────────────────────────

enum Phase {
    Pending,
    PendingOn,
    PendingRetry,
    Done(CommandOutcome),
}

// ── Dispatcher ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct CommandDispatcher {
    client: Arc<dyn HubClient>,
    supervisor: Arc<ConnectionSupervisor>,
    store: Arc<DataStore>,
    listeners: Arc<ListenerRegistry>,
    /// The polling lock; held while a gone entity is purged from the cache.
    pass_lock: Arc<Mutex<()>>,
}

impl CommandDispatcher {
    pub fn new(
        client: Arc<dyn HubClient>,
        supervisor: Arc<ConnectionSupervisor>,
        store: Arc<DataStore>,
        listeners: Arc<ListenerRegistry>,
        pass_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            client,
            supervisor,
            store,
            listeners,
            pass_lock,
        }
    }

    /// Run `command` in the background.
    pub fn submit(&self, command: PendingCommand) -> CommandHandle {
        let entity = command.entity.clone();
        let dispatcher = self.clone();
        let task = tokio::spawn(async move { dispatcher.execute(command).await });
        CommandHandle { entity, task }
    }

    /// Run `command` to completion on the current task.
    pub async fn execute(&self, command: PendingCommand) -> CommandOutcome {
        if self.supervisor.state() == ConnectionState::Disconnected {
            debug!(entity = %command.entity, "hub not connected, dropping command");
            return CommandOutcome::NotConnected;
        }

        let mut phase = Phase::Pending;
        loop {
            phase = match phase {
                Phase::Pending => match self.send(&command).await {
                    Ok(()) => Phase::Done(CommandOutcome::Applied),
                    Err(Fault::DeviceOff(reason)) => self.after_device_off(&command, reason).await,
                    Err(fault) => Phase::Done(self.fail(&command.entity, fault).await),
                },
                Phase::PendingOn => {
                    debug!(entity = %command.entity, "light is off, switching it on first");
                    let on = StateUpdate::new().with_on(true);
                    match self.client.set_entity_state(&command.entity, &on).await {
                        Ok(()) => Phase::PendingRetry,
                        Err(e) => Phase::Done(self.fail(&command.entity, Fault::classify(&e)).await),
                    }
                }
                Phase::PendingRetry => match self.send(&command).await {
                    Ok(()) => Phase::Done(CommandOutcome::AppliedAfterPowerOn),
                    Err(fault) => Phase::Done(self.fail(&command.entity, fault).await),
                },
                Phase::Done(outcome) => return outcome,
            };
        }
    }

    // ── Private helpers ──────────────────────────────────────────────

    async fn send(&self, command: &PendingCommand) -> Result<(), Fault> {
        let result = match &command.delta {
            Delta::State(update) => self.client.set_entity_state(&command.entity, update).await,
            Delta::Config(update) => self.client.set_entity_config(&command.entity, update).await,
        };
        result.map_err(Fault::from)
    }

    async fn after_device_off(&self, command: &PendingCommand, reason: String) -> Phase {
        let update = match command.state_update() {
            Some(update) if command.entity.kind == EntityKind::Light => update,
            _ => return Phase::Done(self.fail(&command.entity, Fault::DeviceOff(reason)).await),
        };

        if update.is_color_temperature_only() {
            debug!(entity = %command.entity, "light is off, not switching it on for a color temperature change");
            Phase::Done(CommandOutcome::Suppressed)
        } else if update.is_power_only() {
            Phase::Done(self.fail(&command.entity, Fault::DeviceOff(reason)).await)
        } else {
            Phase::PendingOn
        }
    }

    async fn fail(&self, entity: &EntityRef, fault: Fault) -> CommandOutcome {
        match &fault {
            Fault::Connectivity(reason) => {
                warn!(%entity, %reason, "command failed on I/O");
                self.supervisor.report_communication_error();
            }
            Fault::EntityUnavailable(_) => {
                info!(%entity, "entity no longer exists on the hub");
                self.mark_gone(entity).await;
            }
            Fault::Protocol(reason) => {
                warn!(%entity, %reason, "hub rejected command, likely a bug");
            }
            Fault::Authorization(reason) => {
                warn!(%entity, %reason, "hub rejected credential for command");
            }
            Fault::DeviceOff(reason) => debug!(%entity, %reason, "device is off"),
            Fault::TransientRace(reason) => trace!(%entity, %reason, "ignoring stale client use"),
        }
        CommandOutcome::Failed(fault)
    }

    /// Drop the entity from the cache and tell its listeners it is gone.
    async fn mark_gone(&self, entity: &EntityRef) {
        let _pass = self.pass_lock.lock().await;
        let id = entity.id.clone();
        match entity.kind {
            EntityKind::Light => {
                self.store.lights.remove(&id);
                self.listeners.notify(&EntityEvent::<FullLight>::Gone(id));
            }
            EntityKind::Sensor => {
                self.store.sensors.remove(&id);
                self.listeners.notify(&EntityEvent::<FullSensor>::Gone(id));
            }
            EntityKind::Group => {
                self.store.groups.remove(&id);
                self.listeners.notify(&EntityEvent::<FullGroup>::Gone(id));
            }
        }
    }
}
