// ── Connection supervision ──
//
// Owns hub reachability and authentication. Every poll cycle runs
// through `run_cycle`, which resumes the connection if needed (probe,
// provision, authenticate), runs the task, and turns failures into
// state and status transitions. Lost/resumed callbacks fire once per
// transition, never repeatedly while the state holds.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwapOption;
use secrecy::SecretString;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use huesync_api::HubClient;

use crate::error::Fault;
use crate::model::BridgeProperties;

// ── ConnectionState ──────────────────────────────────────────────

/// Hub connectivity as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ConnectionState {
    Disconnected,
    ConnectedUnauthenticated,
    ConnectedAuthenticated,
}

// ── BridgeStatus ─────────────────────────────────────────────────

/// Why the bridge is offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum OfflineReason {
    #[strum(serialize = "connection lost")]
    ConnectionLost,
    #[strum(serialize = "no credential configured")]
    NoCredential,
    #[strum(serialize = "credential rejected by hub")]
    InvalidCredential,
    #[strum(serialize = "press the pairing button on the hub")]
    PairingButtonNotPressed,
    #[strum(serialize = "credential provisioning failed")]
    ProvisioningFailed,
    #[strum(serialize = "communication error")]
    CommunicationError,
    #[strum(serialize = "configuration error")]
    ConfigurationError,
}

/// Coarse status surfaced to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeStatus {
    /// No cycle has completed yet.
    Unknown,
    Online,
    Offline(OfflineReason),
}

impl fmt::Display for BridgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::Online => f.write_str("online"),
            Self::Offline(reason) => write!(f, "offline ({reason})"),
        }
    }
}

// ── Host callbacks ───────────────────────────────────────────────

/// Error a host may return from [`BridgeHost::persist_credential`].
pub type HostError = Box<dyn std::error::Error + Send + Sync>;

/// The environment embedding the bridge: receives status transitions
/// and stores what the engine learns about the hub.
pub trait BridgeHost: Send + Sync {
    fn on_status_changed(&self, _status: &BridgeStatus) {}

    fn on_connection_lost(&self) {}

    fn on_connection_resumed(&self) {}

    /// Store a credential obtained by provisioning so it survives restarts.
    fn persist_credential(&self, credential: &SecretString) -> Result<(), HostError>;

    fn update_properties(&self, _properties: &BridgeProperties) {}
}

// ── Cycle outcome ────────────────────────────────────────────────

/// Result of one supervised cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The task ran to completion.
    Completed,
    /// The connection could not be (re)established; the task did not run.
    NotConnected,
    /// The task ran and failed.
    Failed(Fault),
}

// ── ConnectionSupervisor ─────────────────────────────────────────

pub struct ConnectionSupervisor {
    client: Arc<dyn HubClient>,
    host: Arc<dyn BridgeHost>,
    device_label: String,
    credential: ArcSwapOption<SecretString>,
    state: watch::Sender<ConnectionState>,
    status: watch::Sender<BridgeStatus>,
    /// Whether the hub was reachable and authenticated at the last transition.
    link_up: AtomicBool,
    ever_connected: AtomicBool,
}

impl ConnectionSupervisor {
    pub fn new(
        client: Arc<dyn HubClient>,
        host: Arc<dyn BridgeHost>,
        device_label: impl Into<String>,
        credential: Option<SecretString>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (status, _) = watch::channel(BridgeStatus::Unknown);
        Self {
            client,
            host,
            device_label: device_label.into(),
            credential: ArcSwapOption::from(credential.map(Arc::new)),
            state,
            status,
            link_up: AtomicBool::new(false),
            ever_connected: AtomicBool::new(false),
        }
    }

    // ── Observation ──────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn status(&self) -> BridgeStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<BridgeStatus> {
        self.status.subscribe()
    }

    /// Whether an authenticated connection has been established at least once.
    pub fn has_connected(&self) -> bool {
        self.ever_connected.load(Ordering::Acquire)
    }

    pub fn has_credential(&self) -> bool {
        self.credential.load().is_some()
    }

    // ── Supervised execution ─────────────────────────────────────

    /// Run `task` if the hub is reachable and authenticated, recovering
    /// the connection first when it is not.
    ///
    /// An authorization fault from the task triggers one re-authentication
    /// and one retry. Every other fault is handled here and reported back
    /// in the outcome; nothing propagates as an error.
    pub async fn run_cycle<F, Fut>(&self, task: F) -> CycleOutcome
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<(), Fault>>,
    {
        if self.state() != ConnectionState::ConnectedAuthenticated && !self.try_resume().await {
            return CycleOutcome::NotConnected;
        }

        let fault = match task().await {
            Ok(()) => return CycleOutcome::Completed,
            Err(Fault::Authorization(reason)) => {
                debug!(%reason, "credential rejected during cycle, re-authenticating");
                self.set_state(ConnectionState::ConnectedUnauthenticated);
                if !self.reauthenticate().await {
                    return CycleOutcome::Failed(Fault::Authorization(reason));
                }
                match task().await {
                    Ok(()) => return CycleOutcome::Completed,
                    Err(fault) => fault,
                }
            }
            Err(fault) => fault,
        };

        self.handle_fault(&fault);
        CycleOutcome::Failed(fault)
    }

    /// Run `op`; on an authorization failure re-authenticate once and
    /// retry once. Any failure yields `None`.
    pub async fn with_reauthentication<T, F, Fut>(&self, description: &str, op: F) -> Option<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, huesync_api::Error>>,
    {
        let err = match op().await {
            Ok(value) => return Some(value),
            Err(err) => err,
        };

        if !Fault::classify(&err).is_authorization() {
            debug!(operation = description, error = %err, "hub operation failed");
            return None;
        }

        debug!(operation = description, "credential rejected, re-authenticating once");
        if !self.reauthenticate().await {
            return None;
        }

        match op().await {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(operation = description, error = %err, "hub operation failed after re-authentication");
                None
            }
        }
    }

    /// Authenticate with the stored credential.
    pub async fn reauthenticate(&self) -> bool {
        if let Some(credential) = self.credential.load_full() {
            self.authenticate_with(&credential).await
        } else {
            self.set_status(BridgeStatus::Offline(OfflineReason::NoCredential));
            false
        }
    }

    // ── Failure reports from outside the cycle ───────────────────

    /// A command hit an I/O failure.
    pub fn report_communication_error(&self) {
        self.connection_lost(OfflineReason::CommunicationError);
    }

    /// A poll pass panicked; treated like a lost connection.
    pub fn report_panic(&self) {
        self.connection_lost(OfflineReason::ConnectionLost);
    }

    // ── Resume path ──────────────────────────────────────────────

    async fn try_resume(&self) -> bool {
        if !self.probe().await {
            self.connection_lost(OfflineReason::ConnectionLost);
            return false;
        }

        let credential = match self.credential.load_full() {
            Some(credential) => credential,
            None => match self.provision().await {
                Some(credential) => credential,
                None => return false,
            },
        };

        self.authenticate_with(&credential).await
    }

    /// Lightweight reachability check. An authorization error still means
    /// the hub answered.
    async fn probe(&self) -> bool {
        match self.client.fetch_global_config().await {
            Ok(_) => true,
            Err(err) => match Fault::classify(&err) {
                Fault::Connectivity(reason) => {
                    debug!(%reason, "hub unreachable");
                    false
                }
                Fault::Authorization(_) => true,
                other => {
                    debug!(error = %other, "hub answered probe with an error");
                    true
                }
            },
        }
    }

    async fn provision(&self) -> Option<Arc<SecretString>> {
        info!(label = %self.device_label, "no credential configured, requesting one from the hub");

        match self.client.provision_credential(&self.device_label).await {
            Ok(credential) => {
                info!("hub issued a new credential");
                if let Err(e) = self.host.persist_credential(&credential) {
                    warn!(error = %e, "could not persist the new credential, configure it manually");
                }
                let credential = Arc::new(credential);
                self.credential.store(Some(Arc::clone(&credential)));
                Some(credential)
            }
            Err(huesync_api::Error::LinkButtonNotPressed) => {
                info!("pairing button not pressed, waiting for it");
                self.set_status(BridgeStatus::Offline(OfflineReason::PairingButtonNotPressed));
                None
            }
            Err(err) if err.is_transient() => {
                self.connection_lost(OfflineReason::ConnectionLost);
                None
            }
            Err(err) => {
                warn!(error = %err, "credential provisioning failed");
                self.set_status(BridgeStatus::Offline(OfflineReason::ProvisioningFailed));
                None
            }
        }
    }

    async fn authenticate_with(&self, credential: &SecretString) -> bool {
        match self.client.authenticate(credential).await {
            Ok(()) => {
                self.mark_connected().await;
                true
            }
            Err(err) => match Fault::classify(&err) {
                Fault::Authorization(reason) => {
                    warn!(%reason, "hub rejected the configured credential");
                    self.set_state(ConnectionState::ConnectedUnauthenticated);
                    self.set_status(BridgeStatus::Offline(OfflineReason::InvalidCredential));
                    false
                }
                Fault::Connectivity(_) => {
                    self.connection_lost(OfflineReason::ConnectionLost);
                    false
                }
                other => {
                    warn!(error = %other, "authentication failed unexpectedly");
                    self.set_status(BridgeStatus::Offline(OfflineReason::ConfigurationError));
                    false
                }
            },
        }
    }

    async fn mark_connected(&self) {
        self.set_state(ConnectionState::ConnectedAuthenticated);
        self.ever_connected.store(true, Ordering::Release);
        self.set_status(BridgeStatus::Online);

        if !self.link_up.swap(true, Ordering::AcqRel) {
            info!("connection to hub established");
            self.host.on_connection_resumed();
            self.refresh_properties().await;
        }
    }

    async fn refresh_properties(&self) {
        match self.client.fetch_global_config().await {
            Ok(config) => {
                let properties = BridgeProperties::from_global_config(&config);
                debug!(?properties, "hub properties refreshed");
                self.host.update_properties(&properties);
            }
            Err(err) => debug!(error = %err, "could not read hub properties"),
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    fn handle_fault(&self, fault: &Fault) {
        match fault {
            Fault::Connectivity(reason) => {
                debug!(%reason, "cycle failed on I/O");
                self.connection_lost(OfflineReason::ConnectionLost);
            }
            Fault::Authorization(reason) => {
                warn!(%reason, "credential rejected again after re-authentication");
                self.set_state(ConnectionState::ConnectedUnauthenticated);
                self.set_status(BridgeStatus::Offline(OfflineReason::InvalidCredential));
            }
            Fault::Protocol(reason) => {
                warn!(%reason, "unexpected hub response, likely a bug; abandoning this cycle");
            }
            Fault::TransientRace(reason) => trace!(%reason, "ignoring stale client use"),
            Fault::DeviceOff(reason) | Fault::EntityUnavailable(reason) => {
                debug!(%reason, "unexpected entity fault during cycle");
            }
        }
    }

    fn connection_lost(&self, reason: OfflineReason) {
        self.set_state(ConnectionState::Disconnected);
        if self.link_up.swap(false, Ordering::AcqRel) {
            warn!("connection to hub lost");
            self.host.on_connection_lost();
        }
        self.set_status(BridgeStatus::Offline(reason));
    }

    fn set_state(&self, next: ConnectionState) {
        let changed = self.state.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
        if changed {
            trace!(state = %next, "connection state changed");
        }
    }

    fn set_status(&self, next: BridgeStatus) {
        let changed = self.status.send_if_modified(|status| {
            if *status == next {
                false
            } else {
                *status = next;
                true
            }
        });
        if changed {
            info!(status = %next, "bridge status changed");
            self.host.on_status_changed(&next);
        }
    }
}
