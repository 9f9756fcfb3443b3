//! Command dispatch: CLI args -> bridge operations -> output formatting.

pub mod entities;
pub mod info;
pub mod pair;
pub mod run;
pub mod search;

use std::sync::Arc;

use huesync_api::{HttpHubClient, TransportConfig};
use huesync_core::Bridge;

use crate::cli::{Command, GlobalOpts};
use crate::config::{self, Resolved};
use crate::error::CliError;
use crate::host::CliHost;

/// A bridge wired to the real hub, plus the host it reports to.
pub struct Session {
    pub bridge: Bridge,
    pub host: Arc<CliHost>,
}

/// Build a session from the resolved configuration.
///
/// With `forget_credential`, the configured credential is ignored so the
/// first cycle provisions a new one.
pub fn open(resolved: &Resolved, forget_credential: bool) -> Result<Session, CliError> {
    let cfg = &resolved.config;
    let transport = TransportConfig::default().with_timeout(cfg.timeout());
    let client = HttpHubClient::new(cfg.base_url()?, &transport)?;

    let mut bridge_config = cfg.to_bridge_config();
    if forget_credential {
        bridge_config.credential = None;
    }

    let host = Arc::new(CliHost::new(resolved.path.clone()));
    let bridge = Bridge::new(bridge_config, Arc::new(client), host.clone());
    Ok(Session { bridge, host })
}

/// Dispatch a command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;
    match cmd {
        Command::Run => run::handle(&resolved, global).await,
        Command::Lights => entities::lights(&resolved, global).await,
        Command::Sensors => entities::sensors(&resolved, global).await,
        Command::Groups => entities::groups(&resolved, global).await,
        Command::Search(args) => search::handle(&resolved, args, global).await,
        Command::Pair(args) => pair::handle(&resolved, args, global).await,
        Command::Info => info::handle(&resolved, global).await,
    }
}
