//! Long-running sync: poll both cadences and print entity events until
//! interrupted.

use std::io::{self, Write};
use std::sync::Arc;

use huesync_core::model::Entity;
use huesync_core::{EntityListener, FullGroup, FullLight, FullSensor, ListenerError};

use crate::cli::GlobalOpts;
use crate::config::Resolved;
use crate::error::CliError;

use super::open;

/// Writes one line per entity event to stdout.
struct EventPrinter;

impl EventPrinter {
    fn line<E: Entity>(event: &str, entity: &E) -> Result<(), ListenerError> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{:<8} {:<7} {:>4}  {}", event, E::KIND, entity.id(), entity.name())?;
        Ok(())
    }

    fn gone<E: Entity>(id: &str) -> Result<(), ListenerError> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{:<8} {:<7} {:>4}", "gone", E::KIND, id)?;
        Ok(())
    }
}

macro_rules! printer_for {
    ($($ty:ty),+) => {$(
        impl EntityListener<$ty> for EventPrinter {
            fn on_added(&self, entity: &$ty) -> Result<(), ListenerError> {
                Self::line("added", entity)
            }

            fn on_changed(&self, entity: &$ty) -> Result<(), ListenerError> {
                Self::line("changed", entity)
            }

            fn on_removed(&self, entity: &$ty) -> Result<(), ListenerError> {
                Self::line("removed", entity)
            }

            fn on_gone(&self, id: &str) -> Result<(), ListenerError> {
                Self::gone::<$ty>(id)
            }
        }
    )+};
}

printer_for!(FullLight, FullSensor, FullGroup);

pub async fn handle(resolved: &Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let session = open(resolved, false)?;
    let bridge = &session.bridge;

    if !global.quiet {
        bridge.register_discovery_listener(Arc::new(EventPrinter)).await;
    }

    tracing::info!(
        host = %resolved.config.host,
        lights_every = ?bridge.config().polling_interval(),
        sensors_every = ?bridge.config().sensor_polling_interval(),
        "starting sync"
    );
    bridge.start().await;

    let signal = tokio::signal::ctrl_c().await;
    bridge.stop().await;
    bridge.unregister_discovery_listener();

    signal?;
    tracing::info!("sync stopped");
    Ok(())
}
