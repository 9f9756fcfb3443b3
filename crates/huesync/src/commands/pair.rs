//! Credential provisioning.
//!
//! Runs connection cycles with no credential until the hub issues one
//! (after its pairing button is pressed) or the attempts run out. The
//! host writes the new credential into the config file.

use std::time::Duration;

use huesync_core::{BridgeStatus, CoreError, OfflineReason, PollKind};

use crate::cli::{GlobalOpts, PairArgs};
use crate::config::Resolved;
use crate::error::CliError;

use super::open;

pub async fn handle(resolved: &Resolved, args: PairArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let session = open(resolved, true)?;
    let status = session.bridge.status();
    let mut prompted = false;

    for attempt in 1..=args.attempts {
        match session.bridge.poll_now(PollKind::Lights).await {
            Ok(()) => {
                if !global.quiet {
                    let serial = session.host.properties().and_then(|p| p.serial_number);
                    eprintln!(
                        "Paired with hub {}; credential saved to {}",
                        serial.as_deref().unwrap_or("?"),
                        resolved.path.display()
                    );
                }
                return Ok(());
            }
            Err(CoreError::NotConnected) => {
                let current = *status.borrow();
                if current == BridgeStatus::Offline(OfflineReason::PairingButtonNotPressed) && !prompted && !global.quiet {
                    eprintln!("Press the pairing button on the hub...");
                    prompted = true;
                }
                tracing::debug!(attempt, %current, "not paired yet");
            }
            Err(e) => return Err(e.into()),
        }
        tokio::time::sleep(Duration::from_secs(args.interval)).await;
    }

    Err(CliError::PairingTimedOut {
        attempts: args.attempts,
    })
}
