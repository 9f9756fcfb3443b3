//! Hub identity.

use huesync_core::BridgeProperties;

use crate::cli::GlobalOpts;
use crate::config::Resolved;
use crate::error::CliError;
use crate::output::{self, opt};

use super::open;

fn detail(p: &BridgeProperties) -> String {
    [
        format!("Serial:    {}", opt(p.serial_number.as_deref())),
        format!("Model:     {}", opt(p.model_id.as_deref())),
        format!("MAC:       {}", opt(p.mac_address.as_deref())),
        format!("Firmware:  {}", opt(p.firmware_version.as_deref())),
    ]
    .join("\n")
}

pub async fn handle(resolved: &Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let session = open(resolved, false)?;
    let properties = session.bridge.bridge_properties().await?;

    let out = output::render_single(global.output, &properties, detail, |p| {
        p.serial_number.clone().unwrap_or_default()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
