//! One-shot listings of lights, sensors, and groups.

use std::sync::Arc;

use tabled::Tabled;

use huesync_core::{FullGroup, FullLight, FullSensor, Hsb, PollKind};

use crate::cli::GlobalOpts;
use crate::config::Resolved;
use crate::error::CliError;
use crate::output::{self, opt};

use super::open;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct LightRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    light_type: String,
    #[tabled(rename = "On")]
    on: bool,
    #[tabled(rename = "Bri")]
    bri: String,
    #[tabled(rename = "Color (H/S/B)")]
    color: String,
    #[tabled(rename = "Reachable")]
    reachable: bool,
}

impl From<&Arc<FullLight>> for LightRow {
    fn from(l: &Arc<FullLight>) -> Self {
        let color = l.state.colormode.map(|_| {
            let hsb = Hsb::from_light_state(&l.state);
            format!("{}/{}/{}", hsb.hue, hsb.saturation, hsb.brightness)
        });
        Self {
            id: l.id.clone(),
            name: l.name.clone(),
            light_type: l.light_type.clone(),
            on: l.state.on,
            bri: opt(l.state.bri),
            color: opt(color),
            reachable: l.state.reachable,
        }
    }
}

#[derive(Tabled)]
struct SensorRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    sensor_type: String,
    #[tabled(rename = "State")]
    state: String,
}

impl From<&Arc<FullSensor>> for SensorRow {
    fn from(s: &Arc<FullSensor>) -> Self {
        let state = s
            .state
            .iter()
            .filter(|(key, _)| key.as_str() != "lastupdated")
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            id: s.id.clone(),
            name: s.name.clone(),
            sensor_type: s.sensor_type.clone(),
            state,
        }
    }
}

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    group_type: String,
    #[tabled(rename = "Lights")]
    lights: usize,
    #[tabled(rename = "On")]
    on: bool,
    #[tabled(rename = "Bri")]
    bri: String,
}

impl From<&Arc<FullGroup>> for GroupRow {
    fn from(g: &Arc<FullGroup>) -> Self {
        Self {
            id: g.id.clone(),
            name: g.name.clone(),
            group_type: g.group_type.clone(),
            lights: g.lights.len(),
            on: g.state.on,
            bri: opt(g.state.bri),
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn lights(resolved: &Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let session = open(resolved, false)?;
    session.bridge.poll_now(PollKind::Lights).await?;

    let snap: Vec<_> = session.bridge.store().lights_snapshot().values().cloned().collect();
    let out = output::render_list(global.output, &snap, |l| LightRow::from(l), |l| l.id.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn sensors(resolved: &Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let session = open(resolved, false)?;
    session.bridge.poll_now(PollKind::Sensors).await?;

    let snap: Vec<_> = session.bridge.store().sensors_snapshot().values().cloned().collect();
    let out = output::render_list(global.output, &snap, |s| SensorRow::from(s), |s| s.id.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn groups(resolved: &Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let session = open(resolved, false)?;
    session.bridge.poll_now(PollKind::Lights).await?;

    let snap: Vec<_> = session.bridge.store().groups_snapshot().values().cloned().collect();
    let out = output::render_list(global.output, &snap, |g| GroupRow::from(g), |g| g.id.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
