// ── Group aggregation ──
//
// Groups carry no state of their own in the sync engine. Their state is
// derived from the cached member lights on every slow pass, then diffed
// like any other entity.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::trace;

use crate::model::{FullGroup, FullLight, Hsb, LightState};

/// Derive a group's state from the current light snapshot.
///
/// - on if any cached member is on
/// - brightness is the truncated mean over all on members (a member
///   reporting none counts as zero), zero if no member is on
/// - color fields are copied from the first on, color-capable member,
///   but only if every such member converts to the same [`Hsb`]
///
/// Members missing from the snapshot are skipped.
pub fn derive_group_state(members: &[String], lights: &IndexMap<String, Arc<FullLight>>) -> LightState {
    let mut on = false;
    let mut bri_sum: u32 = 0;
    let mut bri_count: u32 = 0;
    let mut reference: Option<(Hsb, &LightState)> = None;
    let mut uniform_color = true;

    for id in members {
        let Some(light) = lights.get(id) else {
            trace!(light = %id, "group member not in cache");
            continue;
        };
        let state = &light.state;
        if !state.on {
            continue;
        }
        on = true;

        // An on member without a dimmer counts as zero brightness.
        bri_sum += u32::from(state.bri.unwrap_or(0));
        bri_count += 1;

        if state.colormode.is_some() {
            let hsb = Hsb::from_light_state(state);
            match reference {
                None => reference = Some((hsb, state)),
                Some((first, _)) if first != hsb => uniform_color = false,
                Some(_) => {}
            }
        }
    }

    let bri = bri_sum.checked_div(bri_count).unwrap_or(0);
    let mut derived = LightState {
        on,
        bri: Some(u8::try_from(bri).unwrap_or(u8::MAX)),
        reachable: true,
        ..LightState::default()
    };

    if let (true, Some((_, color))) = (uniform_color, reference) {
        derived.colormode = color.colormode;
        derived.hue = color.hue;
        derived.sat = color.sat;
        derived.ct = color.ct;
        derived.xy = color.xy;
    }

    derived
}

/// Replace `group.state` with the state derived from its members.
pub fn with_derived_state(mut group: FullGroup, lights: &IndexMap<String, Arc<FullLight>>) -> FullGroup {
    group.state = derive_group_state(&group.lights, lights);
    trace!(group = %group.id, on = group.state.on, bri = ?group.state.bri, "derived group state");
    group
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColorMode;
    use pretty_assertions::assert_eq;

    fn light(id: &str, state: LightState) -> (String, Arc<FullLight>) {
        (
            id.to_string(),
            Arc::new(FullLight {
                id: id.into(),
                name: id.into(),
                light_type: "Extended color light".into(),
                model_id: None,
                unique_id: None,
                manufacturer: None,
                sw_version: None,
                state,
            }),
        )
    }

    fn plain(on: bool, bri: u8) -> LightState {
        LightState {
            on,
            bri: Some(bri),
            reachable: true,
            ..LightState::default()
        }
    }

    fn colored(on: bool, bri: u8, hue: u16) -> LightState {
        LightState {
            on,
            bri: Some(bri),
            hue: Some(hue),
            sat: Some(254),
            colormode: Some(ColorMode::Hs),
            reachable: true,
            ..LightState::default()
        }
    }

    fn members(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn any_on_member_turns_group_on() {
        let lights: IndexMap<_, _> = [light("a", plain(true, 40)), light("b", plain(false, 90))]
            .into_iter()
            .collect();
        let state = derive_group_state(&members(&["a", "b"]), &lights);
        assert!(state.on);
        assert_eq!(state.bri, Some(40));
    }

    #[test]
    fn all_off_gives_off_and_zero_brightness() {
        let lights: IndexMap<_, _> = [light("a", plain(false, 40)), light("b", plain(false, 90))]
            .into_iter()
            .collect();
        let state = derive_group_state(&members(&["a", "b"]), &lights);
        assert!(!state.on);
        assert_eq!(state.bri, Some(0));
    }

    #[test]
    fn brightness_mean_truncates() {
        let lights: IndexMap<_, _> = [
            light("a", plain(true, 10)),
            light("b", plain(true, 11)),
            light("c", plain(true, 12)),
            light("d", plain(true, 12)),
        ]
        .into_iter()
        .collect();
        // (10 + 11 + 12 + 12) / 4 = 11.25
        assert_eq!(
            derive_group_state(&members(&["a", "b", "c", "d"]), &lights).bri,
            Some(11)
        );
    }

    #[test]
    fn on_member_without_brightness_counts_as_zero() {
        let onoff = LightState {
            on: true,
            bri: None,
            reachable: true,
            ..LightState::default()
        };
        let lights: IndexMap<_, _> = [light("a", plain(true, 100)), light("b", onoff)]
            .into_iter()
            .collect();
        let state = derive_group_state(&members(&["a", "b"]), &lights);
        assert!(state.on);
        assert_eq!(state.bri, Some(50));
    }

    #[test]
    fn differing_colors_leave_color_unset() {
        let lights: IndexMap<_, _> = [
            light("red", colored(true, 200, 0)),
            light("blue", colored(true, 200, 46920)),
        ]
        .into_iter()
        .collect();
        let state = derive_group_state(&members(&["red", "blue"]), &lights);
        assert_eq!(state.colormode, None);
        assert_eq!(state.hue, None);
        assert_eq!(state.sat, None);
    }

    #[test]
    fn shared_color_is_copied() {
        let lights: IndexMap<_, _> = [
            light("a", colored(true, 200, 46920)),
            light("b", colored(true, 200, 46920)),
            light("c", colored(false, 10, 0)),
        ]
        .into_iter()
        .collect();
        let state = derive_group_state(&members(&["a", "b", "c"]), &lights);
        assert_eq!(state.colormode, Some(ColorMode::Hs));
        assert_eq!(state.hue, Some(46920));
        assert_eq!(state.sat, Some(254));
    }

    #[test]
    fn colorless_members_do_not_break_uniformity() {
        let lights: IndexMap<_, _> = [light("a", colored(true, 200, 100)), light("b", plain(true, 50))]
            .into_iter()
            .collect();
        let state = derive_group_state(&members(&["a", "b"]), &lights);
        assert_eq!(state.hue, Some(100));
        assert_eq!(state.bri, Some(125));
    }

    #[test]
    fn unknown_members_are_ignored() {
        let lights: IndexMap<_, _> = [light("a", plain(true, 60))].into_iter().collect();
        let group = FullGroup {
            id: "1".into(),
            name: "Hall".into(),
            group_type: "Room".into(),
            lights: members(&["a", "ghost"]),
            state: LightState::default(),
        };
        let group = with_derived_state(group, &lights);
        assert!(group.state.on);
        assert_eq!(group.state.bri, Some(60));
    }
}
