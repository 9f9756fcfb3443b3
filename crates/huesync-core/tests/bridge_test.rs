#![allow(clippy::unwrap_used)]
// End-to-end behavior of `Bridge` against a scripted in-memory hub.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};

use huesync_api::{Error, HubClient};
use huesync_core::model::Entity;
use huesync_core::{
    Bridge, BridgeConfig, BridgeHost, BridgeProperties, BridgeStatus, CommandOutcome,
    ConfigUpdate, ConnectionState, CoreError, EntityListener, EntityRef, Fault, FullGroup,
    FullLight, FullSensor, GlobalConfig, HostError, LightState, ListenerError, OfflineReason,
    PollKind, SensorConfig, SensorState, StateUpdate,
};

const CREDENTIAL: &str = "accepted-credential";

// ── Scripted hub ────────────────────────────────────────────────────

struct ScriptedHub {
    reachable: AtomicBool,
    /// The credential the hub currently accepts.
    accepted: Mutex<Option<String>>,
    /// The credential the client presented last and the hub accepted.
    session: Mutex<Option<String>>,
    link_pressed: AtomicBool,
    lights: Mutex<Vec<FullLight>>,
    sensors: Mutex<Vec<FullSensor>>,
    groups: Mutex<Vec<FullGroup>>,
    write_results: Mutex<VecDeque<Result<(), Error>>>,
    writes: Mutex<Vec<(EntityRef, serde_json::Value)>>,
    searches: Mutex<Vec<Vec<String>>>,
    auth_calls: AtomicUsize,
    fetch_delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    panic_next_fetch: AtomicBool,
}

impl ScriptedHub {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            reachable: AtomicBool::new(true),
            accepted: Mutex::new(Some(CREDENTIAL.into())),
            session: Mutex::new(None),
            link_pressed: AtomicBool::new(false),
            lights: Mutex::new(Vec::new()),
            sensors: Mutex::new(Vec::new()),
            groups: Mutex::new(Vec::new()),
            write_results: Mutex::new(VecDeque::new()),
            writes: Mutex::new(Vec::new()),
            searches: Mutex::new(Vec::new()),
            auth_calls: AtomicUsize::new(0),
            fetch_delay: Mutex::new(None),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            panic_next_fetch: AtomicBool::new(false),
        })
    }

    fn set_lights(&self, lights: Vec<FullLight>) {
        *self.lights.lock().unwrap() = lights;
    }

    fn set_groups(&self, groups: Vec<FullGroup>) {
        *self.groups.lock().unwrap() = groups;
    }

    fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    fn expire_session(&self) {
        *self.session.lock().unwrap() = None;
    }

    fn script_writes(&self, results: Vec<Result<(), Error>>) {
        self.write_results.lock().unwrap().extend(results);
    }

    fn writes(&self) -> Vec<(EntityRef, serde_json::Value)> {
        self.writes.lock().unwrap().clone()
    }

    fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), Error> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Unavailable { status: 503 })
        }
    }

    fn check_session(&self) -> Result<(), Error> {
        self.check_online()?;
        let session = self.session.lock().unwrap().clone();
        let accepted = self.accepted.lock().unwrap().clone();
        if session.is_some() && session == accepted {
            Ok(())
        } else {
            Err(Error::from_hub(1, "unauthorized user"))
        }
    }

    async fn guarded_fetch<T: Clone>(&self, source: &Mutex<Vec<T>>) -> Result<Vec<T>, Error> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panic_next_fetch.swap(false, Ordering::SeqCst) {
            panic!("scripted fetch panic");
        }
        self.check_session()?;
        Ok(source.lock().unwrap().clone())
    }

    fn record_write(&self, entity: &EntityRef, body: serde_json::Value) -> Result<(), Error> {
        self.writes.lock().unwrap().push((entity.clone(), body));
        self.check_session()?;
        self.write_results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

#[async_trait]
impl HubClient for ScriptedHub {
    async fn fetch_lights(&self) -> Result<Vec<FullLight>, Error> {
        self.guarded_fetch(&self.lights).await
    }

    async fn fetch_sensors(&self) -> Result<Vec<FullSensor>, Error> {
        self.guarded_fetch(&self.sensors).await
    }

    async fn fetch_groups(&self) -> Result<Vec<FullGroup>, Error> {
        self.check_session()?;
        Ok(self.groups.lock().unwrap().clone())
    }

    async fn fetch_global_config(&self) -> Result<GlobalConfig, Error> {
        self.check_online()?;
        Ok(GlobalConfig {
            name: Some("Test hub".into()),
            bridge_id: Some("001788FFFE4A2B3C".into()),
            model_id: Some("BSB002".into()),
            mac: Some("00:17:88:4a:2b:3c".into()),
            sw_version: Some("1941132080".into()),
            api_version: Some("1.41.0".into()),
        })
    }

    async fn authenticate(&self, credential: &SecretString) -> Result<(), Error> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let presented = credential.expose_secret().to_owned();
        if self.accepted.lock().unwrap().as_deref() == Some(presented.as_str()) {
            *self.session.lock().unwrap() = Some(presented);
            Ok(())
        } else {
            Err(Error::from_hub(1, "unauthorized user"))
        }
    }

    async fn provision_credential(&self, _device_label: &str) -> Result<SecretString, Error> {
        self.check_online()?;
        if self.link_pressed.load(Ordering::SeqCst) {
            *self.accepted.lock().unwrap() = Some("issued-credential".into());
            Ok(SecretString::from("issued-credential"))
        } else {
            Err(Error::LinkButtonNotPressed)
        }
    }

    async fn set_entity_state(&self, entity: &EntityRef, update: &StateUpdate) -> Result<(), Error> {
        self.record_write(entity, serde_json::to_value(update).unwrap())
    }

    async fn set_entity_config(&self, entity: &EntityRef, update: &ConfigUpdate) -> Result<(), Error> {
        self.record_write(entity, serde_json::to_value(update).unwrap())
    }

    async fn start_search(&self, serial_numbers: &[String]) -> Result<(), Error> {
        self.check_session()?;
        self.searches.lock().unwrap().push(serial_numbers.to_vec());
        Ok(())
    }
}

// ── Recording host and listener ─────────────────────────────────────

#[derive(Default)]
struct RecordingHost {
    lost: AtomicUsize,
    resumed: AtomicUsize,
    persisted: Mutex<Vec<String>>,
    statuses: Mutex<Vec<BridgeStatus>>,
    properties: Mutex<Option<BridgeProperties>>,
}

impl BridgeHost for RecordingHost {
    fn on_status_changed(&self, status: &BridgeStatus) {
        self.statuses.lock().unwrap().push(*status);
    }

    fn on_connection_lost(&self) {
        self.lost.fetch_add(1, Ordering::SeqCst);
    }

    fn on_connection_resumed(&self) {
        self.resumed.fetch_add(1, Ordering::SeqCst);
    }

    fn persist_credential(&self, credential: &SecretString) -> Result<(), HostError> {
        self.persisted
            .lock()
            .unwrap()
            .push(credential.expose_secret().to_owned());
        Ok(())
    }

    fn update_properties(&self, properties: &BridgeProperties) {
        *self.properties.lock().unwrap() = Some(properties.clone());
    }
}

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<String>>,
}

impl Recorder {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.seen.lock().unwrap())
    }

    fn push(&self, line: String) {
        self.seen.lock().unwrap().push(line);
    }
}

impl<E: Entity> EntityListener<E> for Recorder {
    fn on_added(&self, entity: &E) -> Result<(), ListenerError> {
        self.push(format!("added {} {}", E::KIND, entity.id()));
        Ok(())
    }

    fn on_changed(&self, entity: &E) -> Result<(), ListenerError> {
        self.push(format!("changed {} {}", E::KIND, entity.id()));
        Ok(())
    }

    fn on_removed(&self, entity: &E) -> Result<(), ListenerError> {
        self.push(format!("removed {} {}", E::KIND, entity.id()));
        Ok(())
    }

    fn on_gone(&self, id: &str) -> Result<(), ListenerError> {
        self.push(format!("gone {} {id}", E::KIND));
        Ok(())
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

fn light(id: &str, on: bool, bri: u8) -> FullLight {
    FullLight {
        id: id.into(),
        name: format!("Light {id}"),
        light_type: "Dimmable light".into(),
        model_id: Some("LWB010".into()),
        unique_id: None,
        manufacturer: None,
        sw_version: None,
        state: LightState {
            on,
            bri: Some(bri),
            reachable: true,
            ..LightState::default()
        },
    }
}

fn sensor(id: &str, button: i64) -> FullSensor {
    let mut state = SensorState::new();
    state.insert("buttonevent".into(), button.into());
    let mut config = SensorConfig::new();
    config.insert("on".into(), true.into());
    FullSensor {
        id: id.into(),
        name: format!("Switch {id}"),
        sensor_type: "ZLLSwitch".into(),
        model_id: None,
        unique_id: None,
        state,
        config,
    }
}

fn group(id: &str, members: &[&str]) -> FullGroup {
    FullGroup {
        id: id.into(),
        name: format!("Room {id}"),
        group_type: "Room".into(),
        lights: members.iter().map(|m| (*m).to_string()).collect(),
        state: LightState::default(),
    }
}

fn config(credential: Option<&str>) -> BridgeConfig {
    let config = BridgeConfig::new("hub.test");
    match credential {
        Some(c) => config.with_credential(SecretString::from(c)),
        None => config,
    }
}

fn bridge(hub: &Arc<ScriptedHub>, host: &Arc<RecordingHost>, credential: Option<&str>) -> Bridge {
    Bridge::new(config(credential), hub.clone(), host.clone())
}

fn connected() -> (Arc<ScriptedHub>, Arc<RecordingHost>, Bridge) {
    let hub = ScriptedHub::new();
    let host = Arc::new(RecordingHost::default());
    let bridge = bridge(&hub, &host, Some(CREDENTIAL));
    (hub, host, bridge)
}

// ── Reconciliation through the facade ───────────────────────────────

#[tokio::test]
async fn test_late_listener_is_caught_up_in_cache_order() {
    let (hub, _host, bridge) = connected();
    hub.set_lights(vec![light("3", true, 10), light("1", false, 20), light("2", true, 30)]);
    bridge.poll_now(PollKind::Lights).await.unwrap();

    let recorder = Arc::new(Recorder::default());
    assert!(bridge.register_light_listener(recorder.clone()).await);
    assert_eq!(recorder.take(), vec!["added light 3", "added light 1", "added light 2"]);

    hub.set_lights(vec![light("3", true, 10), light("1", true, 20), light("2", true, 30)]);
    bridge.poll_now(PollKind::Lights).await.unwrap();
    assert_eq!(recorder.take(), vec!["changed light 1"]);
}

#[tokio::test]
async fn test_duplicate_registration_gets_no_second_catch_up() {
    let (hub, _host, bridge) = connected();
    hub.set_lights(vec![light("1", true, 10)]);
    bridge.poll_now(PollKind::Lights).await.unwrap();

    let recorder = Arc::new(Recorder::default());
    let listener: Arc<dyn EntityListener<FullLight>> = recorder.clone();
    assert!(bridge.register_light_listener(Arc::clone(&listener)).await);
    assert!(!bridge.register_light_listener(Arc::clone(&listener)).await);
    assert_eq!(recorder.take(), vec!["added light 1"]);

    assert!(bridge.unregister_light_listener(&listener));
    hub.set_lights(vec![light("1", false, 10)]);
    bridge.poll_now(PollKind::Lights).await.unwrap();
    assert!(recorder.take().is_empty());
}

#[tokio::test]
async fn test_listener_before_first_connection_sees_live_events_only() {
    let (hub, _host, bridge) = connected();
    let recorder = Arc::new(Recorder::default());
    assert!(bridge.register_light_listener(recorder.clone()).await);
    assert!(recorder.take().is_empty());

    hub.set_lights(vec![light("1", true, 10), light("2", true, 10)]);
    bridge.poll_now(PollKind::Lights).await.unwrap();
    assert_eq!(recorder.take(), vec!["added light 1", "added light 2"]);
}

#[tokio::test]
async fn test_removal_is_reported_once() {
    let (hub, _host, bridge) = connected();
    let recorder = Arc::new(Recorder::default());
    bridge.register_light_listener(recorder.clone()).await;

    hub.set_lights(vec![light("1", true, 10), light("2", true, 10)]);
    bridge.poll_now(PollKind::Lights).await.unwrap();
    recorder.take();

    hub.set_lights(vec![light("1", true, 10)]);
    bridge.poll_now(PollKind::Lights).await.unwrap();
    bridge.poll_now(PollKind::Lights).await.unwrap();

    assert_eq!(recorder.take(), vec!["removed light 2"]);
    assert!(bridge.light_by_id("2").is_none());
    assert!(bridge.light_by_id("1").is_some());
}

#[tokio::test]
async fn test_group_state_follows_member_lights() {
    let (hub, _host, bridge) = connected();
    hub.set_lights(vec![light("a", true, 40), light("b", false, 90)]);
    hub.set_groups(vec![group("1", &["a", "b"])]);
    let recorder = Arc::new(Recorder::default());
    bridge.register_group_listener(recorder.clone()).await;

    bridge.poll_now(PollKind::Lights).await.unwrap();
    let derived = bridge.group_by_id("1").unwrap();
    assert!(derived.state.on);
    assert_eq!(derived.state.bri, Some(40));
    assert_eq!(recorder.take(), vec!["added group 1"]);

    hub.set_lights(vec![light("a", false, 40), light("b", false, 90)]);
    bridge.poll_now(PollKind::Lights).await.unwrap();
    assert!(!bridge.group_by_id("1").unwrap().state.on);
    assert_eq!(recorder.take(), vec!["changed group 1"]);
}

#[tokio::test]
async fn test_targeted_and_discovery_listeners() {
    let (hub, _host, bridge) = connected();
    *hub.sensors.lock().unwrap() = vec![sensor("5", 1002), sensor("6", 1002)];
    bridge.poll_now(PollKind::Sensors).await.unwrap();

    let targeted = Arc::new(Recorder::default());
    bridge
        .register_listener_for::<FullSensor>("6", targeted.clone())
        .await;
    assert_eq!(targeted.take(), vec!["added sensor 6"]);

    let discovery = Arc::new(Recorder::default());
    let second = Arc::new(Recorder::default());
    assert!(bridge.register_discovery_listener(discovery.clone()).await);
    assert!(!bridge.register_discovery_listener(second.clone()).await);
    assert_eq!(discovery.take(), vec!["added sensor 5", "added sensor 6"]);

    *hub.sensors.lock().unwrap() = vec![sensor("5", 2002), sensor("6", 3002)];
    bridge.poll_now(PollKind::Sensors).await.unwrap();
    assert_eq!(targeted.take(), vec!["changed sensor 6"]);
    assert_eq!(discovery.take(), vec!["changed sensor 5", "changed sensor 6"]);
    assert!(second.take().is_empty());

    assert!(bridge.unregister_listener_for::<FullSensor>("6"));
    assert!(bridge.unregister_discovery_listener());
}

// ── Connection supervision ──────────────────────────────────────────

#[tokio::test]
async fn test_lost_and_resumed_fire_once_per_transition() {
    let (hub, host, bridge) = connected();
    hub.set_lights(vec![light("1", true, 10)]);

    bridge.poll_now(PollKind::Lights).await.unwrap();
    assert_eq!(host.resumed.load(Ordering::SeqCst), 1);
    assert_eq!(*bridge.status().borrow(), BridgeStatus::Online);
    assert_eq!(
        host.properties.lock().unwrap().clone().unwrap().serial_number.as_deref(),
        Some("0017884A2B3C")
    );

    hub.set_reachable(false);
    assert!(bridge.poll_now(PollKind::Lights).await.is_err());
    assert!(matches!(
        bridge.poll_now(PollKind::Lights).await,
        Err(CoreError::NotConnected)
    ));
    assert_eq!(host.lost.load(Ordering::SeqCst), 1);
    assert_eq!(*bridge.connection_state().borrow(), ConnectionState::Disconnected);
    assert_eq!(
        *bridge.status().borrow(),
        BridgeStatus::Offline(OfflineReason::ConnectionLost)
    );

    hub.set_reachable(true);
    bridge.poll_now(PollKind::Lights).await.unwrap();
    bridge.poll_now(PollKind::Lights).await.unwrap();
    assert_eq!(host.resumed.load(Ordering::SeqCst), 2);
    assert_eq!(host.lost.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_expired_session_reauthenticates_once_and_retries() {
    let (hub, _host, bridge) = connected();
    hub.set_lights(vec![light("1", true, 10)]);
    bridge.poll_now(PollKind::Lights).await.unwrap();
    let before = hub.auth_calls();

    hub.expire_session();
    bridge.poll_now(PollKind::Lights).await.unwrap();
    assert_eq!(hub.auth_calls(), before + 1);
    assert_eq!(
        *bridge.connection_state().borrow(),
        ConnectionState::ConnectedAuthenticated
    );
}

#[tokio::test]
async fn test_rejected_credential_goes_offline_without_looping() {
    let (hub, _host, bridge) = connected();
    hub.set_lights(vec![light("1", true, 10)]);
    bridge.poll_now(PollKind::Lights).await.unwrap();
    let before = hub.auth_calls();

    *hub.accepted.lock().unwrap() = Some("rotated".into());
    hub.expire_session();
    assert!(matches!(
        bridge.poll_now(PollKind::Lights).await,
        Err(CoreError::AuthenticationFailed { .. })
    ));
    assert_eq!(hub.auth_calls(), before + 1);
    assert_eq!(
        *bridge.connection_state().borrow(),
        ConnectionState::ConnectedUnauthenticated
    );
    assert_eq!(
        *bridge.status().borrow(),
        BridgeStatus::Offline(OfflineReason::InvalidCredential)
    );
}

#[tokio::test]
async fn test_full_lights_reauthenticates_exactly_once() {
    let (hub, _host, bridge) = connected();
    hub.set_lights(vec![light("1", true, 10), light("2", true, 10)]);
    bridge.poll_now(PollKind::Lights).await.unwrap();
    let before = hub.auth_calls();

    hub.expire_session();
    assert_eq!(bridge.full_lights().await.len(), 2);
    assert_eq!(hub.auth_calls(), before + 1);

    *hub.accepted.lock().unwrap() = Some("rotated".into());
    hub.expire_session();
    assert!(bridge.full_lights().await.is_empty());
    assert_eq!(hub.auth_calls(), before + 2);
}

#[tokio::test]
async fn test_provisioning_waits_for_pairing_button_then_persists() {
    let hub = ScriptedHub::new();
    let host = Arc::new(RecordingHost::default());
    let bridge = bridge(&hub, &host, None);
    hub.set_lights(vec![light("1", true, 10)]);

    assert!(matches!(
        bridge.poll_now(PollKind::Lights).await,
        Err(CoreError::NotConnected)
    ));
    assert_eq!(
        *bridge.status().borrow(),
        BridgeStatus::Offline(OfflineReason::PairingButtonNotPressed)
    );
    assert_eq!(*bridge.connection_state().borrow(), ConnectionState::Disconnected);
    assert!(host.persisted.lock().unwrap().is_empty());

    hub.link_pressed.store(true, Ordering::SeqCst);
    bridge.poll_now(PollKind::Lights).await.unwrap();
    assert_eq!(*host.persisted.lock().unwrap(), vec!["issued-credential"]);
    assert_eq!(*bridge.status().borrow(), BridgeStatus::Online);
    assert!(bridge.light_by_id("1").is_some());
}

#[tokio::test]
async fn test_passes_never_overlap() {
    let (hub, _host, bridge) = connected();
    hub.set_lights(vec![light("1", true, 10)]);
    *hub.sensors.lock().unwrap() = vec![sensor("1", 1002)];
    *hub.fetch_delay.lock().unwrap() = Some(Duration::from_millis(20));

    let (a, b, c) = tokio::join!(
        bridge.poll_now(PollKind::Lights),
        bridge.poll_now(PollKind::Sensors),
        bridge.poll_now(PollKind::Lights),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();
    assert_eq!(hub.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_panicking_pass_is_treated_as_connection_loss() {
    let (hub, host, bridge) = connected();
    hub.set_lights(vec![light("1", true, 10)]);
    bridge.poll_now(PollKind::Lights).await.unwrap();

    hub.panic_next_fetch.store(true, Ordering::SeqCst);
    assert!(matches!(
        bridge.poll_now(PollKind::Lights).await,
        Err(CoreError::ConnectionFailed { .. })
    ));
    assert_eq!(host.lost.load(Ordering::SeqCst), 1);
    assert_eq!(
        *bridge.status().borrow(),
        BridgeStatus::Offline(OfflineReason::ConnectionLost)
    );

    bridge.poll_now(PollKind::Lights).await.unwrap();
    assert_eq!(*bridge.status().borrow(), BridgeStatus::Online);
}

#[tokio::test(start_paused = true)]
async fn test_cadences_poll_until_stopped() {
    let (hub, _host, bridge) = connected();
    hub.set_lights(vec![light("1", true, 10)]);
    *hub.sensors.lock().unwrap() = vec![sensor("1", 1002)];

    bridge.start().await;
    bridge.start().await;
    assert!(bridge.is_polling(PollKind::Lights).await);
    assert!(bridge.is_polling(PollKind::Sensors).await);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(bridge.light_by_id("1").is_some());
    assert!(bridge.sensor_by_id("1").is_some());

    bridge.stop().await;
    assert!(!bridge.is_polling(PollKind::Lights).await);
    assert!(!bridge.is_polling(PollKind::Sensors).await);
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_color_temperature_on_off_light_is_suppressed() {
    let (hub, _host, bridge) = connected();
    bridge.poll_now(PollKind::Lights).await.unwrap();
    hub.script_writes(vec![Err(Error::from_hub(201, "device is set to off"))]);

    let outcome = bridge
        .submit_light_state("4", StateUpdate::new().with_color_temperature(366))
        .outcome()
        .await;

    assert_eq!(outcome, CommandOutcome::Suppressed);
    assert_eq!(hub.writes().len(), 1);
}

#[tokio::test]
async fn test_brightness_on_off_light_switches_on_and_retries_once() {
    let (hub, _host, bridge) = connected();
    bridge.poll_now(PollKind::Lights).await.unwrap();
    hub.script_writes(vec![Err(Error::from_hub(201, "device is set to off"))]);

    let outcome = bridge
        .submit_light_state("4", StateUpdate::new().with_brightness(120))
        .outcome()
        .await;

    assert_eq!(outcome, CommandOutcome::AppliedAfterPowerOn);
    let bodies: Vec<_> = hub.writes().into_iter().map(|(_, body)| body).collect();
    assert_eq!(
        bodies,
        vec![
            serde_json::json!({ "bri": 120 }),
            serde_json::json!({ "on": true }),
            serde_json::json!({ "bri": 120 }),
        ]
    );
}

#[tokio::test]
async fn test_second_device_off_is_not_retried_again() {
    let (hub, _host, bridge) = connected();
    bridge.poll_now(PollKind::Lights).await.unwrap();
    hub.script_writes(vec![
        Err(Error::from_hub(201, "device is set to off")),
        Ok(()),
        Err(Error::from_hub(201, "device is set to off")),
    ]);

    let outcome = bridge
        .submit_light_state("4", StateUpdate::new().with_hue_saturation(100, 200))
        .outcome()
        .await;

    assert!(matches!(outcome, CommandOutcome::Failed(Fault::DeviceOff(_))));
    assert_eq!(hub.writes().len(), 3);
}

#[tokio::test]
async fn test_write_to_missing_entity_notifies_gone() {
    let (hub, _host, bridge) = connected();
    hub.set_lights(vec![light("9", true, 100)]);
    bridge.poll_now(PollKind::Lights).await.unwrap();
    let recorder = Arc::new(Recorder::default());
    bridge.register_light_listener(recorder.clone()).await;
    assert_eq!(recorder.take(), vec!["added light 9"]);
    hub.script_writes(vec![Err(Error::from_hub(3, "resource, /lights/9, not available"))]);

    let outcome = bridge
        .submit_light_state("9", StateUpdate::new().with_on(true))
        .outcome()
        .await;

    assert!(matches!(outcome, CommandOutcome::Failed(Fault::EntityUnavailable(_))));
    assert_eq!(recorder.take(), vec!["gone light 9"]);
    assert!(bridge.light_by_id("9").is_none());
}

#[tokio::test]
async fn test_command_io_failure_goes_offline() {
    let (hub, host, bridge) = connected();
    hub.set_lights(vec![light("1", true, 100)]);
    bridge.poll_now(PollKind::Lights).await.unwrap();
    assert_eq!(*bridge.status().borrow(), BridgeStatus::Online);
    hub.script_writes(vec![
        Err(Error::Unavailable { status: 503 }),
        Err(Error::Unavailable { status: 503 }),
    ]);

    let outcome = bridge
        .submit_light_state("1", StateUpdate::new().with_brightness(50))
        .outcome()
        .await;

    assert!(matches!(outcome, CommandOutcome::Failed(Fault::Connectivity(_))));
    assert_eq!(
        *bridge.status().borrow(),
        BridgeStatus::Offline(OfflineReason::CommunicationError)
    );
    assert_eq!(*bridge.connection_state().borrow(), ConnectionState::Disconnected);
    assert_eq!(host.lost.load(Ordering::SeqCst), 1);

    // Already down: the next write is dropped and the loss is not reported again.
    let outcome = bridge
        .submit_light_state("1", StateUpdate::new().with_brightness(60))
        .outcome()
        .await;

    assert_eq!(outcome, CommandOutcome::NotConnected);
    assert_eq!(hub.writes().len(), 1);
    assert_eq!(host.lost.load(Ordering::SeqCst), 1);
    assert_eq!(
        *bridge.status().borrow(),
        BridgeStatus::Offline(OfflineReason::CommunicationError)
    );
}

#[tokio::test]
async fn test_commands_are_dropped_while_disconnected() {
    let (hub, _host, bridge) = connected();
    let outcome = bridge
        .submit_group_state("1", StateUpdate::new().with_on(true))
        .outcome()
        .await;

    assert_eq!(outcome, CommandOutcome::NotConnected);
    assert!(hub.writes().is_empty());
}

#[tokio::test]
async fn test_sensor_config_goes_to_config_resource() {
    let (hub, _host, bridge) = connected();
    bridge.poll_now(PollKind::Sensors).await.unwrap();

    let outcome = bridge
        .submit_sensor_config("5", ConfigUpdate::new().with_field("on", false))
        .outcome()
        .await;

    assert!(outcome.is_applied());
    let writes = hub.writes();
    assert_eq!(writes[0].0, EntityRef::sensor("5"));
    assert_eq!(writes[0].1, serde_json::json!({ "on": false }));
}

#[tokio::test]
async fn test_search_forwards_serials() {
    let (hub, _host, bridge) = connected();
    bridge.poll_now(PollKind::Lights).await.unwrap();

    assert!(bridge.start_search().await);
    assert!(bridge.start_search_for(&["AB12CD".to_string()]).await);
    assert_eq!(
        *hub.searches.lock().unwrap(),
        vec![Vec::<String>::new(), vec!["AB12CD".to_string()]]
    );

    let properties = bridge.bridge_properties().await.unwrap();
    assert_eq!(properties.model_id.as_deref(), Some("BSB002"));
}
