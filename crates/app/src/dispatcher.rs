//! Dispatch loop — the single writer of the device registry.
//!
//! Serializes three input streams: bus command messages, operator control
//! events and fatal errors from collaborators. Commands are resolved to
//! pulse jobs and handed to the [`PulseRunner`]; control events mutate the
//! registry, notify the [`DeviceStore`] and announce enabled devices.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use udin2mqtt_domain::action::Operation;
use udin2mqtt_domain::device::{Device, DeviceSpec};
use udin2mqtt_domain::discovery::DiscoverySettings;
use udin2mqtt_domain::error::{BridgeError, NotFoundError};
use udin2mqtt_domain::topic;

use crate::controller::ControllerSet;
use crate::ports::{DeviceStore, InboundMessage, OutboundMessage};
use crate::pulse::{PulseJob, PulseRunner};
use crate::registry::DeviceRegistry;

/// Channel on which the dispatch loop answers an operator.
pub type Reply = oneshot::Sender<Result<Device, BridgeError>>;

/// An operator request from the control surface.
#[derive(Debug)]
pub enum ControlEvent {
    /// Enable or disable an existing device.
    SetEnabled {
        name: String,
        enabled: bool,
        reply: Option<Reply>,
    },
    /// Define a new device. It always starts disabled.
    Create { spec: DeviceSpec, reply: Option<Reply> },
}

impl ControlEvent {
    /// Enable/disable event from its textual form: only `"true"` enables.
    #[must_use]
    pub fn enable_from_text(
        name: impl Into<String>,
        value: &str,
    ) -> (Self, oneshot::Receiver<Result<Device, BridgeError>>) {
        Self::set_enabled(name, value == "true")
    }

    /// Enable/disable event paired with the receiver of its answer.
    #[must_use]
    pub fn set_enabled(
        name: impl Into<String>,
        enabled: bool,
    ) -> (Self, oneshot::Receiver<Result<Device, BridgeError>>) {
        let (tx, rx) = oneshot::channel();
        let event = Self::SetEnabled {
            name: name.into(),
            enabled,
            reply: Some(tx),
        };
        (event, rx)
    }

    /// Create event paired with the receiver of its answer.
    #[must_use]
    pub fn create(spec: DeviceSpec) -> (Self, oneshot::Receiver<Result<Device, BridgeError>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self::Create {
                spec,
                reply: Some(tx),
            },
            rx,
        )
    }
}

/// Receiving ends the dispatch loop consumes.
#[derive(Debug)]
pub struct DispatcherInputs {
    pub commands: mpsc::Receiver<InboundMessage>,
    pub control: mpsc::Receiver<ControlEvent>,
    /// Fatal errors reported by collaborators (e.g. the bus client).
    pub fatal: mpsc::Receiver<BridgeError>,
}

/// The coordination point between the bus, the operator and the controllers.
pub struct Dispatcher<S> {
    registry: Arc<DeviceRegistry>,
    controllers: Arc<ControllerSet>,
    store: S,
    settings: DiscoverySettings,
    outbound: mpsc::Sender<OutboundMessage>,
    pulses: PulseRunner,
    announce_every: Option<Duration>,
}

impl<S: DeviceStore> Dispatcher<S> {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        controllers: Arc<ControllerSet>,
        store: S,
        settings: DiscoverySettings,
        outbound: mpsc::Sender<OutboundMessage>,
        pulses: PulseRunner,
    ) -> Self {
        Self {
            registry,
            controllers,
            store,
            settings,
            outbound,
            pulses,
            announce_every: None,
        }
    }

    /// Re-announce every enabled device with this period.
    #[must_use]
    pub fn announce_every(mut self, period: Option<Duration>) -> Self {
        self.announce_every = period.filter(|period| !period.is_zero());
        self
    }

    /// Replay persisted definitions into the registry and announce the
    /// enabled ones. Nothing is written back to the store.
    ///
    /// # Errors
    ///
    /// Returns the first validation error, or [`BridgeError::Bus`] if the
    /// bus client is gone.
    pub async fn load(&self, specs: impl IntoIterator<Item = DeviceSpec>) -> Result<usize, BridgeError> {
        let mut loaded = 0;
        for spec in specs {
            let device = self.registry.create(spec)?;
            tracing::info!(device = %device, "loaded device");
            if device.enabled {
                self.announce(&device).await?;
            }
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Run until `shutdown` completes or a fatal error occurs.
    ///
    /// Cancellation is checked between selections. In-flight pulses are
    /// left to finish on their own.
    ///
    /// # Errors
    ///
    /// Returns the fatal error: a persistence failure while enabling or
    /// disabling, a bus failure, or an error reported on `inputs.fatal`.
    pub async fn run(
        self,
        mut inputs: DispatcherInputs,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), BridgeError> {
        let mut shutdown = std::pin::pin!(shutdown);
        let mut ticker = self.announce_every.map(|period| {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });
        tracing::info!("dispatch loop started");

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    tracing::info!("dispatch loop shutting down");
                    return Ok(());
                }
                Some(err) = inputs.fatal.recv() => {
                    tracing::error!(error = %err, "fatal error reported by collaborator");
                    return Err(err);
                }
                Some(event) = inputs.control.recv() => self.handle_control(event).await?,
                Some(message) = inputs.commands.recv() => self.handle_command(&message),
                () = next_tick(&mut ticker) => self.announce_all().await?,
            }
        }
    }

    /// Resolve a bus command to the pulse it authorizes.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Validation`] for a malformed topic or an
    /// unrecognized command, and [`BridgeError::NotFound`] when the device or
    /// its controller does not exist.
    pub fn route_command(&self, message: &InboundMessage) -> Result<PulseJob, BridgeError> {
        let name = topic::device_from_command_topic(&message.topic)?;
        let device = self.registry.get(name).ok_or_else(|| NotFoundError {
            entity: "Device",
            id: name.to_string(),
        })?;
        let action = device.interpret(&message.payload_text())?;
        tracing::debug!(device = %device.name, %action, "command resolved");
        let controller = self
            .controllers
            .get(&action.controller)
            .ok_or_else(|| NotFoundError {
                entity: "Controller",
                id: action.controller.clone(),
            })?;
        match action.operation {
            Operation::Pulse => Ok(PulseJob {
                device: device.name,
                controller,
                relay: action.relay,
            }),
        }
    }

    fn handle_command(&self, message: &InboundMessage) {
        tracing::debug!(topic = %message.topic, payload = %message.payload_text(), "command received");
        match self.route_command(message) {
            Ok(job) => {
                self.pulses.submit(job);
            }
            Err(err) => tracing::warn!(
                topic = %message.topic,
                command = %message.payload_text(),
                error = %err,
                "command discarded"
            ),
        }
    }

    async fn handle_control(&self, event: ControlEvent) -> Result<(), BridgeError> {
        match event {
            ControlEvent::SetEnabled {
                name,
                enabled,
                reply,
            } => self.set_enabled(&name, enabled, reply).await,
            ControlEvent::Create { spec, reply } => {
                let result = self.create(spec).await;
                respond(reply, result);
                Ok(())
            }
        }
    }

    #[tracing::instrument(skip(self, reply))]
    async fn set_enabled(
        &self,
        name: &str,
        enabled: bool,
        reply: Option<Reply>,
    ) -> Result<(), BridgeError> {
        let device = match self.registry.set_enabled(name, enabled) {
            Ok(device) => device,
            Err(err) => {
                tracing::warn!(error = %err, "enable/disable ignored");
                respond(reply, Err(err));
                return Ok(());
            }
        };
        if let Err(err) = self.store.save_device(&device).await {
            tracing::error!(error = %err, "failed to persist enabled state");
            return Err(err);
        }
        tracing::info!(enabled, "device enabled state changed");
        if device.enabled {
            self.announce(&device).await?;
        }
        respond(reply, Ok(device));
        Ok(())
    }

    #[tracing::instrument(skip(self, spec), fields(device = %spec.name))]
    async fn create(&self, spec: DeviceSpec) -> Result<Device, BridgeError> {
        let device = self.registry.create(spec.enabled(false)).inspect_err(|err| {
            tracing::warn!(error = %err, "failed to create device");
        })?;
        self.store.save_device(&device).await.inspect_err(|err| {
            tracing::warn!(error = %err, "failed to persist new device");
        })?;
        tracing::info!(device = %device, "created device");
        Ok(device)
    }

    async fn announce(&self, device: &Device) -> Result<(), BridgeError> {
        let message = OutboundMessage::from(device.announcement(&self.settings));
        tracing::debug!(device = %device.name, topic = %message.topic, "announcing device");
        self.outbound
            .send(message)
            .await
            .map_err(|err| BridgeError::Bus(Box::new(err)))
    }

    async fn announce_all(&self) -> Result<(), BridgeError> {
        for device in self.registry.list().into_iter().filter(|d| d.enabled) {
            self.announce(&device).await?;
        }
        Ok(())
    }
}

fn respond(reply: Option<Reply>, result: Result<Device, BridgeError>) {
    if let Some(reply) = reply {
        // The operator may have given up waiting.
        let _ = reply.send(result);
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::controller::Controller;
    use crate::controller::tests::ScriptedLine;
    use udin2mqtt_domain::device::DeviceKind;
    use udin2mqtt_domain::protocol::Request;

    #[derive(Default)]
    struct RecordingStore {
        saved: Mutex<Vec<Device>>,
        fail: bool,
    }

    impl DeviceStore for RecordingStore {
        async fn save_device(&self, device: &Device) -> Result<(), BridgeError> {
            if self.fail {
                return Err(BridgeError::Storage(Box::new(std::io::Error::other(
                    "read-only config",
                ))));
            }
            self.saved.lock().unwrap().push(device.clone());
            Ok(())
        }
    }

    struct Harness {
        dispatcher: Dispatcher<Arc<RecordingStore>>,
        store: Arc<RecordingStore>,
        outbound: mpsc::Receiver<OutboundMessage>,
        log: Arc<Mutex<Vec<Request>>>,
    }

    fn harness(store: RecordingStore) -> Harness {
        harness_holding(store, Duration::from_millis(1))
    }

    fn harness_holding(store: RecordingStore, hold: Duration) -> Harness {
        let line = ScriptedLine::new("UDIN-8R", "UDIN-8R 8 x Relay V1.0");
        let log = Arc::clone(&line.log);
        let mut controllers = ControllerSet::new();
        controllers.insert(Controller::connect(line).unwrap());
        let registry = Arc::new(DeviceRegistry::new(controllers.relays()));
        let store = Arc::new(store);
        let (outbound_tx, outbound) = mpsc::channel(16);
        let (pulses, _failures) = PulseRunner::new(hold);
        let settings = DiscoverySettings {
            app_name: "udin2mqtt".to_string(),
            version: "0.1.0".to_string(),
            bridge_topic: "udin2mqtt".to_string(),
            discovery_prefix: "hass".to_string(),
            advertise: "127.0.0.1:8094".to_string(),
        };
        let dispatcher = Dispatcher::new(
            registry,
            Arc::new(controllers),
            Arc::clone(&store),
            settings,
            outbound_tx,
            pulses,
        );
        Harness {
            dispatcher,
            store,
            outbound,
            log,
        }
    }

    fn blind1() -> DeviceSpec {
        DeviceSpec::new(
            "blind1",
            DeviceKind::MomentaryOpenClose,
            vec!["udin_8r-r1".to_string(), "udin_8r-r2".to_string()],
        )
    }

    #[tokio::test]
    async fn should_route_open_to_first_relay() {
        let h = harness(RecordingStore::default());
        h.dispatcher.load([blind1()]).await.unwrap();
        let job = h
            .dispatcher
            .route_command(&InboundMessage::new("udin2mqtt/blind1/set", "open"))
            .unwrap();
        assert_eq!(job.device, "blind1");
        assert_eq!(job.controller.key(), "udin_8r");
        assert_eq!(job.relay, 1);
    }

    #[tokio::test]
    async fn should_route_close_to_second_relay() {
        let h = harness(RecordingStore::default());
        h.dispatcher.load([blind1()]).await.unwrap();
        let job = h
            .dispatcher
            .route_command(&InboundMessage::new("udin2mqtt/blind1/set", "CLOSE"))
            .unwrap();
        assert_eq!(job.relay, 2);
    }

    #[tokio::test]
    async fn should_reject_unknown_command_text() {
        let h = harness(RecordingStore::default());
        h.dispatcher.load([blind1()]).await.unwrap();
        let result = h
            .dispatcher
            .route_command(&InboundMessage::new("udin2mqtt/blind1/set", "foo"));
        assert!(matches!(result, Err(BridgeError::Validation(_))));
    }

    #[tokio::test]
    async fn should_reject_unknown_device() {
        let h = harness(RecordingStore::default());
        let result = h
            .dispatcher
            .route_command(&InboundMessage::new("udin2mqtt/quux/set", "open"));
        assert!(matches!(result, Err(BridgeError::NotFound(ref e)) if e.entity == "Device"));
    }

    #[tokio::test]
    async fn should_reject_unknown_controller() {
        let mut h = harness(RecordingStore::default());
        // Catalog offers relays of a board that is not attached.
        h.dispatcher.registry = Arc::new(DeviceRegistry::new(
            (1..=2).map(|i| udin2mqtt_domain::relay::RelayAddress::new("udin_99", i)),
        ));
        h.dispatcher
            .load([DeviceSpec::new(
                "ghost",
                DeviceKind::MomentaryOpenClose,
                vec!["udin_99-r1".to_string(), "udin_99-r2".to_string()],
            )])
            .await
            .unwrap();
        let result = h
            .dispatcher
            .route_command(&InboundMessage::new("udin2mqtt/ghost/set", "open"));
        assert!(matches!(result, Err(BridgeError::NotFound(ref e)) if e.entity == "Controller"));
    }

    #[tokio::test]
    async fn should_announce_enabled_devices_on_load_only() {
        let mut h = harness(RecordingStore::default());
        let enabled = DeviceSpec::new(
            "blind2",
            DeviceKind::MomentaryOpenClose,
            vec!["udin_8r-r3".to_string(), "udin_8r-r4".to_string()],
        )
        .enabled(true);
        let loaded = h.dispatcher.load([blind1(), enabled]).await.unwrap();
        assert_eq!(loaded, 2);
        let message = h.outbound.try_recv().unwrap();
        assert_eq!(message.topic, "hass/cover/blind2/config");
        assert!(h.outbound.try_recv().is_err());
        assert!(h.store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_announce_and_persist_when_enabling() {
        let mut h = harness(RecordingStore::default());
        h.dispatcher.load([blind1()]).await.unwrap();

        let (event, reply) = ControlEvent::set_enabled("blind1", true);
        h.dispatcher.handle_control(event).await.unwrap();

        let device = reply.await.unwrap().unwrap();
        assert!(device.enabled);
        let saved = h.store.saved.lock().unwrap().clone();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].enabled);

        let message = h.outbound.try_recv().unwrap();
        assert_eq!(message.topic, "hass/cover/blind1/config");
        assert!(message.retain);
        let payload: serde_json::Value = serde_json::from_slice(&message.payload).unwrap();
        assert_eq!(payload["command_topic"], "udin2mqtt/blind1/set");
        assert!(h.outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn should_only_persist_when_disabling() {
        let mut h = harness(RecordingStore::default());
        h.dispatcher.load([blind1().enabled(true)]).await.unwrap();
        h.outbound.try_recv().unwrap();

        h.dispatcher
            .handle_control(ControlEvent::enable_from_text("blind1", "false").0)
            .await
            .unwrap();

        assert_eq!(h.store.saved.lock().unwrap().len(), 1);
        assert!(!h.store.saved.lock().unwrap()[0].enabled);
        assert!(h.outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn should_treat_persistence_failure_on_enable_as_fatal() {
        let h = harness(RecordingStore {
            fail: true,
            ..RecordingStore::default()
        });
        h.dispatcher.load([blind1()]).await.unwrap();
        let result = h
            .dispatcher
            .handle_control(ControlEvent::enable_from_text("blind1", "true").0)
            .await;
        assert!(matches!(result, Err(BridgeError::Storage(_))));
    }

    #[tokio::test]
    async fn should_answer_not_found_for_unknown_device_on_enable() {
        let h = harness(RecordingStore::default());
        let (event, reply) = ControlEvent::set_enabled("quux", true);
        h.dispatcher.handle_control(event).await.unwrap();
        assert!(matches!(reply.await.unwrap(), Err(BridgeError::NotFound(_))));
        assert!(h.store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_create_disabled_device_and_persist_it() {
        let mut h = harness(RecordingStore::default());
        let (event, reply) = ControlEvent::create(blind1().enabled(true));
        h.dispatcher.handle_control(event).await.unwrap();

        let device = reply.await.unwrap().unwrap();
        assert!(!device.enabled);
        assert_eq!(h.dispatcher.registry.get("blind1"), Some(device.clone()));
        assert_eq!(*h.store.saved.lock().unwrap(), vec![device]);
        assert!(h.outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn should_answer_validation_error_on_bad_create() {
        let h = harness(RecordingStore::default());
        let spec = DeviceSpec::new(
            "blind1",
            DeviceKind::MomentaryOpenClose,
            vec!["udin_8r-r1".to_string(), "udin_8r-r9".to_string()],
        );
        let (event, reply) = ControlEvent::create(spec);
        h.dispatcher.handle_control(event).await.unwrap();
        assert!(matches!(reply.await.unwrap(), Err(BridgeError::Validation(_))));
        assert!(h.dispatcher.registry.list().is_empty());
    }

    #[tokio::test]
    async fn should_not_treat_persistence_failure_on_create_as_fatal() {
        let h = harness(RecordingStore {
            fail: true,
            ..RecordingStore::default()
        });
        let (event, reply) = ControlEvent::create(blind1());
        assert!(h.dispatcher.handle_control(event).await.is_ok());
        assert!(matches!(reply.await.unwrap(), Err(BridgeError::Storage(_))));
    }

    #[tokio::test]
    async fn should_pulse_from_run_loop_and_stop_on_shutdown() {
        let h = harness(RecordingStore::default());
        h.dispatcher.load([blind1()]).await.unwrap();
        let log = Arc::clone(&h.log);

        let (commands_tx, commands) = mpsc::channel(4);
        let (_control_tx, control) = mpsc::channel(4);
        let (_fatal_tx, fatal) = mpsc::channel(1);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let inputs = DispatcherInputs {
            commands,
            control,
            fatal,
        };
        let task = tokio::spawn(h.dispatcher.run(inputs, async {
            let _ = stop_rx.await;
        }));

        commands_tx
            .send(InboundMessage::new("udin2mqtt/blind1/set", "close"))
            .await
            .unwrap();
        for _ in 0..200 {
            if log.lock().unwrap().contains(&Request::Off(2)) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(log.lock().unwrap().ends_with(&[Request::On(2), Request::Off(2)]));

        stop_tx.send(()).unwrap();
        assert!(task.await.unwrap().is_ok());
    }

    async fn wait_for(log: &Mutex<Vec<Request>>, request: Request) {
        for _ in 0..400 {
            if log.lock().unwrap().contains(&request) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("{request} never reached the line");
    }

    #[tokio::test]
    async fn should_serve_control_events_while_pulse_is_held() {
        let mut h = harness_holding(RecordingStore::default(), Duration::from_millis(500));
        h.dispatcher.load([blind1()]).await.unwrap();
        let log = Arc::clone(&h.log);

        let (commands_tx, commands) = mpsc::channel(4);
        let (control_tx, control) = mpsc::channel(4);
        let (_fatal_tx, fatal) = mpsc::channel(1);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let inputs = DispatcherInputs {
            commands,
            control,
            fatal,
        };
        let task = tokio::spawn(h.dispatcher.run(inputs, async {
            let _ = stop_rx.await;
        }));

        commands_tx
            .send(InboundMessage::new("udin2mqtt/blind1/set", "open"))
            .await
            .unwrap();
        wait_for(&log, Request::On(1)).await;

        // The relay is still held while the loop answers the operator.
        let (event, reply) = ControlEvent::set_enabled("blind1", true);
        control_tx.send(event).await.unwrap();
        assert!(reply.await.unwrap().unwrap().enabled);
        assert!(!log.lock().unwrap().contains(&Request::Off(1)));
        assert_eq!(h.outbound.recv().await.unwrap().topic, "hass/cover/blind1/config");

        wait_for(&log, Request::Off(1)).await;
        assert!(log.lock().unwrap().ends_with(&[Request::On(1), Request::Off(1)]));

        stop_tx.send(()).unwrap();
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn should_exit_with_fatal_error_from_collaborator() {
        let h = harness(RecordingStore::default());
        let (_commands_tx, commands) = mpsc::channel(1);
        let (_control_tx, control) = mpsc::channel(1);
        let (fatal_tx, fatal) = mpsc::channel(1);
        fatal_tx
            .send(BridgeError::Bus(Box::new(std::io::Error::other("broker gone"))))
            .await
            .unwrap();
        let inputs = DispatcherInputs {
            commands,
            control,
            fatal,
        };
        let result = h.dispatcher.run(inputs, std::future::pending()).await;
        assert!(matches!(result, Err(BridgeError::Bus(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn should_reannounce_enabled_devices_periodically() {
        let mut h = harness(RecordingStore::default());
        h.dispatcher.load([blind1().enabled(true)]).await.unwrap();
        h.outbound.try_recv().unwrap();

        let (_commands_tx, commands) = mpsc::channel(1);
        let (_control_tx, control) = mpsc::channel(1);
        let (_fatal_tx, fatal) = mpsc::channel(1);
        let inputs = DispatcherInputs {
            commands,
            control,
            fatal,
        };
        let dispatcher = h.dispatcher.announce_every(Some(Duration::from_secs(600)));
        tokio::spawn(dispatcher.run(inputs, std::future::pending()));

        let message = h.outbound.recv().await.unwrap();
        assert_eq!(message.topic, "hass/cover/blind1/config");
    }
}
