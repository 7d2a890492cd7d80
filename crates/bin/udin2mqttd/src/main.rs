//! # udin2mqttd — UDIN to MQTT bridge daemon
//!
//! Composition root that wires controllers, the dispatch loop and all
//! adapters together and runs the bridge.
//!
//! ## Responsibilities
//! - Load configuration (env vars, config file) and initialise logging
//! - Attach one controller per configured serial endpoint
//! - Replay persisted devices into the registry and announce enabled ones
//! - Start the MQTT client and the HTTP control surface
//! - Run the dispatch loop until SIGINT/SIGTERM or a fatal error, then stop
//!   the other tasks cleanly
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

use udin2mqtt_adapter_http_axum::state::{AppState, BridgeInfo};
use udin2mqtt_adapter_mqtt::MqttBus;
use udin2mqtt_adapter_serial::SerialConfig;
use udin2mqtt_adapter_store_toml::TomlDeviceStore;
use udin2mqtt_app::controller::{Controller, ControllerSet};
use udin2mqtt_app::dispatcher::{Dispatcher, DispatcherInputs};
use udin2mqtt_app::pulse::{PulseRunner, report_failures};
use udin2mqtt_app::registry::DeviceRegistry;

use crate::config::{APP_NAME, Config};

const INBOUND_CAPACITY: usize = 300;
const OUTBOUND_CAPACITY: usize = 50;
const CONTROL_CAPACITY: usize = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().nth(1).as_deref() == Some("--version") {
        println!("{APP_NAME} v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config_path = Config::path();
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    init_tracing(&config.logging.filter);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "starting udin2mqttd"
    );

    // Controllers
    let controllers = attach_controllers(&config.serial)?;
    let registry = Arc::new(DeviceRegistry::new(controllers.relays()));

    // Channels
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let (control_tx, control_rx) = mpsc::channel(CONTROL_CAPACITY);
    let (fatal_tx, fatal_rx) = mpsc::channel(1);
    let (stop_tx, stop_rx) = watch::channel(false);

    // Pulses
    let (pulses, failures) = PulseRunner::new(config.pulse_duration());
    tokio::spawn(report_failures(failures));

    // Dispatch loop, with the persisted devices replayed
    let dispatcher = Dispatcher::new(
        Arc::clone(&registry),
        Arc::new(controllers),
        TomlDeviceStore::new(&config_path),
        config.discovery_settings(),
        outbound_tx,
        pulses,
    )
    .announce_every(config.announce_interval());

    // MQTT, started before the replay so announcements are drained
    let bus = MqttBus::new(config.mqtt.clone(), &config.bridge.topic);
    let bus_task = tokio::spawn({
        let stop = stopped(stop_rx.clone());
        async move {
            if let Err(err) = bus.run(inbound_tx, outbound_rx, stop).await {
                tracing::error!(error = %err, "MQTT client failed");
                let _ = fatal_tx.send(err.into_domain()).await;
            }
        }
    });

    let loaded = dispatcher
        .load(config.device_specs())
        .await
        .context("invalid device definition in configuration")?;
    tracing::info!(devices = loaded, "devices loaded");

    // HTTP
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    let info = BridgeInfo {
        name: APP_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        start_time: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default(),
    };
    let app = udin2mqtt_adapter_http_axum::router::build(AppState::new(registry, control_tx, info));
    tracing::info!(address = %bind_addr, "control surface listening");
    let http_task = tokio::spawn({
        let stop = stopped(stop_rx);
        async move {
            if let Err(err) = axum::serve(listener, app).with_graceful_shutdown(stop).await {
                tracing::error!(error = %err, "HTTP server failed");
            }
        }
    });

    let inputs = DispatcherInputs {
        commands: inbound_rx,
        control: control_rx,
        fatal: fatal_rx,
    };
    let result = dispatcher.run(inputs, shutdown_signal()).await;

    let _ = stop_tx.send(true);
    if let Err(err) = bus_task.await {
        tracing::warn!(error = %err, "MQTT task did not finish cleanly");
    }
    if let Err(err) = http_task.await {
        tracing::warn!(error = %err, "HTTP task did not finish cleanly");
    }
    result.context("dispatch loop stopped on a fatal error")?;
    tracing::info!("udin2mqttd stopped");
    Ok(())
}

fn init_tracing(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();
}

/// Open every endpoint and identify the board behind it.
fn attach_controllers(serial: &SerialConfig) -> anyhow::Result<ControllerSet> {
    let mut controllers = ControllerSet::new();
    for endpoint in &serial.endpoints {
        let line = udin2mqtt_adapter_serial::open(endpoint, serial.baud_rate)
            .with_context(|| format!("failed to open UDIN endpoint {endpoint}"))?;
        let controller = Controller::connect(line)
            .with_context(|| format!("failed to identify UDIN board on {endpoint}"))?;
        tracing::info!(%endpoint, controller = %controller, "found UDIN controller");
        if let Some(previous) = controllers.insert(controller) {
            tracing::warn!(controller = %previous, "controller replaced by one with the same name");
        }
    }
    Ok(controllers)
}

async fn stopped(mut stop: watch::Receiver<bool>) {
    let _ = stop.wait_for(|stop| *stop).await;
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
