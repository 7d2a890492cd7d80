//! MQTT adapter error types.

use udin2mqtt_domain::error::BridgeError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The rumqttc client could not queue a request.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),

    /// The connection task panicked or was cancelled.
    #[error("MQTT connection task failed")]
    Task(#[source] tokio::task::JoinError),
}

impl MqttError {
    /// Convert into a [`BridgeError::Bus`] for propagation across port
    /// boundaries.
    pub fn into_domain(self) -> BridgeError {
        BridgeError::Bus(Box::new(self))
    }
}

impl From<MqttError> for BridgeError {
    fn from(err: MqttError) -> Self {
        err.into_domain()
    }
}
