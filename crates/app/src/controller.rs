//! Controller driver — one attached UDIN board and its typed operations.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use udin2mqtt_domain::board::BoardModel;
use udin2mqtt_domain::name::sanitize;
use udin2mqtt_domain::protocol::Request;
use udin2mqtt_domain::relay::RelayAddress;

use crate::ports::{LineTransport, TransportError};

/// Errors raised by a [`Controller`].
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("failed to identify UDIN device {endpoint}")]
    Identify {
        endpoint: String,
        #[source]
        source: TransportError,
    },

    #[error("unsupported UDIN device {endpoint}: {model:?}")]
    UnsupportedModel { endpoint: String, model: String },

    #[error("invalid relay {index} on {controller} (relays 1..={count})")]
    InvalidRelay {
        controller: String,
        index: u8,
        count: u8,
    },

    #[error("UDIN {controller} exchange failed")]
    Transport {
        controller: String,
        #[source]
        source: TransportError,
    },
}

/// Outcome of a failed pulse. Each step reports its own error.
#[derive(Debug)]
pub struct PulseError {
    pub relay: u8,
    /// Error of the switch-on step, if it failed.
    pub on: Option<ControllerError>,
    /// Error of the switch-off step, if it failed.
    pub off: Option<ControllerError>,
}

impl fmt::Display for PulseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pulse of relay {} failed", self.relay)?;
        if let Some(err) = &self.on {
            write!(f, "; on: {err}")?;
        }
        if let Some(err) = &self.off {
            write!(f, "; off: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for PulseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.on
            .as_ref()
            .or(self.off.as_ref())
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

/// An identified UDIN board owning its serial line.
///
/// Requests are serialized through an internal lock: the line protocol has
/// no multiplexing, so only one exchange may be in flight per transport.
pub struct Controller {
    name: String,
    key: String,
    model: String,
    board: BoardModel,
    transport: Mutex<Box<dyn LineTransport>>,
}

impl Controller {
    /// Identify the board behind `transport` and wrap it.
    ///
    /// Issues exactly one identify request.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Identify`] if the exchange fails and
    /// [`ControllerError::UnsupportedModel`] if the model line has an
    /// unknown prefix.
    pub fn connect<T: LineTransport + 'static>(mut transport: T) -> Result<Self, ControllerError> {
        let name = transport.identifier().to_lowercase();
        let model = transport
            .send(Request::Identify)
            .map_err(|source| ControllerError::Identify {
                endpoint: name.clone(),
                source,
            })?;
        let board = BoardModel::from_model_line(&model).ok_or_else(|| {
            ControllerError::UnsupportedModel {
                endpoint: name.clone(),
                model: model.clone(),
            }
        })?;
        let controller = Self {
            key: sanitize(&name),
            name,
            model,
            board,
            transport: Mutex::new(Box::new(transport)),
        };
        tracing::debug!(controller = %controller, "UDIN device identified");
        Ok(controller)
    }

    /// Lower-cased endpoint identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sanitized name, used in relay addresses and as lookup key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Full model line reported by the board.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn relay_count(&self) -> u8 {
        self.board.relay_count()
    }

    #[must_use]
    pub fn input_count(&self) -> u8 {
        self.board.input_count()
    }

    /// Every relay on this board, in index order.
    pub fn relays(&self) -> impl Iterator<Item = RelayAddress> + '_ {
        (1..=self.relay_count()).map(|index| RelayAddress::new(self.key.clone(), index))
    }

    /// Switch relay `index` on.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidRelay`] without touching the line
    /// when `index` is out of range, or [`ControllerError::Transport`].
    pub fn relay_on(&self, index: u8) -> Result<(), ControllerError> {
        self.check_relay(index)?;
        self.exchange(Request::On(index)).map(drop)
    }

    /// Switch relay `index` off.
    ///
    /// # Errors
    ///
    /// Same as [`relay_on`](Self::relay_on).
    pub fn relay_off(&self, index: u8) -> Result<(), ControllerError> {
        self.check_relay(index)?;
        self.exchange(Request::Off(index)).map(drop)
    }

    /// Switch relay `index` on, hold for `hold`, then switch it off.
    ///
    /// The off step is always attempted so the relay is released whenever
    /// the line allows it; the hold is skipped when the on step failed.
    /// Blocks the calling thread.
    ///
    /// # Errors
    ///
    /// Returns a [`PulseError`] carrying the failure of each step.
    pub fn pulse(&self, index: u8, hold: Duration) -> Result<(), PulseError> {
        let on = self.relay_on(index).err();
        if on.is_none() {
            std::thread::sleep(hold);
        }
        let off = self.relay_off(index).err();
        if on.is_none() && off.is_none() {
            return Ok(());
        }
        Err(PulseError {
            relay: index,
            on,
            off,
        })
    }

    fn check_relay(&self, index: u8) -> Result<(), ControllerError> {
        let count = self.relay_count();
        if index == 0 || index > count {
            return Err(ControllerError::InvalidRelay {
                controller: self.key.clone(),
                index,
                count,
            });
        }
        Ok(())
    }

    fn exchange(&self, request: Request) -> Result<String, ControllerError> {
        let mut transport = self
            .transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let response = transport
            .send(request)
            .map_err(|source| ControllerError::Transport {
                controller: self.key.clone(),
                source,
            })?;
        tracing::trace!(controller = %self.key, %request, %response, "UDIN exchange");
        Ok(response)
    }
}

impl fmt::Display for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (r={} i={})",
            self.name,
            self.model,
            self.relay_count(),
            self.input_count()
        )
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("key", &self.key)
            .field("model", &self.model)
            .field("board", &self.board)
            .finish_non_exhaustive()
    }
}

/// The attached controllers, keyed by [`Controller::key`].
#[derive(Debug, Default)]
pub struct ControllerSet {
    controllers: BTreeMap<String, Arc<Controller>>,
}

impl ControllerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a controller. Returns the one previously held under the same
    /// key, if any.
    pub fn insert(&mut self, controller: Controller) -> Option<Arc<Controller>> {
        self.controllers
            .insert(controller.key().to_string(), Arc::new(controller))
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<Controller>> {
        self.controllers.get(key).cloned()
    }

    /// Every relay on every attached controller.
    pub fn relays(&self) -> impl Iterator<Item = RelayAddress> + '_ {
        self.controllers.values().flat_map(|controller| controller.relays())
    }
}
