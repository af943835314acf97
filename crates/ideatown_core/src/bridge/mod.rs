//! Message bridge between the agent and one attached UI surface.
//!
//! # Responsibility
//! - Decode UI commands from the wire envelope.
//! - Deliver notifications to the most recently attached surface.
//!
//! # Invariants
//! - At most one surface receives notifications; attaching replaces it.
//! - Notifications are fire-and-forget: delivery failures are logged and
//!   never surface to the caller.
//! - The bridge only reads state; it never writes the install store.

use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod origin;
pub mod protocol;

pub use origin::AllowedOrigins;
pub use protocol::{InboundCommand, OutboundMessage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    MalformedMessage(String),
    SurfaceClosed,
}

impl Display for BridgeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedMessage(message) => write!(f, "malformed bridge message: {message}"),
            Self::SurfaceClosed => write!(f, "ui surface is closed"),
        }
    }
}

impl Error for BridgeError {}

/// Delivery endpoint of an attached UI page.
pub trait UiSurface {
    fn post(&mut self, message: &OutboundMessage) -> Result<(), BridgeError>;
}

/// Outbound side of the bridge plus inbound decoding.
#[derive(Default)]
pub struct MessageBridge {
    surface: Option<Box<dyn UiSurface>>,
}

impl MessageBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `surface` the notification target, dropping any previous one.
    pub fn attach(&mut self, surface: Box<dyn UiSurface>) {
        if self.surface.replace(surface).is_some() {
            info!("event=surface_attach module=bridge status=ok replaced=true");
        } else {
            info!("event=surface_attach module=bridge status=ok replaced=false");
        }
    }

    pub fn detach(&mut self) {
        self.surface = None;
    }

    pub fn is_attached(&self) -> bool {
        self.surface.is_some()
    }

    /// Sends `message` to the current surface, if any.
    pub fn notify(&mut self, message: OutboundMessage) {
        let Some(surface) = self.surface.as_mut() else {
            debug!(
                "event=notify module=bridge status=skip reason=no_surface type={}",
                message.event_name()
            );
            return;
        };

        match surface.post(&message) {
            Ok(()) => debug!(
                "event=notify module=bridge status=ok type={}",
                message.event_name()
            ),
            Err(BridgeError::SurfaceClosed) => {
                warn!(
                    "event=notify module=bridge status=error reason=surface_closed type={}",
                    message.event_name()
                );
                self.surface = None;
            }
            Err(err) => warn!(
                "event=notify module=bridge status=error type={} error={}",
                message.event_name(),
                err
            ),
        }
    }

    /// Decodes one `{type, data}` envelope received from the UI.
    pub fn decode(raw: &str) -> Result<InboundCommand, BridgeError> {
        serde_json::from_str(raw).map_err(|err| BridgeError::MalformedMessage(err.to_string()))
    }
}
