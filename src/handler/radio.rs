//! Handler for radio modules.
//!
//! The radio module forwards what it hears to the host as lines on its UART,
//! so receiving works like a wired bridge. Transmitting through the radio is
//! not implemented yet: [`Handler::send`] returns
//! [`AppError::NotImplemented`] instead of claiming success.

use tracing::warn;

use crate::config::LinkConfig;
use crate::handler::{Handler, HandlerState, LinkCore, LinkStats, Outbound};
use crate::transport::Transport;
use crate::{AppError, Result};

/// Receive-only handler for a radio module's line feed.
#[derive(Debug)]
pub struct RadioHandler<T> {
    core: LinkCore<T>,
}

impl<T: Transport> RadioHandler<T> {
    /// Bind `transport` (the module's UART) to a handler identified as `node_id`.
    #[must_use]
    pub fn new(node_id: impl Into<String>, transport: T, link: LinkConfig) -> Self {
        Self {
            core: LinkCore::new(node_id.into(), transport, link),
        }
    }

    /// Shared access to the owned transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.core.transport
    }
}

impl<T: Transport> Handler for RadioHandler<T> {
    fn begin(&mut self) -> Result<()> {
        self.core.begin()
    }

    /// Not implemented: the radio transmit path does not exist yet.
    ///
    /// Lifecycle checks still apply, so a closed handler reports
    /// `InvalidState` rather than `NotImplemented`.
    fn send(&mut self, _message: Outbound) -> Result<()> {
        self.core.ensure_ready("send")?;
        warn!(node_id = self.core.node_id.as_str(), "radio send requested but not implemented");
        Err(AppError::NotImplemented("radio send".into()))
    }

    fn receive(&mut self) -> Result<Option<String>> {
        self.core.receive()
    }

    fn node_id(&self) -> &str {
        &self.core.node_id
    }

    fn set_node_id(&mut self, node_id: &str) {
        node_id.clone_into(&mut self.core.node_id);
    }

    fn close(&mut self) -> Result<()> {
        self.core.close()
    }

    fn state(&self) -> HandlerState {
        self.core.state
    }

    fn stats(&self) -> LinkStats {
        self.core.stats
    }
}
