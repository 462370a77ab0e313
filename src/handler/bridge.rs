//! Handler for wired bridges.
//!
//! Covers every link where the node talks to the dispatcher through a plain
//! byte stream: a local UART, a UART exposed over TCP, or an in-process pair.

use crate::config::LinkConfig;
use crate::handler::{Handler, HandlerState, LinkCore, LinkStats, Outbound};
use crate::transport::Transport;
use crate::Result;

/// Full-duplex handler over any [`Transport`].
///
/// ```
/// use bifrost::config::LinkConfig;
/// use bifrost::handler::{BridgeHandler, Handler};
/// use bifrost::transport::MemoryTransport;
///
/// let (node_side, hub_side) = MemoryTransport::pair();
/// let mut node = BridgeHandler::new("sensor1", node_side, LinkConfig::default());
/// let mut hub = BridgeHandler::new("hub", hub_side, LinkConfig::default());
/// node.begin().unwrap();
/// hub.begin().unwrap();
///
/// assert_eq!(hub.receive().unwrap(), None);
/// node.send("hello".into()).unwrap();
/// assert_eq!(hub.receive().unwrap().as_deref(), Some("hello"));
/// ```
#[derive(Debug)]
pub struct BridgeHandler<T> {
    core: LinkCore<T>,
}

impl<T: Transport> BridgeHandler<T> {
    /// Bind `transport` to a handler identified as `node_id`.
    ///
    /// `link` is handed to [`Transport::open`] on [`Handler::begin`].
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

    /// Link parameters used on `begin`.
    #[must_use]
    pub fn link(&self) -> &LinkConfig {
        &self.core.link
    }
}

impl<T: Transport> Handler for BridgeHandler<T> {
    fn begin(&mut self) -> Result<()> {
        self.core.begin()
    }

    fn send(&mut self, message: Outbound) -> Result<()> {
        self.core.send(message)
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
