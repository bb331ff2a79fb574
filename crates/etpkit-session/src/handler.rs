//! The protocol handler abstraction.

use std::sync::OnceLock;

use async_trait::async_trait;

use etpkit_protocol::types::core::SupportedProtocol;
use etpkit_protocol::{ErrorInfo, EtpError, EtpResult, MessageHeader, ProtocolId, Role};
use etpkit_wire::InboundBody;

use crate::registry::ContractId;
use crate::session::SessionHandle;

/// What a handler declares about itself at registration time.
#[derive(Debug, Clone, Copy)]
pub struct HandlerDescriptor {
    /// The protocol this handler speaks.
    pub protocol: ProtocolId,
    /// The role the local peer plays on this protocol.
    pub local_role: Role,
    /// The role the remote peer plays.
    pub remote_role: Role,
    /// The handler's contract tag.
    pub contract: ContractId,
}

/// A peer protocol exception, surfaced as a handler event.
#[derive(Debug, Clone)]
pub struct ExceptionReceived {
    /// Header of the exception message.
    pub header: MessageHeader,
    /// The carried error.
    pub error: ErrorInfo,
}

/// Per-protocol state and dispatch.
///
/// The session calls [`handle_message`](Self::handle_message) for every
/// inbound message on the handler's protocol, in receive order, from a single
/// dispatch task. A returned error is converted into an outbound
/// `ProtocolException` correlated to the failing message; the session stays
/// open.
///
/// Handlers must not mutate shared state outside their own synchronization;
/// outbound traffic always goes through the session's send lock via
/// [`SessionHandle::send_message`].
#[async_trait]
pub trait ProtocolHandler: Send + Sync + 'static {
    /// The handler's protocol, roles, and contract.
    fn descriptor(&self) -> HandlerDescriptor;

    /// Called at registration with the handle the handler sends through.
    fn attach(&self, session: SessionHandle);

    /// Called once registration has completed.
    fn on_registered(&self) {}

    /// Called after negotiation, in registration order, with both the
    /// requested and the negotiated protocol lists.
    async fn on_session_opened(
        &self,
        requested: &[SupportedProtocol],
        negotiated: &[SupportedProtocol],
    ) {
        let _ = (requested, negotiated);
    }

    /// Called when the session reaches `Closed`, in registration order.
    async fn on_session_closed(&self, reason: Option<&str>) {
        let _ = reason;
    }

    /// Called for every inbound `ProtocolException` on this protocol,
    /// including locally raised send failures.
    fn on_protocol_exception(&self, header: &MessageHeader, error: &ErrorInfo) {
        let _ = (header, error);
    }

    /// Dispatches one inbound message.
    async fn handle_message(&self, header: &MessageHeader, body: &InboundBody) -> EtpResult<()>;
}

/// A handler's slot for the session handle, filled at registration.
#[derive(Debug, Default)]
pub struct SessionSlot(OnceLock<SessionHandle>);

impl SessionSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the handle; a second bind on the same handler is ignored with
    /// a warning.
    pub fn bind(&self, session: SessionHandle) {
        if self.0.set(session).is_err() {
            tracing::warn!("handler already bound to a session; ignoring rebind");
        }
    }

    /// The bound handle, or `SessionClosed` if the handler was never
    /// registered.
    pub fn get(&self) -> EtpResult<SessionHandle> {
        self.0.get().cloned().ok_or(EtpError::SessionClosed)
    }
}
