//! The ETP session: id allocation, send serialization, inbound routing,
//! negotiation, and lifecycle.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use etpkit_protocol::catalog::MESSAGE_TYPE_PROTOCOL_EXCEPTION;
use etpkit_protocol::types::core::{
    self as core_msg, CloseSession, OpenSession, ProtocolException, RequestSession,
    SupportedProtocol,
};
use etpkit_protocol::{
    Capabilities, ErrorCode, ErrorInfo, EtpError, EtpResult, EtpVersion, MessageFlags,
    MessageHeader, ProtocolId, Role,
};
use etpkit_transport_traits::{Frame, Transport};
use etpkit_wire::{FrameCodec, MessageEncoding};

use crate::correlation::{CorrelationOutcome, CorrelationTracker, PendingRequest, ReplyDisposition};
use crate::handler::ProtocolHandler;
use crate::handlers::core::CoreHandler;
use crate::registry::{HandlerContract, HandlerRegistry};

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created; negotiation has not completed.
    Negotiating,
    /// Negotiation succeeded; steady state.
    Open,
    /// `close` in progress; no new sends are accepted.
    Closing,
    /// Terminal; all pending correlations have been discarded.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Negotiating => "negotiating",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Session construction parameters.
///
/// Everything environmental is injected here (the application identity sent
/// in `RequestSession`, the encoding, the advertised capabilities, the
/// timeouts), so there is no process-wide mutable state.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The side this peer plays: [`Role::Customer`] or [`Role::Store`].
    pub role: Role,
    /// Wire version for this session.
    pub version: EtpVersion,
    /// Message encoding, latched for the session lifetime.
    pub encoding: MessageEncoding,
    /// Application name advertised during negotiation.
    pub application_name: String,
    /// Application version advertised during negotiation.
    pub application_version: String,
    /// Capabilities attached to each advertised protocol.
    pub capabilities: Capabilities,
    /// How long `open`/`serve` wait for negotiation to finish.
    pub negotiation_timeout: std::time::Duration,
    /// Bound on waiting for in-flight sends while closing.
    pub close_timeout: std::time::Duration,
    /// Period of the correlation deadline sweeper.
    pub sweep_interval: std::time::Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            role: Role::Customer,
            version: EtpVersion::V11,
            encoding: MessageEncoding::Binary,
            application_name: "etpkit".to_owned(),
            application_version: env!("CARGO_PKG_VERSION").to_owned(),
            capabilities: Capabilities::new(),
            negotiation_timeout: std::time::Duration::from_secs(30),
            close_timeout: std::time::Duration::from_secs(5),
            sweep_interval: std::time::Duration::from_millis(250),
        }
    }
}

impl SessionConfig {
    /// A customer-side config for the given version.
    pub fn customer(version: EtpVersion) -> Self {
        Self {
            role: Role::Customer,
            version,
            ..Self::default()
        }
    }

    /// A store-side config for the given version.
    pub fn store(version: EtpVersion) -> Self {
        Self {
            role: Role::Store,
            version,
            ..Self::default()
        }
    }
}

pub(crate) struct SessionCore {
    pub(crate) config: SessionConfig,
    pub(crate) codec: FrameCodec,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) registry: HandlerRegistry,
    pub(crate) correlations: Arc<CorrelationTracker>,
    state: watch::Sender<SessionState>,
    session_id: RwLock<Option<String>>,
    next_message_id: AtomicI64,
    send_gate: tokio::sync::Mutex<()>,
    pub(crate) shutdown: broadcast::Sender<()>,
    teardown_started: AtomicBool,
}

impl SessionCore {
    pub(crate) fn state_now(&self) -> SessionState {
        *self.state.borrow()
    }

    pub(crate) fn session_id(&self) -> Option<String> {
        self.session_id.read().clone()
    }

    /// Stamps, encodes, and writes one message under the send lock.
    ///
    /// `before_send` runs synchronously after the id is stamped and before
    /// bytes reach the wire, so callers can record correlation first. On
    /// encode or transport failure a local `ProtocolException(InvalidState)`
    /// is raised on the same protocol while the lock is still held, so it
    /// cannot interleave with a later caller's send, and the
    /// already-allocated id is returned.
    pub(crate) async fn send_message<T: Serialize>(
        &self,
        header: MessageHeader,
        body: &T,
        before_send: impl FnOnce(&MessageHeader),
    ) -> EtpResult<i64> {
        if matches!(self.state_now(), SessionState::Closing | SessionState::Closed) {
            return Err(EtpError::SessionClosed);
        }
        let _gate = self.send_gate.lock().await;
        let mut header = header;
        header.message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        before_send(&header);

        if let Err(send_error) = self.encode_and_write(&header, body).await {
            error!(error = %send_error, %header, "send failed; raising local protocol exception");
            let info = ErrorInfo::new(ErrorCode::InvalidState, send_error.to_string());
            self.correlations.fail(header.message_id, info.clone());
            if let Some(handler) = self.registry.get(header.protocol) {
                let exception_header = MessageHeader::response(
                    header.protocol,
                    MESSAGE_TYPE_PROTOCOL_EXCEPTION,
                    header.message_id,
                    MessageFlags::NONE,
                );
                handler.on_protocol_exception(&exception_header, &info);
            }
        }
        Ok(header.message_id)
    }

    /// Send path without the lifecycle check or the failure exception, used
    /// for `CloseSession` during teardown and for outbound protocol
    /// exceptions (which must not recurse).
    async fn send_plain<T: Serialize>(&self, header: MessageHeader, body: &T) -> EtpResult<i64> {
        let _gate = self.send_gate.lock().await;
        let mut header = header;
        header.message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.encode_and_write(&header, body).await?;
        Ok(header.message_id)
    }

    async fn encode_and_write<T: Serialize>(
        &self,
        header: &MessageHeader,
        body: &T,
    ) -> EtpResult<()> {
        let frame = self.codec.encode(header, body)?;
        self.transport
            .send(frame)
            .await
            .map_err(|err| EtpError::Transport(err.to_string()))?;
        trace!(%header, "frame written");
        Ok(())
    }

    pub(crate) async fn send_protocol_exception(
        &self,
        protocol: ProtocolId,
        correlation_id: i64,
        code: ErrorCode,
        message: String,
    ) {
        if matches!(self.state_now(), SessionState::Closing | SessionState::Closed) {
            return;
        }
        let body = ProtocolException {
            error_code: code.code(),
            error_message: message,
            errors: None,
        };
        let header = MessageHeader::response(
            protocol,
            MESSAGE_TYPE_PROTOCOL_EXCEPTION,
            correlation_id,
            MessageFlags::NONE,
        );
        if let Err(err) = self.send_plain(header, &body).await {
            warn!(error = %err, "failed to send protocol exception");
        }
    }

    /// Routes one inbound frame: decode the header, then dispatch to the
    /// registered handler or answer `UnsupportedProtocol` on Core.
    pub(crate) async fn dispatch_frame(&self, frame: Frame) {
        let (header, body) = match self.codec.decode(&frame) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(error = %err, kind = frame.kind(), "dropping malformed frame");
                self.send_protocol_exception(
                    ProtocolId::CORE,
                    0,
                    ErrorCode::InvalidArgument,
                    err.to_string(),
                )
                .await;
                return;
            }
        };
        trace!(%header, "dispatching inbound message");

        if header.message_type == MESSAGE_TYPE_PROTOCOL_EXCEPTION {
            self.handle_protocol_exception(&header, &body);
            return;
        }

        let Some(handler) = self.registry.get(header.protocol) else {
            debug!(protocol = %header.protocol, "message for unregistered protocol dropped");
            self.send_protocol_exception(
                ProtocolId::CORE,
                header.message_id,
                ErrorCode::UnsupportedProtocol,
                format!("protocol {} is not supported on this session", header.protocol),
            )
            .await;
            return;
        };

        if let Err(err) = handler.handle_message(&header, &body).await {
            warn!(error = %err, %header, "handler failed; replying with protocol exception");
            self.send_protocol_exception(
                header.protocol,
                header.message_id,
                err.wire_code(),
                err.to_string(),
            )
            .await;
        }

        if header.correlation_id != 0
            && self.correlations.record_reply(&header, &body) == ReplyDisposition::Orphan
        {
            debug!(correlation_id = header.correlation_id, "orphan reply dropped");
        }
    }

    fn handle_protocol_exception(&self, header: &MessageHeader, body: &etpkit_wire::InboundBody) {
        let exception: ProtocolException = match body.decode() {
            Ok(exception) => exception,
            Err(err) => {
                warn!(error = %err, "undecodable protocol exception dropped");
                return;
            }
        };
        let info = exception.info();
        warn!(%header, error = %info, "peer protocol exception");

        if let Some(handler) = self.registry.get(header.protocol) {
            handler.on_protocol_exception(header, &info);
        }
        if header.correlation_id != 0 && !self.correlations.fail(header.correlation_id, info) {
            debug!(
                correlation_id = header.correlation_id,
                "protocol exception for unknown correlation"
            );
        }
    }

    /// Store-side negotiation: intersect the peer's request with the local
    /// registry, answer `OpenSession`, drop handlers outside the
    /// intersection, and open the session.
    pub(crate) async fn negotiate_as_server(
        &self,
        request_header: &MessageHeader,
        request: RequestSession,
    ) -> EtpResult<()> {
        if self.state_now() != SessionState::Negotiating {
            return Err(EtpError::InvalidState(
                "session request received after negotiation".into(),
            ));
        }

        let requested = SupportedProtocol::dedup(request.requested_protocols);
        let mut accepted_from_peer = Vec::new();
        let mut negotiated = Vec::new();
        for entry in &requested {
            if EtpVersion::from_record(&entry.protocol_version) != Some(self.config.version) {
                continue;
            }
            let Some(handler) = self.registry.get(entry.protocol) else {
                continue;
            };
            let descriptor = handler.descriptor();
            if descriptor.protocol == ProtocolId::CORE || descriptor.remote_role != entry.role {
                continue;
            }
            accepted_from_peer.push(entry.clone());
            let mut supported = SupportedProtocol::new(
                descriptor.protocol,
                self.config.version,
                descriptor.local_role,
            );
            supported.protocol_capabilities = self.config.capabilities.clone();
            negotiated.push(supported);
        }

        if negotiated.is_empty() {
            return Err(EtpError::NotSupported(
                "no requested protocol is supported by this store".into(),
            ));
        }

        let session_id = Uuid::new_v4().to_string();
        *self.session_id.write() = Some(session_id.clone());

        let open = OpenSession {
            session_id: session_id.clone(),
            supported_protocols: negotiated.clone(),
        };
        let header = MessageHeader::response(
            ProtocolId::CORE,
            core_msg::OPEN_SESSION,
            request_header.message_id,
            MessageFlags::NONE,
        );
        self.send_message(header, &open, |_| {}).await?;

        for protocol in self.registry.unregister_unsupported(&accepted_from_peer) {
            debug!(%protocol, "handler outside negotiated set removed");
        }
        self.state.send_replace(SessionState::Open);
        info!(
            application = %request.application_name,
            %session_id,
            protocols = negotiated.len(),
            "session open"
        );
        self.fire_session_opened(&requested, &negotiated).await;
        Ok(())
    }

    pub(crate) async fn fire_session_opened(
        &self,
        requested: &[SupportedProtocol],
        negotiated: &[SupportedProtocol],
    ) {
        for handler in self.registry.in_order() {
            handler.on_session_opened(requested, negotiated).await;
        }
    }

    /// Single teardown path for local close, peer close, and transport loss.
    /// Idempotent: the second and later callers observe the work as done.
    pub(crate) async fn teardown(&self, reason: Option<&str>, send_close: bool) {
        if self.teardown_started.swap(true, Ordering::SeqCst) {
            return;
        }
        self.state.send_replace(SessionState::Closing);

        if send_close {
            let close = CloseSession {
                reason: reason.unwrap_or("session closed").to_owned(),
            };
            let header = MessageHeader::request(ProtocolId::CORE, core_msg::CLOSE_SESSION);
            // The send gate queues us behind in-flight sends; the wait is
            // bounded by the close timeout.
            match tokio::time::timeout(self.config.close_timeout, self.send_plain(header, &close))
                .await
            {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => debug!(error = %err, "close notification not delivered"),
                Err(_) => warn!("timed out waiting for in-flight sends during close"),
            }
        }

        let discarded = self.correlations.complete_all_closed();
        if discarded > 0 {
            debug!(discarded, "pending correlations completed with session-closed");
        }
        if let Err(err) = self.transport.close().await {
            debug!(error = %err, "transport close failed");
        }
        let _ = self.shutdown.send(());
        self.state.send_replace(SessionState::Closed);
        info!(reason = reason.unwrap_or(""), "session closed");

        for handler in self.registry.in_order() {
            handler.on_session_closed(reason).await;
        }
    }
}

impl fmt::Debug for SessionCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCore")
            .field("role", &self.config.role)
            .field("version", &self.config.version)
            .field("state", &self.state_now())
            .field("session_id", &self.session_id())
            .finish()
    }
}

/// A cheap, cloneable handle for sending on a session.
///
/// Handlers hold one of these; it does not keep the session alive, so sends
/// after the session is dropped fail with `SessionClosed`.
#[derive(Clone)]
pub struct SessionHandle {
    core: Weak<SessionCore>,
}

impl SessionHandle {
    pub(crate) fn core(&self) -> EtpResult<Arc<SessionCore>> {
        self.core.upgrade().ok_or(EtpError::SessionClosed)
    }

    /// Sends one message, stamping its `message_id` inside the send critical
    /// section and returning the allocated id.
    ///
    /// `before_send` is invoked synchronously with the stamped header before
    /// any bytes hit the wire, so callers can register correlation first.
    pub async fn send_message<T: Serialize>(
        &self,
        header: MessageHeader,
        body: &T,
        before_send: impl FnOnce(&MessageHeader),
    ) -> EtpResult<i64> {
        self.core()?.send_message(header, body, before_send).await
    }

    /// Sends one message with no correlation bookkeeping.
    pub async fn send<T: Serialize>(&self, header: MessageHeader, body: &T) -> EtpResult<i64> {
        self.send_message(header, body, |_| {}).await
    }

    /// The session's correlation tracker.
    pub fn correlations(&self) -> EtpResult<Arc<CorrelationTracker>> {
        Ok(self.core()?.correlations.clone())
    }

    /// The session's negotiated wire version.
    pub fn version(&self) -> EtpResult<EtpVersion> {
        Ok(self.core()?.config.version)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EtpResult<SessionState> {
        Ok(self.core()?.state_now())
    }

    /// The server-assigned session id, once negotiation completed.
    pub fn session_id(&self) -> EtpResult<Option<String>> {
        Ok(self.core()?.session_id())
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionHandle")
    }
}

/// A client/server ETP session over one transport.
///
/// Construction registers the Core handler; the application registers its
/// protocol handlers, then either [`open`](Self::open)s (customer side) or
/// [`serve`](Self::serve)s (store side). All sends happen through
/// [`SessionHandle`]s handed to the handlers at registration.
pub struct EtpSession {
    core: Arc<SessionCore>,
    started: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl EtpSession {
    /// Creates a session over `transport`.
    pub fn new(config: SessionConfig, transport: Arc<dyn Transport>) -> EtpResult<Self> {
        let role = config.role;
        if !matches!(role, Role::Customer | Role::Store) {
            return Err(EtpError::InvalidArgument(
                "session role must be customer or store".into(),
            ));
        }
        let codec = FrameCodec::new(config.encoding);
        let (state, _) = watch::channel(SessionState::Negotiating);
        let (shutdown, _) = broadcast::channel(4);
        let core = Arc::new(SessionCore {
            config,
            codec,
            transport,
            registry: HandlerRegistry::new(),
            correlations: Arc::new(CorrelationTracker::new()),
            state,
            session_id: RwLock::new(None),
            next_message_id: AtomicI64::new(0),
            send_gate: tokio::sync::Mutex::new(()),
            shutdown,
            teardown_started: AtomicBool::new(false),
        });
        let session = Self {
            core,
            started: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        };
        session.register(Arc::new(CoreHandler::new(role)))?;
        Ok(session)
    }

    /// A handle for sending on this session.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            core: Arc::downgrade(&self.core),
        }
    }

    /// Registers a protocol handler. Only valid before the session opens;
    /// the registry is not mutated in steady state.
    pub fn register<H>(&self, handler: Arc<H>) -> EtpResult<()>
    where
        H: ProtocolHandler + HandlerContract,
    {
        if self.core.state_now() != SessionState::Negotiating {
            return Err(EtpError::InvalidState(
                "handlers must be registered before the session opens".into(),
            ));
        }
        self.core.registry.register(handler.clone())?;
        handler.attach(self.handle());
        handler.on_registered();
        debug!(contract = %H::CONTRACT, "handler registered");
        Ok(())
    }

    /// Fetches a registered handler by contract.
    pub fn handler<H>(&self) -> EtpResult<Arc<H>>
    where
        H: ProtocolHandler + HandlerContract,
    {
        self.core.registry.contract_handler::<H>()
    }

    /// Returns `true` if the contract survived registration and negotiation.
    pub fn can_handle<H>(&self) -> bool
    where
        H: ProtocolHandler + HandlerContract,
    {
        self.core.registry.contains_contract(H::CONTRACT)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.core.state_now()
    }

    /// The server-assigned session id, once negotiation completed.
    pub fn session_id(&self) -> Option<String> {
        self.core.session_id()
    }

    /// The session's wire version.
    pub fn version(&self) -> EtpVersion {
        self.core.config.version
    }

    /// Spawns the receive loop and the correlation deadline sweeper.
    ///
    /// [`open`](Self::open) and [`serve`](Self::serve) call this; calling it
    /// directly is only needed to exchange traffic before negotiation.
    /// Idempotent.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut tasks = self.tasks.lock();

        let core = self.core.clone();
        let mut shutdown = core.shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    received = core.transport.receive() => match received {
                        Ok(Some(frame)) => core.dispatch_frame(frame).await,
                        Ok(None) => {
                            debug!("transport closed by peer");
                            core.teardown(Some("transport closed"), false).await;
                            break;
                        }
                        Err(err) => {
                            error!(error = %err, "transport receive failed");
                            core.teardown(Some("transport failure"), false).await;
                            break;
                        }
                    }
                }
            }
        }));

        let core = self.core.clone();
        let mut shutdown = core.shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(core.config.sweep_interval);
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = ticker.tick() => {
                        for message_id in core.correlations.expire_due() {
                            debug!(message_id, "correlation deadline elapsed");
                        }
                    }
                }
            }
        }));
    }

    /// Customer-side open: sends `RequestSession`, awaits `OpenSession`,
    /// drops handlers outside the negotiated set, fires `on_session_opened`
    /// in registration order, and returns the server-assigned session id.
    pub async fn open(&self) -> EtpResult<String> {
        if self.core.config.role != Role::Customer {
            return Err(EtpError::InvalidState(
                "open() is the customer side; stores use serve()".into(),
            ));
        }
        if self.core.state_now() != SessionState::Negotiating {
            return Err(EtpError::InvalidState("session already opened".into()));
        }
        self.start();

        let requested = self
            .core
            .registry
            .local_supported(self.core.config.version, &self.core.config.capabilities);
        let request = RequestSession {
            application_name: self.core.config.application_name.clone(),
            application_version: self.core.config.application_version.clone(),
            requested_protocols: requested.clone(),
        };

        let (completion, response) = oneshot::channel();
        let tracker = self.core.correlations.clone();
        let deadline = tokio::time::Instant::now() + self.core.config.negotiation_timeout;
        let header = MessageHeader::request(ProtocolId::CORE, core_msg::REQUEST_SESSION);
        self.core
            .send_message(header, &request, |stamped| {
                tracker.register(
                    stamped.message_id,
                    PendingRequest::new(ProtocolId::CORE)
                        .with_expected_types(vec![core_msg::OPEN_SESSION])
                        .with_completion(completion)
                        .with_deadline(deadline),
                );
            })
            .await?;

        match response.await.map_err(|_| EtpError::SessionClosed)? {
            CorrelationOutcome::Completed(parts) => {
                let open: OpenSession = parts
                    .first()
                    .ok_or_else(|| EtpError::Codec("empty OpenSession response".into()))?
                    .body
                    .decode()?;
                *self.core.session_id.write() = Some(open.session_id.clone());
                for protocol in self
                    .core
                    .registry
                    .unregister_unsupported(&open.supported_protocols)
                {
                    debug!(%protocol, "handler outside negotiated set removed");
                }
                self.core.state.send_replace(SessionState::Open);
                info!(session_id = %open.session_id, "session open");
                self.core
                    .fire_session_opened(&requested, &open.supported_protocols)
                    .await;
                Ok(open.session_id)
            }
            CorrelationOutcome::Failed(info) => Err(EtpError::Remote(info)),
            CorrelationOutcome::TimedOut => Err(EtpError::Timeout),
            CorrelationOutcome::SessionClosed => Err(EtpError::SessionClosed),
        }
    }

    /// Store-side open: starts the receive loop and waits for the peer's
    /// `RequestSession` to negotiate the session. Returns the assigned
    /// session id.
    pub async fn serve(&self) -> EtpResult<String> {
        if self.core.config.role != Role::Store {
            return Err(EtpError::InvalidState(
                "serve() is the store side; customers use open()".into(),
            ));
        }
        self.start();

        let mut state = self.core.state.subscribe();
        let waited = tokio::time::timeout(
            self.core.config.negotiation_timeout,
            state.wait_for(|current| matches!(current, SessionState::Open | SessionState::Closed)),
        )
        .await;
        match waited {
            Err(_) => Err(EtpError::Timeout),
            Ok(Err(_)) => Err(EtpError::SessionClosed),
            Ok(Ok(current)) => {
                let reached = *current;
                drop(current);
                if reached == SessionState::Open {
                    Ok(self.core.session_id().unwrap_or_default())
                } else {
                    Err(EtpError::SessionClosed)
                }
            }
        }
    }

    /// Closes the session: best-effort `CloseSession`, bounded wait for
    /// in-flight sends, transport close, completion of all pending
    /// correlations, and `on_session_closed` on every handler. Idempotent.
    pub async fn close(&self, reason: &str) -> EtpResult<()> {
        self.core.teardown(Some(reason), true).await;
        Ok(())
    }
}

impl fmt::Debug for EtpSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EtpSession").field("core", &self.core).finish()
    }
}

impl Drop for EtpSession {
    fn drop(&mut self) {
        // Stop the background tasks; transport close happened in teardown if
        // the application closed cleanly.
        let _ = self.core.shutdown.send(());
    }
}
