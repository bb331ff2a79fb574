//! GrowingObject protocol handlers (protocol 6).
//!
//! Range endpoints travel as discriminated unions with their unit-of-measure
//! and depth-datum annotations; the handlers pass them through untouched.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use etpkit_protocol::types::core::{ProtocolException, SupportedProtocol};
use etpkit_protocol::types::growing_object::{
    self as go_msg, DeleteParts, DeletePartsByRange, GetParts, GetPartsByRange, GetPartsResponse,
    GrowingObjectDelete, GrowingObjectDeleteRange, GrowingObjectGet, GrowingObjectGetRange,
    GrowingObjectPut, IndexRange, ObjectFragment, ObjectPart, PutParts, ReplacePartsByRange,
};
use etpkit_protocol::{
    ErrorInfo, EtpError, EtpResult, EtpVersion, MessageFlags, MessageHeader, ProtocolId, Role,
};
use etpkit_wire::InboundBody;

use crate::correlation::{CorrelationOutcome, PendingRequest};
use crate::events::EventListeners;
use crate::handler::{ExceptionReceived, HandlerDescriptor, ProtocolHandler, SessionSlot};
use crate::registry::{ContractId, HandlerContract};
use crate::session::SessionHandle;

/// One growing-object part delivered to the customer side.
#[derive(Debug, Clone)]
pub struct FragmentReceived {
    /// Header of the carrying message.
    pub header: MessageHeader,
    /// Parent object URI.
    pub uri: String,
    /// Part uid, when the wire version carries one (ETP 1.2).
    pub uid: Option<String>,
    /// MIME type of `data`.
    pub content_type: String,
    /// The serialized part.
    pub data: Bytes,
}

/// Customer side of the GrowingObject protocol.
pub struct GrowingObjectCustomerHandler {
    session: SessionSlot,
    fragments: EventListeners<FragmentReceived>,
    exceptions: EventListeners<ExceptionReceived>,
    negotiated: Mutex<Option<Vec<SupportedProtocol>>>,
}

impl Default for GrowingObjectCustomerHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl GrowingObjectCustomerHandler {
    /// Creates a handler; register it on a customer session.
    pub fn new() -> Self {
        Self {
            session: SessionSlot::new(),
            fragments: EventListeners::new(),
            exceptions: EventListeners::new(),
            negotiated: Mutex::new(None),
        }
    }

    /// Parts arriving in response to gets.
    pub fn fragments(&self) -> &EventListeners<FragmentReceived> {
        &self.fragments
    }

    /// Protocol exceptions on the GrowingObject protocol.
    pub fn exceptions(&self) -> &EventListeners<ExceptionReceived> {
        &self.exceptions
    }

    /// The negotiated protocol list observed by `on_session_opened`.
    pub fn negotiated(&self) -> Option<Vec<SupportedProtocol>> {
        self.negotiated.lock().clone()
    }

    fn register_get(
        &self,
        tracker: &Arc<crate::correlation::CorrelationTracker>,
        completion: Option<oneshot::Sender<CorrelationOutcome>>,
        timeout: Option<Duration>,
    ) -> impl FnOnce(&MessageHeader) + use<> {
        let tracker = tracker.clone();
        move |stamped: &MessageHeader| {
            let mut pending = PendingRequest::new(ProtocolId::GROWING_OBJECT)
                .with_expected_types(vec![go_msg::OBJECT_FRAGMENT]);
            if let Some(completion) = completion {
                pending = pending.with_completion(completion);
            }
            if let Some(timeout) = timeout {
                pending = pending.with_deadline(tokio::time::Instant::now() + timeout);
            }
            tracker.register(stamped.message_id, pending);
        }
    }

    /// Requests every part of one object; parts arrive through
    /// [`fragments`](Self::fragments). Returns the allocated request id.
    pub async fn get(&self, uri: &str) -> EtpResult<i64> {
        let session = self.session.get()?;
        let tracker = session.correlations()?;
        let register = self.register_get(&tracker, None, None);
        let header = MessageHeader::request(ProtocolId::GROWING_OBJECT, go_msg::GROWING_OBJECT_GET);
        match session.version()? {
            EtpVersion::V11 => {
                session
                    .send_message(header, &GrowingObjectGet { uri: uri.to_owned() }, register)
                    .await
            }
            EtpVersion::V12 => {
                let header =
                    MessageHeader::request(ProtocolId::GROWING_OBJECT, go_msg::GET_PARTS);
                session
                    .send_message(
                        header,
                        &GetParts {
                            uri: uri.to_owned(),
                            uids: Vec::new(),
                        },
                        register,
                    )
                    .await
            }
        }
    }

    /// Requests every part of one object and awaits the complete multipart
    /// response set.
    pub async fn get_await(
        &self,
        uri: &str,
        timeout: Option<Duration>,
    ) -> EtpResult<Vec<FragmentReceived>> {
        let session = self.session.get()?;
        let version = session.version()?;
        let tracker = session.correlations()?;
        let (completion, response) = oneshot::channel();
        let register = self.register_get(&tracker, Some(completion), timeout);
        let header = MessageHeader::request(ProtocolId::GROWING_OBJECT, go_msg::GROWING_OBJECT_GET);
        match version {
            EtpVersion::V11 => {
                session
                    .send_message(header, &GrowingObjectGet { uri: uri.to_owned() }, register)
                    .await?
            }
            EtpVersion::V12 => {
                let header =
                    MessageHeader::request(ProtocolId::GROWING_OBJECT, go_msg::GET_PARTS);
                session
                    .send_message(
                        header,
                        &GetParts {
                            uri: uri.to_owned(),
                            uids: Vec::new(),
                        },
                        register,
                    )
                    .await?
            }
        };

        match response.await.map_err(|_| EtpError::SessionClosed)? {
            CorrelationOutcome::Completed(parts) => {
                let mut fragments = Vec::new();
                for part in &parts {
                    fragments.extend(decode_fragments(version, &part.header, &part.body)?);
                }
                Ok(fragments)
            }
            CorrelationOutcome::Failed(info) => Err(EtpError::Remote(info)),
            CorrelationOutcome::TimedOut => Err(EtpError::Timeout),
            CorrelationOutcome::SessionClosed => Err(EtpError::SessionClosed),
        }
    }

    /// Requests the parts within a range.
    pub async fn get_range(&self, uri: &str, range: IndexRange) -> EtpResult<i64> {
        let session = self.session.get()?;
        let tracker = session.correlations()?;
        let register = self.register_get(&tracker, None, None);
        match session.version()? {
            EtpVersion::V11 => {
                let header = MessageHeader::request(
                    ProtocolId::GROWING_OBJECT,
                    go_msg::GROWING_OBJECT_GET_RANGE,
                );
                session
                    .send_message(
                        header,
                        &GrowingObjectGetRange {
                            uri: uri.to_owned(),
                            range,
                        },
                        register,
                    )
                    .await
            }
            EtpVersion::V12 => {
                let header = MessageHeader::request(
                    ProtocolId::GROWING_OBJECT,
                    go_msg::GET_PARTS_BY_RANGE,
                );
                session
                    .send_message(
                        header,
                        &GetPartsByRange {
                            uri: uri.to_owned(),
                            range,
                        },
                        register,
                    )
                    .await
            }
        }
    }

    /// Adds or updates one part. No reply is expected.
    pub async fn put_part(&self, uri: &str, part: ObjectPart) -> EtpResult<i64> {
        let session = self.session.get()?;
        match session.version()? {
            EtpVersion::V11 => {
                let header =
                    MessageHeader::request(ProtocolId::GROWING_OBJECT, go_msg::GROWING_OBJECT_PUT);
                session
                    .send(
                        header,
                        &GrowingObjectPut {
                            uri: uri.to_owned(),
                            part,
                        },
                    )
                    .await
            }
            EtpVersion::V12 => {
                let header = MessageHeader::request(ProtocolId::GROWING_OBJECT, go_msg::PUT_PARTS);
                session
                    .send(
                        header,
                        &PutParts {
                            uri: uri.to_owned(),
                            parts: vec![part],
                        },
                    )
                    .await
            }
        }
    }

    /// Deletes one part by uid. No reply is expected.
    pub async fn delete_part(&self, uri: &str, uid: &str) -> EtpResult<i64> {
        let session = self.session.get()?;
        match session.version()? {
            EtpVersion::V11 => {
                let header = MessageHeader::request(
                    ProtocolId::GROWING_OBJECT,
                    go_msg::GROWING_OBJECT_DELETE,
                );
                session
                    .send(
                        header,
                        &GrowingObjectDelete {
                            uri: uri.to_owned(),
                            uid: uid.to_owned(),
                        },
                    )
                    .await
            }
            EtpVersion::V12 => {
                let header =
                    MessageHeader::request(ProtocolId::GROWING_OBJECT, go_msg::DELETE_PARTS);
                session
                    .send(
                        header,
                        &DeleteParts {
                            uri: uri.to_owned(),
                            uids: vec![uid.to_owned()],
                        },
                    )
                    .await
            }
        }
    }

    /// Deletes the parts within a range. No reply is expected.
    pub async fn delete_range(&self, uri: &str, range: IndexRange) -> EtpResult<i64> {
        let session = self.session.get()?;
        match session.version()? {
            EtpVersion::V11 => {
                let header = MessageHeader::request(
                    ProtocolId::GROWING_OBJECT,
                    go_msg::GROWING_OBJECT_DELETE_RANGE,
                );
                session
                    .send(
                        header,
                        &GrowingObjectDeleteRange {
                            uri: uri.to_owned(),
                            range,
                        },
                    )
                    .await
            }
            EtpVersion::V12 => {
                let header = MessageHeader::request(
                    ProtocolId::GROWING_OBJECT,
                    go_msg::DELETE_PARTS_BY_RANGE,
                );
                session
                    .send(
                        header,
                        &DeletePartsByRange {
                            uri: uri.to_owned(),
                            range,
                        },
                    )
                    .await
            }
        }
    }

    /// Atomically replaces the parts within a range (ETP 1.2 sessions only).
    pub async fn replace_parts_by_range(
        &self,
        uri: &str,
        delete_range: IndexRange,
        parts: Vec<ObjectPart>,
    ) -> EtpResult<i64> {
        let session = self.session.get()?;
        if session.version()? != EtpVersion::V12 {
            return Err(EtpError::NotSupported(
                "ReplacePartsByRange requires an ETP 1.2 session".into(),
            ));
        }
        let header =
            MessageHeader::request(ProtocolId::GROWING_OBJECT, go_msg::REPLACE_PARTS_BY_RANGE);
        session
            .send(
                header,
                &ReplacePartsByRange {
                    uri: uri.to_owned(),
                    delete_range,
                    parts,
                },
            )
            .await
    }
}

fn decode_fragments(
    version: EtpVersion,
    header: &MessageHeader,
    body: &InboundBody,
) -> EtpResult<Vec<FragmentReceived>> {
    if header.message_flags.contains(MessageFlags::NO_DATA) {
        return Ok(Vec::new());
    }
    match version {
        EtpVersion::V11 => {
            let fragment: ObjectFragment = body.decode()?;
            Ok(vec![FragmentReceived {
                header: *header,
                uri: fragment.uri,
                uid: None,
                content_type: fragment.content_type,
                data: fragment.data,
            }])
        }
        EtpVersion::V12 => {
            let reply: GetPartsResponse = body.decode()?;
            Ok(reply
                .parts
                .into_iter()
                .map(|part| FragmentReceived {
                    header: *header,
                    uri: reply.uri.clone(),
                    uid: Some(part.uid),
                    content_type: part.content_type,
                    data: part.data,
                })
                .collect())
        }
    }
}

impl HandlerContract for GrowingObjectCustomerHandler {
    const CONTRACT: ContractId = ContractId("growing-object.customer");
}

#[async_trait]
impl ProtocolHandler for GrowingObjectCustomerHandler {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor {
            protocol: ProtocolId::GROWING_OBJECT,
            local_role: Role::Customer,
            remote_role: Role::Store,
            contract: Self::CONTRACT,
        }
    }

    fn attach(&self, session: SessionHandle) {
        self.session.bind(session);
    }

    async fn on_session_opened(
        &self,
        _requested: &[SupportedProtocol],
        negotiated: &[SupportedProtocol],
    ) {
        *self.negotiated.lock() = Some(negotiated.to_vec());
    }

    async fn handle_message(&self, header: &MessageHeader, body: &InboundBody) -> EtpResult<()> {
        let version = self.session.get()?.version()?;
        match header.message_type {
            go_msg::OBJECT_FRAGMENT => {
                for fragment in decode_fragments(version, header, body)? {
                    self.fragments.emit(&fragment);
                }
                Ok(())
            }
            other => Err(EtpError::InvalidMessageType {
                protocol: ProtocolId::GROWING_OBJECT,
                message_type: other,
            }),
        }
    }

    fn on_protocol_exception(&self, header: &MessageHeader, error: &ErrorInfo) {
        self.exceptions.emit(&ExceptionReceived {
            header: *header,
            error: error.clone(),
        });
    }
}

/// Backing storage a [`GrowingObjectStoreHandler`] serves from.
#[async_trait]
pub trait GrowingObjectBackend: Send + Sync + 'static {
    /// All parts of one object, in index order. An empty result is a valid
    /// empty object.
    async fn get(&self, uri: &str) -> Result<Vec<ObjectPart>, ErrorInfo>;

    /// The parts within a range, in index order.
    async fn get_range(&self, uri: &str, range: &IndexRange) -> Result<Vec<ObjectPart>, ErrorInfo>;

    /// Adds or updates one part.
    async fn put(&self, uri: &str, part: ObjectPart) -> Result<(), ErrorInfo>;

    /// Deletes one part by uid.
    async fn delete(&self, uri: &str, uid: &str) -> Result<(), ErrorInfo>;

    /// Deletes the parts within a range.
    async fn delete_range(&self, uri: &str, range: &IndexRange) -> Result<(), ErrorInfo>;

    /// Atomically replaces the parts within a range.
    async fn replace_parts_by_range(
        &self,
        uri: &str,
        delete_range: &IndexRange,
        parts: Vec<ObjectPart>,
    ) -> Result<(), ErrorInfo>;
}

/// Store side of the GrowingObject protocol.
pub struct GrowingObjectStoreHandler {
    session: SessionSlot,
    backend: Arc<dyn GrowingObjectBackend>,
}

impl GrowingObjectStoreHandler {
    /// Creates a handler serving from `backend`; register it on a store
    /// session.
    pub fn new(backend: Arc<dyn GrowingObjectBackend>) -> Self {
        Self {
            session: SessionSlot::new(),
            backend,
        }
    }

    async fn reply_parts(
        &self,
        request: &MessageHeader,
        uri: &str,
        parts: Vec<ObjectPart>,
        version: EtpVersion,
    ) -> EtpResult<()> {
        let session = self.session.get()?;
        if parts.is_empty() {
            // An empty object still needs a final part to complete the
            // requester's correlation.
            let reply = MessageHeader::response(
                ProtocolId::GROWING_OBJECT,
                go_msg::OBJECT_FRAGMENT,
                request.message_id,
                MessageFlags::FINAL_PART | MessageFlags::NO_DATA,
            );
            match version {
                EtpVersion::V11 => {
                    session
                        .send(
                            reply,
                            &ObjectFragment {
                                uri: uri.to_owned(),
                                content_type: String::new(),
                                data: Bytes::new(),
                            },
                        )
                        .await?;
                }
                EtpVersion::V12 => {
                    session
                        .send(
                            reply,
                            &GetPartsResponse {
                                uri: uri.to_owned(),
                                parts: Vec::new(),
                            },
                        )
                        .await?;
                }
            }
            return Ok(());
        }

        let count = parts.len();
        for (index, part) in parts.into_iter().enumerate() {
            let reply = MessageHeader::response(
                ProtocolId::GROWING_OBJECT,
                go_msg::OBJECT_FRAGMENT,
                request.message_id,
                MessageFlags::for_part(index, count),
            );
            match version {
                EtpVersion::V11 => {
                    session
                        .send(
                            reply,
                            &ObjectFragment {
                                uri: uri.to_owned(),
                                content_type: part.content_type,
                                data: part.data,
                            },
                        )
                        .await?;
                }
                EtpVersion::V12 => {
                    session
                        .send(
                            reply,
                            &GetPartsResponse {
                                uri: uri.to_owned(),
                                parts: vec![part],
                            },
                        )
                        .await?;
                }
            }
        }
        Ok(())
    }

    async fn reply_exception(
        &self,
        request: &MessageHeader,
        uri: &str,
        info: ErrorInfo,
        version: EtpVersion,
    ) -> EtpResult<()> {
        let session = self.session.get()?;
        let body = match version {
            EtpVersion::V11 => ProtocolException::from_info(&info),
            EtpVersion::V12 => ProtocolException {
                error_code: info.code,
                error_message: info.message.clone(),
                errors: Some(HashMap::from([(uri.to_owned(), info)])),
            },
        };
        let header = MessageHeader::response(
            ProtocolId::GROWING_OBJECT,
            etpkit_protocol::catalog::MESSAGE_TYPE_PROTOCOL_EXCEPTION,
            request.message_id,
            MessageFlags::NONE,
        );
        session.send(header, &body).await?;
        Ok(())
    }

    async fn handle_v11(&self, header: &MessageHeader, body: &InboundBody) -> EtpResult<()> {
        match header.message_type {
            go_msg::GROWING_OBJECT_GET => {
                let request: GrowingObjectGet = body.decode()?;
                match self.backend.get(&request.uri).await {
                    Ok(parts) => {
                        self.reply_parts(header, &request.uri, parts, EtpVersion::V11)
                            .await
                    }
                    Err(info) => {
                        self.reply_exception(header, &request.uri, info, EtpVersion::V11)
                            .await
                    }
                }
            }
            go_msg::GROWING_OBJECT_GET_RANGE => {
                let request: GrowingObjectGetRange = body.decode()?;
                match self.backend.get_range(&request.uri, &request.range).await {
                    Ok(parts) => {
                        self.reply_parts(header, &request.uri, parts, EtpVersion::V11)
                            .await
                    }
                    Err(info) => {
                        self.reply_exception(header, &request.uri, info, EtpVersion::V11)
                            .await
                    }
                }
            }
            go_msg::GROWING_OBJECT_PUT => {
                let request: GrowingObjectPut = body.decode()?;
                if let Err(info) = self.backend.put(&request.uri, request.part).await {
                    debug!(uri = %request.uri, "put part rejected");
                    return self
                        .reply_exception(header, &request.uri, info, EtpVersion::V11)
                        .await;
                }
                Ok(())
            }
            go_msg::GROWING_OBJECT_DELETE => {
                let request: GrowingObjectDelete = body.decode()?;
                if let Err(info) = self.backend.delete(&request.uri, &request.uid).await {
                    return self
                        .reply_exception(header, &request.uri, info, EtpVersion::V11)
                        .await;
                }
                Ok(())
            }
            go_msg::GROWING_OBJECT_DELETE_RANGE => {
                let request: GrowingObjectDeleteRange = body.decode()?;
                if let Err(info) = self.backend.delete_range(&request.uri, &request.range).await {
                    return self
                        .reply_exception(header, &request.uri, info, EtpVersion::V11)
                        .await;
                }
                Ok(())
            }
            other => Err(EtpError::InvalidMessageType {
                protocol: ProtocolId::GROWING_OBJECT,
                message_type: other,
            }),
        }
    }

    async fn handle_v12(&self, header: &MessageHeader, body: &InboundBody) -> EtpResult<()> {
        match header.message_type {
            go_msg::GET_PARTS => {
                let request: GetParts = body.decode()?;
                match self.backend.get(&request.uri).await {
                    Ok(parts) => {
                        let parts = if request.uids.is_empty() {
                            parts
                        } else {
                            parts
                                .into_iter()
                                .filter(|part| request.uids.contains(&part.uid))
                                .collect()
                        };
                        self.reply_parts(header, &request.uri, parts, EtpVersion::V12)
                            .await
                    }
                    Err(info) => {
                        self.reply_exception(header, &request.uri, info, EtpVersion::V12)
                            .await
                    }
                }
            }
            go_msg::GET_PARTS_BY_RANGE => {
                let request: GetPartsByRange = body.decode()?;
                match self.backend.get_range(&request.uri, &request.range).await {
                    Ok(parts) => {
                        self.reply_parts(header, &request.uri, parts, EtpVersion::V12)
                            .await
                    }
                    Err(info) => {
                        self.reply_exception(header, &request.uri, info, EtpVersion::V12)
                            .await
                    }
                }
            }
            go_msg::PUT_PARTS => {
                let request: PutParts = body.decode()?;
                for part in request.parts {
                    if let Err(info) = self.backend.put(&request.uri, part).await {
                        return self
                            .reply_exception(header, &request.uri, info, EtpVersion::V12)
                            .await;
                    }
                }
                Ok(())
            }
            go_msg::DELETE_PARTS => {
                let request: DeleteParts = body.decode()?;
                for uid in &request.uids {
                    if let Err(info) = self.backend.delete(&request.uri, uid).await {
                        return self
                            .reply_exception(header, &request.uri, info, EtpVersion::V12)
                            .await;
                    }
                }
                Ok(())
            }
            go_msg::DELETE_PARTS_BY_RANGE => {
                let request: DeletePartsByRange = body.decode()?;
                if let Err(info) = self.backend.delete_range(&request.uri, &request.range).await {
                    return self
                        .reply_exception(header, &request.uri, info, EtpVersion::V12)
                        .await;
                }
                Ok(())
            }
            go_msg::REPLACE_PARTS_BY_RANGE => {
                let request: ReplacePartsByRange = body.decode()?;
                if let Err(info) = self
                    .backend
                    .replace_parts_by_range(&request.uri, &request.delete_range, request.parts)
                    .await
                {
                    return self
                        .reply_exception(header, &request.uri, info, EtpVersion::V12)
                        .await;
                }
                Ok(())
            }
            other => Err(EtpError::InvalidMessageType {
                protocol: ProtocolId::GROWING_OBJECT,
                message_type: other,
            }),
        }
    }
}

impl HandlerContract for GrowingObjectStoreHandler {
    const CONTRACT: ContractId = ContractId("growing-object.store");
}

#[async_trait]
impl ProtocolHandler for GrowingObjectStoreHandler {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor {
            protocol: ProtocolId::GROWING_OBJECT,
            local_role: Role::Store,
            remote_role: Role::Customer,
            contract: Self::CONTRACT,
        }
    }

    fn attach(&self, session: SessionHandle) {
        self.session.bind(session);
    }

    async fn handle_message(&self, header: &MessageHeader, body: &InboundBody) -> EtpResult<()> {
        match self.session.get()?.version()? {
            EtpVersion::V11 => self.handle_v11(header, body).await,
            EtpVersion::V12 => self.handle_v12(header, body).await,
        }
    }
}
