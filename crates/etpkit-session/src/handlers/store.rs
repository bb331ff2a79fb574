//! Store protocol handlers (protocol 4).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use etpkit_protocol::types::core::{ProtocolException, SupportedProtocol};
use etpkit_protocol::types::store::{
    self as store_msg, DataObject, DeleteDataObjects, DeleteObject, GetDataObjects,
    GetDataObjectsResponse, GetObject, Object, PutDataObjects, PutObject,
};
use etpkit_protocol::{
    ErrorCode, ErrorInfo, EtpError, EtpResult, EtpVersion, MessageFlags, MessageHeader, ProtocolId,
    Role,
};
use etpkit_wire::InboundBody;

use crate::correlation::{CorrelationOutcome, PendingRequest};
use crate::events::EventListeners;
use crate::handler::{ExceptionReceived, HandlerDescriptor, ProtocolHandler, SessionSlot};
use crate::registry::{ContractId, HandlerContract};
use crate::session::SessionHandle;

/// A data object delivered to the customer side.
#[derive(Debug, Clone)]
pub struct ObjectReceived {
    /// Header of the carrying message.
    pub header: MessageHeader,
    /// The object.
    pub object: DataObject,
}

/// Customer side of the Store protocol: issues get/put/delete requests and
/// surfaces inbound objects as events.
pub struct StoreCustomerHandler {
    session: SessionSlot,
    objects: EventListeners<ObjectReceived>,
    exceptions: EventListeners<ExceptionReceived>,
    negotiated: Mutex<Option<Vec<SupportedProtocol>>>,
}

impl Default for StoreCustomerHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreCustomerHandler {
    /// Creates a handler; register it on a customer session.
    pub fn new() -> Self {
        Self {
            session: SessionSlot::new(),
            objects: EventListeners::new(),
            exceptions: EventListeners::new(),
            negotiated: Mutex::new(None),
        }
    }

    /// Objects arriving in response to gets.
    pub fn objects(&self) -> &EventListeners<ObjectReceived> {
        &self.objects
    }

    /// Protocol exceptions on the Store protocol.
    pub fn exceptions(&self) -> &EventListeners<ExceptionReceived> {
        &self.exceptions
    }

    /// The negotiated protocol list observed by `on_session_opened`, once
    /// the session is open.
    pub fn negotiated(&self) -> Option<Vec<SupportedProtocol>> {
        self.negotiated.lock().clone()
    }

    /// Requests one object; replies arrive through [`objects`](Self::objects).
    /// Returns the allocated request id.
    pub async fn get_object(&self, uri: &str) -> EtpResult<i64> {
        let session = self.session.get()?;
        let tracker = session.correlations()?;
        let header = MessageHeader::request(ProtocolId::STORE, store_msg::GET_OBJECT);
        let register = |stamped: &MessageHeader| {
            tracker.register(
                stamped.message_id,
                PendingRequest::new(ProtocolId::STORE)
                    .with_expected_types(vec![store_msg::OBJECT]),
            );
        };
        match session.version()? {
            EtpVersion::V11 => {
                session
                    .send_message(header, &GetObject { uri: uri.to_owned() }, register)
                    .await
            }
            EtpVersion::V12 => {
                session
                    .send_message(
                        header,
                        &GetDataObjects {
                            uris: vec![uri.to_owned()],
                        },
                        register,
                    )
                    .await
            }
        }
    }

    /// Requests one object and awaits the complete (possibly multipart)
    /// response set.
    pub async fn get_object_await(
        &self,
        uri: &str,
        timeout: Option<Duration>,
    ) -> EtpResult<Vec<DataObject>> {
        let session = self.session.get()?;
        let version = session.version()?;
        let tracker = session.correlations()?;
        let (completion, response) = oneshot::channel();
        let header = MessageHeader::request(ProtocolId::STORE, store_msg::GET_OBJECT);
        let register = |stamped: &MessageHeader| {
            let mut pending = PendingRequest::new(ProtocolId::STORE)
                .with_expected_types(vec![store_msg::OBJECT])
                .with_completion(completion);
            if let Some(timeout) = timeout {
                pending = pending.with_deadline(tokio::time::Instant::now() + timeout);
            }
            tracker.register(stamped.message_id, pending);
        };
        match version {
            EtpVersion::V11 => {
                session
                    .send_message(header, &GetObject { uri: uri.to_owned() }, register)
                    .await?
            }
            EtpVersion::V12 => {
                session
                    .send_message(
                        header,
                        &GetDataObjects {
                            uris: vec![uri.to_owned()],
                        },
                        register,
                    )
                    .await?
            }
        };

        match response.await.map_err(|_| EtpError::SessionClosed)? {
            CorrelationOutcome::Completed(parts) => {
                let mut objects = Vec::new();
                for part in &parts {
                    match version {
                        EtpVersion::V11 => {
                            let reply: Object = part.body.decode()?;
                            objects.push(reply.data_object);
                        }
                        EtpVersion::V12 => {
                            let reply: GetDataObjectsResponse = part.body.decode()?;
                            objects.extend(reply.data_objects);
                        }
                    }
                }
                Ok(objects)
            }
            CorrelationOutcome::Failed(info) => Err(EtpError::Remote(info)),
            CorrelationOutcome::TimedOut => Err(EtpError::Timeout),
            CorrelationOutcome::SessionClosed => Err(EtpError::SessionClosed),
        }
    }

    /// Creates or updates one object. No reply is expected.
    pub async fn put_object(&self, object: DataObject) -> EtpResult<i64> {
        let session = self.session.get()?;
        let header = MessageHeader::request(ProtocolId::STORE, store_msg::PUT_OBJECT);
        match session.version()? {
            EtpVersion::V11 => {
                session
                    .send(header, &PutObject { data_object: object })
                    .await
            }
            EtpVersion::V12 => {
                session
                    .send(
                        header,
                        &PutDataObjects {
                            data_objects: vec![object],
                        },
                    )
                    .await
            }
        }
    }

    /// Deletes one object by URI. No reply is expected.
    pub async fn delete_object(&self, uri: &str) -> EtpResult<i64> {
        let session = self.session.get()?;
        let header = MessageHeader::request(ProtocolId::STORE, store_msg::DELETE_OBJECT);
        match session.version()? {
            EtpVersion::V11 => {
                session
                    .send(header, &DeleteObject { uri: uri.to_owned() })
                    .await
            }
            EtpVersion::V12 => {
                session
                    .send(
                        header,
                        &DeleteDataObjects {
                            uris: vec![uri.to_owned()],
                        },
                    )
                    .await
            }
        }
    }
}

impl HandlerContract for StoreCustomerHandler {
    const CONTRACT: ContractId = ContractId("store.customer");
}

#[async_trait]
impl ProtocolHandler for StoreCustomerHandler {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor {
            protocol: ProtocolId::STORE,
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
        let session = self.session.get()?;
        match header.message_type {
            store_msg::OBJECT => {
                match session.version()? {
                    EtpVersion::V11 => {
                        let reply: Object = body.decode()?;
                        self.objects.emit(&ObjectReceived {
                            header: *header,
                            object: reply.data_object,
                        });
                    }
                    EtpVersion::V12 => {
                        let reply: GetDataObjectsResponse = body.decode()?;
                        for object in reply.data_objects {
                            self.objects.emit(&ObjectReceived {
                                header: *header,
                                object,
                            });
                        }
                    }
                }
                Ok(())
            }
            other => Err(EtpError::InvalidMessageType {
                protocol: ProtocolId::STORE,
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

/// Backing storage a [`StoreStoreHandler`] serves from.
///
/// A missing object is reported as an `Err` with the appropriate code
/// (usually `InvalidUri`); an `Ok` get result must be non-empty.
#[async_trait]
pub trait StoreBackend: Send + Sync + 'static {
    /// Fetches the objects for one URI; multi-object results become a
    /// multipart response.
    async fn get(&self, uri: &str) -> Result<Vec<DataObject>, ErrorInfo>;

    /// Creates or updates one object.
    async fn put(&self, object: DataObject) -> Result<(), ErrorInfo>;

    /// Deletes one object.
    async fn delete(&self, uri: &str) -> Result<(), ErrorInfo>;
}

/// Store side of the Store protocol: serves get/put/delete from a
/// [`StoreBackend`], replying with `Object` parts or `ProtocolException`.
pub struct StoreStoreHandler {
    session: SessionSlot,
    backend: Arc<dyn StoreBackend>,
}

impl StoreStoreHandler {
    /// Creates a handler serving from `backend`; register it on a store
    /// session.
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self {
            session: SessionSlot::new(),
            backend,
        }
    }

    async fn reply_objects(
        &self,
        request: &MessageHeader,
        objects: Vec<DataObject>,
        version: EtpVersion,
    ) -> EtpResult<()> {
        let session = self.session.get()?;
        let count = objects.len();
        for (index, object) in objects.into_iter().enumerate() {
            let reply = MessageHeader::response(
                ProtocolId::STORE,
                store_msg::OBJECT,
                request.message_id,
                MessageFlags::for_part(index, count),
            );
            match version {
                EtpVersion::V11 => {
                    session.send(reply, &Object { data_object: object }).await?;
                }
                EtpVersion::V12 => {
                    session
                        .send(
                            reply,
                            &GetDataObjectsResponse {
                                data_objects: vec![object],
                            },
                        )
                        .await?;
                }
            }
        }
        Ok(())
    }

    /// Answers a failed request. ETP 1.2 carries the full per-URI collection;
    /// 1.1 carries the first failure.
    async fn reply_exception(
        &self,
        request: &MessageHeader,
        failures: HashMap<String, ErrorInfo>,
        version: EtpVersion,
    ) -> EtpResult<()> {
        let session = self.session.get()?;
        let first = failures
            .values()
            .next()
            .cloned()
            .unwrap_or_else(|| ErrorInfo::new(ErrorCode::InvalidState, "request failed"));
        let body = match version {
            EtpVersion::V11 => ProtocolException::from_info(&first),
            EtpVersion::V12 => ProtocolException {
                error_code: first.code,
                error_message: first.message,
                errors: Some(failures),
            },
        };
        let header = MessageHeader::response(
            ProtocolId::STORE,
            etpkit_protocol::catalog::MESSAGE_TYPE_PROTOCOL_EXCEPTION,
            request.message_id,
            MessageFlags::NONE,
        );
        session.send(header, &body).await?;
        Ok(())
    }
}

impl HandlerContract for StoreStoreHandler {
    const CONTRACT: ContractId = ContractId("store.store");
}

#[async_trait]
impl ProtocolHandler for StoreStoreHandler {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor {
            protocol: ProtocolId::STORE,
            local_role: Role::Store,
            remote_role: Role::Customer,
            contract: Self::CONTRACT,
        }
    }

    fn attach(&self, session: SessionHandle) {
        self.session.bind(session);
    }

    async fn handle_message(&self, header: &MessageHeader, body: &InboundBody) -> EtpResult<()> {
        let version = self.session.get()?.version()?;
        match header.message_type {
            store_msg::GET_OBJECT => {
                let uris = match version {
                    EtpVersion::V11 => vec![body.decode::<GetObject>()?.uri],
                    EtpVersion::V12 => body.decode::<GetDataObjects>()?.uris,
                };
                let mut objects = Vec::new();
                let mut failures = HashMap::new();
                for uri in &uris {
                    match self.backend.get(uri).await {
                        Ok(found) if found.is_empty() => {
                            failures.insert(
                                uri.clone(),
                                ErrorInfo::new(ErrorCode::InvalidUri, format!("no object at {uri}")),
                            );
                        }
                        Ok(mut found) => objects.append(&mut found),
                        Err(info) => {
                            failures.insert(uri.clone(), info);
                        }
                    }
                }
                if failures.is_empty() {
                    self.reply_objects(header, objects, version).await
                } else {
                    debug!(failed = failures.len(), "get request failed");
                    self.reply_exception(header, failures, version).await
                }
            }
            store_msg::PUT_OBJECT => {
                let objects = match version {
                    EtpVersion::V11 => vec![body.decode::<PutObject>()?.data_object],
                    EtpVersion::V12 => body.decode::<PutDataObjects>()?.data_objects,
                };
                for object in objects {
                    let uri = object.uri.clone();
                    if let Err(info) = self.backend.put(object).await {
                        let failures = HashMap::from([(uri, info)]);
                        return self.reply_exception(header, failures, version).await;
                    }
                }
                Ok(())
            }
            store_msg::DELETE_OBJECT => {
                let uris = match version {
                    EtpVersion::V11 => vec![body.decode::<DeleteObject>()?.uri],
                    EtpVersion::V12 => body.decode::<DeleteDataObjects>()?.uris,
                };
                for uri in uris {
                    if let Err(info) = self.backend.delete(&uri).await {
                        let failures = HashMap::from([(uri, info)]);
                        return self.reply_exception(header, failures, version).await;
                    }
                }
                Ok(())
            }
            other => Err(EtpError::InvalidMessageType {
                protocol: ProtocolId::STORE,
                message_type: other,
            }),
        }
    }
}
