//! Session-level integration tests over the in-process transport: negotiation,
//! routing errors, multipart assembly, send ordering under contention,
//! handler-failure containment, and close semantics.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::timeout;

use etpkit_protocol::types::growing_object::{IndexRange, ObjectPart};
use etpkit_protocol::types::store::{DataObject, GetObject};
use etpkit_protocol::{
    ErrorCode, ErrorInfo, EtpError, EtpResult, EtpVersion, MessageHeader, ProtocolId, Role,
};
use etpkit_session::handlers::{
    CoreHandler, GrowingObjectBackend, GrowingObjectCustomerHandler, GrowingObjectStoreHandler,
    StoreBackend, StoreCustomerHandler, StoreStoreHandler,
};
use etpkit_session::{
    ContractId, EtpSession, ExceptionReceived, HandlerContract, HandlerDescriptor,
    ProtocolHandler, SessionConfig, SessionHandle, SessionState,
};
use etpkit_transport_traits::Transport;
use etpkit_transport_traits::inproc::InProcTransport;
use etpkit_wire::{FrameCodec, InboundBody, MessageEncoding};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn sample_object(uri: &str) -> DataObject {
    DataObject {
        uri: uri.to_owned(),
        content_type: "application/x-witsml+xml".to_owned(),
        data: Bytes::from_static(b"<object/>"),
    }
}

#[derive(Default)]
struct MemoryStore {
    objects: parking_lot::Mutex<HashMap<String, DataObject>>,
}

#[async_trait]
impl StoreBackend for MemoryStore {
    async fn get(&self, uri: &str) -> Result<Vec<DataObject>, ErrorInfo> {
        self.objects
            .lock()
            .get(uri)
            .cloned()
            .map(|object| vec![object])
            .ok_or_else(|| ErrorInfo::new(ErrorCode::InvalidUri, format!("no object at {uri}")))
    }

    async fn put(&self, object: DataObject) -> Result<(), ErrorInfo> {
        self.objects.lock().insert(object.uri.clone(), object);
        Ok(())
    }

    async fn delete(&self, uri: &str) -> Result<(), ErrorInfo> {
        self.objects
            .lock()
            .remove(uri)
            .map(|_| ())
            .ok_or_else(|| ErrorInfo::new(ErrorCode::InvalidUri, format!("no object at {uri}")))
    }
}

#[derive(Default)]
struct MemoryGrowingStore {
    parts: parking_lot::Mutex<HashMap<String, Vec<ObjectPart>>>,
}

#[async_trait]
impl GrowingObjectBackend for MemoryGrowingStore {
    async fn get(&self, uri: &str) -> Result<Vec<ObjectPart>, ErrorInfo> {
        Ok(self.parts.lock().get(uri).cloned().unwrap_or_default())
    }

    async fn get_range(&self, uri: &str, _range: &IndexRange) -> Result<Vec<ObjectPart>, ErrorInfo> {
        self.get(uri).await
    }

    async fn put(&self, uri: &str, part: ObjectPart) -> Result<(), ErrorInfo> {
        self.parts.lock().entry(uri.to_owned()).or_default().push(part);
        Ok(())
    }

    async fn delete(&self, uri: &str, uid: &str) -> Result<(), ErrorInfo> {
        let mut parts = self.parts.lock();
        let entries = parts
            .get_mut(uri)
            .ok_or_else(|| ErrorInfo::new(ErrorCode::InvalidUri, format!("no object at {uri}")))?;
        entries.retain(|part| part.uid != uid);
        Ok(())
    }

    async fn delete_range(&self, uri: &str, _range: &IndexRange) -> Result<(), ErrorInfo> {
        self.parts.lock().remove(uri);
        Ok(())
    }

    async fn replace_parts_by_range(
        &self,
        uri: &str,
        _delete_range: &IndexRange,
        parts: Vec<ObjectPart>,
    ) -> Result<(), ErrorInfo> {
        self.parts.lock().insert(uri.to_owned(), parts);
        Ok(())
    }
}

struct OpenPair {
    customer: EtpSession,
    store: EtpSession,
    store_backend: Arc<MemoryStore>,
    growing_backend: Arc<MemoryGrowingStore>,
}

async fn open_pair(version: EtpVersion, encoding: MessageEncoding) -> OpenPair {
    init_tracing();
    let (customer_end, store_end) = InProcTransport::pair();

    let mut customer_config = SessionConfig::customer(version);
    customer_config.encoding = encoding;
    let customer = EtpSession::new(customer_config, Arc::new(customer_end)).unwrap();
    customer
        .register(Arc::new(StoreCustomerHandler::new()))
        .unwrap();
    customer
        .register(Arc::new(GrowingObjectCustomerHandler::new()))
        .unwrap();

    let mut store_config = SessionConfig::store(version);
    store_config.encoding = encoding;
    let store = EtpSession::new(store_config, Arc::new(store_end)).unwrap();
    let store_backend = Arc::new(MemoryStore::default());
    let growing_backend = Arc::new(MemoryGrowingStore::default());
    store
        .register(Arc::new(StoreStoreHandler::new(store_backend.clone())))
        .unwrap();
    store
        .register(Arc::new(GrowingObjectStoreHandler::new(
            growing_backend.clone(),
        )))
        .unwrap();

    let (customer_id, store_id) = tokio::join!(customer.open(), store.serve());
    let customer_id = customer_id.unwrap();
    let store_id = store_id.unwrap();
    assert_eq!(customer_id, store_id);

    OpenPair {
        customer,
        store,
        store_backend,
        growing_backend,
    }
}

fn exception_channel(
    handler_events: &etpkit_session::EventListeners<ExceptionReceived>,
) -> mpsc::UnboundedReceiver<ExceptionReceived> {
    let (tx, rx) = mpsc::unbounded_channel();
    handler_events.subscribe(move |event| {
        let _ = tx.send(event.clone());
    });
    rx
}

#[tokio::test]
async fn negotiation_happy_path_opens_both_handler_sets() {
    let pair = open_pair(EtpVersion::V11, MessageEncoding::Binary).await;

    assert_eq!(pair.customer.state(), SessionState::Open);
    assert_eq!(pair.store.state(), SessionState::Open);
    assert!(pair.customer.session_id().is_some());

    // Both customer handlers saw on_session_opened with the negotiated set.
    let store_customer = pair.customer.handler::<StoreCustomerHandler>().unwrap();
    let growing_customer = pair
        .customer
        .handler::<GrowingObjectCustomerHandler>()
        .unwrap();
    let negotiated = store_customer.negotiated().expect("store customer not opened");
    assert_eq!(negotiated.len(), 2);
    assert!(
        negotiated
            .iter()
            .all(|supported| supported.role == Role::Store)
    );
    assert!(growing_customer.negotiated().is_some());

    assert!(pair.customer.can_handle::<StoreCustomerHandler>());
    assert!(pair.customer.can_handle::<GrowingObjectCustomerHandler>());
    assert!(
        pair.customer
            .handler::<GrowingObjectStoreHandler>()
            .is_err()
    );
}

#[tokio::test]
async fn store_get_put_delete_round_trip() {
    let pair = open_pair(EtpVersion::V11, MessageEncoding::Binary).await;
    let customer = pair.customer.handler::<StoreCustomerHandler>().unwrap();

    customer
        .put_object(sample_object("eml://well/1"))
        .await
        .unwrap();
    // Put has no reply; give the store a moment to apply it.
    timeout(Duration::from_secs(1), async {
        while pair.store_backend.objects.lock().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let objects = customer
        .get_object_await("eml://well/1", Some(Duration::from_secs(1)))
        .await
        .unwrap();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].uri, "eml://well/1");

    customer.delete_object("eml://well/1").await.unwrap();
    timeout(Duration::from_secs(1), async {
        while !pair.store_backend.objects.lock().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    // The store now answers the get with a protocol exception.
    let err = customer
        .get_object_await("eml://well/1", Some(Duration::from_secs(1)))
        .await
        .unwrap_err();
    match err {
        EtpError::Remote(info) => assert_eq!(info.error_code(), Some(ErrorCode::InvalidUri)),
        other => panic!("expected remote exception, got {other}"),
    }
}

#[tokio::test]
async fn unknown_protocol_is_answered_on_core_and_dropped() {
    let pair = open_pair(EtpVersion::V11, MessageEncoding::Binary).await;
    let core = pair.customer.handler::<CoreHandler>().unwrap();
    let mut exceptions = exception_channel(core.exceptions());

    let header = MessageHeader::request(ProtocolId(99), 1);
    let sent_id = pair
        .customer
        .handle()
        .send(
            header,
            &GetObject {
                uri: "eml://well/1".into(),
            },
        )
        .await
        .unwrap();

    let event = timeout(Duration::from_secs(1), exceptions.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.error.error_code(), Some(ErrorCode::UnsupportedProtocol));
    assert_eq!(event.header.correlation_id, sent_id);
    assert_eq!(event.header.protocol, ProtocolId::CORE);

    // The store dropped the message and stays open.
    assert_eq!(pair.store.state(), SessionState::Open);
}

#[tokio::test]
async fn multipart_response_emits_per_part_and_clears_the_tracker() {
    let pair = open_pair(EtpVersion::V11, MessageEncoding::Binary).await;
    let uri = "eml://witsml20/Log(l-1)";
    for index in 0..3 {
        pair.growing_backend
            .parts
            .lock()
            .entry(uri.to_owned())
            .or_default()
            .push(ObjectPart {
                uid: format!("part-{index}"),
                content_type: "application/x-witsml+xml".to_owned(),
                data: Bytes::from(vec![index as u8]),
            });
    }

    let growing = pair
        .customer
        .handler::<GrowingObjectCustomerHandler>()
        .unwrap();
    let (fragment_tx, mut fragment_rx) = mpsc::unbounded_channel();
    growing.fragments().subscribe(move |fragment| {
        let _ = fragment_tx.send(fragment.clone());
    });

    let fragments = growing
        .get_await(uri, Some(Duration::from_secs(1)))
        .await
        .unwrap();
    assert_eq!(fragments.len(), 3);

    // One event per part, in part order, with exactly one final part.
    let mut events = Vec::new();
    for _ in 0..3 {
        events.push(
            timeout(Duration::from_secs(1), fragment_rx.recv())
                .await
                .unwrap()
                .unwrap(),
        );
    }
    let finals = events
        .iter()
        .filter(|event| event.header.message_flags.is_final_part())
        .count();
    assert_eq!(finals, 1);
    assert!(events.last().unwrap().header.message_flags.is_final_part());

    // The correlation entry is gone.
    assert_eq!(pair.customer.handle().correlations().unwrap().len(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sends_allocate_contiguous_ids_in_wire_order() {
    init_tracing();
    let (customer_end, peer_end) = InProcTransport::pair();
    let customer =
        EtpSession::new(SessionConfig::customer(EtpVersion::V11), Arc::new(customer_end)).unwrap();
    let handler = Arc::new(StoreCustomerHandler::new());
    customer.register(handler.clone()).unwrap();

    let mut sends = Vec::new();
    for index in 0..10 {
        let handler = handler.clone();
        sends.push(tokio::spawn(async move {
            handler.get_object(&format!("eml://well/{index}")).await
        }));
    }
    let mut returned_ids = Vec::new();
    for send in sends {
        returned_ids.push(send.await.unwrap().unwrap());
    }

    let codec = FrameCodec::new(MessageEncoding::Binary);
    let mut wire_ids = Vec::new();
    for _ in 0..10 {
        let frame = timeout(Duration::from_secs(1), peer_end.receive())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let (header, _) = codec.decode(&frame).unwrap();
        wire_ids.push(header.message_id);
    }

    // Exactly the ids 1..=10, unique, monotonically increasing on the wire.
    assert!(wire_ids.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(wire_ids, (1..=10).collect::<Vec<i64>>());
    returned_ids.sort_unstable();
    assert_eq!(returned_ids, wire_ids);
}

/// Customer-side probe for an application-defined protocol.
struct ProbeHandler {
    exceptions: etpkit_session::EventListeners<ExceptionReceived>,
}

impl ProbeHandler {
    fn new() -> Self {
        Self {
            exceptions: etpkit_session::EventListeners::new(),
        }
    }
}

impl HandlerContract for ProbeHandler {
    const CONTRACT: ContractId = ContractId("test.probe");
}

#[async_trait]
impl ProtocolHandler for ProbeHandler {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor {
            protocol: ProtocolId::DATA_ARRAY,
            local_role: Role::Customer,
            remote_role: Role::Store,
            contract: Self::CONTRACT,
        }
    }

    fn attach(&self, _session: SessionHandle) {}

    async fn handle_message(&self, header: &MessageHeader, _body: &InboundBody) -> EtpResult<()> {
        Err(EtpError::InvalidMessageType {
            protocol: header.protocol,
            message_type: header.message_type,
        })
    }

    fn on_protocol_exception(&self, header: &MessageHeader, error: &ErrorInfo) {
        self.exceptions.emit(&ExceptionReceived {
            header: *header,
            error: error.clone(),
        });
    }
}

/// Store-side handler whose dispatch always fails.
struct FailingHandler;

impl FailingHandler {
    fn new() -> Self {
        Self
    }
}

impl HandlerContract for FailingHandler {
    const CONTRACT: ContractId = ContractId("test.failing");
}

#[async_trait]
impl ProtocolHandler for FailingHandler {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor {
            protocol: ProtocolId::DATA_ARRAY,
            local_role: Role::Store,
            remote_role: Role::Customer,
            contract: Self::CONTRACT,
        }
    }

    fn attach(&self, _session: SessionHandle) {}

    async fn handle_message(&self, _header: &MessageHeader, _body: &InboundBody) -> EtpResult<()> {
        Err(EtpError::InvalidState("backing service unavailable".into()))
    }
}

#[tokio::test]
async fn handler_failure_becomes_invalid_state_exception_and_session_survives() {
    init_tracing();
    let (customer_end, store_end) = InProcTransport::pair();

    let customer = EtpSession::new(
        SessionConfig::customer(EtpVersion::V11),
        Arc::new(customer_end),
    )
    .unwrap();
    customer
        .register(Arc::new(StoreCustomerHandler::new()))
        .unwrap();
    let probe = Arc::new(ProbeHandler::new());
    customer.register(probe.clone()).unwrap();

    let store = EtpSession::new(SessionConfig::store(EtpVersion::V11), Arc::new(store_end)).unwrap();
    let backend = Arc::new(MemoryStore::default());
    store
        .register(Arc::new(StoreStoreHandler::new(backend.clone())))
        .unwrap();
    store.register(Arc::new(FailingHandler::new())).unwrap();

    let (opened, served) = tokio::join!(customer.open(), store.serve());
    opened.unwrap();
    served.unwrap();

    let mut exceptions = exception_channel(&probe.exceptions);
    let header = MessageHeader::request(ProtocolId::DATA_ARRAY, 1);
    let sent_id = pair_send(&customer, header).await;

    let event = timeout(Duration::from_secs(1), exceptions.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.error.error_code(), Some(ErrorCode::InvalidState));
    assert_eq!(event.header.correlation_id, sent_id);
    assert_eq!(event.header.protocol, ProtocolId::DATA_ARRAY);

    // Both sessions remain open and the store still serves.
    assert_eq!(customer.state(), SessionState::Open);
    assert_eq!(store.state(), SessionState::Open);
    backend
        .put(sample_object("eml://well/9"))
        .await
        .unwrap();
    let objects = customer
        .handler::<StoreCustomerHandler>()
        .unwrap()
        .get_object_await("eml://well/9", Some(Duration::from_secs(1)))
        .await
        .unwrap();
    assert_eq!(objects.len(), 1);
}

async fn pair_send(session: &EtpSession, header: MessageHeader) -> i64 {
    session
        .handle()
        .send(
            header,
            &GetObject {
                uri: "eml://well/1".into(),
            },
        )
        .await
        .unwrap()
}

/// Counts lifecycle callbacks for close-idempotence checks.
struct LifecycleProbe {
    closed: AtomicUsize,
}

impl LifecycleProbe {
    fn new() -> Self {
        Self {
            closed: AtomicUsize::new(0),
        }
    }
}

impl HandlerContract for LifecycleProbe {
    const CONTRACT: ContractId = ContractId("test.lifecycle");
}

#[async_trait]
impl ProtocolHandler for LifecycleProbe {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor {
            protocol: ProtocolId::DISCOVERY,
            local_role: Role::Customer,
            remote_role: Role::Store,
            contract: Self::CONTRACT,
        }
    }

    fn attach(&self, _session: SessionHandle) {}

    async fn on_session_closed(&self, _reason: Option<&str>) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }

    async fn handle_message(&self, header: &MessageHeader, _body: &InboundBody) -> EtpResult<()> {
        Err(EtpError::InvalidMessageType {
            protocol: header.protocol,
            message_type: header.message_type,
        })
    }
}

#[tokio::test]
async fn close_is_idempotent_and_fails_later_sends_locally() {
    init_tracing();
    let (customer_end, store_end) = InProcTransport::pair();

    let customer = EtpSession::new(
        SessionConfig::customer(EtpVersion::V11),
        Arc::new(customer_end),
    )
    .unwrap();
    let store_customer = Arc::new(StoreCustomerHandler::new());
    customer.register(store_customer.clone()).unwrap();
    let probe = Arc::new(LifecycleProbe::new());
    customer.register(probe.clone()).unwrap();

    let store = EtpSession::new(SessionConfig::store(EtpVersion::V11), Arc::new(store_end)).unwrap();
    store
        .register(Arc::new(StoreStoreHandler::new(Arc::new(
            MemoryStore::default(),
        ))))
        .unwrap();

    // The store offers no Discovery handler, so the probe is unregistered at
    // negotiation and must not see lifecycle callbacks afterwards.
    let (opened, served) = tokio::join!(customer.open(), store.serve());
    opened.unwrap();
    served.unwrap();
    assert!(!customer.can_handle::<LifecycleProbe>());

    customer.close("test done").await.unwrap();
    customer.close("test done again").await.unwrap();
    assert_eq!(customer.state(), SessionState::Closed);
    assert_eq!(probe.closed.load(Ordering::SeqCst), 0);

    // Pending sends after close fail locally with no wire traffic.
    let err = store_customer.get_object("eml://well/1").await.unwrap_err();
    assert!(matches!(err, EtpError::SessionClosed));

    // The peer observed CloseSession and reached Closed as well.
    timeout(Duration::from_secs(1), async {
        while store.state() != SessionState::Closed {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn negotiation_with_no_common_protocols_is_rejected() {
    init_tracing();
    let (customer_end, store_end) = InProcTransport::pair();

    let customer = EtpSession::new(
        SessionConfig::customer(EtpVersion::V11),
        Arc::new(customer_end),
    )
    .unwrap();
    customer
        .register(Arc::new(StoreCustomerHandler::new()))
        .unwrap();

    // The store registers only the growing-object family.
    let store = EtpSession::new(SessionConfig::store(EtpVersion::V11), Arc::new(store_end)).unwrap();
    store
        .register(Arc::new(GrowingObjectStoreHandler::new(Arc::new(
            MemoryGrowingStore::default(),
        ))))
        .unwrap();
    tokio::spawn(async move {
        let _ = store.serve().await;
    });

    let err = customer.open().await.unwrap_err();
    match err {
        EtpError::Remote(info) => {
            assert_eq!(info.error_code(), Some(ErrorCode::NotSupported));
        }
        other => panic!("expected remote rejection, got {other}"),
    }
}

#[tokio::test]
async fn request_deadline_expires_and_late_reply_is_orphaned() {
    init_tracing();
    let (customer_end, peer_end) = InProcTransport::pair();
    let mut config = SessionConfig::customer(EtpVersion::V11);
    config.sweep_interval = Duration::from_millis(20);
    let customer = EtpSession::new(config, Arc::new(customer_end)).unwrap();
    let handler = Arc::new(StoreCustomerHandler::new());
    customer.register(handler.clone()).unwrap();
    customer.start();

    let result = handler
        .get_object_await("eml://well/1", Some(Duration::from_millis(50)))
        .await;
    assert!(matches!(result, Err(EtpError::Timeout)));
    assert_eq!(customer.handle().correlations().unwrap().len(), 0);

    // Read the request the peer saw, then answer it late.
    let codec = FrameCodec::new(MessageEncoding::Binary);
    let frame = peer_end.receive().await.unwrap().unwrap();
    let (request_header, _) = codec.decode(&frame).unwrap();

    let (object_tx, mut object_rx) = mpsc::unbounded_channel();
    handler.objects().subscribe(move |event| {
        let _ = object_tx.send(event.clone());
    });

    let mut reply = MessageHeader::response(
        ProtocolId::STORE,
        etpkit_protocol::types::store::OBJECT,
        request_header.message_id,
        etpkit_protocol::MessageFlags::FINAL_PART,
    );
    reply.message_id = 1;
    let late = codec
        .encode(
            &reply,
            &etpkit_protocol::types::store::Object {
                data_object: sample_object("eml://well/1"),
            },
        )
        .unwrap();
    peer_end.send(late).await.unwrap();

    // The late reply still raises the event, but the correlation is gone.
    let event = timeout(Duration::from_secs(1), object_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.object.uri, "eml://well/1");
    assert_eq!(customer.handle().correlations().unwrap().len(), 0);
}

#[tokio::test]
async fn json_encoded_session_round_trips() {
    let pair = open_pair(EtpVersion::V11, MessageEncoding::Json).await;
    let customer = pair.customer.handler::<StoreCustomerHandler>().unwrap();

    pair.store_backend
        .put(sample_object("eml://well/json"))
        .await
        .unwrap();
    let objects = customer
        .get_object_await("eml://well/json", Some(Duration::from_secs(1)))
        .await
        .unwrap();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].data, Bytes::from_static(b"<object/>"));
}

#[tokio::test]
async fn v12_session_uses_plural_store_messages_and_replace_parts() {
    let pair = open_pair(EtpVersion::V12, MessageEncoding::Binary).await;
    let customer = pair.customer.handler::<StoreCustomerHandler>().unwrap();
    let growing = pair
        .customer
        .handler::<GrowingObjectCustomerHandler>()
        .unwrap();

    pair.store_backend
        .put(sample_object("eml://well/12"))
        .await
        .unwrap();
    let objects = customer
        .get_object_await("eml://well/12", Some(Duration::from_secs(1)))
        .await
        .unwrap();
    assert_eq!(objects.len(), 1);

    let range = IndexRange {
        start: etpkit_protocol::types::growing_object::RangeEndpoint::new(
            etpkit_protocol::types::growing_object::IndexValue::Double(0.0),
            "m",
        ),
        end: etpkit_protocol::types::growing_object::RangeEndpoint::new(
            etpkit_protocol::types::growing_object::IndexValue::Double(100.0),
            "m",
        ),
    };
    growing
        .replace_parts_by_range(
            "eml://witsml20/Log(l-9)",
            range,
            vec![ObjectPart {
                uid: "p1".into(),
                content_type: "application/x-witsml+xml".into(),
                data: Bytes::from_static(b"<part/>"),
            }],
        )
        .await
        .unwrap();
    timeout(Duration::from_secs(1), async {
        while pair.growing_backend.parts.lock().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let fragments = growing
        .get_await("eml://witsml20/Log(l-9)", Some(Duration::from_secs(1)))
        .await
        .unwrap();
    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].uid.as_deref(), Some("p1"));
}

#[tokio::test]
async fn replace_parts_by_range_requires_v12() {
    let pair = open_pair(EtpVersion::V11, MessageEncoding::Binary).await;
    let growing = pair
        .customer
        .handler::<GrowingObjectCustomerHandler>()
        .unwrap();
    let range = IndexRange {
        start: etpkit_protocol::types::growing_object::RangeEndpoint::new(
            etpkit_protocol::types::growing_object::IndexValue::Long(0),
            "m",
        ),
        end: etpkit_protocol::types::growing_object::RangeEndpoint::new(
            etpkit_protocol::types::growing_object::IndexValue::Long(1),
            "m",
        ),
    };
    let err = growing
        .replace_parts_by_range("eml://log/1", range, Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EtpError::NotSupported(_)));
}

#[tokio::test]
async fn empty_growing_object_completes_with_no_data_final() {
    let pair = open_pair(EtpVersion::V11, MessageEncoding::Binary).await;
    let growing = pair
        .customer
        .handler::<GrowingObjectCustomerHandler>()
        .unwrap();

    let fragments = growing
        .get_await("eml://witsml20/Log(empty)", Some(Duration::from_secs(1)))
        .await
        .unwrap();
    assert!(fragments.is_empty());
    assert_eq!(pair.customer.handle().correlations().unwrap().len(), 0);
}
