//! Frame round-trip coverage over the real protocol records, both framings.

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use etpkit_protocol::types::core::{
    CloseSession, OpenSession, ProtocolException, RequestSession, SupportedProtocol,
};
use etpkit_protocol::types::growing_object::{
    GrowingObjectGetRange, IndexRange, IndexValue, ObjectPart, RangeEndpoint, ReplacePartsByRange,
};
use etpkit_protocol::types::store::{DataObject, Object};
use etpkit_protocol::{
    ErrorCode, ErrorInfo, EtpVersion, MessageFlags, MessageHeader, ProtocolId, Role,
};
use etpkit_wire::{FrameCodec, MessageEncoding};

fn roundtrip_both<T>(header: MessageHeader, body: &T)
where
    T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
{
    for encoding in [MessageEncoding::Binary, MessageEncoding::Json] {
        let codec = FrameCodec::new(encoding);
        let frame = codec.encode(&header, body).unwrap();
        let (decoded_header, inbound) = codec.decode(&frame).unwrap();
        assert_eq!(decoded_header, header, "{encoding:?}");
        assert_eq!(&inbound.decode::<T>().unwrap(), body, "{encoding:?}");

        // Encoding the decoded message again must reproduce the frame.
        let reencoded = codec
            .encode(&decoded_header, &inbound.decode::<T>().unwrap())
            .unwrap();
        assert_eq!(frame, reencoded, "{encoding:?}");
    }
}

#[test]
fn negotiation_messages_roundtrip() {
    let mut store = SupportedProtocol::new(ProtocolId::STORE, EtpVersion::V11, Role::Customer);
    store
        .protocol_capabilities
        .set("MaxResponseCount", 100i64)
        .set("VendorFlag", true);
    let growing =
        SupportedProtocol::new(ProtocolId::GROWING_OBJECT, EtpVersion::V11, Role::Customer);

    roundtrip_both(
        MessageHeader {
            protocol: ProtocolId::CORE,
            message_type: 1,
            message_id: 1,
            correlation_id: 0,
            message_flags: MessageFlags::NONE,
        },
        &RequestSession {
            application_name: "witsml-loader".into(),
            application_version: "2.4.1".into(),
            requested_protocols: vec![store.clone(), growing.clone()],
        },
    );

    roundtrip_both(
        MessageHeader {
            protocol: ProtocolId::CORE,
            message_type: 2,
            message_id: 1,
            correlation_id: 1,
            message_flags: MessageFlags::NONE,
        },
        &OpenSession {
            session_id: "0f8fad5b-d9cb-469f-a165-70867728950e".into(),
            supported_protocols: vec![store, growing],
        },
    );

    roundtrip_both(
        MessageHeader {
            protocol: ProtocolId::CORE,
            message_type: 5,
            message_id: 9,
            correlation_id: 0,
            message_flags: MessageFlags::NONE,
        },
        &CloseSession {
            reason: "done".into(),
        },
    );
}

#[test]
fn protocol_exception_roundtrips_with_and_without_error_map() {
    let header = MessageHeader {
        protocol: ProtocolId::STORE,
        message_type: 1000,
        message_id: 3,
        correlation_id: 7,
        message_flags: MessageFlags::NONE,
    };

    roundtrip_both(
        header,
        &ProtocolException {
            error_code: ErrorCode::UnsupportedProtocol.code(),
            error_message: "protocol 99 not negotiated".into(),
            errors: None,
        },
    );

    let mut errors = std::collections::HashMap::new();
    errors.insert(
        "eml://well/1".to_owned(),
        ErrorInfo::new(ErrorCode::InvalidUri, "no such object"),
    );
    roundtrip_both(
        header,
        &ProtocolException {
            error_code: ErrorCode::RequestDenied.code(),
            error_message: "one or more requests failed".into(),
            errors: Some(errors),
        },
    );
}

#[test]
fn store_object_roundtrips() {
    roundtrip_both(
        MessageHeader {
            protocol: ProtocolId::STORE,
            message_type: 4,
            message_id: 12,
            correlation_id: 11,
            message_flags: MessageFlags::FINAL_PART,
        },
        &Object {
            data_object: DataObject {
                uri: "eml://witsml20/Well(w-01)".into(),
                content_type: "application/x-witsml+xml;version=2.0".into(),
                data: Bytes::from_static(b"<Well uid=\"w-01\"/>"),
            },
        },
    );
}

#[test]
fn range_endpoint_annotations_survive_both_framings() {
    let range = IndexRange {
        start: RangeEndpoint {
            value: IndexValue::Double(1500.25),
            uom: "m".into(),
            depth_datum: Some("KB".into()),
        },
        end: RangeEndpoint {
            value: IndexValue::Long(2000),
            uom: "m".into(),
            depth_datum: Some("KB".into()),
        },
    };

    roundtrip_both(
        MessageHeader {
            protocol: ProtocolId::GROWING_OBJECT,
            message_type: 2,
            message_id: 4,
            correlation_id: 0,
            message_flags: MessageFlags::NONE,
        },
        &GrowingObjectGetRange {
            uri: "eml://witsml20/Log(l-7)".into(),
            range: range.clone(),
        },
    );

    let time_range = IndexRange {
        start: RangeEndpoint::new(IndexValue::Timestamp(1_690_000_000_000_000), "us"),
        end: RangeEndpoint::new(IndexValue::Timestamp(1_690_000_600_000_000), "us"),
    };
    roundtrip_both(
        MessageHeader {
            protocol: ProtocolId::GROWING_OBJECT,
            message_type: 7,
            message_id: 5,
            correlation_id: 0,
            message_flags: MessageFlags::NONE,
        },
        &ReplacePartsByRange {
            uri: "eml://witsml20/Log(l-7)".into(),
            delete_range: time_range,
            parts: vec![ObjectPart {
                uid: "station-12".into(),
                content_type: "application/x-witsml+xml".into(),
                data: Bytes::from_static(b"<part/>"),
            }],
        },
    );
}

#[test]
fn binary_header_is_self_delimiting() {
    // Concatenated header + body with no length prefix: decoding the header
    // as a prefix must leave exactly the body bytes.
    let codec = FrameCodec::new(MessageEncoding::Binary);
    let header = MessageHeader {
        protocol: ProtocolId::CORE,
        message_type: 5,
        message_id: 2,
        correlation_id: 0,
        message_flags: MessageFlags::NONE,
    };
    let body = CloseSession {
        reason: "shutdown".into(),
    };
    let frame = codec.encode(&header, &body).unwrap();
    let (_, inbound) = codec.decode(&frame).unwrap();
    let etpkit_wire::InboundBody::Binary(rest) = inbound else {
        panic!("binary codec must defer binary bodies");
    };
    assert_eq!(rest, Bytes::from(etpkit_wire::avro::to_vec(&body).unwrap()));
}
