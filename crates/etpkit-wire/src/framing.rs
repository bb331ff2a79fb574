//! Frame-level codec: header + body in one transport frame.

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use etpkit_protocol::MessageHeader;
use etpkit_transport_traits::Frame;

use crate::avro;
use crate::error::{CodecError, CodecResult};

/// The session's message encoding, latched from the `etp-encoding` handshake
/// header for the lifetime of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageEncoding {
    /// Avro-binary framing in binary frames (`etp+binary`, the default).
    #[default]
    Binary,
    /// JSON framing in text frames (`etp+json`).
    Json,
}

impl MessageEncoding {
    /// Default name of the handshake header that selects the encoding.
    pub const HEADER_NAME: &'static str = "etp-encoding";

    /// The handshake header value for this encoding.
    pub const fn header_value(self) -> &'static str {
        match self {
            Self::Binary => "etp+binary",
            Self::Json => "etp+json",
        }
    }

    /// Parses a handshake header value; unknown values are rejected so the
    /// upgrade can be refused rather than silently mis-framed.
    pub fn from_header_value(value: &str) -> Option<Self> {
        match value.trim() {
            "etp+binary" => Some(Self::Binary),
            "etp+json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// An inbound message body whose decoding is deferred until the header has
/// selected the record type from the message catalog.
#[derive(Debug, Clone)]
pub enum InboundBody {
    /// Avro-binary body bytes.
    Binary(Bytes),
    /// Parsed JSON body value.
    Json(Value),
}

impl InboundBody {
    /// Decodes the body as `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> CodecResult<T> {
        match self {
            Self::Binary(bytes) => avro::from_slice(bytes),
            Self::Json(value) => {
                serde_json::from_value(value.clone()).map_err(CodecError::from)
            }
        }
    }
}

/// Encodes and decodes whole frames in the session's fixed encoding.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    encoding: MessageEncoding,
}

impl FrameCodec {
    /// Creates a codec for the given encoding.
    pub const fn new(encoding: MessageEncoding) -> Self {
        Self { encoding }
    }

    /// The encoding this codec produces.
    pub const fn encoding(&self) -> MessageEncoding {
        self.encoding
    }

    /// Encodes a header and body into one frame.
    pub fn encode<T: Serialize>(&self, header: &MessageHeader, body: &T) -> CodecResult<Frame> {
        match self.encoding {
            MessageEncoding::Binary => {
                let mut out = avro::to_vec(header)?;
                out.extend(avro::to_vec(body)?);
                Ok(Frame::Binary(Bytes::from(out)))
            }
            MessageEncoding::Json => {
                let array = Value::Array(vec![
                    serde_json::to_value(header)?,
                    serde_json::to_value(body)?,
                ]);
                Ok(Frame::Text(array.to_string()))
            }
        }
    }

    /// Decodes a frame into its header and deferred body.
    ///
    /// The frame kind selects the framing: binary frames split after the
    /// self-delimiting header, text frames parse the outer two-element array
    /// and keep the body value for typed decoding after header inspection.
    pub fn decode(&self, frame: &Frame) -> CodecResult<(MessageHeader, InboundBody)> {
        match frame {
            Frame::Binary(bytes) => {
                let (header, consumed) = avro::from_slice_prefix::<MessageHeader>(bytes)?;
                Ok((header, InboundBody::Binary(bytes.slice(consumed..))))
            }
            Frame::Text(text) => {
                let mut elements: Vec<Value> = serde_json::from_str(text)?;
                if elements.len() != 2 {
                    return Err(CodecError::decode(format!(
                        "expected [header, body] array, got {} elements",
                        elements.len()
                    )));
                }
                let body = elements.pop().unwrap_or(Value::Null);
                let header = elements.pop().unwrap_or(Value::Null);
                let header: MessageHeader = serde_json::from_value(header)?;
                Ok((header, InboundBody::Json(body)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etpkit_protocol::types::store::GetObject;
    use etpkit_protocol::{MessageFlags, ProtocolId};

    fn sample_header() -> MessageHeader {
        MessageHeader {
            protocol: ProtocolId::STORE,
            message_type: 1,
            message_id: 1,
            correlation_id: 0,
            message_flags: MessageFlags::NONE,
        }
    }

    #[test]
    fn encoding_header_values_roundtrip() {
        for encoding in [MessageEncoding::Binary, MessageEncoding::Json] {
            assert_eq!(
                MessageEncoding::from_header_value(encoding.header_value()),
                Some(encoding)
            );
        }
        assert_eq!(MessageEncoding::from_header_value(" etp+json "), Some(MessageEncoding::Json));
        assert_eq!(MessageEncoding::from_header_value("etp+xml"), None);
    }

    #[test]
    fn binary_frame_roundtrips() {
        let codec = FrameCodec::new(MessageEncoding::Binary);
        let body = GetObject {
            uri: "eml://well/1".into(),
        };
        let frame = codec.encode(&sample_header(), &body).unwrap();
        let (header, inbound) = codec.decode(&frame).unwrap();
        assert_eq!(header, sample_header());
        assert_eq!(inbound.decode::<GetObject>().unwrap(), body);
    }

    #[test]
    fn binary_reencode_is_byte_identical() {
        let codec = FrameCodec::new(MessageEncoding::Binary);
        let body = GetObject {
            uri: "eml://well/1".into(),
        };
        let frame = codec.encode(&sample_header(), &body).unwrap();
        let (header, inbound) = codec.decode(&frame).unwrap();
        let reencoded = codec
            .encode(&header, &inbound.decode::<GetObject>().unwrap())
            .unwrap();
        assert_eq!(frame, reencoded);
    }

    #[test]
    fn json_frame_matches_wire_shape() {
        let codec = FrameCodec::new(MessageEncoding::Json);
        let body = GetObject {
            uri: "eml://well/1".into(),
        };
        let frame = codec.encode(&sample_header(), &body).unwrap();
        let Frame::Text(text) = &frame else {
            panic!("json codec must produce text frames");
        };
        let value: Value = serde_json::from_str(text).unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                {
                    "protocol": 4,
                    "messageType": 1,
                    "messageId": 1,
                    "correlationId": 0,
                    "messageFlags": 0,
                },
                { "uri": "eml://well/1" },
            ])
        );

        let (header, inbound) = codec.decode(&frame).unwrap();
        assert_eq!(header, sample_header());
        assert_eq!(inbound.decode::<GetObject>().unwrap(), body);
    }

    #[test]
    fn malformed_frames_are_codec_errors() {
        let codec = FrameCodec::new(MessageEncoding::Json);
        assert!(codec.decode(&Frame::Text("not json".into())).is_err());
        assert!(codec.decode(&Frame::Text("[1, 2, 3]".into())).is_err());
        assert!(
            codec
                .decode(&Frame::Binary(Bytes::from_static(&[0x80])))
                .is_err()
        );
    }
}
