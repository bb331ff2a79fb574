//! The Core protocol handler (protocol 0).
//!
//! Registered automatically at session construction and never removed by
//! negotiation. The customer side treats `OpenSession` as a tracked reply;
//! the store side drives negotiation; both sides honor `CloseSession` and,
//! on ETP 1.2 sessions, answer `Ping` with `Pong`.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::{debug, info, trace};

use etpkit_protocol::types::core as core_msg;
use etpkit_protocol::types::core::{CloseSession, OpenSession, Ping, Pong, RequestSession};
use etpkit_protocol::{
    ErrorInfo, EtpError, EtpResult, EtpVersion, MessageFlags, MessageHeader, ProtocolId, Role,
};
use etpkit_wire::InboundBody;

use crate::events::EventListeners;
use crate::handler::{ExceptionReceived, HandlerDescriptor, ProtocolHandler, SessionSlot};
use crate::registry::{ContractId, HandlerContract};
use crate::session::SessionHandle;

fn now_microseconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_micros() as i64)
        .unwrap_or(0)
}

/// Core-protocol state for one session.
pub struct CoreHandler {
    session: SessionSlot,
    role: Role,
    exceptions: EventListeners<ExceptionReceived>,
}

impl CoreHandler {
    pub(crate) fn new(role: Role) -> Self {
        Self {
            session: SessionSlot::new(),
            role,
            exceptions: EventListeners::new(),
        }
    }

    /// Protocol exceptions addressed to the Core protocol, including
    /// `UnsupportedProtocol` replies for traffic this peer sent on
    /// unregistered protocols.
    pub fn exceptions(&self) -> &EventListeners<ExceptionReceived> {
        &self.exceptions
    }

    /// Sends a keep-alive `Ping` (ETP 1.2 sessions only).
    pub async fn ping(&self) -> EtpResult<i64> {
        let session = self.session.get()?;
        if session.version()? != EtpVersion::V12 {
            return Err(EtpError::NotSupported("Ping requires an ETP 1.2 session".into()));
        }
        let header = MessageHeader::request(ProtocolId::CORE, core_msg::PING);
        session
            .send(
                header,
                &Ping {
                    current_date_time: now_microseconds(),
                },
            )
            .await
    }
}

impl HandlerContract for CoreHandler {
    const CONTRACT: ContractId = ContractId("core");
}

#[async_trait]
impl ProtocolHandler for CoreHandler {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor {
            protocol: ProtocolId::CORE,
            local_role: self.role,
            remote_role: self.role.counterpart(),
            contract: Self::CONTRACT,
        }
    }

    fn attach(&self, session: SessionHandle) {
        self.session.bind(session);
    }

    async fn handle_message(&self, header: &MessageHeader, body: &InboundBody) -> EtpResult<()> {
        let session = self.session.get()?;
        let version = session.version()?;
        match header.message_type {
            core_msg::REQUEST_SESSION => {
                if self.role != Role::Store {
                    return Err(EtpError::InvalidMessageType {
                        protocol: ProtocolId::CORE,
                        message_type: header.message_type,
                    });
                }
                let request: RequestSession = body.decode()?;
                session.core()?.negotiate_as_server(header, request).await
            }
            core_msg::OPEN_SESSION => {
                if self.role != Role::Customer {
                    return Err(EtpError::InvalidMessageType {
                        protocol: ProtocolId::CORE,
                        message_type: header.message_type,
                    });
                }
                // Completion is delivered through the correlation tracker;
                // decoding here just validates the body early.
                let open: OpenSession = body.decode()?;
                debug!(session_id = %open.session_id, "open session received");
                Ok(())
            }
            core_msg::CLOSE_SESSION => {
                let close: CloseSession = body.decode()?;
                info!(reason = %close.reason, "peer requested close");
                session.core()?.teardown(Some(&close.reason), false).await;
                Ok(())
            }
            core_msg::PING if version == EtpVersion::V12 => {
                let _ping: Ping = body.decode()?;
                let reply = MessageHeader::response(
                    ProtocolId::CORE,
                    core_msg::PONG,
                    header.message_id,
                    MessageFlags::NONE,
                );
                session
                    .send(
                        reply,
                        &Pong {
                            current_date_time: now_microseconds(),
                        },
                    )
                    .await?;
                Ok(())
            }
            core_msg::PONG if version == EtpVersion::V12 => {
                let pong: Pong = body.decode()?;
                trace!(peer_time = pong.current_date_time, "pong received");
                Ok(())
            }
            other => Err(EtpError::InvalidMessageType {
                protocol: ProtocolId::CORE,
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
