//! The dual-keyed protocol handler registry.
//!
//! One canonical map from protocol id to handler serves the receive path; a
//! secondary map from contract tag to protocol id serves application lookups.
//! Contract tags are per-contract constants, so lookup never needs
//! reflection. The registry is build-once-then-read: it is only mutated
//! during registration and negotiation, before the session reaches steady
//! state, and lookups afterwards are lock-free reads on the concurrent maps.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use etpkit_protocol::types::core::SupportedProtocol;
use etpkit_protocol::{Capabilities, EtpError, EtpResult, EtpVersion, ProtocolId, Role};

use crate::handler::ProtocolHandler;

/// Stable identity of a handler contract (for example `"store.customer"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContractId(pub &'static str);

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Associates a handler type with its contract tag.
pub trait HandlerContract {
    /// The contract this handler type implements.
    const CONTRACT: ContractId;
}

struct Registered {
    handler: Arc<dyn ProtocolHandler>,
    // Same object, kept as `Any` for typed contract lookups.
    any: Arc<dyn Any + Send + Sync>,
    contract: ContractId,
}

/// Holds the session's per-protocol handlers under both keys.
#[derive(Default)]
pub struct HandlerRegistry {
    by_protocol: DashMap<u16, Registered>,
    by_contract: DashMap<ContractId, ProtocolId>,
    insertion_order: Mutex<Vec<ProtocolId>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under both its contract and its protocol id.
    ///
    /// Re-registering the same contract replaces the previous handler with a
    /// warning; a different contract claiming an already-registered protocol
    /// id is rejected.
    pub fn register<H>(&self, handler: Arc<H>) -> EtpResult<()>
    where
        H: ProtocolHandler + HandlerContract,
    {
        let descriptor = handler.descriptor();
        let protocol = descriptor.protocol;

        if let Some(previous_protocol) = self.by_contract.get(&H::CONTRACT).map(|entry| *entry) {
            tracing::warn!(
                contract = %H::CONTRACT,
                protocol = %previous_protocol,
                "replacing previously registered handler for contract"
            );
            self.by_protocol.remove(&previous_protocol.0);
            self.by_contract.remove(&H::CONTRACT);
            self.insertion_order.lock().retain(|id| *id != previous_protocol);
        }

        if self.by_protocol.contains_key(&protocol.0) {
            return Err(EtpError::InvalidState(format!(
                "protocol {protocol} already has a registered handler"
            )));
        }

        let any: Arc<dyn Any + Send + Sync> = handler.clone();
        self.by_protocol.insert(
            protocol.0,
            Registered {
                handler,
                any,
                contract: H::CONTRACT,
            },
        );
        self.by_contract.insert(H::CONTRACT, protocol);
        self.insertion_order.lock().push(protocol);
        Ok(())
    }

    /// Receive-path lookup by protocol id.
    pub fn get(&self, protocol: ProtocolId) -> Option<Arc<dyn ProtocolHandler>> {
        self.by_protocol
            .get(&protocol.0)
            .map(|entry| entry.handler.clone())
    }

    /// Returns `true` if a handler is registered for `protocol`.
    pub fn contains_protocol(&self, protocol: ProtocolId) -> bool {
        self.by_protocol.contains_key(&protocol.0)
    }

    /// Returns `true` if `contract` is registered.
    pub fn contains_contract(&self, contract: ContractId) -> bool {
        self.by_contract.contains_key(&contract)
    }

    /// Application lookup by contract, downcast to the concrete handler type.
    pub fn contract_handler<H>(&self) -> EtpResult<Arc<H>>
    where
        H: ProtocolHandler + HandlerContract,
    {
        let protocol = self
            .by_contract
            .get(&H::CONTRACT)
            .map(|entry| *entry)
            .ok_or_else(|| EtpError::NotSupported(H::CONTRACT.to_string()))?;
        let entry = self
            .by_protocol
            .get(&protocol.0)
            .ok_or_else(|| EtpError::NotSupported(H::CONTRACT.to_string()))?;
        entry
            .any
            .clone()
            .downcast::<H>()
            .map_err(|_| EtpError::NotSupported(H::CONTRACT.to_string()))
    }

    /// All handlers in registration order.
    pub fn in_order(&self) -> Vec<Arc<dyn ProtocolHandler>> {
        let order = self.insertion_order.lock().clone();
        order
            .into_iter()
            .filter_map(|protocol| self.get(protocol))
            .collect()
    }

    /// The `(protocol, version, role)` tuples this side can offer during
    /// negotiation, in registration order, Core excluded.
    pub fn local_supported(
        &self,
        version: EtpVersion,
        capabilities: &Capabilities,
    ) -> Vec<SupportedProtocol> {
        self.in_order()
            .into_iter()
            .map(|handler| handler.descriptor())
            .filter(|descriptor| descriptor.protocol != ProtocolId::CORE)
            .map(|descriptor| {
                let mut supported =
                    SupportedProtocol::new(descriptor.protocol, version, descriptor.local_role);
                supported.protocol_capabilities = capabilities.clone();
                supported
            })
            .collect()
    }

    /// Removes handlers outside the negotiated set; the Core protocol is
    /// never removed.
    ///
    /// `supported` holds the peer's tuples, so a handler survives when the
    /// set contains its protocol under the handler's *remote* role.
    pub fn unregister_unsupported(&self, supported: &[SupportedProtocol]) -> Vec<ProtocolId> {
        let keys: HashSet<(ProtocolId, Role)> =
            supported.iter().map(SupportedProtocol::key).collect();
        let doomed: Vec<(ProtocolId, ContractId)> = self
            .by_protocol
            .iter()
            .filter_map(|entry| {
                let descriptor = entry.handler.descriptor();
                if descriptor.protocol == ProtocolId::CORE {
                    return None;
                }
                if keys.contains(&(descriptor.protocol, descriptor.remote_role)) {
                    return None;
                }
                Some((descriptor.protocol, entry.contract))
            })
            .collect();

        let mut removed = Vec::with_capacity(doomed.len());
        for (protocol, contract) in doomed {
            self.by_protocol.remove(&protocol.0);
            self.by_contract.remove(&contract);
            self.insertion_order.lock().retain(|id| *id != protocol);
            removed.push(protocol);
        }
        removed
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("protocols", &self.insertion_order.lock().clone())
            .finish()
    }
}
