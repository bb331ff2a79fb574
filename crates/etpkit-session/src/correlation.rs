//! In-flight request tracking and multipart assembly.
//!
//! Every request this peer initiates may register an entry keyed by its
//! `messageId`. Inbound replies append to the entry's part buffer; the part
//! carrying `FinalPart` (or a single non-multipart reply) removes the entry
//! and delivers the assembled set through the completion signal. Protocol
//! exceptions, session close, and deadline expiry complete entries with the
//! corresponding failure outcome.
//!
//! The table is a concurrent map of its own, disjoint from the session's send
//! lock; entry reclamation is O(1).

use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::time::Instant;

use etpkit_protocol::{ErrorInfo, MessageHeader, ProtocolId};
use etpkit_wire::InboundBody;

/// One message of an assembled response set.
#[derive(Debug, Clone)]
pub struct AssembledPart {
    /// The part's header.
    pub header: MessageHeader,
    /// The part's body, still in wire form.
    pub body: InboundBody,
}

/// How a tracked request ended.
#[derive(Debug)]
pub enum CorrelationOutcome {
    /// All parts arrived; the final part is last.
    Completed(Vec<AssembledPart>),
    /// The peer answered with a protocol exception.
    Failed(ErrorInfo),
    /// The per-correlation deadline elapsed before the final part.
    TimedOut,
    /// The session closed with the request still in flight.
    SessionClosed,
}

/// What [`CorrelationTracker::record_reply`] did with an inbound reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyDisposition {
    /// Appended to an in-flight entry; more parts expected.
    Appended,
    /// The final part arrived; the entry was removed and completed.
    Completed,
    /// No entry matched the correlation id.
    Orphan,
}

/// An outstanding request awaiting its response set.
#[derive(Debug)]
pub struct PendingRequest {
    protocol: ProtocolId,
    expected_types: Vec<u16>,
    parts: Vec<AssembledPart>,
    completion: Option<oneshot::Sender<CorrelationOutcome>>,
    deadline: Option<Instant>,
}

impl PendingRequest {
    /// Creates a tracking-only entry for a request on `protocol`.
    pub fn new(protocol: ProtocolId) -> Self {
        Self {
            protocol,
            expected_types: Vec::new(),
            parts: Vec::new(),
            completion: None,
            deadline: None,
        }
    }

    /// Declares the message types a well-behaved peer answers with.
    #[must_use]
    pub fn with_expected_types(mut self, expected_types: Vec<u16>) -> Self {
        self.expected_types = expected_types;
        self
    }

    /// Attaches a completion signal for a caller awaiting the reply.
    #[must_use]
    pub fn with_completion(mut self, completion: oneshot::Sender<CorrelationOutcome>) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Attaches a deadline; expiry completes the entry with
    /// [`CorrelationOutcome::TimedOut`] without sending anything on the wire.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn finish(mut self, outcome_for_signal: impl FnOnce(Self) -> CorrelationOutcome) {
        if let Some(completion) = self.completion.take() {
            let _ = completion.send(outcome_for_signal(self));
        }
    }
}

/// The session's table of in-flight requests.
#[derive(Debug, Default)]
pub struct CorrelationTracker {
    entries: DashMap<i64, PendingRequest>,
}

impl CorrelationTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entry under the request's `message_id`.
    ///
    /// Called from the `on_before_send` hook so the entry exists before the
    /// request bytes reach the wire.
    pub fn register(&self, message_id: i64, pending: PendingRequest) {
        if self.entries.insert(message_id, pending).is_some() {
            tracing::warn!(message_id, "replaced an existing correlation entry");
        }
    }

    /// Returns `true` if `message_id` has an in-flight entry.
    pub fn is_tracking(&self, message_id: i64) -> bool {
        self.entries.contains_key(&message_id)
    }

    /// Number of in-flight entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records an inbound reply for `header.correlation_id`.
    pub fn record_reply(&self, header: &MessageHeader, body: &InboundBody) -> ReplyDisposition {
        let is_final = {
            let Some(mut entry) = self.entries.get_mut(&header.correlation_id) else {
                return ReplyDisposition::Orphan;
            };
            if !entry.expected_types.is_empty()
                && !entry.expected_types.contains(&header.message_type)
            {
                tracing::warn!(
                    correlation_id = header.correlation_id,
                    message_type = header.message_type,
                    protocol = %entry.protocol,
                    "reply message type outside the expected set"
                );
            }
            entry.parts.push(AssembledPart {
                header: *header,
                body: body.clone(),
            });
            header.is_final()
        };

        if !is_final {
            return ReplyDisposition::Appended;
        }
        if let Some((_, pending)) = self.entries.remove(&header.correlation_id) {
            pending.finish(|p| CorrelationOutcome::Completed(p.parts));
        }
        ReplyDisposition::Completed
    }

    /// Completes an entry with a peer protocol exception. Returns `false` if
    /// no entry matched (an orphan exception).
    pub fn fail(&self, correlation_id: i64, error: ErrorInfo) -> bool {
        match self.entries.remove(&correlation_id) {
            Some((_, pending)) => {
                pending.finish(|_| CorrelationOutcome::Failed(error));
                true
            }
            None => false,
        }
    }

    /// Completes every outstanding entry with
    /// [`CorrelationOutcome::SessionClosed`]. Terminal states discard all
    /// pending correlations.
    pub fn complete_all_closed(&self) -> usize {
        let ids: Vec<i64> = self.entries.iter().map(|entry| *entry.key()).collect();
        let mut completed = 0;
        for id in ids {
            if let Some((_, pending)) = self.entries.remove(&id) {
                pending.finish(|_| CorrelationOutcome::SessionClosed);
                completed += 1;
            }
        }
        completed
    }

    /// Removes entries whose deadline has passed, completing each with
    /// [`CorrelationOutcome::TimedOut`]. Returns the expired ids.
    pub fn expire_due(&self) -> Vec<i64> {
        let now = Instant::now();
        let due: Vec<i64> = self
            .entries
            .iter()
            .filter(|entry| entry.deadline.is_some_and(|deadline| deadline <= now))
            .map(|entry| *entry.key())
            .collect();

        let mut expired = Vec::new();
        for id in due {
            if let Some((_, pending)) = self.entries.remove(&id) {
                pending.finish(|_| CorrelationOutcome::TimedOut);
                expired.push(id);
            }
        }
        expired
    }
}
