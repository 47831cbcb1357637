//! The server-side stand-in for one seat.
//!
//! An [`Agent`] outlives any single connection. The room asks it for
//! answers; it forwards the question to whatever connection is bound,
//! keeps the deadline, and hands back a default whenever a real answer
//! cannot come:
//!
//! ```text
//!            issue()
//!               │
//!     ┌─────────┴──────────┐
//!     │ bound and trusted? │── no ──→ default now
//!     └─────────┬──────────┘
//!               │ yes
//!               ▼
//!          [pending] ──on_reply()──→ decoded reply (or default if garbled)
//!               │
//!               ├──expire()─────→ default
//!               └──disconnect()─→ default
//! ```

use std::time::Duration;

use serde_json::Value;
use skirmish_logic::{Reply, Request};
use skirmish_protocol::{Packet, ProtocolError, RequestId, decode_reply, request_packet};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::default_reply;

/// Channel for delivering packets to a connection's writer task.
pub type PacketSender = mpsc::UnboundedSender<Packet>;

/// The two flags broadcast as `SessionStateChanged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentStatus {
    /// A connection is bound.
    pub online: bool,
    /// The connection answers its own requests.
    pub trusted: bool,
}

#[derive(Debug, Clone)]
struct Pending {
    request: Request,
    packet: Packet,
    deadline: Instant,
}

#[derive(Debug)]
struct Link {
    id: u64,
    sender: PacketSender,
}

/// One seat's proxy.
#[derive(Debug)]
pub struct Agent {
    name: String,
    display_name: String,
    seat: u8,
    link: Option<Link>,
    trusted: bool,
    pending: Option<Pending>,
    timeout: Duration,
}

impl Agent {
    /// Creates an unbound, untrusted agent.
    pub fn new(name: impl Into<String>, display_name: impl Into<String>, seat: u8, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            seat,
            link: None,
            trusted: false,
            pending: None,
            timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn seat(&self) -> u8 {
        self.seat
    }

    pub fn is_online(&self) -> bool {
        self.link.is_some()
    }

    pub fn is_trusted(&self) -> bool {
        self.trusted
    }

    pub fn status(&self) -> AgentStatus {
        AgentStatus {
            online: self.is_online(),
            trusted: self.trusted,
        }
    }

    /// Whether the connection with transport id `link` is the bound one.
    pub fn is_bound_to(&self, link: u64) -> bool {
        self.link.as_ref().is_some_and(|l| l.id == link)
    }

    /// The request still waiting for an answer.
    pub fn pending(&self) -> Option<&Request> {
        self.pending.as_ref().map(|p| &p.request)
    }

    /// When the pending request times out.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    // -------------------------------------------------------------------------
    // Binding
    // -------------------------------------------------------------------------

    /// Binds a connection, replacing any previous one.
    ///
    /// A request still pending from before is sent again so the new
    /// connection can answer it; its deadline is left alone.
    pub fn bind(&mut self, link: u64, sender: PacketSender, trusted: bool) {
        if let Some(old) = &self.link {
            tracing::debug!(player = %self.name, old = old.id, new = link, "connection replaced");
        }
        self.link = Some(Link { id: link, sender });
        self.trusted = trusted;
        if let Some(pending) = &self.pending {
            self.send(pending.packet.clone());
        }
    }

    /// Drops the bound connection and clears both flags.
    ///
    /// Returns the default for a request that was still pending.
    pub fn disconnect(&mut self) -> Option<Reply> {
        self.link = None;
        self.trusted = false;
        let pending = self.pending.take()?;
        tracing::warn!(
            player = %self.name,
            kind = %pending.request.kind(),
            "disconnected with a request pending, using default"
        );
        Some(default_reply(&pending.request))
    }

    /// Changes whether the seat answers for itself.
    ///
    /// Turning trust off answers a pending request with its default.
    pub fn set_trusted(&mut self, trusted: bool) -> Option<Reply> {
        self.trusted = trusted;
        if trusted {
            return None;
        }
        let pending = self.pending.take()?;
        Some(default_reply(&pending.request))
    }

    // -------------------------------------------------------------------------
    // Requests
    // -------------------------------------------------------------------------

    /// Puts `request` to the seat.
    ///
    /// The request is always shown to a bound connection. Returns the
    /// default reply at once when nobody can answer (unbound or
    /// untrusted); otherwise `None`, and the answer arrives later through
    /// [`on_reply`](Self::on_reply) or [`expire`](Self::expire).
    pub fn issue(&mut self, request: Request) -> Result<Option<Reply>, ProtocolError> {
        let packet = request_packet(&request)?;
        self.send(packet.clone());

        if !self.is_online() || !self.trusted {
            tracing::debug!(
                player = %self.name,
                kind = %request.kind(),
                online = self.is_online(),
                "no one to answer, using default"
            );
            return Ok(Some(default_reply(&request)));
        }

        if let Some(old) = &self.pending {
            tracing::warn!(player = %self.name, kind = %old.request.kind(), "pending request replaced");
        }
        self.pending = Some(Pending {
            request,
            packet,
            deadline: Instant::now() + self.timeout,
        });
        Ok(None)
    }

    /// Takes an answer from the connection.
    ///
    /// Returns `None` when nothing with this id is pending (a stale or
    /// foreign reply). A reply whose value does not decode is replaced by
    /// the default.
    pub fn on_reply(&mut self, id: RequestId, value: Value) -> Option<Reply> {
        let expected = RequestId::from(self.pending.as_ref()?.request.kind());
        if expected != id {
            tracing::debug!(player = %self.name, ?id, ?expected, "stale reply ignored");
            return None;
        }
        let pending = self.pending.take()?;
        match decode_reply(id, value) {
            Ok(reply) => Some(reply),
            Err(e) => {
                tracing::warn!(player = %self.name, error = %e, "unusable reply, using default");
                Some(default_reply(&pending.request))
            }
        }
    }

    /// Answers the pending request with its default if its deadline has
    /// passed by `now`.
    pub fn expire(&mut self, now: Instant) -> Option<Reply> {
        if self.pending.as_ref()?.deadline > now {
            return None;
        }
        let pending = self.pending.take()?;
        tracing::warn!(player = %self.name, kind = %pending.request.kind(), "request timed out, using default");
        Some(default_reply(&pending.request))
    }

    /// Fire-and-forget delivery to the bound connection. Dropped if
    /// nothing is bound or the writer is gone.
    pub fn send(&self, packet: Packet) {
        if let Some(link) = &self.link {
            let _ = link.sender.send(packet);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use skirmish_protocol::NotifyId;
    use skirmish_rules::{Action, HandSign, UpgradeKind};

    const TIMEOUT: Duration = Duration::from_secs(30);

    fn agent() -> Agent {
        Agent::new("alice", "Alice", 1, TIMEOUT)
    }

    fn bound(trusted: bool) -> (Agent, mpsc::UnboundedReceiver<Packet>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut a = agent();
        a.bind(7, tx, trusted);
        (a, rx)
    }

    // =====================================================================
    // issue()
    // =====================================================================

    #[tokio::test]
    async fn test_issue_unbound_returns_default_immediately() {
        let mut a = agent();
        let reply = a.issue(Request::Action).unwrap();
        assert_eq!(reply, Some(Reply::Action(Action::Pass)));
        assert!(a.pending().is_none());
        assert!(a.deadline().is_none());
    }

    #[tokio::test]
    async fn test_issue_bound_trusted_sends_and_waits() {
        let (mut a, mut rx) = bound(true);
        let reply = a.issue(Request::HandSign).unwrap();

        assert!(reply.is_none());
        assert_eq!(a.pending(), Some(&Request::HandSign));
        let sent = rx.try_recv().unwrap();
        assert!(matches!(sent, Packet::Request { id: RequestId::HandSign, .. }));
    }

    #[tokio::test]
    async fn test_issue_untrusted_shows_request_and_returns_default() {
        let (mut a, mut rx) = bound(false);
        let reply = a.issue(Request::Upgrade { points: 2 }).unwrap();

        assert_eq!(reply, Some(Reply::Upgrade(vec![UpgradeKind::MaxHp; 2])));
        assert!(a.pending().is_none());
        assert!(matches!(rx.try_recv().unwrap(), Packet::Request { id: RequestId::Upgrade, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_issue_sets_deadline_after_timeout() {
        let (mut a, _rx) = bound(true);
        let before = Instant::now();
        a.issue(Request::Action).unwrap();
        assert_eq!(a.deadline(), Some(before + TIMEOUT));
    }

    // =====================================================================
    // on_reply()
    // =====================================================================

    #[tokio::test]
    async fn test_on_reply_matching_id_decodes_and_clears_pending() {
        let (mut a, _rx) = bound(true);
        a.issue(Request::HandSign).unwrap();

        let reply = a.on_reply(RequestId::HandSign, json!("cloth"));
        assert_eq!(reply, Some(Reply::HandSign(HandSign::Cloth)));
        assert!(a.pending().is_none());
    }

    #[tokio::test]
    async fn test_on_reply_wrong_id_is_ignored() {
        let (mut a, _rx) = bound(true);
        a.issue(Request::HandSign).unwrap();

        assert!(a.on_reply(RequestId::Action, json!({"action": "pass"})).is_none());
        assert_eq!(a.pending(), Some(&Request::HandSign));
    }

    #[tokio::test]
    async fn test_on_reply_nothing_pending_is_ignored() {
        let (mut a, _rx) = bound(true);
        assert!(a.on_reply(RequestId::HandSign, json!("stone")).is_none());
    }

    #[tokio::test]
    async fn test_on_reply_garbled_value_returns_default() {
        let (mut a, _rx) = bound(true);
        a.issue(Request::OrderClaim {
            open_slots: vec![1, 2],
            tokens: 1,
        })
        .unwrap();

        let reply = a.on_reply(RequestId::OrderClaim, json!("not a list"));
        assert_eq!(reply, Some(Reply::OrderClaim(vec![1])));
    }

    // =====================================================================
    // expire()
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_expire_before_deadline_returns_none() {
        let (mut a, _rx) = bound(true);
        a.issue(Request::Action).unwrap();
        tokio::time::advance(TIMEOUT / 2).await;

        assert!(a.expire(Instant::now()).is_none());
        assert!(a.pending().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_after_deadline_returns_default() {
        let (mut a, _rx) = bound(true);
        a.issue(Request::Action).unwrap();
        tokio::time::advance(TIMEOUT).await;

        assert_eq!(a.expire(Instant::now()), Some(Reply::Action(Action::Pass)));
        assert!(a.pending().is_none());
    }

    // =====================================================================
    // bind() / disconnect() / set_trusted()
    // =====================================================================

    #[tokio::test]
    async fn test_disconnect_with_pending_returns_default_and_clears_flags() {
        let (mut a, _rx) = bound(true);
        a.issue(Request::Action).unwrap();

        assert_eq!(a.disconnect(), Some(Reply::Action(Action::Pass)));
        assert_eq!(
            a.status(),
            AgentStatus {
                online: false,
                trusted: false
            }
        );
    }

    #[tokio::test]
    async fn test_disconnect_idle_returns_none() {
        let (mut a, _rx) = bound(true);
        assert!(a.disconnect().is_none());
        assert!(!a.is_online());
    }

    #[tokio::test]
    async fn test_bind_with_pending_resends_request() {
        let (mut a, _old) = bound(true);
        a.issue(Request::HandSign).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        a.bind(8, tx, true);

        assert!(a.is_bound_to(8));
        assert!(!a.is_bound_to(7));
        assert!(matches!(rx.try_recv().unwrap(), Packet::Request { id: RequestId::HandSign, .. }));
        assert_eq!(a.pending(), Some(&Request::HandSign));
    }

    #[tokio::test]
    async fn test_set_trusted_false_answers_pending_with_default() {
        let (mut a, _rx) = bound(true);
        a.issue(Request::Upgrade { points: 1 }).unwrap();

        let reply = a.set_trusted(false);
        assert_eq!(reply, Some(Reply::Upgrade(vec![UpgradeKind::MaxHp])));
        assert!(a.is_online());
        assert!(!a.is_trusted());
    }

    #[tokio::test]
    async fn test_send_unbound_is_dropped_silently() {
        let a = agent();
        a.send(Packet::notify_value(NotifyId::Chat, json!({"text": "hi"})));
    }
}
