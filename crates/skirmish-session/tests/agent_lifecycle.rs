//! One seat through a whole disconnect / reconnect cycle.

use std::time::Duration;

use serde_json::json;
use skirmish_logic::{Reply, Request};
use skirmish_protocol::{Packet, RequestId, RoomId};
use skirmish_rules::{Action, HandSign};
use skirmish_session::{Agent, SessionManager, new_connection_id};
use tokio::sync::mpsc;
use tokio::time::Instant;

const TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test(start_paused = true)]
async fn test_issue_unbound_hand_sign_answers_without_waiting() {
    let mut agent = Agent::new("ghost", "Ghost", 2, TIMEOUT);
    let before = Instant::now();

    let reply = agent.issue(Request::HandSign).unwrap();

    assert!(matches!(reply, Some(Reply::HandSign(_))));
    assert_eq!(Instant::now(), before);
    assert!(agent.deadline().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_agent_and_session_survive_reconnect() {
    let mut sessions = SessionManager::new();
    let mut agent = Agent::new("alice", "Alice", 1, TIMEOUT);

    let (tx, mut rx) = mpsc::unbounded_channel();
    agent.bind(1, tx, true);
    let id = sessions.create(RoomId(1), "alice", new_connection_id(), 1).unwrap().connection_id.clone();

    assert!(agent.issue(Request::HandSign).unwrap().is_none());
    assert!(matches!(rx.recv().await, Some(Packet::Request { id: RequestId::HandSign, .. })));

    // A new connection takes over before the old one is noticed gone.
    let (tx2, mut rx2) = mpsc::unbounded_channel();
    sessions.reconnect("alice", &id, 2).unwrap();
    agent.bind(2, tx2, true);
    assert!(matches!(rx2.recv().await, Some(Packet::Request { id: RequestId::HandSign, .. })));

    // The old link's disconnect is stale on both sides.
    assert!(!sessions.disconnect(&id, 1).unwrap());
    assert!(!agent.is_bound_to(1));

    let reply = agent.on_reply(RequestId::HandSign, json!("scissors"));
    assert_eq!(reply, Some(Reply::HandSign(HandSign::Scissors)));
}

#[tokio::test(start_paused = true)]
async fn test_pending_request_times_out_to_pass() {
    let mut agent = Agent::new("alice", "Alice", 1, TIMEOUT);
    let (tx, _rx) = mpsc::unbounded_channel();
    agent.bind(1, tx, true);
    agent.issue(Request::Action).unwrap();

    let deadline = agent.deadline().unwrap();
    tokio::time::sleep_until(deadline).await;

    assert_eq!(agent.expire(Instant::now()), Some(Reply::Action(Action::Pass)));
}
