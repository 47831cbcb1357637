//! Per-connection handler: handshake, sign-in, and packet routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive `ClientVersion` → check it, answer `ServerVersion`
//!   2. Receive `SignIn` or `Reconnect` → bind the connection to a seat
//!   3. Loop: inbound packets go to the room, the seat's outbound packets
//!      go to the wire

use std::sync::Arc;

use skirmish_protocol::{
    Chat, Codec, ErrorCode, ErrorNotice, NotifyId, PROTOCOL_VERSION, Packet, ProtocolError,
    Reconnect, RoomId, SetSessionState, SignIn, Version,
};
use skirmish_room::{Departure, JoinRequest, RoomError, RoomHandle};
use skirmish_session::{PacketSender, new_connection_id};
use skirmish_transport::Connection;
use tokio::sync::mpsc;

use crate::SkirmishError;
use crate::server::ServerState;

/// The seat a connection ended up bound to.
struct Binding {
    name: String,
    connection_id: String,
    room: RoomHandle,
}

/// Drop guard that reports the connection's departure to its room and
/// the session manager when the handler exits.
///
/// `Drop` is synchronous, so the cleanup runs on a spawned task.
struct SeatGuard<C: Codec> {
    name: String,
    connection_id: String,
    link: u64,
    room: RoomHandle,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for SeatGuard<C> {
    fn drop(&mut self) {
        let name = std::mem::take(&mut self.name);
        let connection_id = std::mem::take(&mut self.connection_id);
        let link = self.link;
        let room = self.room.clone();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let departure = room.disconnect(&name, link).await;
            let mut sessions = state.sessions.lock().await;
            match departure {
                Ok(Departure::Released) => {
                    sessions.remove(&connection_id);
                }
                Ok(Departure::Stale) => {}
                // The game goes on, or the room is already gone and will be
                // pruned along with its identifiers.
                Ok(Departure::Offline) | Err(_) => {
                    let _ = sessions.disconnect(&connection_id, link);
                }
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<Conn, C>(
    conn: Conn,
    state: Arc<ServerState<C>>,
) -> Result<(), SkirmishError>
where
    Conn: Connection,
    C: Codec,
{
    let link = conn.id().into_inner();
    tracing::debug!(conn_id = %conn.id(), "handling new connection");

    // --- Step 1: Version handshake ---
    if let Err(e) = perform_handshake(&conn, &state).await {
        let _ = conn.close().await;
        return Err(e);
    }

    // --- Step 2: Sign-in or reconnect ---
    let (sender, mut outbound) = mpsc::unbounded_channel();
    let Some(binding) = bind_seat(&conn, &state, link, sender).await? else {
        return Ok(());
    };
    tracing::info!(player = %binding.name, room_id = %binding.room.room_id(), link, "seat bound");

    let _guard = SeatGuard {
        name: binding.name.clone(),
        connection_id: binding.connection_id.clone(),
        link,
        room: binding.room.clone(),
        state: Arc::clone(&state),
    };

    // --- Step 3: Packet loop ---
    let result = run_seat(&conn, &state, &binding, &mut outbound).await;
    let _ = conn.close().await;

    // _guard drops here → departure is reported.
    result
}

/// Receives the first packet and checks it is a compatible
/// `ClientVersion`.
async fn perform_handshake<Conn: Connection, C: Codec>(
    conn: &Conn,
    state: &ServerState<C>,
) -> Result<(), SkirmishError> {
    let packet = match tokio::time::timeout(state.handshake_timeout, recv_packet(conn, &state.codec)).await
    {
        Ok(Ok(Some(packet))) => packet,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage("connection closed before handshake".into()).into());
        }
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let version = match &packet {
        Packet::Notify {
            id: NotifyId::ClientVersion,
            ..
        } => packet.payload::<Version>().ok().map(|v| v.version),
        _ => None,
    };

    match version {
        Some(PROTOCOL_VERSION) => {
            let ack = Packet::notify(
                NotifyId::ServerVersion,
                &Version {
                    version: PROTOCOL_VERSION,
                },
            )?;
            send_packet(conn, &state.codec, &ack).await
        }
        other => {
            let message = match other {
                Some(v) => format!("version mismatch: expected {PROTOCOL_VERSION}, got {v}"),
                None => "first packet must be a version notify".to_string(),
            };
            tracing::warn!(conn_id = %conn.id(), %message, "handshake rejected");
            send_error(conn, &state.codec, ErrorCode::VersionMismatch, &message).await?;
            Err(ProtocolError::InvalidMessage(message).into())
        }
    }
}

/// Waits for a `SignIn` or `Reconnect` that succeeds.
///
/// A failed attempt is answered with an `Error` notify and the client may
/// try again. Returns `None` if the connection closes first.
async fn bind_seat<Conn: Connection, C: Codec>(
    conn: &Conn,
    state: &ServerState<C>,
    link: u64,
    sender: PacketSender,
) -> Result<Option<Binding>, SkirmishError> {
    loop {
        let Some(packet) = recv_packet(conn, &state.codec).await? else {
            tracing::debug!(conn_id = %conn.id(), "closed before sign-in");
            return Ok(None);
        };

        let attempt = match &packet {
            Packet::Notify {
                id: NotifyId::SignIn,
                ..
            } => match packet.payload::<SignIn>() {
                Ok(sign_in) => sign_in_seat(state, sign_in, link, sender.clone()).await,
                Err(e) => Err((ErrorCode::BadRequest, e.to_string())),
            },
            Packet::Notify {
                id: NotifyId::Reconnect,
                ..
            } => match packet.payload::<Reconnect>() {
                Ok(reconnect) => reconnect_seat(state, reconnect, link, sender.clone()).await,
                Err(e) => Err((ErrorCode::BadRequest, e.to_string())),
            },
            other => {
                tracing::warn!(conn_id = %conn.id(), packet = ?other.kind(), "packet before sign-in dropped");
                continue;
            }
        };

        match attempt {
            Ok(binding) => return Ok(Some(binding)),
            Err((code, message)) => send_error(conn, &state.codec, code, &message).await?,
        }
    }
}

/// Seats a newcomer in the first room that takes them.
async fn sign_in_seat<C: Codec>(
    state: &ServerState<C>,
    sign_in: SignIn,
    link: u64,
    sender: PacketSender,
) -> Result<Binding, (ErrorCode, String)> {
    let connection_id = new_connection_id();
    let request = JoinRequest {
        name: sign_in.name.clone(),
        display_name: sign_in.display_name,
        trusted: sign_in.trusted,
        connection_id: connection_id.clone(),
        link,
        sender,
    };

    // Seat assignment is serialized by the rooms lock.
    let mut rooms = state.rooms.lock().await;
    let finished = rooms.prune_finished();
    let seat = rooms.join_or_create(request).await;

    let mut sessions = state.sessions.lock().await;
    for room_id in finished {
        sessions.remove_room(room_id);
    }
    let seat = seat.map_err(|e| (join_error_code(&e), e.to_string()))?;
    let room = rooms
        .get(seat.room_id)
        .ok_or_else(|| (ErrorCode::Unavailable, format!("room {} is gone", seat.room_id)))?;
    if let Err(e) = sessions.create(seat.room_id, &sign_in.name, connection_id.clone(), link) {
        tracing::warn!(player = %sign_in.name, error = %e, "seat has no session record");
    }
    tracing::info!(player = %sign_in.name, room_id = %seat.room_id, seat = seat.seat, "signed in");

    Ok(Binding {
        name: sign_in.name,
        connection_id,
        room,
    })
}

/// Re-binds a new connection to an existing seat.
async fn reconnect_seat<C: Codec>(
    state: &ServerState<C>,
    reconnect: Reconnect,
    link: u64,
    sender: PacketSender,
) -> Result<Binding, (ErrorCode, String)> {
    let room_id: RoomId = {
        let mut sessions = state.sessions.lock().await;
        sessions
            .reconnect(&reconnect.name, &reconnect.connection_id, link)
            .map(|session| session.room_id)
            .map_err(|e| (ErrorCode::UnknownSession, e.to_string()))?
    };

    let room = state.rooms.lock().await.get(room_id);
    let bound = match room {
        Some(room) => match room.reconnect(&reconnect.name, link, sender).await {
            Ok(()) => Ok(room),
            Err(e) => Err((ErrorCode::UnknownSession, e.to_string())),
        },
        None => Err((ErrorCode::UnknownSession, format!("room {room_id} has ended"))),
    };

    match bound {
        Ok(room) => {
            tracing::info!(player = %reconnect.name, %room_id, link, "reconnected");
            Ok(Binding {
                name: reconnect.name,
                connection_id: reconnect.connection_id,
                room,
            })
        }
        Err(e) => {
            // The seat stays with whatever connection had it before.
            let _ = state
                .sessions
                .lock()
                .await
                .disconnect(&reconnect.connection_id, link);
            Err(e)
        }
    }
}

fn join_error_code(error: &RoomError) -> ErrorCode {
    match error {
        RoomError::NameTaken { .. } => ErrorCode::NameTaken,
        RoomError::Rule(_) => ErrorCode::BadRequest,
        _ => ErrorCode::Unavailable,
    }
}

/// Forwards packets both ways until either side goes away.
async fn run_seat<Conn: Connection, C: Codec>(
    conn: &Conn,
    state: &ServerState<C>,
    binding: &Binding,
    outbound: &mut mpsc::UnboundedReceiver<Packet>,
) -> Result<(), SkirmishError> {
    let name = binding.name.as_str();
    loop {
        tokio::select! {
            inbound = recv_packet(conn, &state.codec) => {
                let Some(packet) = inbound? else {
                    tracing::info!(player = name, "connection closed cleanly");
                    return Ok(());
                };
                route_packet(conn, state, binding, packet).await?;
            }
            packet = outbound.recv() => {
                let Some(packet) = packet else {
                    tracing::info!(player = name, "room ended, closing connection");
                    return Ok(());
                };
                send_packet(conn, &state.codec, &packet).await?;
            }
        }
    }
}

/// Routes one inbound packet of a seated connection.
async fn route_packet<Conn: Connection, C: Codec>(
    conn: &Conn,
    state: &ServerState<C>,
    binding: &Binding,
    packet: Packet,
) -> Result<(), SkirmishError> {
    let name = binding.name.as_str();
    let room = &binding.room;

    let id = match packet {
        Packet::Reply { id, value } => {
            tracing::debug!(player = name, request = ?id, "reply");
            let _ = room.reply(name, id, value).await;
            return Ok(());
        }
        Packet::Request { id, .. } => {
            tracing::warn!(player = name, request = ?id, "request from a client dropped");
            return Ok(());
        }
        Packet::Notify { id, .. } => id,
    };

    if !id.namespace().is_inbound() {
        tracing::warn!(
            player = name,
            notify = ?id,
            namespace = ?id.namespace(),
            "notify outside the inbound namespaces dropped"
        );
        return Ok(());
    }

    let result = match id {
        NotifyId::SendChat => match packet.payload::<Chat>() {
            Ok(chat) => {
                let _ = room.chat(name, chat.text).await;
                Ok(())
            }
            Err(e) => Err(e),
        },
        NotifyId::SetSessionState => match packet.payload::<SetSessionState>() {
            Ok(change) => {
                let _ = room.set_trusted(name, change.trusted).await;
                Ok(())
            }
            Err(e) => Err(e),
        },
        other => {
            tracing::debug!(player = name, notify = ?other, "notify not valid once seated");
            Err(ProtocolError::InvalidMessage(format!("{other:?} is not valid once seated")))
        }
    };

    if let Err(e) = result {
        send_error(conn, &state.codec, ErrorCode::BadRequest, &e.to_string()).await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Wire helpers
// ---------------------------------------------------------------------------

/// Receives and decodes one packet. A malformed envelope is an error, so
/// the caller closes the connection.
async fn recv_packet<Conn: Connection, C: Codec>(
    conn: &Conn,
    codec: &C,
) -> Result<Option<Packet>, SkirmishError> {
    let Some(data) = conn.recv().await? else {
        return Ok(None);
    };
    match codec.decode_packet(&data) {
        Ok(packet) => Ok(Some(packet)),
        Err(e) => {
            tracing::warn!(conn_id = %conn.id(), error = %e, "malformed envelope");
            Err(e.into())
        }
    }
}

async fn send_packet<Conn: Connection, C: Codec>(
    conn: &Conn,
    codec: &C,
    packet: &Packet,
) -> Result<(), SkirmishError> {
    let bytes = codec.encode_packet(packet)?;
    conn.send(&bytes).await?;
    Ok(())
}

async fn send_error<Conn: Connection, C: Codec>(
    conn: &Conn,
    codec: &C,
    code: ErrorCode,
    message: &str,
) -> Result<(), SkirmishError> {
    let packet = Packet::notify(NotifyId::Error, &ErrorNotice::new(code, message))?;
    send_packet(conn, codec, &packet).await
}
