//! The bidirectional event channel (`spec.md` §6): one WebSocket per
//! session, upgraded via `rocket_ws`. Structurally this plays the role the
//! teacher's `GET /api/v1/rooms/<id>/stream` SSE endpoint plays — a
//! long-lived per-connection task reading from a channel and writing JSON
//! frames — generalized to read inbound frames too (`tokio::select!` over
//! both directions, same idiom as the teacher's `stream.rs` heartbeat
//! select loop).

use crate::coalescer::Coalescer;
use crate::disappearance::DisappearanceScheduler;
use crate::protocol::InboundEvent;
use crate::registry::ConnectionRegistry;
use crate::router::{Router, SessionContext};
use futures_util::{SinkExt, StreamExt};
use rocket::{get, State};
use rocket_ws::{Message as WsMessage, WebSocket};
use std::sync::Arc;

#[get("/ws")]
pub fn ws(
    ws: WebSocket,
    router: &State<Arc<Router>>,
    registry: &State<Arc<ConnectionRegistry>>,
    disappearance: &State<Arc<DisappearanceScheduler>>,
    coalescer: &State<Arc<Coalescer>>,
) -> rocket_ws::Channel<'static> {
    let router = Arc::clone(router);
    let registry = Arc::clone(registry);
    let disappearance = Arc::clone(disappearance);
    let coalescer = Arc::clone(coalescer);

    ws.channel(move |stream| {
        Box::pin(async move {
            let session_id = uuid::Uuid::new_v4().to_string();
            println!("🔌 connection opened: {session_id}");
            let mut outbound = registry.register(session_id.clone());
            let mut ctx = SessionContext {
                session_id: session_id.clone(),
                room_id: None,
                persistent_user_id: None,
                display_name: None,
            };

            let (mut sink, mut incoming) = stream.split();

            loop {
                tokio::select! {
                    outgoing = outbound.recv() => {
                        let Some(event) = outgoing else { break };
                        let Ok(text) = serde_json::to_string(&event) else { continue };
                        if sink.send(WsMessage::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    frame = incoming.next() => {
                        match frame {
                            Some(Ok(WsMessage::Text(text))) => {
                                // Malformed/unknown frames are dropped silently
                                // (spec.md §7) — no error is ever sent back.
                                if let Ok(event) = serde_json::from_str::<InboundEvent>(&text) {
                                    let outcome = router.handle(&mut ctx, event);
                                    if let Some(room_id) = &outcome.dirty_room {
                                        coalescer.mark_dirty(room_id.clone());
                                    }
                                    if let Some(timer) = outcome.timer {
                                        disappearance.arm(timer.room_id, timer.message_id, timer.at);
                                    }
                                }
                            }
                            Some(Ok(WsMessage::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(_)) => break,
                        }
                    }
                }
            }

            registry.remove(&session_id);
            if let Some(room_id) = ctx.room_id.clone() {
                let session = session_id.clone();
                let result = router.rooms().with_room(&room_id, move |room| room.disconnect(&session));
                if let Some(result) = result
                    && !result.dispatch.is_empty()
                {
                    router.deliver(&room_id, result.dispatch, &session_id);
                }
            }
            println!("🔌 connection closed: {session_id}");

            Ok(())
        })
    })
}
