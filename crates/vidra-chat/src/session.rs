//! WebSocket session actor.
//!
//! One actor per connection. On start it subscribes to the member's
//! own fan-out topic and begins the protocol-level liveness ping; the
//! read loop dispatches actions one at a time, and `enter_room` /
//! `leave_room` swap the per-room subscription. Every write goes
//! through the mailbox, so the ping ticker, subscription callbacks
//! and action replies cannot interleave bytes on the socket.

use std::sync::Arc;
use std::time::Duration;

use actix::{fut, Actor, ActorContext, ActorFutureExt, AsyncContext, Handler, Message, StreamHandler};
use actix_web_actors::ws;
use log::{debug, error, info, warn};

use vidra_broker::{RedisChatSubscriber, Subscription};
use vidra_commons::constants::{member_topic, room_topic};
use vidra_commons::{ChatMessage, MemberId, RoomId};

use crate::actions::{Action, WsResponse};
use crate::dispatch::{dispatch, SessionCommand};
use crate::state::ChatServices;

/// Interval of the protocol-level ping.
pub const PING_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// A fan-out message for this connection's member.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Notify(pub ChatMessage);

/// WebSocket session actor for one authenticated member.
pub struct ChatSession {
    member_id: MemberId,
    services: Arc<ChatServices>,
    subscriber: RedisChatSubscriber,
    /// Per-member topic subscription, held for the connection's life.
    user_sub: Option<Subscription>,
    /// Per-room subscription while inside a room. Replaced on
    /// `enter_room`, dropped on `leave_room` and on disconnect.
    room_sub: Option<Subscription>,
}

impl ChatSession {
    pub fn new(
        member_id: MemberId,
        services: Arc<ChatServices>,
        subscriber: RedisChatSubscriber,
    ) -> Self {
        Self {
            member_id,
            services,
            subscriber,
            user_sub: None,
            room_sub: None,
        }
    }

    fn start_ping(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(PING_INTERVAL, |act, ctx| {
            debug!("ping sent to {}", act.member_id);
            ctx.ping(b"ping");
        });
    }

    /// Subscribe to this member's own topic. Failing to subscribe
    /// means the member cannot receive fan-out, so the connection is
    /// closed rather than left silently deaf.
    fn subscribe_member_topic(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let subscriber = self.subscriber.clone();
        let topic = member_topic(self.member_id.as_str());
        let addr = ctx.address();

        ctx.wait(
            fut::wrap_future(async move {
                subscriber
                    .subscribe(&topic, move |message| {
                        addr.do_send(Notify(message));
                    })
                    .await
            })
            .map(|result, act: &mut Self, ctx| match result {
                Ok(sub) => act.user_sub = Some(sub),
                Err(e) => {
                    error!("member topic subscription failed for {}: {e}", act.member_id);
                    ctx.close(None);
                    ctx.stop();
                }
            }),
        );
    }

    fn subscribe_room_topic(&mut self, ctx: &mut ws::WebsocketContext<Self>, room_id: RoomId) {
        // entering a new room replaces the previous subscription
        self.room_sub = None;

        let subscriber = self.subscriber.clone();
        let topic = room_topic(room_id.as_str());
        let addr = ctx.address();

        ctx.wait(
            fut::wrap_future(async move {
                subscriber
                    .subscribe(&topic, move |message| {
                        addr.do_send(Notify(message));
                    })
                    .await
            })
            .map(|result, act: &mut Self, _ctx| match result {
                Ok(sub) => act.room_sub = Some(sub),
                Err(e) => warn!("room topic subscription failed for {}: {e}", act.member_id),
            }),
        );
    }

    fn handle_frame(&mut self, ctx: &mut ws::WebsocketContext<Self>, text: &str) {
        let action: Action = match serde_json::from_str(text) {
            Ok(action) => action,
            Err(e) => {
                debug!("unparseable frame from {}: {e}", self.member_id);
                ctx.text(WsResponse::unknown_action().to_json());
                return;
            }
        };

        let services = self.services.clone();
        let member = self.member_id.clone();

        // ctx.wait serializes actions per connection: the next frame
        // is not processed until this dispatch completed
        ctx.wait(
            fut::wrap_future(async move { dispatch(&services, &member, action).await }).map(
                |(response, command), act: &mut Self, ctx| {
                    if let Some(error) = &response.error {
                        warn!(
                            "action {} failed for {}: {error}",
                            response.action, act.member_id
                        );
                    }
                    ctx.text(response.to_json());

                    match command {
                        Some(SessionCommand::EnterRoom(room_id)) => {
                            act.subscribe_room_topic(ctx, room_id)
                        }
                        Some(SessionCommand::LeaveRoom) => act.room_sub = None,
                        None => {}
                    }
                },
            ),
        );
    }
}

impl Actor for ChatSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("websocket connected: {}", self.member_id);
        self.start_ping(ctx);
        self.subscribe_member_topic(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        // dropping the handles aborts both subscription tasks
        self.user_sub = None;
        self.room_sub = None;
        info!("websocket closed: {}", self.member_id);
    }
}

/// The frame delivered to a recipient for a fanned-out message.
fn notify_response(message: &ChatMessage) -> WsResponse {
    WsResponse::ok("notify_message")
        .with("message_id", message.message_id.as_str())
        .with("sender_id", message.sender_id.as_str())
        .with("message", message.content.as_str())
        .with("timestamp", message.timestamp)
}

impl Handler<Notify> for ChatSession {
    type Result = ();

    fn handle(&mut self, msg: Notify, ctx: &mut Self::Context) {
        ctx.text(notify_response(&msg.0).to_json());
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ChatSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => self.handle_frame(ctx, &text),
            Ok(ws::Message::Ping(payload)) => ctx.pong(&payload),
            Ok(ws::Message::Pong(_)) => debug!("pong from {}", self.member_id),
            Ok(ws::Message::Binary(_)) => {
                warn!("binary frames not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                info!("client closed: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                error!("websocket protocol error for {}: {e}", self.member_id);
                ctx.stop();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_frame_carries_the_message() {
        let sender = MemberId::generate();
        let message = ChatMessage::new(sender.clone(), "hi".into(), 1_700_000_000);
        let frame = notify_response(&message);

        let json: serde_json::Value = serde_json::from_str(&frame.to_json()).unwrap();
        assert_eq!(json["action"], "notify_message");
        assert_eq!(json["success"], true);
        assert_eq!(json["payload"]["message_id"], message.message_id.as_str());
        assert_eq!(json["payload"]["sender_id"], sender.as_str());
        assert_eq!(json["payload"]["message"], "hi");
        assert_eq!(json["payload"]["timestamp"], 1_700_000_000);
    }
}
