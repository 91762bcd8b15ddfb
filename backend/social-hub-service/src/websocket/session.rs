use super::{ChannelId, ClientMessage, JoinError, PresenceRegistry, ServerEvent};
use crate::config::WebSocketConfig;
use actix::{Actor, ActorContext, ActorFutureExt, AsyncContext, StreamHandler, WrapFuture};
use actix_web_actors::ws;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

/// One live channel.
///
/// The channel is registered before the actor starts; `stopped` removes it again.
pub struct WsSession {
    channel_id: ChannelId,
    user_id: Option<Uuid>,
    registry: PresenceRegistry,
    events: Option<UnboundedReceiver<ServerEvent>>,
    hb: Instant,
    heartbeat_interval: Duration,
    client_timeout: Duration,
}

impl WsSession {
    pub fn new(
        channel_id: ChannelId,
        events: UnboundedReceiver<ServerEvent>,
        registry: PresenceRegistry,
        config: &WebSocketConfig,
    ) -> Self {
        Self {
            channel_id,
            user_id: None,
            registry,
            events: Some(events),
            hb: Instant::now(),
            heartbeat_interval: Duration::from_secs(config.heartbeat_interval_secs),
            client_timeout: Duration::from_secs(config.client_timeout_secs),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let timeout = self.client_timeout;
        ctx.run_interval(self.heartbeat_interval, move |act, ctx| {
            if Instant::now().duration_since(act.hb) > timeout {
                tracing::warn!(channel_id = %act.channel_id, "WebSocket heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn send_event(&self, ctx: &mut ws::WebsocketContext<Self>, event: &ServerEvent) {
        match event.to_json() {
            Ok(text) => ctx.text(text),
            Err(e) => tracing::error!(event = event.name(), "Failed to encode event: {}", e),
        }
    }

    fn handle_client_message(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match msg {
            ClientMessage::Ping {} => self.send_event(ctx, &ServerEvent::Pong),
            ClientMessage::JoinUserRoom { user_id } => {
                if let Some(existing) = self.user_id.filter(|existing| *existing != user_id) {
                    let err = JoinError::AlreadyJoined(existing);
                    self.send_event(ctx, &ServerEvent::error("already_joined", err.to_string()));
                    return;
                }

                let registry = self.registry.clone();
                let channel_id = self.channel_id;
                let join = async move { registry.join(user_id, channel_id).await };

                ctx.spawn(join.into_actor(self).map(move |result, act, ctx| match result {
                    Ok(()) => {
                        act.user_id = Some(user_id);
                        tracing::info!(channel_id = %act.channel_id, user_id = %user_id, "channel joined user room");
                        act.send_event(ctx, &ServerEvent::Joined { user_id });
                    }
                    Err(e) => {
                        tracing::warn!(channel_id = %act.channel_id, user_id = %user_id, "join refused: {}", e);
                        act.send_event(ctx, &ServerEvent::error("already_joined", e.to_string()));
                    }
                }));
            }
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(channel_id = %self.channel_id, "WebSocket session started");

        self.hb(ctx);

        if let Some(events) = self.events.take() {
            ctx.add_stream(UnboundedReceiverStream::new(events));
        }

        self.send_event(
            ctx,
            &ServerEvent::Connected {
                channel_id: self.channel_id,
            },
        );
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(
            channel_id = %self.channel_id,
            user_id = ?self.user_id,
            "WebSocket session stopped"
        );

        let registry = self.registry.clone();
        let channel_id = self.channel_id;
        actix::spawn(async move {
            registry.leave(channel_id).await;
        });
    }
}

// Events routed to this channel
impl StreamHandler<ServerEvent> for WsSession {
    fn handle(&mut self, event: ServerEvent, ctx: &mut Self::Context) {
        self.send_event(ctx, &event);
    }

    fn finished(&mut self, ctx: &mut Self::Context) {
        // registry dropped our sender
        ctx.stop();
    }
}

// WebSocket protocol frames from the client
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.hb = Instant::now();
                match ClientMessage::from_json(&text) {
                    Ok(msg) => self.handle_client_message(msg, ctx),
                    Err(e) => {
                        tracing::warn!(channel_id = %self.channel_id, "Failed to parse WS message: {}", e);
                        self.send_event(ctx, &ServerEvent::error("invalid_message", e.to_string()));
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!("Binary WebSocket messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!("WebSocket close message received: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                tracing::warn!(channel_id = %self.channel_id, "WebSocket protocol error: {}", e);
                ctx.stop();
            }
            _ => {}
        }
    }
}
