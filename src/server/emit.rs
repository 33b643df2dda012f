use crate::duel::Effect;
use crate::live::engine::LiveEffect;
use crate::notify::Dispatcher;
use crate::rooms::Fabric;
use crate::rooms::RoomKey;
use serde_json::json;
use std::sync::Arc;

/// Post-commit effect emission, in the order the transaction produced
/// them: state update, game ended, then per-player notifications. Failures
/// are logged and swallowed; a committed operation never turns into a
/// client-visible error here.
pub struct Emitter {
    fabric: Arc<Fabric>,
    dispatcher: Arc<Dispatcher>,
}

impl Emitter {
    pub fn new(fabric: Arc<Fabric>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { fabric, dispatcher }
    }
    pub fn fabric(&self) -> &Arc<Fabric> {
        &self.fabric
    }

    pub async fn emit(&self, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::Broadcast {
                    room,
                    event,
                    payload,
                    exclude,
                } => {
                    let frame = json!({ "type": event, "data": payload }).to_string();
                    self.fabric.broadcast(room, &frame, *exclude).await;
                }
                Effect::Notify { to, kind, payload } => {
                    // the user room mirrors the in-app feed for connected clients
                    let frame = json!({
                        "type": "notification",
                        "kind": kind,
                        "data": payload,
                    })
                    .to_string();
                    self.fabric.send_to_user(*to, &frame).await;
                    self.dispatcher.dispatch(*to, *kind, payload.clone()).await;
                }
            }
        }
    }

    pub async fn emit_live(&self, effects: &[LiveEffect]) {
        for effect in effects {
            match effect {
                LiveEffect::Broadcast {
                    room,
                    message,
                    exclude,
                } => {
                    self.fabric
                        .broadcast(room, &message.to_json(), *exclude)
                        .await;
                }
                LiveEffect::Send { to, message } => {
                    self.fabric.send_to_user(*to, &message.to_json()).await;
                }
                LiveEffect::Notify { to, kind, payload } => {
                    self.dispatcher.dispatch(*to, *kind, payload.clone()).await;
                }
            }
        }
    }

    /// Convenience for direct error frames outside the effect pipeline.
    pub async fn send_to_user(&self, to: crate::duel::PlayerId, json: &str) {
        self.fabric.send_to_user(to, json).await;
    }
    pub async fn broadcast(&self, room: &RoomKey, json: &str) {
        self.fabric.broadcast(room, json, None).await;
    }
}
