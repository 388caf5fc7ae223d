//! Fire-and-forget topic broadcast backing the live dashboard feed.
//!
//! Delivery is at-most-once with no ack; the notifications table remains the
//! durable source of truth. An absent subscriber is not an error.

use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub struct TopicMessage {
    pub topic: String,
    pub payload: serde_json::Value,
}

pub trait Broadcaster: Send + Sync {
    fn publish(&self, topic: &str, payload: serde_json::Value);
}

pub struct ChannelBroadcaster {
    tx: broadcast::Sender<TopicMessage>,
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TopicMessage> {
        self.tx.subscribe()
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn publish(&self, topic: &str, payload: serde_json::Value) {
        let message = TopicMessage {
            topic: topic.to_string(),
            payload,
        };
        // send only errors when nobody is subscribed
        if self.tx.send(message).is_err() {
            log::trace!("no live subscribers for topic {topic}");
        }
    }
}
