//! Event bus and audit log.
//!
//! A `tokio::sync::broadcast`-backed publish/subscribe channel carrying the
//! two event kinds the core observes: download-state `TransitionEvent`s and
//! acquisition `GrabRequested` intents. Delivery is best-effort per
//! subscriber — a full buffer drops that subscriber's copy rather than
//! blocking the publisher; ordering is FIFO per subscriber, with no
//! cross-subscriber ordering guarantee.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::correlation::{current_correlation_id, CorrelationId};
use crate::error::{CoreError, Result};
use crate::models::DownloadStatus;

const EVENT_BUFFER_SIZE: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub correlation_id: CorrelationId,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub event: SystemEvent,
}

impl EventEnvelope {
    pub fn new(event: SystemEvent) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            correlation_id: current_correlation_id(),
            timestamp: chrono::Utc::now(),
            event,
        }
    }

    pub fn description(&self) -> String {
        format!(
            "[{}] {} (event_id={})",
            self.correlation_id,
            self.event.description(),
            self.event_id
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SystemEvent {
    /// Emitted exactly once by a successful `Transition`; no event is
    /// emitted on rejection.
    Transition {
        download_id: Uuid,
        from: DownloadStatus,
        to: DownloadStatus,
        at: chrono::DateTime<chrono::Utc>,
    },
    /// Emitted by the acquisition pipeline once per search it issues.
    GrabRequested {
        content_id: Uuid,
        release_name: String,
        indexer: String,
        season: Option<i32>,
        is_complete_season: bool,
        download_url: String,
    },
}

impl SystemEvent {
    pub fn description(&self) -> String {
        match self {
            SystemEvent::Transition {
                download_id,
                from,
                to,
                ..
            } => format!("download {download_id} transitioned {from:?} -> {to:?}"),
            SystemEvent::GrabRequested {
                content_id,
                release_name,
                ..
            } => format!("grab requested for content {content_id}: {release_name}"),
        }
    }

    pub fn entity_id(&self) -> Uuid {
        match self {
            SystemEvent::Transition { download_id, .. } => *download_id,
            SystemEvent::GrabRequested { content_id, .. } => *content_id,
        }
    }

    pub fn entity_type(&self) -> &'static str {
        match self {
            SystemEvent::Transition { .. } => "download",
            SystemEvent::GrabRequested { .. } => "content",
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            SystemEvent::Transition { .. } => "transition",
            SystemEvent::GrabRequested { .. } => "grab_requested",
        }
    }
}

/// One row of the append-only audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub occurred_at: chrono::DateTime<chrono::Utc>,
}

impl From<&EventEnvelope> for AuditEntry {
    fn from(envelope: &EventEnvelope) -> Self {
        Self {
            id: envelope.event_id,
            event_type: envelope.event.event_type().to_string(),
            entity_type: envelope.event.entity_type().to_string(),
            entity_id: envelope.event.entity_id(),
            occurred_at: envelope.timestamp,
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self { sender }
    }

    pub fn with_buffer_size(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);
        Self { sender }
    }

    /// Best-effort: a closed channel (no receivers) is not an error.
    pub fn publish(&self, event: SystemEvent) {
        let envelope = EventEnvelope::new(event);
        debug!("publishing event: {}", envelope.description());
        match self.sender.send(envelope) {
            Ok(count) => debug!("event delivered to {count} subscribers"),
            Err(broadcast::error::SendError(_)) => debug!("event published with no subscribers"),
        }
    }

    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EventSubscriber {
    receiver: broadcast::Receiver<EventEnvelope>,
}

impl EventSubscriber {
    pub async fn recv(&mut self) -> Result<EventEnvelope> {
        match self.receiver.recv().await {
            Ok(envelope) => Ok(envelope),
            Err(broadcast::error::RecvError::Closed) => Err(CoreError::ExternalServiceError {
                service: "event_bus".to_string(),
                error: "event bus channel closed".to_string(),
            }),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("event subscriber lagged, skipped {skipped} events");
                Box::pin(self.recv()).await
            }
        }
    }
}

/// A component that reacts to events, e.g. the audit logger.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, envelope: &EventEnvelope) -> Result<()>;
}

/// Background consumer that dispatches every event it observes to its
/// registered handlers, logging (not propagating) handler failures.
pub struct EventProcessor {
    subscriber: EventSubscriber,
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventProcessor {
    pub fn new(event_bus: &EventBus) -> Self {
        Self {
            subscriber: event_bus.subscribe(),
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub async fn run(mut self) -> Result<()> {
        info!("starting event processor with {} handlers", self.handlers.len());
        loop {
            match self.subscriber.recv().await {
                Ok(envelope) => {
                    for handler in &self.handlers {
                        if let Err(err) = handler.handle_event(&envelope).await {
                            error!(
                                "handler failed to process event {}: {}",
                                envelope.description(),
                                err
                            );
                        }
                    }
                }
                Err(err) => {
                    error!("event processor stopping: {err}");
                    break;
                }
            }
        }
        Ok(())
    }
}

/// Persists every event observed to the audit log repository.
pub struct AuditLogger {
    repository: Arc<dyn crate::domain::AuditRepository>,
}

impl AuditLogger {
    pub fn new(repository: Arc<dyn crate::domain::AuditRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl EventHandler for AuditLogger {
    async fn handle_event(&self, envelope: &EventEnvelope) -> Result<()> {
        let entry: AuditEntry = envelope.into();
        self.repository.record(&entry).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{timeout, Duration};

    struct CountingHandler {
        counter: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle_event(&self, _envelope: &EventEnvelope) -> Result<()> {
            self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn transition_event() -> SystemEvent {
        SystemEvent::Transition {
            download_id: Uuid::new_v4(),
            from: DownloadStatus::Queued,
            to: DownloadStatus::Downloading,
            at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn publish_and_receive_roundtrips() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        bus.publish(transition_event());
        let envelope = sub.recv().await.unwrap();
        assert!(matches!(envelope.event, SystemEvent::Transition { .. }));
    }

    #[tokio::test]
    async fn delivery_is_fifo_per_subscriber() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        for i in 0..3 {
            bus.publish(SystemEvent::GrabRequested {
                content_id: Uuid::new_v4(),
                release_name: format!("release-{i}"),
                indexer: "prowlarr".to_string(),
                season: None,
                is_complete_season: false,
                download_url: "magnet:?x".to_string(),
            });
        }
        for i in 0..3 {
            let envelope = sub.recv().await.unwrap();
            if let SystemEvent::GrabRequested { release_name, .. } = envelope.event {
                assert_eq!(release_name, format!("release-{i}"));
            } else {
                panic!("wrong event kind");
            }
        }
    }

    #[tokio::test]
    async fn multiple_subscribers_each_receive_the_event() {
        let bus = EventBus::new();
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(transition_event());

        let r1 = timeout(Duration::from_millis(100), sub1.recv()).await.unwrap().unwrap();
        let r2 = timeout(Duration::from_millis(100), sub2.recv()).await.unwrap().unwrap();
        assert_eq!(r1.event_id, r2.event_id);
    }

    #[tokio::test]
    async fn event_processor_dispatches_to_handlers() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(CountingHandler {
            counter: counter.clone(),
        });
        let processor = EventProcessor::new(&bus).add_handler(handler);
        let handle = tokio::spawn(processor.run());

        tokio::time::sleep(Duration::from_millis(10)).await;
        for _ in 0..5 {
            bus.publish(transition_event());
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 5);

        drop(bus);
        let _ = timeout(Duration::from_millis(100), handle).await;
    }
}
