//! In-memory event publisher.
//!
//! Thread-safe broadcast of clinic events using tokio broadcast channels.
//! Each (topic, routing key) pair has its own channel for targeted delivery.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

use clinica_core::events::{ClinicEvent, EventPublisher, Result};

/// Channel capacity for event messages.
const CHANNEL_CAPACITY: usize = 100;

/// In-memory event publisher backed by broadcast channels.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    channels: Arc<RwLock<HashMap<(String, String), broadcast::Sender<ClinicEvent>>>>,
}

impl BroadcastPublisher {
    /// Creates a new empty publisher.
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Gets or creates the channel for a (topic, routing key) pair.
    async fn get_or_create_channel(
        &self,
        topic: &str,
        routing_key: &str,
    ) -> broadcast::Sender<ClinicEvent> {
        let channel_key = (topic.to_string(), routing_key.to_string());

        // Try read lock first to avoid write contention
        {
            let channels = self.channels.read().await;
            if let Some(sender) = channels.get(&channel_key) {
                return sender.clone();
            }
        }

        // Need to create a new channel
        let mut channels = self.channels.write().await;

        // Double-check after acquiring write lock
        if let Some(sender) = channels.get(&channel_key) {
            return sender.clone();
        }

        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        channels.insert(channel_key, sender.clone());
        sender
    }

    /// Subscribes to events published under a (topic, routing key) pair.
    pub async fn subscribe(
        &self,
        topic: &str,
        routing_key: &str,
    ) -> broadcast::Receiver<ClinicEvent> {
        self.get_or_create_channel(topic, routing_key)
            .await
            .subscribe()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for BroadcastPublisher {
    async fn publish(&self, topic: &str, routing_key: &str, event: &ClinicEvent) -> Result<()> {
        let sender = self.get_or_create_channel(topic, routing_key).await;

        // Send the event. If there are no receivers, that's fine -
        // it just means no one is listening for this routing key.
        let _ = sender.send(event.clone());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinica_core::events::{APPOINTMENT_CREATED, CLINIC_TOPIC, PATIENT_CREATED};
    use uuid::Uuid;

    fn patient_event() -> ClinicEvent {
        ClinicEvent::PatientCreated {
            tenant_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_publish_and_subscribe() {
        let publisher = BroadcastPublisher::new();
        let event = patient_event();

        let mut receiver = publisher.subscribe(CLINIC_TOPIC, PATIENT_CREATED).await;

        publisher
            .publish(CLINIC_TOPIC, PATIENT_CREATED, &event)
            .await
            .unwrap();

        let received = receiver.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let publisher = BroadcastPublisher::new();
        let event = patient_event();

        let mut receiver1 = publisher.subscribe(CLINIC_TOPIC, PATIENT_CREATED).await;
        let mut receiver2 = publisher.subscribe(CLINIC_TOPIC, PATIENT_CREATED).await;

        publisher
            .publish(CLINIC_TOPIC, PATIENT_CREATED, &event)
            .await
            .unwrap();

        assert_eq!(receiver1.recv().await.unwrap(), event);
        assert_eq!(receiver2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_routing_keys_are_isolated() {
        let publisher = BroadcastPublisher::new();

        let mut patient_rx = publisher.subscribe(CLINIC_TOPIC, PATIENT_CREATED).await;
        let mut appointment_rx = publisher.subscribe(CLINIC_TOPIC, APPOINTMENT_CREATED).await;

        let event = patient_event();
        publisher
            .publish(CLINIC_TOPIC, PATIENT_CREATED, &event)
            .await
            .unwrap();

        assert_eq!(patient_rx.recv().await.unwrap(), event);
        // The appointment channel saw nothing.
        assert!(appointment_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_no_subscribers() {
        let publisher = BroadcastPublisher::new();

        // Publish without any subscribers - should not error
        let result = publisher
            .publish(CLINIC_TOPIC, PATIENT_CREATED, &patient_event())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_channel_reuse() {
        let publisher = BroadcastPublisher::new();

        let _receiver1 = publisher.subscribe(CLINIC_TOPIC, PATIENT_CREATED).await;
        {
            let channels = publisher.channels.read().await;
            assert_eq!(channels.len(), 1);
        }

        let _receiver2 = publisher.subscribe(CLINIC_TOPIC, PATIENT_CREATED).await;
        {
            let channels = publisher.channels.read().await;
            assert_eq!(channels.len(), 1);
        }
    }
}
