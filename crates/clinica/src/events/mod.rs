//! Event publisher backends and the fire-and-forget helper.

mod memory;

pub use memory::BroadcastPublisher;

use std::sync::Arc;

use clinica_core::events::{ClinicEvent, EventPublisher, CLINIC_TOPIC};

/// Publishes an event on a detached task.
///
/// The originating request never waits for, or learns about, the outcome:
/// a failed publish is logged and dropped. At most one attempt is made.
pub fn spawn_publish(publisher: Arc<dyn EventPublisher>, event: ClinicEvent) {
    tokio::spawn(async move {
        let routing_key = event.routing_key();
        if let Err(e) = publisher.publish(CLINIC_TOPIC, routing_key, &event).await {
            tracing::warn!(error = %e, routing_key, "Failed to publish event");
        }
    });
}
