//! Event publication: payload types and the publisher trait.
//!
//! Events are a best-effort side channel. Publication is fire-and-forget
//! with at most one attempt; a failed publish is logged by the caller and
//! never joined to the originating request's outcome.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// The topic all clinic events are published under.
pub const CLINIC_TOPIC: &str = "clinic";

/// Routing key for appointment creation events.
pub const APPOINTMENT_CREATED: &str = "appointment.created";

/// Routing key for patient creation events.
pub const PATIENT_CREATED: &str = "patient.created";

/// Errors that can occur when publishing an event.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The broker could not be reached.
    #[error("Event broker unreachable: {0}")]
    Unreachable(String),
    /// The event payload could not be serialized.
    #[error("Event serialization failed: {0}")]
    Serialization(String),
}

/// Result type for event operations.
pub type Result<T> = std::result::Result<T, EventError>;

/// A domain event emitted after a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClinicEvent {
    AppointmentCreated {
        tenant_id: Uuid,
        appointment_id: Uuid,
        patient_id: Uuid,
        branch_id: Uuid,
        start_at: DateTime<Utc>,
    },
    PatientCreated {
        tenant_id: Uuid,
        patient_id: Uuid,
    },
}

impl ClinicEvent {
    /// The routing key this event is published under.
    pub fn routing_key(&self) -> &'static str {
        match self {
            ClinicEvent::AppointmentCreated { .. } => APPOINTMENT_CREATED,
            ClinicEvent::PatientCreated { .. } => PATIENT_CREATED,
        }
    }
}

/// A fire-and-forget event sink.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes one event under a topic and routing key. Implementations
    /// make a single delivery attempt; there is no retry or buffering.
    async fn publish(&self, topic: &str, routing_key: &str, event: &ClinicEvent) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_keys() {
        let event = ClinicEvent::PatientCreated {
            tenant_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
        };
        assert_eq!(event.routing_key(), "patient.created");
    }

    #[test]
    fn test_event_payload_is_tagged() {
        let event = ClinicEvent::AppointmentCreated {
            tenant_id: Uuid::new_v4(),
            appointment_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            start_at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains("\"type\":\"appointment_created\""));
    }
}
