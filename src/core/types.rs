use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Service class shared by clients, queues and servers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceClass {
    /// VIP lane
    Preferential,
    General,
}

impl std::fmt::Display for ServiceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceClass::Preferential => write!(f, "PREF"),
            ServiceClass::General => write!(f, "GEN"),
        }
    }
}

/// Stable identity of a client for the lifetime of its visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Create a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Deterministic identifier for the `seq`-th client admitted by an
    /// engine, so seeded runs replay with the same ids
    pub fn from_sequence(seq: u64) -> Self {
        Self(Uuid::from_u128(seq as u128))
    }

    /// Get the underlying uuid
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A waiting client. Lives in exactly one queue until it is dispatched,
/// reneges, or the engine is dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    pub id: ClientId,
    /// Simulation clock (hours) at creation
    pub arrival_time: f64,
    pub class: ServiceClass,
    /// Maximum tolerated wait in hours; only set when reneging is enabled
    pub patience: Option<f64>,
}

impl Client {
    /// Create a new client arriving at `arrival_time`
    pub fn new(arrival_time: f64, class: ServiceClass, patience: Option<f64>) -> Self {
        Self::with_id(ClientId::new(), arrival_time, class, patience)
    }

    pub fn with_id(
        id: ClientId,
        arrival_time: f64,
        class: ServiceClass,
        patience: Option<f64>,
    ) -> Self {
        Self {
            id,
            arrival_time,
            class,
            patience,
        }
    }

    /// Hours spent waiting so far
    pub fn waited(&self, now: f64) -> f64 {
        now - self.arrival_time
    }

    /// True once the client has waited longer than its patience
    pub fn has_run_out_of_patience(&self, now: f64) -> bool {
        match self.patience {
            Some(limit) => self.waited(now) > limit,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ids_are_unique() {
        let a = Client::new(0.0, ServiceClass::General, None);
        let b = Client::new(0.0, ServiceClass::General, None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_sequence_ids() {
        let id = ClientId::from_sequence(42);
        assert_eq!(id, ClientId::from_sequence(42));
        assert_ne!(id, ClientId::from_sequence(43));
        assert_eq!(id.as_uuid().as_u128(), 42);

        let client = Client::with_id(id, 0.5, ServiceClass::General, None);
        assert_eq!(client.id, id);
        assert_eq!(client.arrival_time, 0.5);
    }

    #[test]
    fn test_patience() {
        let client = Client::new(1.0, ServiceClass::Preferential, Some(0.25));
        assert!(!client.has_run_out_of_patience(1.25));
        assert!(client.has_run_out_of_patience(1.26));

        let stoic = Client::new(0.0, ServiceClass::General, None);
        assert!(!stoic.has_run_out_of_patience(1_000.0));
    }

    #[test]
    fn test_class_display() {
        assert_eq!(ServiceClass::Preferential.to_string(), "PREF");
        assert_eq!(ServiceClass::General.to_string(), "GEN");
    }
}
