use super::types::{Client, ClientId, ServiceClass};
use serde::Serialize;

/// A single service station
#[derive(Debug, Clone, Serialize)]
pub struct Server {
    /// Stable index within the pool
    pub id: usize,
    /// Fixed at construction
    pub class: ServiceClass,
    pub busy: bool,
    /// Hours of service left for the current client
    pub remaining_service_time: f64,
    pub current_client_class: Option<ServiceClass>,
    #[serde(skip)]
    pub current_client: Option<ClientId>,
    /// Hours this station has spent serving
    pub busy_hours: f64,
    /// Clients completed at this station
    pub served: u64,
}

impl Server {
    fn new(id: usize, class: ServiceClass) -> Self {
        Self {
            id,
            class,
            busy: false,
            remaining_service_time: 0.0,
            current_client_class: None,
            current_client: None,
            busy_hours: 0.0,
            served: 0,
        }
    }

    /// Count down the current service by `dt`.
    /// Returns true when the service finished during this advance.
    pub fn advance(&mut self, dt: f64) -> bool {
        if !self.busy {
            return false;
        }
        self.remaining_service_time -= dt;
        self.busy_hours += dt;
        if self.remaining_service_time <= 0.0 {
            self.busy = false;
            self.remaining_service_time = 0.0;
            self.current_client_class = None;
            self.current_client = None;
            self.served += 1;
            return true;
        }
        false
    }

    /// Start serving `client` for `service_time` hours. The client record
    /// is consumed; only its class and id are kept.
    pub fn assign(&mut self, client: Client, service_time: f64) {
        self.busy = true;
        self.remaining_service_time = service_time;
        self.current_client_class = Some(client.class);
        self.current_client = Some(client.id);
    }
}

/// Fixed set of stations. Preferential stations occupy the lowest indices.
#[derive(Debug, Clone)]
pub struct ServerPool {
    servers: Vec<Server>,
    preferential_count: usize,
}

impl ServerPool {
    /// Build `count` stations (at least one), the first `preferential`
    /// of them VIP. A single-station pool never has a VIP station.
    pub fn new(count: usize, preferential: usize) -> Self {
        let count = count.max(1);
        let preferential_count = if count == 1 { 0 } else { preferential.min(count) };
        let servers = (0..count)
            .map(|i| {
                let class = if i < preferential_count {
                    ServiceClass::Preferential
                } else {
                    ServiceClass::General
                };
                Server::new(i, class)
            })
            .collect();
        Self {
            servers,
            preferential_count,
        }
    }

    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    pub(crate) fn servers_mut(&mut self) -> &mut [Server] {
        &mut self.servers
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn preferential_count(&self) -> usize {
        self.preferential_count
    }

    /// True if at least one VIP station exists
    pub fn has_preferential(&self) -> bool {
        self.preferential_count > 0
    }

    pub fn busy_count(&self) -> usize {
        self.servers.iter().filter(|s| s.busy).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_places_vip_first() {
        let pool = ServerPool::new(4, 2);
        let classes: Vec<_> = pool.servers().iter().map(|s| s.class).collect();
        assert_eq!(
            classes,
            vec![
                ServiceClass::Preferential,
                ServiceClass::Preferential,
                ServiceClass::General,
                ServiceClass::General
            ]
        );
        assert!(pool.has_preferential());
    }

    #[test]
    fn test_single_station_is_never_vip() {
        let pool = ServerPool::new(1, 5);
        assert_eq!(pool.servers()[0].class, ServiceClass::General);
        assert!(!pool.has_preferential());
    }

    #[test]
    fn test_vip_count_clamped() {
        let pool = ServerPool::new(3, 10);
        assert_eq!(pool.preferential_count(), 3);
        let empty = ServerPool::new(0, 0);
        assert_eq!(empty.len(), 1);
    }

    #[test]
    fn test_service_countdown() {
        let mut pool = ServerPool::new(2, 0);
        let server = &mut pool.servers_mut()[0];
        server.assign(Client::new(0.0, ServiceClass::General, None), 0.05);
        assert!(server.busy);
        assert_eq!(server.current_client_class, Some(ServiceClass::General));

        assert!(!server.advance(0.03));
        assert!(server.advance(0.03));
        assert!(!server.busy);
        assert_eq!(server.current_client, None);
        assert_eq!(server.served, 1);
        assert!((server.busy_hours - 0.06).abs() < 1e-12);

        assert!(!server.advance(0.03));
        assert_eq!(pool.busy_count(), 0);
    }
}
