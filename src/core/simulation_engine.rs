use super::config::EngineConfig;
use super::queues::QueueSet;
use super::random::{bernoulli, sample_exponential, sample_patience, RngSource, UniformSource};
use super::servers::{Server, ServerPool};
use super::stats::{Statistics, StatsSnapshot};
use super::types::{Client, ClientId, ServiceClass};
use log::{debug, info};
use rand::rngs::StdRng;
use std::collections::VecDeque;

/// Steppable multi-queue, multi-station service floor.
///
/// The engine only changes inside [`SimulationEngine::step`]. Callers drive it
/// with small simulation-hour increments and read its state in between.
pub struct SimulationEngine<U: UniformSource = RngSource<StdRng>> {
    config: EngineConfig,
    arrival_rate: f64,
    vip_probability: f64,
    queues: QueueSet,
    pool: ServerPool,
    stats: Statistics,
    clock: f64,
    overtime: f64,
    open: bool,
    active: bool,
    admitted: u64,
    source: U,
}

impl SimulationEngine<RngSource<StdRng>> {
    /// Create an engine drawing from an entropy-seeded generator
    pub fn new(config: EngineConfig) -> Self {
        Self::with_source(config, RngSource::from_entropy())
    }

    /// Create an engine whose run can be replayed from `seed`
    pub fn seeded(config: EngineConfig, seed: u64) -> Self {
        Self::with_source(config, RngSource::seeded(seed))
    }
}

impl<U: UniformSource> SimulationEngine<U> {
    /// Create an engine drawing every random number from `source`
    pub fn with_source(config: EngineConfig, source: U) -> Self {
        let server_count = config.server_count.max(1);
        let pool = ServerPool::new(server_count, config.vip_server_count());
        let queues = QueueSet::new(config.general_queue_count);
        let vip_probability = if pool.has_preferential() {
            config.vip_arrivals.probability()
        } else {
            0.0
        };

        debug!(
            "Engine built: {} stations ({} VIP), {} general lines, {:?} mode",
            pool.len(),
            pool.preferential_count(),
            queues.general_line_count(),
            config.mode
        );

        Self {
            arrival_rate: config.arrival_rate,
            vip_probability,
            queues,
            pool,
            stats: Statistics::new(),
            clock: 0.0,
            overtime: 0.0,
            open: true,
            active: true,
            admitted: 0,
            source,
            config,
        }
    }

    /// Advance the simulation by `dt` hours.
    ///
    /// Returns false once the floor is closed and empty; from then on the
    /// engine no longer changes.
    pub fn step(&mut self, dt: f64) -> bool {
        if !self.active {
            return false;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        // clock and closing
        let mut dt_normal = 0.0;
        if self.open {
            let until_close = (self.config.operating_hours - self.clock).max(0.0);
            if dt >= until_close {
                dt_normal = until_close;
                self.clock = self.config.operating_hours;
                self.open = false;
                info!("Closing at {:.3}h with {} clients inside", self.clock, self.clients_in_system());
            } else {
                dt_normal = dt;
                self.clock += dt;
            }
        }

        if dt_normal > 0.0 {
            self.try_arrival(dt_normal);
        }

        if self.config.mode.reneging_enabled() {
            let left = self.queues.renege(self.clock);
            if left > 0 {
                debug!("{} clients reneged at {:.3}h", left, self.clock);
                self.stats.record_abandonments(left);
            }
        }

        if !self.open {
            if self.clients_in_system() > 0 {
                self.overtime += dt - dt_normal;
            } else {
                self.active = false;
                info!(
                    "Floor empty after {:.3}h overtime: {} served, {} abandoned, {} rejected",
                    self.overtime, self.stats.served, self.stats.abandoned, self.stats.rejected
                );
                return false;
            }
        }

        self.queues.rebalance(self.config.tuning.rebalance_threshold);
        self.serve(dt);

        self.stats.observe_queue_length(self.queues.total_len());
        self.stats
            .record_busy_fraction(self.pool.busy_count(), self.pool.len(), dt);

        true
    }

    /// One Bernoulli arrival trial over `dt` open hours
    fn try_arrival(&mut self, dt: f64) {
        if !bernoulli(self.source.next_uniform(), self.arrival_rate * dt) {
            return;
        }
        self.stats.record_arrival();

        let class = if self.pool.has_preferential()
            && bernoulli(self.source.next_uniform(), self.vip_probability)
        {
            ServiceClass::Preferential
        } else {
            ServiceClass::General
        };

        let mut patience = None;
        if self.config.mode.reneging_enabled() {
            let limit = self.config.abandon_tolerance * self.queues.general_line_count() as f64;
            if self.queues.total_len() as f64 > limit
                && bernoulli(self.source.next_uniform(), self.config.tuning.shed_probability)
            {
                debug!("Arrival turned away at {:.3}h ({} queued)", self.clock, self.queues.total_len());
                self.stats.record_rejection();
                return;
            }
            patience = Some(sample_patience(
                self.source.next_uniform(),
                self.config.patience_base_hours(),
                self.config.tuning.patience_spread,
            ));
        }

        self.admitted += 1;
        let id = ClientId::from_sequence(self.admitted);
        self.queues
            .enqueue(Client::with_id(id, self.clock, class, patience));
    }

    /// Count down busy stations and hand waiting clients to idle ones
    fn serve(&mut self, dt: f64) {
        let has_preferential = self.pool.has_preferential();
        let can_dispatch = self.config.service_rate > 0.0;

        for server in self.pool.servers_mut() {
            if server.advance(dt) {
                self.stats.record_served();
            }
            if server.busy || !can_dispatch {
                continue;
            }

            let next = match server.class {
                ServiceClass::Preferential => self
                    .queues
                    .pop_preferential()
                    .or_else(|| self.queues.pop_fullest_general()),
                ServiceClass::General => match self.queues.pop_fullest_general() {
                    Some(client) => Some(client),
                    None if !has_preferential => self.queues.pop_preferential(),
                    None => None,
                },
            };

            if let Some(client) = next {
                self.stats.record_wait(client.waited(self.clock));
                let service_time =
                    sample_exponential(self.source.next_uniform(), self.config.service_rate);
                debug!(
                    "Station {} takes {} client {} for {:.4}h",
                    server.id, client.class, client.id, service_time
                );
                server.assign(client, service_time);
            }
        }
    }

    /// Snapshot of counters and derived metrics
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            pref_queue_len: self.queues.preferential_len(),
            gen_queue_len: self.queues.general_len(),
            arrivals: self.stats.arrivals,
            served: self.stats.served,
            abandoned: self.stats.abandoned,
            rejected: self.stats.rejected,
            wait_time_sum: self.stats.wait_time_sum,
            busy_time_sum: self.stats.busy_time_sum,
            max_queue_length: self.stats.max_queue_length,
            utilization: self.stats.utilization(self.elapsed_hours()),
            avg_wait_minutes: self.stats.avg_wait_minutes(),
            overtime_hours: self.overtime,
            ticket_price: self.config.ticket_price,
            cost_per_client: self.config.cost_per_client,
        }
    }

    /// Change λ; takes effect on the next step
    pub fn set_arrival_rate(&mut self, rate: f64) {
        debug!("Arrival rate {} -> {}", self.arrival_rate, rate);
        self.arrival_rate = rate;
    }

    pub fn arrival_rate(&self) -> f64 {
        self.arrival_rate
    }

    /// Operating hours elapsed since opening, capped at closing time
    pub fn clock_hours(&self) -> f64 {
        self.clock
    }

    pub fn overtime_hours(&self) -> f64 {
        self.overtime
    }

    /// Regular plus overtime hours
    pub fn elapsed_hours(&self) -> f64 {
        self.clock + self.overtime
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn server_count(&self) -> usize {
        self.pool.len()
    }

    pub fn operating_hours_limit(&self) -> f64 {
        self.config.operating_hours
    }

    pub fn servers(&self) -> &[Server] {
        self.pool.servers()
    }

    pub fn busy_servers(&self) -> usize {
        self.pool.busy_count()
    }

    pub fn general_queues(&self) -> &[VecDeque<Client>] {
        self.queues.general()
    }

    pub fn preferential_queue(&self) -> &VecDeque<Client> {
        self.queues.preferential()
    }

    pub fn queues(&self) -> &QueueSet {
        &self.queues
    }

    /// Clients waiting or being served
    pub fn clients_in_system(&self) -> usize {
        self.queues.total_len() + self.pool.busy_count()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn source(&self) -> &U {
        &self.source
    }
}
