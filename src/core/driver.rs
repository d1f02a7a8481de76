use super::random::{RngSource, UniformSource};
use super::simulation_engine::SimulationEngine;
use super::stats::StatsSnapshot;
use super::timeline::Timeline;
use log::{debug, info};
use rand::rngs::StdRng;

/// Simulation hours advanced per tick at each speed level
pub const SPEED_LEVELS: [f64; 5] = [0.0008, 0.002, 0.005, 0.010, 0.025];
pub const SPEED_LABELS: [&str; 5] = [
    "x1 (Demo)",
    "x2 (Slow)",
    "x3 (Normal)",
    "x4 (Fast)",
    "x5 (Turbo)",
];
/// λ multiplier applied by the peak-demand control
pub const DEFAULT_PEAK_MULTIPLIER: f64 = 3.0;

/// Observer for rendering collaborators
pub trait TickObserver<U: UniformSource> {
    /// Called after every tick, paused or not
    fn on_tick(&mut self, engine: &SimulationEngine<U>, paused: bool);

    /// Called once when the engine reports it has finished
    fn on_finish(&mut self, _engine: &SimulationEngine<U>) {}
}

/// Fixed-cadence tick source that owns one engine.
///
/// Each tick steps the engine by the current speed level, feeds the chart
/// timeline and then notifies observers. Pausing just skips the step.
pub struct SimulationDriver<U: UniformSource = RngSource<StdRng>> {
    engine: SimulationEngine<U>,
    timeline: Timeline,
    speed_index: usize,
    paused: bool,
    peak_active: bool,
    peak_multiplier: f64,
    finished: bool,
    ticks: u64,
    observers: Vec<Box<dyn TickObserver<U>>>,
}

impl<U: UniformSource> SimulationDriver<U> {
    pub fn new(engine: SimulationEngine<U>) -> Self {
        Self {
            engine,
            timeline: Timeline::new(),
            speed_index: 0,
            paused: false,
            peak_active: false,
            peak_multiplier: DEFAULT_PEAK_MULTIPLIER,
            finished: false,
            ticks: 0,
            observers: Vec::new(),
        }
    }

    pub fn with_timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = timeline;
        self
    }

    /// Start at the given speed level (clamped to the available levels)
    pub fn with_speed_index(mut self, index: usize) -> Self {
        self.speed_index = index.min(SPEED_LEVELS.len() - 1);
        self
    }

    pub fn with_peak_multiplier(mut self, multiplier: f64) -> Self {
        self.peak_multiplier = multiplier;
        self
    }

    pub fn add_observer(&mut self, observer: Box<dyn TickObserver<U>>) {
        self.observers.push(observer);
    }

    /// Advance one frame. Returns false once the run has finished.
    pub fn tick(&mut self) -> bool {
        if self.finished {
            return false;
        }
        self.ticks += 1;

        if !self.paused {
            let active = self.engine.step(self.speed());
            let stats = self.engine.stats();
            self.timeline.observe(self.engine.elapsed_hours(), &stats);
            if !active {
                self.finished = true;
            }
        }

        for observer in &mut self.observers {
            observer.on_tick(&self.engine, self.paused);
        }

        if self.finished {
            info!(
                "Run finished after {} ticks at {:.3}h (+{:.3}h overtime)",
                self.ticks,
                self.engine.clock_hours(),
                self.engine.overtime_hours()
            );
            for observer in &mut self.observers {
                observer.on_finish(&self.engine);
            }
        }
        !self.finished
    }

    /// Tick until the run finishes. Fails if `max_ticks` pass first or
    /// the driver is paused, since a paused driver never finishes.
    pub fn run_to_completion(&mut self, max_ticks: u64) -> Result<u64, String> {
        if self.paused && !self.finished {
            return Err("Cannot run a paused simulation to completion".to_string());
        }
        let start = self.ticks;
        while self.tick() {
            if self.ticks - start >= max_ticks {
                return Err(format!(
                    "Simulation still active after {} ticks (clock {:.3}h, {} clients inside)",
                    max_ticks,
                    self.engine.clock_hours(),
                    self.engine.clients_in_system()
                ));
            }
        }
        Ok(self.ticks - start)
    }

    /// Flip pause. Returns the new paused state.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        debug!("Paused: {}", self.paused);
        self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Move to the next speed level, wrapping around. Returns the new level.
    pub fn cycle_speed(&mut self) -> usize {
        self.speed_index = (self.speed_index + 1) % SPEED_LEVELS.len();
        debug!("Speed set to {}", self.speed_label());
        self.speed_index
    }

    pub fn speed(&self) -> f64 {
        SPEED_LEVELS[self.speed_index]
    }

    pub fn speed_label(&self) -> &'static str {
        SPEED_LABELS[self.speed_index]
    }

    pub fn speed_index(&self) -> usize {
        self.speed_index
    }

    /// Multiply λ for the rest of the run. Only works while open and
    /// only once; returns whether it took effect.
    pub fn activate_peak_demand(&mut self) -> bool {
        if self.peak_active || !self.engine.is_open() {
            return false;
        }
        let rate = self.engine.arrival_rate() * self.peak_multiplier;
        info!(
            "Peak demand at {:.3}h: arrival rate {} -> {}",
            self.engine.clock_hours(),
            self.engine.arrival_rate(),
            rate
        );
        self.engine.set_arrival_rate(rate);
        self.peak_active = true;
        true
    }

    pub fn is_peak_active(&self) -> bool {
        self.peak_active
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn engine(&self) -> &SimulationEngine<U> {
        &self.engine
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.engine.stats()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn into_engine(self) -> SimulationEngine<U> {
        self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::core::random::ScriptedSource;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn quiet_engine(hours: f64) -> SimulationEngine<ScriptedSource> {
        let config = EngineConfig::new()
            .with_arrival_rate(0.0)
            .with_operating_hours(hours)
            .without_vip();
        SimulationEngine::with_source(config, ScriptedSource::constant(0.5))
    }

    #[derive(Default)]
    struct Counts {
        ticks: usize,
        paused_ticks: usize,
        finishes: usize,
    }

    struct CountingObserver(Rc<RefCell<Counts>>);

    impl TickObserver<ScriptedSource> for CountingObserver {
        fn on_tick(&mut self, _engine: &SimulationEngine<ScriptedSource>, paused: bool) {
            let mut counts = self.0.borrow_mut();
            counts.ticks += 1;
            if paused {
                counts.paused_ticks += 1;
            }
        }

        fn on_finish(&mut self, _engine: &SimulationEngine<ScriptedSource>) {
            self.0.borrow_mut().finishes += 1;
        }
    }

    #[test]
    fn test_speed_cycles_through_levels() {
        let mut driver = SimulationDriver::new(quiet_engine(1.0));
        assert_eq!(driver.speed(), 0.0008);
        assert_eq!(driver.speed_label(), "x1 (Demo)");
        for _ in 0..4 {
            driver.cycle_speed();
        }
        assert_eq!(driver.speed(), 0.025);
        assert_eq!(driver.cycle_speed(), 0);

        let fast = SimulationDriver::new(quiet_engine(1.0)).with_speed_index(99);
        assert_eq!(fast.speed_index(), SPEED_LEVELS.len() - 1);
    }

    #[test]
    fn test_pause_skips_steps() {
        let mut driver = SimulationDriver::new(quiet_engine(1.0));
        assert!(driver.toggle_pause());
        for _ in 0..5 {
            assert!(driver.tick());
        }
        assert_eq!(driver.engine().clock_hours(), 0.0);
        assert!(driver.run_to_completion(10).is_err());

        assert!(!driver.toggle_pause());
        driver.tick();
        assert!((driver.engine().clock_hours() - 0.0008).abs() < 1e-12);
    }

    #[test]
    fn test_peak_demand_only_once_and_only_open() {
        let config = EngineConfig::new()
            .with_arrival_rate(10.0)
            .with_operating_hours(0.001)
            .without_vip();
        let engine = SimulationEngine::with_source(config, ScriptedSource::constant(0.99));
        let mut driver = SimulationDriver::new(engine);

        assert!(driver.activate_peak_demand());
        assert_eq!(driver.engine().arrival_rate(), 30.0);
        assert!(!driver.activate_peak_demand());
        assert_eq!(driver.engine().arrival_rate(), 30.0);

        let mut closed = SimulationDriver::new(quiet_engine(0.0));
        closed.tick();
        assert!(!closed.activate_peak_demand());
    }

    #[test]
    fn test_custom_peak_timeline_and_engine_handoff() {
        let config = EngineConfig::new()
            .with_arrival_rate(10.0)
            .with_operating_hours(0.05)
            .without_vip();
        let engine = SimulationEngine::with_source(config, ScriptedSource::constant(0.99));
        let mut driver = SimulationDriver::new(engine)
            .with_peak_multiplier(1.5)
            .with_timeline(Timeline::with_interval(0.01, 2))
            .with_speed_index(1);

        assert!(driver.activate_peak_demand());
        assert_eq!(driver.engine().arrival_rate(), 15.0);
        driver.run_to_completion(1_000).unwrap();
        // 0.002h per tick, sampled every 0.01h over 0.05h
        assert!(driver.timeline().len() >= 5);
        assert_eq!(driver.timeline().window().len(), 2);

        let engine = driver.into_engine();
        assert!(!engine.is_active());
        assert_eq!(engine.arrival_rate(), 15.0);
    }

    #[test]
    fn test_run_to_completion_notifies_observers() {
        let counts = Rc::new(RefCell::new(Counts::default()));
        let mut driver = SimulationDriver::new(quiet_engine(0.01)).with_speed_index(3);
        driver.add_observer(Box::new(CountingObserver(counts.clone())));

        let ticks = driver.run_to_completion(1_000).unwrap();
        assert_eq!(ticks, 1);
        assert!(driver.is_finished());
        assert!(!driver.tick());

        let counts = counts.borrow();
        assert_eq!(counts.ticks, 1);
        assert_eq!(counts.paused_ticks, 0);
        assert_eq!(counts.finishes, 1);
    }

    #[test]
    fn test_tick_budget_exhausted() {
        let mut driver = SimulationDriver::new(quiet_engine(f64::INFINITY));
        let err = driver.run_to_completion(50).unwrap_err();
        assert!(err.contains("50 ticks"));
        assert!(driver.engine().is_active());
    }

    #[test]
    fn test_timeline_is_fed() {
        let mut driver = SimulationDriver::new(quiet_engine(1.0)).with_speed_index(4);
        driver.run_to_completion(1_000).unwrap();
        // 0.025h per tick over one hour, sampled every 0.2h
        assert!(driver.timeline().len() >= 5);
        assert_eq!(driver.timeline().samples()[0].label, "00:01");
    }
}
