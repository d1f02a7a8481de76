//! End-of-run financial report.
//!
//! Reads a finished engine's statistics and prices them with the operator's
//! cost parameters. Nothing here feeds back into the simulation.

use super::random::UniformSource;
use super::simulation_engine::SimulationEngine;
use super::stats::StatsSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit cost at or above which operations are flagged as expensive
pub const UNIT_COST_ALERT: f64 = 5.0;

/// Operator cost assumptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostParams {
    pub salary_per_hour: f64,
    /// Supply cost per served client; the engine's `cost_per_client` when unset
    pub variable_per_client: Option<f64>,
    /// Revenue per served client; the engine's `ticket_price` when unset
    pub revenue_per_client: Option<f64>,
    pub budget: f64,
    /// Paid hours per station; the engine's operating limit when unset
    pub hours: Option<f64>,
    /// Overtime pay factor; overtime is unpaid when unset
    pub overtime_multiplier: Option<f64>,
}

impl Default for CostParams {
    fn default() -> Self {
        Self {
            salary_per_hour: 15.0,
            variable_per_client: None,
            revenue_per_client: None,
            budget: 1000.0,
            hours: None,
            overtime_multiplier: None,
        }
    }
}

impl CostParams {
    pub fn with_overtime_multiplier(mut self, multiplier: f64) -> Self {
        self.overtime_multiplier = Some(multiplier);
        self
    }

    pub fn with_salary(mut self, per_hour: f64) -> Self {
        self.salary_per_hour = per_hour;
        self
    }

    pub fn with_budget(mut self, budget: f64) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_variable_per_client(mut self, cost: f64) -> Self {
        self.variable_per_client = Some(cost);
        self
    }

    pub fn with_revenue_per_client(mut self, revenue: f64) -> Self {
        self.revenue_per_client = Some(revenue);
        self
    }

    pub fn with_hours(mut self, hours: f64) -> Self {
        self.hours = Some(hours);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinanceVerdict {
    Profitable,
    Deficit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationsVerdict {
    EfficientCosts,
    HighUnitCosts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    ExpandCapacity,
    ReduceServers,
}

impl fmt::Display for FinanceVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinanceVerdict::Profitable => write!(f, "Profitable model."),
            FinanceVerdict::Deficit => write!(f, "Operating deficit."),
        }
    }
}

impl fmt::Display for OperationsVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationsVerdict::EfficientCosts => write!(f, "Efficient costs."),
            OperationsVerdict::HighUnitCosts => write!(f, "High unit costs."),
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::ExpandCapacity => write!(f, "Expand capacity."),
            Recommendation::ReduceServers => write!(f, "Reduce servers."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub finance: FinanceVerdict,
    pub operations: OperationsVerdict,
    pub recommendation: Recommendation,
}

/// Priced summary of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialReport {
    pub served: u64,
    pub abandoned: u64,
    pub rejected: u64,
    pub servers: usize,
    pub hours: f64,
    pub overtime_hours: f64,
    pub labor_cost: f64,
    pub overtime_cost: f64,
    pub supply_cost: f64,
    pub total_cost: f64,
    pub revenue: f64,
    pub net_profit: f64,
    /// Total cost per served client; zero when nobody was served
    pub unit_cost: f64,
    pub within_budget: bool,
    pub abandonment_rate: f64,
    pub rejection_rate: f64,
    pub utilization: f64,
    pub avg_wait_minutes: f64,
    pub max_queue_length: usize,
    pub diagnostics: Diagnostics,
}

impl FinancialReport {
    /// Price a run. Ticket price, per-client cost and `hours` apply unless
    /// `costs` overrides them; wages and budget always come from `costs`.
    pub fn new(stats: &StatsSnapshot, servers: usize, hours: f64, costs: &CostParams) -> Self {
        let hours = costs.hours.unwrap_or(hours);
        let cost_per_client = costs.variable_per_client.unwrap_or(stats.cost_per_client);
        let revenue_per_client = costs.revenue_per_client.unwrap_or(stats.ticket_price);
        let served = stats.served as f64;
        let labor_cost = servers as f64 * hours * costs.salary_per_hour;
        let overtime_cost = match costs.overtime_multiplier {
            Some(multiplier) => {
                servers as f64 * stats.overtime_hours * costs.salary_per_hour * multiplier
            }
            None => 0.0,
        };
        let supply_cost = served * cost_per_client;
        let total_cost = labor_cost + overtime_cost + supply_cost;
        let revenue = served * revenue_per_client;
        let net_profit = revenue - total_cost;
        let unit_cost = if stats.served > 0 { total_cost / served } else { 0.0 };

        let arrivals = stats.arrivals as f64;
        let rate = |count: u64| if stats.arrivals > 0 { count as f64 / arrivals } else { 0.0 };

        let diagnostics = Diagnostics {
            finance: if net_profit > 0.0 {
                FinanceVerdict::Profitable
            } else {
                FinanceVerdict::Deficit
            },
            operations: if unit_cost < UNIT_COST_ALERT {
                OperationsVerdict::EfficientCosts
            } else {
                OperationsVerdict::HighUnitCosts
            },
            recommendation: if net_profit > 0.0 {
                Recommendation::ExpandCapacity
            } else {
                Recommendation::ReduceServers
            },
        };

        Self {
            served: stats.served,
            abandoned: stats.abandoned,
            rejected: stats.rejected,
            servers,
            hours,
            overtime_hours: stats.overtime_hours,
            labor_cost,
            overtime_cost,
            supply_cost,
            total_cost,
            revenue,
            net_profit,
            unit_cost,
            within_budget: total_cost <= costs.budget,
            abandonment_rate: rate(stats.abandoned),
            rejection_rate: rate(stats.rejected),
            utilization: stats.utilization,
            avg_wait_minutes: stats.avg_wait_minutes,
            max_queue_length: stats.max_queue_length,
            diagnostics,
        }
    }

    /// Price the engine's run using its own station count and hour limit
    pub fn from_engine<U: UniformSource>(engine: &SimulationEngine<U>, costs: &CostParams) -> Self {
        let hours = if engine.operating_hours_limit().is_finite() {
            engine.operating_hours_limit()
        } else {
            engine.clock_hours()
        };
        Self::new(&engine.stats(), engine.server_count(), hours, costs)
    }
}

fn money(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}${:.2}", sign, value.abs())
}

impl fmt::Display for FinancialReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Operations Report ===")?;
        writeln!(f, "Clients served:     {}", self.served)?;
        writeln!(
            f,
            "Abandoned/rejected: {} / {} ({:.1}% / {:.1}%)",
            self.abandoned,
            self.rejected,
            self.abandonment_rate * 100.0,
            self.rejection_rate * 100.0
        )?;
        writeln!(f, "Stations x hours:   {} x {:.2}h (+{:.2}h overtime)", self.servers, self.hours, self.overtime_hours)?;
        writeln!(f, "Utilization:        {:.1}%", self.utilization * 100.0)?;
        writeln!(f, "Average wait:       {:.2} min", self.avg_wait_minutes)?;
        writeln!(f, "Longest line:       {}", self.max_queue_length)?;
        writeln!(f, "--- Finances ---")?;
        writeln!(f, "Labor:              {}", money(self.labor_cost))?;
        if self.overtime_cost > 0.0 {
            writeln!(f, "Overtime:           {}", money(self.overtime_cost))?;
        }
        writeln!(f, "Supplies:           {}", money(self.supply_cost))?;
        writeln!(f, "Total cost:         {}", money(self.total_cost))?;
        writeln!(f, "Revenue:            {}", money(self.revenue))?;
        let sign = if self.net_profit >= 0.0 { "+" } else { "" };
        writeln!(f, "Net profit:         {}{}", sign, money(self.net_profit))?;
        writeln!(f, "Unit cost:          {}", money(self.unit_cost))?;
        writeln!(f, "Within budget:      {}", if self.within_budget { "yes" } else { "no" })?;
        writeln!(f, "--- Diagnosis ---")?;
        writeln!(f, "Finance:            {}", self.diagnostics.finance)?;
        writeln!(f, "Operations:         {}", self.diagnostics.operations)?;
        write!(f, "Recommendation:     {}", self.diagnostics.recommendation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;

    fn stats(served: u64, overtime: f64) -> StatsSnapshot {
        StatsSnapshot {
            pref_queue_len: 0,
            gen_queue_len: 0,
            arrivals: served + 10,
            served,
            abandoned: 6,
            rejected: 4,
            wait_time_sum: 0.0,
            busy_time_sum: 0.0,
            max_queue_length: 7,
            utilization: 0.8,
            avg_wait_minutes: 3.5,
            overtime_hours: overtime,
            ticket_price: 20.0,
            cost_per_client: 0.5,
        }
    }

    #[test]
    fn test_profitable_run() {
        let report = FinancialReport::new(&stats(190, 0.5), 4, 8.0, &CostParams::default());
        assert_eq!(report.labor_cost, 480.0);
        assert_eq!(report.overtime_cost, 0.0);
        assert_eq!(report.supply_cost, 95.0);
        assert_eq!(report.total_cost, 575.0);
        assert_eq!(report.revenue, 3800.0);
        assert_eq!(report.net_profit, 3225.0);
        assert!(report.within_budget);
        assert!((report.abandonment_rate - 0.03).abs() < 1e-12);
        assert!((report.rejection_rate - 0.02).abs() < 1e-12);
        assert_eq!(report.diagnostics.finance, FinanceVerdict::Profitable);
        assert_eq!(report.diagnostics.operations, OperationsVerdict::EfficientCosts);
        assert_eq!(report.diagnostics.recommendation, Recommendation::ExpandCapacity);
    }

    #[test]
    fn test_overtime_is_paid_when_configured() {
        let costs = CostParams::default().with_overtime_multiplier(1.5);
        let report = FinancialReport::new(&stats(10, 2.0), 2, 8.0, &costs);
        assert_eq!(report.overtime_cost, 2.0 * 2.0 * 15.0 * 1.5);
        assert_eq!(report.total_cost, 240.0 + 90.0 + 5.0);
    }

    #[test]
    fn test_loss_making_run() {
        let report = FinancialReport::new(&stats(0, 0.0), 10, 8.0, &CostParams::default());
        assert_eq!(report.unit_cost, 0.0);
        assert_eq!(report.net_profit, -1200.0);
        assert!(!report.within_budget);
        assert_eq!(report.diagnostics.finance, FinanceVerdict::Deficit);
        assert_eq!(report.diagnostics.recommendation, Recommendation::ReduceServers);

        let text = report.to_string();
        assert!(text.contains("Net profit:         -$1200.00"));
        assert!(text.contains("Reduce servers."));
    }

    #[test]
    fn test_high_unit_cost_flagged() {
        let report = FinancialReport::new(&stats(20, 0.0), 4, 8.0, &CostParams::default());
        // (480 + 10) / 20
        assert_eq!(report.unit_cost, 24.5);
        assert_eq!(report.diagnostics.operations, OperationsVerdict::HighUnitCosts);
    }

    #[test]
    fn test_from_engine_uses_engine_totals() {
        let config = EngineConfig::new()
            .with_arrival_rate(0.0)
            .with_servers(3)
            .with_operating_hours(0.5)
            .without_vip();
        let mut engine = SimulationEngine::seeded(config, 5);
        while engine.step(0.01) {}
        let report = FinancialReport::from_engine(&engine, &CostParams::default());
        assert_eq!(report.servers, 3);
        assert_eq!(report.hours, 0.5);
        assert_eq!(report.labor_cost, 22.5);
        assert_eq!(report.served, 0);
    }

    #[test]
    fn test_cost_params_override_engine_pricing() {
        let base = FinancialReport::new(&stats(10, 0.0), 2, 8.0, &CostParams::default());
        assert_eq!(base.revenue, 200.0);
        assert_eq!(base.supply_cost, 5.0);
        assert_eq!(base.labor_cost, 240.0);

        let revenue = CostParams::default().with_revenue_per_client(1000.0);
        assert_eq!(FinancialReport::new(&stats(10, 0.0), 2, 8.0, &revenue).revenue, 10_000.0);

        let supply = CostParams::default().with_variable_per_client(2.0);
        assert_eq!(FinancialReport::new(&stats(10, 0.0), 2, 8.0, &supply).supply_cost, 20.0);

        let hours = CostParams::default().with_hours(10.0);
        let report = FinancialReport::new(&stats(10, 0.0), 2, 8.0, &hours);
        assert_eq!(report.hours, 10.0);
        assert_eq!(report.labor_cost, 300.0);

        let salary = CostParams::default().with_salary(20.0);
        assert_eq!(FinancialReport::new(&stats(10, 0.0), 2, 8.0, &salary).labor_cost, 320.0);

        let budget = CostParams::default().with_budget(100.0);
        assert!(base.within_budget);
        assert!(!FinancialReport::new(&stats(10, 0.0), 2, 8.0, &budget).within_budget);
    }

    #[test]
    fn test_cost_params_partial_json() {
        let costs: CostParams =
            serde_json::from_str(r#"{ "revenue_per_client": 50.0, "hours": 4.0 }"#).unwrap();
        assert_eq!(costs.revenue_per_client, Some(50.0));
        assert_eq!(costs.variable_per_client, None);
        assert_eq!(costs.salary_per_hour, 15.0);

        let report = FinancialReport::new(&stats(10, 0.0), 2, 8.0, &costs);
        assert_eq!(report.revenue, 500.0);
        assert_eq!(report.labor_cost, 120.0);
    }

    #[test]
    fn test_report_serializes() {
        let report = FinancialReport::new(&stats(5, 0.0), 1, 1.0, &CostParams::default());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["diagnostics"]["finance"], "profitable");
        assert_eq!(json["served"], 5);
    }
}
