//! DeFi yield farming optimizer.
//!
//! Pools are regenerated on every read. Optimization ranks the pools that
//! fit the caller's risk and budget by APY per unit of risk and spreads the
//! budget over the best five.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use demo_core::{
    banner, mock, shared, ApiError, ApiResult, DemoService, Payload, Route, ServiceDescriptor,
    Shared,
};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const DESCRIPTOR: ServiceDescriptor = ServiceDescriptor {
    name: "defi-yield",
    title: "DeFi Yield Farming Optimizer",
    tagline: "Maximize your DeFi returns",
    version: "1.0.0",
    default_port: 8003,
    features: &[
        "Multi-protocol yield optimization",
        "Risk-adjusted portfolio allocation",
        "Automated compounding strategies",
        "Real-time yield monitoring",
        "Gas fee optimization",
    ],
    routes: &[
        Route::new("GET", "/api/pools", "Liquidity pools by APY"),
        Route::new("GET", "/api/yield-rates", "Per-protocol yield rates"),
        Route::new("POST", "/api/optimize", "Allocate a budget across pools"),
        Route::new("GET", "/api/portfolio", "Portfolio performance"),
        Route::new("POST", "/api/compound", "Compound a position"),
        Route::new("GET", "/api/performance-history", "30-day yield history"),
    ],
};

pub const INITIAL_DEPOSIT: f64 = 100_000.0;
const POOL_COUNT: usize = 20;
const MIN_TVL: u64 = 1_000_000;
const TOP_POOLS: usize = 5;
const HISTORY_DAYS: u32 = 30;
const COMPOUND_SUCCESS_RATE: f64 = 0.75;

const PROTOCOLS: [&str; 9] = [
    "Uniswap V3",
    "SushiSwap",
    "Compound",
    "Aave",
    "Curve",
    "Yearn Finance",
    "PancakeSwap",
    "Venus",
    "Synthetix",
];
const PAIRS: [&str; 5] = ["ETH/USDC", "WBTC/ETH", "DAI/USDC", "LINK/ETH", "UNI/ETH"];
const RISK_LEVELS: [&str; 3] = ["Low", "Medium", "High"];

#[derive(Debug, Clone, Serialize)]
pub struct Pool {
    pub id: String,
    pub name: String,
    pub protocol: &'static str,
    pub tokens: Vec<&'static str>,
    pub tvl: u64,
    /// Annual percentage yield, in percent.
    pub apy: f64,
    /// 1 (safest) to 10.
    pub risk_score: f64,
    pub impermanent_loss: f64,
    pub gas_cost: u32,
    pub minimum_deposit: f64,
    pub last_updated: DateTime<Utc>,
}

fn default_budget() -> f64 {
    10_000.0
}

fn default_risk_tolerance() -> f64 {
    0.5
}

fn default_horizon() -> u32 {
    30
}

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    #[serde(default = "default_budget")]
    pub budget: f64,
    /// 0 to 1; pools riskier than `10 * risk_tolerance` are skipped.
    #[serde(default = "default_risk_tolerance")]
    pub risk_tolerance: f64,
    #[serde(default = "default_horizon")]
    pub time_horizon: u32,
}

fn default_position() -> String {
    "POSITION_001".to_string()
}

fn default_auto_compound() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CompoundRequest {
    #[serde(default = "default_position")]
    pub position_id: String,
    #[serde(default = "default_auto_compound")]
    pub auto_compound: bool,
}

#[derive(Debug, Serialize)]
pub struct Allocation {
    pub pool: Pool,
    pub amount: f64,
    pub percentage: f64,
    pub expected_apy: f64,
    pub risk_score: f64,
}

#[derive(Debug, Serialize)]
pub struct Strategy {
    pub allocation: Vec<Allocation>,
    pub total_invested: f64,
    pub expected_apy: f64,
    pub average_risk_score: f64,
    pub estimated_daily_yield: f64,
    pub estimated_monthly_yield: f64,
    pub strategy_score: f64,
    pub time_horizon: u32,
}

#[derive(Debug, Serialize)]
pub struct ProtocolRate {
    pub avg_apy: f64,
    pub tvl: u64,
    pub active_pools: u32,
    pub risk_level: &'static str,
    pub gas_efficiency: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompoundResult {
    pub position_id: String,
    pub action: &'static str,
    pub auto_compound: bool,
    pub amount: f64,
    pub gas_cost: u32,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct PerformanceDay {
    pub day: u32,
    pub apy: f64,
    pub daily_yield: f64,
    pub cumulative_yield: f64,
}

#[derive(Debug, Serialize)]
pub struct PortfolioPerformance {
    pub total_deposited: f64,
    pub current_value: f64,
    pub total_yield: f64,
    pub yield_percentage: f64,
    pub daily_yield: f64,
    pub monthly_yield: f64,
    pub performance_history: Vec<PerformanceDay>,
    pub compounds: usize,
    pub avg_apy: f64,
}

/// Yield over `days` on `principal` at `apy` percent, without compounding.
pub fn simple_yield(apy: f64, principal: f64, days: f64) -> f64 {
    apy / 100.0 * principal * days / 365.0
}

pub struct YieldOptimizer {
    rng: StdRng,
    total_value: f64,
    compounds: Vec<CompoundResult>,
}

impl YieldOptimizer {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng,
            total_value: INITIAL_DEPOSIT,
            compounds: Vec::new(),
        }
    }

    /// Fresh pools, highest APY first.
    pub fn pools(&mut self) -> Vec<Pool> {
        let rng = &mut self.rng;
        let mut pools: Vec<Pool> = (0..POOL_COUNT)
            .map(|i| {
                let pair = mock::pick(rng, &PAIRS);
                let protocol = mock::pick(rng, &PROTOCOLS);
                Pool {
                    id: format!("POOL_{:03}", i),
                    name: format!("{} - {}", pair, protocol),
                    protocol,
                    tokens: pair.split('/').collect(),
                    tvl: rng.gen_range(MIN_TVL..=50_000_000),
                    apy: mock::uniform_rounded(rng, 5.0, 150.0, 2),
                    risk_score: mock::uniform_rounded(rng, 1.0, 10.0, 2),
                    impermanent_loss: mock::uniform_rounded(rng, 0.0, 50.0, 2),
                    gas_cost: rng.gen_range(50..=500),
                    minimum_deposit: f64::from(rng.gen_range(100..=10_000)),
                    last_updated: mock::now(),
                }
            })
            .collect();
        pools.sort_by(|a, b| b.apy.total_cmp(&a.apy));
        pools
    }

    /// `Ok(None)` when no pool fits the request.
    pub fn optimize(&mut self, request: &OptimizeRequest) -> ApiResult<Option<Strategy>> {
        if !(request.budget.is_finite() && request.budget > 0.0) {
            return Err(ApiError::bad_request("Budget must be positive"));
        }
        if !(0.0..=1.0).contains(&request.risk_tolerance) {
            return Err(ApiError::bad_request("risk_tolerance must be between 0 and 1"));
        }
        let pools = self.pools();
        Ok(allocate(&mut self.rng, pools, request))
    }

    pub fn yield_rates(&mut self) -> BTreeMap<&'static str, ProtocolRate> {
        let rng = &mut self.rng;
        PROTOCOLS
            .iter()
            .map(|protocol| {
                let rate = ProtocolRate {
                    avg_apy: mock::uniform_rounded(rng, 8.0, 80.0, 2),
                    tvl: rng.gen_range(50_000_000..=2_000_000_000),
                    active_pools: rng.gen_range(10..=100),
                    risk_level: mock::pick(rng, &RISK_LEVELS),
                    gas_efficiency: mock::uniform_rounded(rng, 0.5, 1.0, 3),
                };
                (*protocol, rate)
            })
            .collect()
    }

    pub fn compound(&mut self, request: CompoundRequest) -> CompoundResult {
        let rng = &mut self.rng;
        let result = CompoundResult {
            position_id: request.position_id,
            action: "compound",
            auto_compound: request.auto_compound,
            amount: mock::uniform_rounded(rng, 100.0, 1000.0, 2),
            gas_cost: rng.gen_range(20..=100),
            timestamp: mock::now(),
            success: rng.gen_bool(COMPOUND_SUCCESS_RATE),
        };
        if result.success {
            self.total_value += result.amount;
            self.compounds.push(result.clone());
        } else {
            log::warn!("Compounding {} failed", result.position_id);
        }
        result
    }

    /// Random-walk APY over the last 30 days applied to the current value.
    pub fn performance_history(&mut self) -> Vec<PerformanceDay> {
        let mut apy = mock::uniform(&mut self.rng, 15.0, 45.0);
        let mut cumulative = 0.0;
        (1..=HISTORY_DAYS)
            .map(|day| {
                apy = (apy + mock::uniform(&mut self.rng, -0.5, 0.5)).clamp(5.0, 100.0);
                let daily = simple_yield(apy, self.total_value, 1.0);
                cumulative += daily;
                PerformanceDay {
                    day,
                    apy: mock::round_to(apy, 2),
                    daily_yield: mock::round_to(daily, 2),
                    cumulative_yield: mock::round_to(cumulative, 2),
                }
            })
            .collect()
    }

    pub fn performance(&mut self) -> PortfolioPerformance {
        let history = self.performance_history();
        let (daily, monthly) = history
            .last()
            .map(|d| (d.daily_yield, d.cumulative_yield))
            .unwrap_or_default();
        let total_yield = self.total_value - INITIAL_DEPOSIT;
        PortfolioPerformance {
            total_deposited: INITIAL_DEPOSIT,
            current_value: mock::round_to(self.total_value, 2),
            total_yield: mock::round_to(total_yield, 2),
            yield_percentage: mock::round_to(total_yield / INITIAL_DEPOSIT * 100.0, 2),
            daily_yield: daily,
            monthly_yield: monthly,
            performance_history: history,
            compounds: self.compounds.len(),
            avg_apy: mock::uniform_rounded(&mut self.rng, 20.0, 60.0, 2),
        }
    }
}

fn allocate(rng: &mut StdRng, pools: Vec<Pool>, request: &OptimizeRequest) -> Option<Strategy> {
    let budget = request.budget;
    let mut suitable: Vec<Pool> = pools
        .into_iter()
        .filter(|p| {
            p.risk_score <= request.risk_tolerance * 10.0
                && p.minimum_deposit <= budget
                && p.tvl > MIN_TVL
        })
        .collect();
    if suitable.is_empty() {
        return None;
    }
    suitable.sort_by(|a, b| (b.apy / b.risk_score).total_cmp(&(a.apy / a.risk_score)));

    let mut remaining = budget;
    let mut allocation = Vec::new();
    for pool in suitable.into_iter().take(TOP_POOLS) {
        if remaining <= 0.0 {
            break;
        }
        let amount = (budget * mock::uniform(rng, 0.1, 0.3)).min(remaining);
        if amount < pool.minimum_deposit {
            continue;
        }
        remaining -= amount;
        allocation.push(Allocation {
            amount: mock::round_to(amount, 2),
            percentage: mock::round_to(amount / budget * 100.0, 2),
            expected_apy: pool.apy,
            risk_score: pool.risk_score,
            pool,
        });
    }

    let weighted_apy: f64 = allocation
        .iter()
        .map(|a| a.expected_apy * a.amount / budget)
        .sum();
    let weighted_risk: f64 = allocation
        .iter()
        .map(|a| a.risk_score * a.amount / budget)
        .sum();

    Some(Strategy {
        total_invested: mock::round_to(allocation.iter().map(|a| a.amount).sum(), 2),
        expected_apy: mock::round_to(weighted_apy, 2),
        average_risk_score: mock::round_to(weighted_risk, 2),
        estimated_daily_yield: mock::round_to(simple_yield(weighted_apy, budget, 1.0), 2),
        estimated_monthly_yield: mock::round_to(simple_yield(weighted_apy, budget, 365.0 / 12.0), 2),
        strategy_score: if weighted_risk > 0.0 {
            mock::round_to(weighted_apy / weighted_risk * 10.0, 2)
        } else {
            0.0
        },
        time_horizon: request.time_horizon,
        allocation,
    })
}

pub struct DefiYieldService;

impl DemoService for DefiYieldService {
    fn descriptor(&self) -> &'static ServiceDescriptor {
        &DESCRIPTOR
    }

    fn router(&self, rng: StdRng) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/api/pools", get(pools))
            .route("/api/yield-rates", get(yield_rates))
            .route("/api/optimize", post(optimize))
            .route("/api/portfolio", get(portfolio))
            .route("/api/compound", post(compound))
            .route("/api/performance-history", get(performance_history))
            .with_state(shared(YieldOptimizer::new(rng)))
    }
}

async fn root() -> Json<Value> {
    Json(banner(&DESCRIPTOR))
}

async fn pools(State(optimizer): State<Shared<YieldOptimizer>>) -> Json<Value> {
    let pools = optimizer.lock().await.pools();
    Json(json!({"success": true, "pools": pools}))
}

async fn yield_rates(State(optimizer): State<Shared<YieldOptimizer>>) -> Json<Value> {
    let rates = optimizer.lock().await.yield_rates();
    Json(json!({"success": true, "rates": rates}))
}

async fn optimize(
    State(optimizer): State<Shared<YieldOptimizer>>,
    Payload(request): Payload<OptimizeRequest>,
) -> ApiResult<Json<Value>> {
    let strategy = match optimizer.lock().await.optimize(&request)? {
        Some(strategy) => serde_json::to_value(strategy)?,
        None => json!({"message": "No suitable pools found for your criteria"}),
    };
    Ok(Json(json!({"success": true, "strategy": strategy})))
}

async fn portfolio(State(optimizer): State<Shared<YieldOptimizer>>) -> Json<Value> {
    let performance = optimizer.lock().await.performance();
    Json(json!({"success": true, "performance": performance}))
}

async fn compound(
    State(optimizer): State<Shared<YieldOptimizer>>,
    Payload(request): Payload<CompoundRequest>,
) -> Json<Value> {
    let result = optimizer.lock().await.compound(request);
    Json(json!({"success": true, "result": result}))
}

async fn performance_history(State(optimizer): State<Shared<YieldOptimizer>>) -> Json<Value> {
    let history = optimizer.lock().await.performance_history();
    Json(json!({"success": true, "history": history}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_app;
    use demo_core::testing;

    fn optimizer() -> YieldOptimizer {
        YieldOptimizer::new(mock::seeded(Some(31)))
    }

    fn pool(id: &str, apy: f64, risk_score: f64, minimum_deposit: f64) -> Pool {
        Pool {
            id: id.to_string(),
            name: id.to_string(),
            protocol: "Aave",
            tokens: vec!["DAI", "USDC"],
            tvl: 5_000_000,
            apy,
            risk_score,
            impermanent_loss: 0.0,
            gas_cost: 50,
            minimum_deposit,
            last_updated: mock::now(),
        }
    }

    fn request(budget: f64, risk_tolerance: f64) -> OptimizeRequest {
        OptimizeRequest {
            budget,
            risk_tolerance,
            time_horizon: 30,
        }
    }

    #[test]
    fn test_simple_yield_uses_percent() {
        assert_eq!(simple_yield(36.5, 10_000.0, 1.0), 10.0);
        assert!((simple_yield(12.0, 10_000.0, 365.0 / 12.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_pools_sorted_by_apy() {
        let pools = optimizer().pools();
        assert_eq!(pools.len(), 20);
        for pair in pools.windows(2) {
            assert!(pair[0].apy >= pair[1].apy);
        }
    }

    #[test]
    fn test_allocation_filters_and_ranks() {
        let mut rng = mock::seeded(Some(1));
        let pools = vec![
            pool("risky", 150.0, 9.0, 100.0),
            pool("steady", 40.0, 2.0, 100.0),
            pool("best", 60.0, 2.0, 100.0),
            pool("expensive", 90.0, 1.0, 50_000.0),
        ];
        let strategy = allocate(&mut rng, pools, &request(10_000.0, 0.5)).unwrap();
        let ids: Vec<&str> = strategy.allocation.iter().map(|a| a.pool.id.as_str()).collect();
        assert_eq!(ids, ["best", "steady"]);
        assert!(strategy.total_invested <= 10_000.0);
        for a in &strategy.allocation {
            assert!(a.percentage >= 10.0 - 1e-6 && a.percentage <= 30.0 + 1e-6);
        }
        let expected_daily = simple_yield(
            strategy
                .allocation
                .iter()
                .map(|a| a.expected_apy * a.amount / 10_000.0)
                .sum(),
            10_000.0,
            1.0,
        );
        assert!((strategy.estimated_daily_yield - expected_daily).abs() < 0.01);
    }

    #[test]
    fn test_no_suitable_pool() {
        let mut rng = mock::seeded(Some(2));
        let pools = vec![pool("risky", 150.0, 9.0, 100.0)];
        assert!(allocate(&mut rng, pools, &request(10_000.0, 0.2)).is_none());
    }

    #[test]
    fn test_compound_updates_value_on_success() {
        let mut optimizer = optimizer();
        let mut expected = INITIAL_DEPOSIT;
        for _ in 0..20 {
            let result = optimizer.compound(CompoundRequest {
                position_id: default_position(),
                auto_compound: true,
            });
            if result.success {
                expected += result.amount;
            }
        }
        assert!((optimizer.total_value - expected).abs() < 1e-6);
        let performance = optimizer.performance();
        assert_eq!(performance.performance_history.len(), 30);
        assert_eq!(performance.compounds, optimizer.compounds.len());
    }

    #[tokio::test]
    async fn test_optimize_validates_input() {
        let app = test_app(&DefiYieldService);
        let (status, _) = testing::post(&app, "/api/optimize", json!({"budget": -5})).await;
        assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
        let (status, body) = testing::post(&app, "/api/optimize", json!({})).await;
        assert_eq!(status, axum::http::StatusCode::OK);
        assert!(body["strategy"].is_object());
    }
}
