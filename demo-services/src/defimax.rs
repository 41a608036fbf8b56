//! DeFiMax: yield strategy allocation, DEX swaps and cross-chain arbitrage
//! over a fixed set of protocols.
//!
//! The optimize and swap endpoints take their arguments from the query
//! string.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use demo_core::{
    banner_with, mock, shared, ApiError, ApiResult, DemoService, Route, ServiceDescriptor, Shared,
};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::markets;

pub const DESCRIPTOR: ServiceDescriptor = ServiceDescriptor {
    name: "defimax",
    title: "DeFiMax",
    tagline: "Revolutionary DeFi Trading Platform",
    version: "1.0.0",
    default_port: 8003,
    features: &[
        "Risk-aware yield strategies",
        "DEX swap execution",
        "Cross-chain arbitrage",
    ],
    routes: &[
        Route::new("POST", "/api/optimize-yield", "Allocate ?amount=&risk_tolerance="),
        Route::new("GET", "/api/arbitrage-opportunities", "Cross-chain arbitrage scan"),
        Route::new("POST", "/api/swap", "Swap ?token_in=&token_out=&amount=&protocol="),
        Route::new("GET", "/api/market-data", "Protocol liquidity and fees"),
        Route::new("GET", "/api/yield-strategies", "Available yield strategies"),
        Route::new("GET", "/api/portfolio-performance", "Aggregate swap performance"),
        Route::new("GET", "/api/trading-history", "The 20 most recent swaps"),
    ],
};

pub const STARTING_VALUE: f64 = 100_000.0;
const DEFAULT_FEE: f64 = 0.003;
/// Cap on any single strategy, as a share of the amount.
const MAX_ALLOCATION_SHARE: f64 = 0.4;
const ARBITRAGE_TRADE_AMOUNT: f64 = 10_000.0;
const ARBITRAGE_SPREAD_PROBABILITY: f64 = 1.0;
const RECENT_SWAPS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    fn return_multiplier(self) -> f64 {
        match self {
            RiskLevel::Low => 1.0,
            RiskLevel::Medium => 0.8,
            RiskLevel::High => 0.6,
        }
    }

    fn base_risk(self) -> f64 {
        match self {
            RiskLevel::Low => 0.2,
            RiskLevel::Medium => 0.5,
            RiskLevel::High => 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProtocolStats {
    pub total_liquidity: u64,
    pub daily_volume: u64,
    pub avg_apy: f64,
    pub fees: f64,
}

const PROTOCOLS: [(&str, ProtocolStats); 5] = [
    (
        "uniswap_v3",
        ProtocolStats {
            total_liquidity: 5_000_000_000,
            daily_volume: 1_000_000_000,
            avg_apy: 15.5,
            fees: 0.003,
        },
    ),
    (
        "sushiswap",
        ProtocolStats {
            total_liquidity: 2_000_000_000,
            daily_volume: 300_000_000,
            avg_apy: 18.2,
            fees: 0.003,
        },
    ),
    (
        "curve",
        ProtocolStats {
            total_liquidity: 8_000_000_000,
            daily_volume: 500_000_000,
            avg_apy: 8.5,
            fees: 0.001,
        },
    ),
    (
        "aave",
        ProtocolStats {
            total_liquidity: 15_000_000_000,
            daily_volume: 2_000_000_000,
            avg_apy: 12.3,
            fees: 0.0009,
        },
    ),
    (
        "compound",
        ProtocolStats {
            total_liquidity: 8_000_000_000,
            daily_volume: 800_000_000,
            avg_apy: 10.7,
            fees: 0.001,
        },
    ),
];

fn protocol_risk(protocol: &str) -> f64 {
    match protocol {
        "curve" => 0.1,
        "aave" | "compound" => 0.2,
        "uniswap_v3" => 0.4,
        "sushiswap" => 0.5,
        "multi_chain" => 0.7,
        _ => 0.5,
    }
}

pub fn protocol_fee(protocol: &str) -> f64 {
    PROTOCOLS
        .iter()
        .find(|(name, _)| *name == protocol)
        .map(|(_, stats)| stats.fees)
        .unwrap_or(DEFAULT_FEE)
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct YieldStrategy {
    pub name: &'static str,
    pub protocol: &'static str,
    pub expected_apy: f64,
    pub risk_level: RiskLevel,
    pub minimum_amount: f64,
    pub auto_compound: bool,
}

pub const STRATEGIES: [YieldStrategy; 5] = [
    YieldStrategy {
        name: "Conservative Stablecoin",
        protocol: "curve",
        expected_apy: 8.5,
        risk_level: RiskLevel::Low,
        minimum_amount: 1_000.0,
        auto_compound: true,
    },
    YieldStrategy {
        name: "ETH-USDC Liquidity",
        protocol: "uniswap_v3",
        expected_apy: 15.2,
        risk_level: RiskLevel::Medium,
        minimum_amount: 5_000.0,
        auto_compound: true,
    },
    YieldStrategy {
        name: "Lending & Borrowing",
        protocol: "aave",
        expected_apy: 12.8,
        risk_level: RiskLevel::Medium,
        minimum_amount: 2_000.0,
        auto_compound: true,
    },
    YieldStrategy {
        name: "High Yield Farming",
        protocol: "sushiswap",
        expected_apy: 25.5,
        risk_level: RiskLevel::High,
        minimum_amount: 10_000.0,
        auto_compound: true,
    },
    YieldStrategy {
        name: "Cross-Chain Arbitrage",
        protocol: "multi_chain",
        expected_apy: 35.0,
        risk_level: RiskLevel::High,
        minimum_amount: 20_000.0,
        auto_compound: false,
    },
];

impl YieldStrategy {
    fn adjusted_apy(&self) -> f64 {
        self.expected_apy * self.risk_level.return_multiplier()
    }

    /// Mean of level, protocol and APY risk, capped at 1.
    pub fn risk_score(&self) -> f64 {
        let apy_risk = (self.expected_apy / 100.0 * 0.1).min(0.3);
        ((self.risk_level.base_risk() + protocol_risk(self.protocol) + apy_risk) / 3.0).min(1.0)
    }
}

#[derive(Debug, Deserialize)]
pub struct OptimizeQuery {
    pub amount: f64,
    #[serde(default)]
    pub risk_tolerance: RiskLevel,
}

fn default_protocol() -> String {
    "uniswap_v3".to_string()
}

#[derive(Debug, Deserialize)]
pub struct SwapQuery {
    pub token_in: String,
    pub token_out: String,
    pub amount: f64,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

#[derive(Debug, Serialize)]
pub struct StrategyAllocation {
    pub strategy: YieldStrategy,
    pub allocation: f64,
    pub allocation_percent: f64,
    pub expected_annual_return: f64,
    pub risk_score: f64,
}

#[derive(Debug, Serialize)]
pub struct YieldOptimization {
    pub optimized_portfolio: Vec<StrategyAllocation>,
    pub total_allocation: f64,
    pub weighted_apy: f64,
    pub portfolio_risk_score: f64,
    pub expected_annual_return: f64,
    pub remaining_amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwapRecord {
    pub swap_id: String,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: f64,
    pub amount_out: f64,
    pub protocol: String,
    /// Percent.
    pub slippage: f64,
    pub fee: f64,
    pub gas_cost: f64,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct SwapPerformance {
    pub total_swaps: usize,
    pub total_volume: f64,
    pub avg_slippage: f64,
    pub total_fees: f64,
    pub total_pnl: f64,
    pub success_rate: f64,
    pub portfolio_value: f64,
}

pub fn optimize_yield(amount: f64, tolerance: RiskLevel) -> ApiResult<YieldOptimization> {
    if !(amount.is_finite() && amount > 0.0) {
        return Err(ApiError::bad_request("Amount must be positive"));
    }
    let suitable: Vec<&YieldStrategy> = STRATEGIES
        .iter()
        .filter(|s| s.minimum_amount <= amount && s.risk_level <= tolerance)
        .collect();
    if suitable.is_empty() {
        return Err(ApiError::bad_request("No suitable strategies found"));
    }

    let total_adjusted: f64 = suitable.iter().map(|s| s.adjusted_apy()).sum();
    let mut remaining = amount;
    let mut portfolio = Vec::new();
    for strategy in suitable {
        let percent = (strategy.adjusted_apy() / total_adjusted * 100.0).min(40.0);
        let allocation = (remaining * percent / 100.0).min(amount * MAX_ALLOCATION_SHARE);
        if allocation < strategy.minimum_amount {
            continue;
        }
        remaining -= allocation;
        portfolio.push(StrategyAllocation {
            strategy: *strategy,
            allocation: mock::round_to(allocation, 2),
            allocation_percent: mock::round_to(percent, 2),
            expected_annual_return: mock::round_to(allocation * strategy.expected_apy / 100.0, 2),
            risk_score: mock::round_to(strategy.risk_score(), 4),
        });
    }

    let total: f64 = portfolio.iter().map(|p| p.allocation).sum();
    let (weighted_apy, risk) = if total > 0.0 {
        (
            portfolio
                .iter()
                .map(|p| p.allocation * p.strategy.expected_apy)
                .sum::<f64>()
                / total,
            portfolio
                .iter()
                .map(|p| p.allocation * p.risk_score)
                .sum::<f64>()
                / total,
        )
    } else {
        (0.0, 0.0)
    };

    Ok(YieldOptimization {
        optimized_portfolio: portfolio,
        total_allocation: mock::round_to(total, 2),
        weighted_apy: mock::round_to(weighted_apy, 2),
        portfolio_risk_score: mock::round_to(risk, 4),
        expected_annual_return: mock::round_to(total * weighted_apy / 100.0, 2),
        remaining_amount: mock::round_to(remaining, 2),
    })
}

pub struct DefiMax {
    rng: StdRng,
    swaps: Vec<SwapRecord>,
}

impl DefiMax {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng,
            swaps: Vec::new(),
        }
    }

    pub fn swap(&mut self, query: SwapQuery) -> ApiResult<(SwapRecord, f64)> {
        if !(query.amount.is_finite() && query.amount > 0.0) {
            return Err(ApiError::bad_request("Amount must be positive"));
        }
        if query.token_in.trim().is_empty() || query.token_out.trim().is_empty() {
            return Err(ApiError::bad_request("token_in and token_out are required"));
        }
        if query.token_in.eq_ignore_ascii_case(&query.token_out) {
            return Err(ApiError::bad_request("Cannot swap a token for itself"));
        }

        let slippage = mock::uniform(&mut self.rng, 0.1, 2.0);
        let gas_cost = mock::uniform(&mut self.rng, 20.0, 100.0);
        let fee_rate = protocol_fee(&query.protocol);
        let received = query.amount * (1.0 - fee_rate) * (1.0 - slippage / 100.0);

        let record = SwapRecord {
            swap_id: format!("SWAP_{:06}", self.swaps.len() + 1),
            token_in: query.token_in,
            token_out: query.token_out,
            amount_in: query.amount,
            amount_out: mock::round_to(received, 6),
            protocol: query.protocol,
            slippage: mock::round_to(slippage, 4),
            fee: mock::round_to(query.amount * fee_rate, 6),
            gas_cost: mock::round_to(gas_cost, 2),
            timestamp: mock::now(),
            success: true,
        };
        log::info!(
            "{}: {} {} -> {} via {}",
            record.swap_id,
            record.amount_in,
            record.token_in,
            record.token_out,
            record.protocol
        );
        self.swaps.push(record.clone());
        let execution_time = mock::uniform_rounded(&mut self.rng, 0.5, 3.0, 3);
        Ok((record, execution_time))
    }

    pub fn performance(&self) -> SwapPerformance {
        if self.swaps.is_empty() {
            return SwapPerformance {
                portfolio_value: STARTING_VALUE,
                ..SwapPerformance::default()
            };
        }
        let done: Vec<&SwapRecord> = self.swaps.iter().filter(|s| s.success).collect();
        let slippages: Vec<f64> = done.iter().map(|s| s.slippage).collect();
        let total_pnl: f64 = done
            .iter()
            .map(|s| s.amount_out - s.amount_in - s.fee - s.gas_cost)
            .sum();
        SwapPerformance {
            total_swaps: done.len(),
            total_volume: mock::round_to(done.iter().map(|s| s.amount_in).sum(), 2),
            avg_slippage: mock::round_to(mock::mean(&slippages).unwrap_or_default(), 4),
            total_fees: mock::round_to(done.iter().map(|s| s.fee + s.gas_cost).sum(), 2),
            total_pnl: mock::round_to(total_pnl, 2),
            success_rate: mock::round_to(done.len() as f64 / self.swaps.len() as f64 * 100.0, 2),
            portfolio_value: mock::round_to(STARTING_VALUE + total_pnl, 2),
        }
    }

    pub fn arbitrage(&mut self) -> Vec<markets::ArbitrageOpportunity> {
        markets::scan_cross_chain(
            &mut self.rng,
            ARBITRAGE_TRADE_AMOUNT,
            ARBITRAGE_SPREAD_PROBABILITY,
        )
    }

    pub fn recent_swaps(&self) -> &[SwapRecord] {
        let start = self.swaps.len().saturating_sub(RECENT_SWAPS);
        &self.swaps[start..]
    }
}

pub struct DefiMaxService;

impl DemoService for DefiMaxService {
    fn descriptor(&self) -> &'static ServiceDescriptor {
        &DESCRIPTOR
    }

    fn router(&self, rng: StdRng) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/api/optimize-yield", post(optimize))
            .route("/api/arbitrage-opportunities", get(arbitrage))
            .route("/api/swap", post(swap))
            .route("/api/market-data", get(market_data))
            .route("/api/yield-strategies", get(yield_strategies))
            .route("/api/portfolio-performance", get(portfolio_performance))
            .route("/api/trading-history", get(trading_history))
            .with_state(shared(DefiMax::new(rng)))
    }
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    query
        .map(|Query(params)| params)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

async fn root() -> Json<Value> {
    let protocols: Vec<&str> = PROTOCOLS.iter().map(|(name, _)| *name).collect();
    Json(banner_with(&DESCRIPTOR, json!({"protocols": protocols})))
}

async fn optimize(query: Result<Query<OptimizeQuery>, QueryRejection>) -> ApiResult<Json<Value>> {
    let params = query_params(query)?;
    let optimization = optimize_yield(params.amount, params.risk_tolerance)?;
    Ok(Json(json!({"success": true, "optimization": optimization})))
}

async fn arbitrage(State(platform): State<Shared<DefiMax>>) -> Json<Value> {
    let opportunities = platform.lock().await.arbitrage();
    Json(json!({"success": true, "opportunities": opportunities}))
}

async fn swap(
    State(platform): State<Shared<DefiMax>>,
    query: Result<Query<SwapQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let (record, execution_time) = platform.lock().await.swap(query_params(query)?)?;
    Ok(Json(json!({
        "success": true,
        "swap_record": record,
        "execution_time": execution_time,
    })))
}

async fn market_data() -> Json<Value> {
    let data: BTreeMap<&str, ProtocolStats> = PROTOCOLS.into_iter().collect();
    Json(json!({"success": true, "market_data": data}))
}

async fn yield_strategies() -> Json<Value> {
    Json(json!({"success": true, "strategies": STRATEGIES}))
}

async fn portfolio_performance(State(platform): State<Shared<DefiMax>>) -> Json<Value> {
    let performance = platform.lock().await.performance();
    Json(json!({"success": true, "performance": performance}))
}

async fn trading_history(State(platform): State<Shared<DefiMax>>) -> Json<Value> {
    let platform = platform.lock().await;
    Json(json!({"success": true, "trades": platform.recent_swaps()}))
}
