//! CarbonCredits AI: a carbon credit marketplace with price prediction,
//! greedy portfolio optimization and volume-checked trading.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use demo_core::{
    banner, mock, shared, ApiError, ApiResult, DemoService, Payload, Route, ServiceDescriptor,
    Shared,
};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::f64::consts::PI;

use crate::markets;

pub const DESCRIPTOR: ServiceDescriptor = ServiceDescriptor {
    name: "carbon",
    title: "CarbonCredits AI",
    tagline: "AI-powered carbon trading platform",
    version: "1.0.0",
    default_port: 8000,
    features: &[
        "AI-powered portfolio optimization",
        "Real-time carbon credit pricing",
        "Cross-chain arbitrage detection",
        "Sustainability impact tracking",
    ],
    routes: &[
        Route::new("GET", "/api/credits", "List carbon credits"),
        Route::new("GET", "/api/credits/:id", "Credit details with predicted price"),
        Route::new("POST", "/api/optimize-portfolio", "Optimize a credit portfolio"),
        Route::new("POST", "/api/trade", "Buy credit volume"),
        Route::new("GET", "/api/market-analytics", "30-day market analytics"),
        Route::new("GET", "/api/market-data", "Current market summary"),
        Route::new("GET", "/api/arbitrage-opportunities", "Cross-chain arbitrage scan"),
        Route::new("GET", "/api/trading-history", "The 20 most recent trades"),
    ],
};

const CREDIT_COUNT: usize = 50;
const HISTORY_DAYS: i64 = 365;
const ANALYTICS_WINDOW: usize = 30;
const RECENT_TRADES: usize = 20;
const MIN_PRICE: f64 = 5.0;
const ARBITRAGE_TRADE_AMOUNT: f64 = 10_000.0;
const ARBITRAGE_SPREAD_PROBABILITY: f64 = 0.3;
const PRICE_CONFIDENCE: f64 = 0.85;

const CERTIFICATIONS: [&str; 4] = ["VCS", "Gold Standard", "CDM", "CAR"];
const LOCATIONS: [&str; 5] = ["USA", "Brazil", "India", "Germany", "Australia"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditType {
    Renewable,
    Forest,
    Ocean,
    Industrial,
}

impl CreditType {
    pub const ALL: [CreditType; 4] = [
        CreditType::Renewable,
        CreditType::Forest,
        CreditType::Ocean,
        CreditType::Industrial,
    ];

    pub fn base_price(self) -> f64 {
        match self {
            CreditType::Renewable => 30.0,
            CreditType::Forest => 25.0,
            CreditType::Ocean => 35.0,
            CreditType::Industrial => 20.0,
        }
    }

    fn price_multiplier(self) -> f64 {
        match self {
            CreditType::Renewable => 1.1,
            CreditType::Forest => 1.0,
            CreditType::Ocean => 1.2,
            CreditType::Industrial => 0.9,
        }
    }

    fn impact(self) -> SustainabilityImpact {
        let (co2_reduction, biodiversity, social_impact) = match self {
            CreditType::Renewable => (1.0, 0.8, 0.9),
            CreditType::Forest => (1.2, 1.0, 0.7),
            CreditType::Ocean => (0.9, 1.1, 0.6),
            CreditType::Industrial => (1.1, 0.5, 0.8),
        };
        SustainabilityImpact {
            co2_reduction,
            biodiversity,
            social_impact,
        }
    }
}

fn certification_multiplier(certification: &str) -> f64 {
    match certification {
        "Gold Standard" => 1.15,
        "CDM" => 1.05,
        "CAR" => 1.08,
        _ => 1.0,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CarbonCredit {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CreditType,
    pub price: f64,
    pub volume: u32,
    pub location: &'static str,
    pub certification: &'static str,
    pub co2_tons: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MarketDay {
    pub date: NaiveDate,
    pub price: f64,
    pub volume: f64,
    pub carbon_demand: f64,
}

fn default_budget() -> f64 {
    10_000.0
}

fn default_risk_tolerance() -> f64 {
    0.5
}

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_budget")]
    pub budget: f64,
    #[serde(default = "default_risk_tolerance")]
    pub risk_tolerance: f64,
    /// Credit types to consider. Empty means all.
    #[serde(default)]
    pub sustainability_goals: Vec<CreditType>,
}

fn default_buyer() -> String {
    "demo_user".to_string()
}

#[derive(Debug, Deserialize)]
pub struct TradeRequest {
    #[serde(default)]
    pub credit_id: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default = "default_buyer")]
    pub buyer_id: String,
    /// Defaults to the listed price.
    #[serde(default)]
    pub price_per_ton: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct SustainabilityImpact {
    pub co2_reduction: f64,
    pub biodiversity: f64,
    pub social_impact: f64,
}

#[derive(Debug, Serialize)]
pub struct PortfolioItem {
    pub credit_id: String,
    #[serde(rename = "type")]
    pub kind: CreditType,
    pub quantity: u32,
    pub price_per_ton: f64,
    pub total_cost: f64,
    pub co2_tons: f64,
    pub predicted_return: f64,
}

#[derive(Debug, Serialize)]
pub struct PortfolioOptimization {
    pub portfolio: Vec<PortfolioItem>,
    pub total_cost: f64,
    pub total_co2_tons: f64,
    pub average_price_per_ton: f64,
    pub remaining_budget: f64,
    pub diversification_score: f64,
    pub sustainability_impact: SustainabilityImpact,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeRecord {
    pub trade_id: String,
    pub credit_id: String,
    pub buyer_id: String,
    pub quantity: u32,
    pub price_per_ton: f64,
    pub total_cost: f64,
    pub co2_tons: f64,
    pub timestamp: DateTime<Utc>,
    pub credit_type: CreditType,
    pub location: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MarketAnalytics {
    pub average_price: f64,
    pub price_volatility: f64,
    pub total_volume: u64,
    pub price_trend: &'static str,
    pub market_sentiment: &'static str,
}

pub struct CarbonMarket {
    rng: StdRng,
    credits: Vec<CarbonCredit>,
    history: Vec<MarketDay>,
    trades: Vec<TradeRecord>,
}

/// Long-run price level for the day of year, peaking mid-spring.
fn seasonal_baseline(day_of_year: u32) -> f64 {
    25.0 + 3.0 * (2.0 * PI * f64::from(day_of_year) / 365.0).sin()
}

impl CarbonMarket {
    pub fn new(mut rng: StdRng) -> Self {
        let today = Utc::now().date_naive();
        let history = (0..=HISTORY_DAYS)
            .rev()
            .map(|offset| {
                let date = today - Duration::days(offset);
                MarketDay {
                    date,
                    price: (seasonal_baseline(date.ordinal()) + mock::uniform(&mut rng, -5.0, 5.0))
                        .max(MIN_PRICE),
                    volume: (1000.0 + mock::uniform(&mut rng, -350.0, 350.0)).max(100.0),
                    carbon_demand: mock::uniform(&mut rng, 0.7, 1.3),
                }
            })
            .collect();

        let credits = (0..CREDIT_COUNT)
            .map(|i| {
                let kind = mock::pick(&mut rng, &CreditType::ALL);
                let base = kind.base_price();
                CarbonCredit {
                    id: format!("CC_{:03}", i),
                    kind,
                    price: mock::round_to(
                        (base + mock::uniform(&mut rng, -0.1 * base, 0.1 * base)).max(MIN_PRICE),
                        2,
                    ),
                    volume: rng.gen_range(100..=5000),
                    location: mock::pick(&mut rng, &LOCATIONS),
                    certification: mock::pick(&mut rng, &CERTIFICATIONS),
                    co2_tons: mock::uniform_rounded(&mut rng, 0.5, 10.0, 3),
                    timestamp: Utc::now() - Duration::days(rng.gen_range(0..=30)),
                }
            })
            .collect();

        Self {
            rng,
            credits,
            history,
            trades: Vec::new(),
        }
    }

    pub fn credits(&self) -> &[CarbonCredit] {
        &self.credits
    }

    pub fn credit(&self, id: &str) -> Option<&CarbonCredit> {
        self.credits.iter().find(|c| c.id == id)
    }

    /// Seasonal baseline scaled by current demand, credit type and
    /// certification; never below the price floor.
    pub fn predict_price(&mut self, credit: &CarbonCredit) -> f64 {
        let baseline = seasonal_baseline(Utc::now().ordinal());
        let demand = mock::uniform(&mut self.rng, 0.8, 1.2);
        let price = baseline
            * demand
            * credit.kind.price_multiplier()
            * certification_multiplier(credit.certification);
        mock::round_to(price.max(MIN_PRICE), 2)
    }

    pub fn optimize_portfolio(&mut self, request: &OptimizeRequest) -> ApiResult<PortfolioOptimization> {
        if !(request.budget.is_finite() && request.budget > 0.0) {
            return Err(ApiError::bad_request("Budget must be positive"));
        }
        if !(request.risk_tolerance.is_finite() && request.risk_tolerance >= 0.0) {
            return Err(ApiError::bad_request("risk_tolerance must be non-negative"));
        }

        let candidates: Vec<CarbonCredit> = self
            .credits
            .iter()
            .filter(|c| {
                request.sustainability_goals.is_empty()
                    || request.sustainability_goals.contains(&c.kind)
            })
            .cloned()
            .collect();
        if candidates.is_empty() {
            return Err(ApiError::bad_request("No credits match sustainability goals"));
        }

        let risk_factor = 1.0 / (1.0 + request.risk_tolerance);
        let mut scored: Vec<(CarbonCredit, f64, f64)> = candidates
            .into_iter()
            .map(|credit| {
                let predicted = self.predict_price(&credit);
                let score = predicted / credit.price * risk_factor;
                (credit, predicted, score)
            })
            .collect();
        scored.sort_by(|a, b| b.2.total_cmp(&a.2));

        let mut remaining = request.budget;
        let mut portfolio = Vec::new();
        for (credit, predicted, score) in scored {
            if remaining <= 0.0 {
                break;
            }
            let affordable = (remaining / predicted).floor() as u32;
            let quantity = credit.volume.min(affordable);
            if quantity == 0 {
                continue;
            }
            let total_cost = f64::from(quantity) * predicted;
            remaining -= total_cost;
            portfolio.push(PortfolioItem {
                credit_id: credit.id,
                kind: credit.kind,
                quantity,
                price_per_ton: predicted,
                total_cost: mock::round_to(total_cost, 2),
                co2_tons: mock::round_to(f64::from(quantity) * credit.co2_tons, 3),
                predicted_return: mock::round_to(score, 4),
            });
        }

        let total_cost: f64 = portfolio.iter().map(|p| p.total_cost).sum();
        let total_co2: f64 = portfolio.iter().map(|p| p.co2_tons).sum();
        let types: HashSet<CreditType> = portfolio.iter().map(|p| p.kind).collect();

        if let Some(user) = &request.user_id {
            log::info!("Optimized portfolio for {}: {} positions", user, portfolio.len());
        }

        Ok(PortfolioOptimization {
            total_cost: mock::round_to(total_cost, 2),
            total_co2_tons: mock::round_to(total_co2, 3),
            average_price_per_ton: if total_co2 > 0.0 {
                mock::round_to(total_cost / total_co2, 2)
            } else {
                0.0
            },
            remaining_budget: mock::round_to(remaining, 2),
            diversification_score: types.len() as f64 / CreditType::ALL.len() as f64,
            sustainability_impact: sustainability_impact(&portfolio),
            portfolio,
        })
    }

    pub fn execute_trade(&mut self, request: TradeRequest) -> ApiResult<(TradeRecord, u32)> {
        if request.quantity == 0 {
            return Err(ApiError::bad_request("Quantity must be positive"));
        }
        let trade_id = format!("TRADE_{:06}", self.trades.len() + 1);
        let credit = self
            .credits
            .iter_mut()
            .find(|c| c.id == request.credit_id)
            .ok_or_else(|| ApiError::not_found("Carbon credit not found"))?;
        if credit.volume < request.quantity {
            return Err(ApiError::bad_request("Insufficient credit volume"));
        }

        let price_per_ton = request.price_per_ton.unwrap_or(credit.price);
        if !(price_per_ton.is_finite() && price_per_ton > 0.0) {
            return Err(ApiError::bad_request("price_per_ton must be positive"));
        }
        credit.volume -= request.quantity;

        let record = TradeRecord {
            trade_id,
            credit_id: request.credit_id,
            buyer_id: request.buyer_id,
            quantity: request.quantity,
            price_per_ton,
            total_cost: mock::round_to(f64::from(request.quantity) * price_per_ton, 2),
            co2_tons: mock::round_to(f64::from(request.quantity) * credit.co2_tons, 3),
            timestamp: mock::now(),
            credit_type: credit.kind,
            location: credit.location,
        };
        let remaining = credit.volume;
        log::info!(
            "{}: {} x {} for {}",
            record.trade_id,
            record.quantity,
            record.credit_id,
            record.buyer_id
        );
        self.trades.push(record.clone());
        Ok((record, remaining))
    }

    pub fn market_analytics(&self) -> MarketAnalytics {
        let start = self.history.len().saturating_sub(ANALYTICS_WINDOW);
        let window = &self.history[start..];
        let prices: Vec<f64> = window.iter().map(|d| d.price).collect();
        let all_prices: Vec<f64> = self.history.iter().map(|d| d.price).collect();
        let average = mock::mean(&prices).unwrap_or_default();
        let rising = match (prices.first(), prices.last()) {
            (Some(first), Some(last)) => last > first,
            _ => false,
        };

        MarketAnalytics {
            average_price: mock::round_to(average, 2),
            price_volatility: mock::round_to(mock::std_dev(&prices).unwrap_or_default(), 2),
            total_volume: window.iter().map(|d| d.volume.round() as u64).sum(),
            price_trend: if rising { "up" } else { "down" },
            market_sentiment: if average > mock::mean(&all_prices).unwrap_or_default() {
                "bullish"
            } else {
                "bearish"
            },
        }
    }

    pub fn market_data(&mut self) -> Value {
        let prices: Vec<f64> = self.credits.iter().map(|c| c.price).collect();
        let latest_demand = self.history.last().map(|d| d.carbon_demand).unwrap_or(1.0);
        json!({
            "total_credits": self.credits.len(),
            "average_price": mock::round_to(mock::mean(&prices).unwrap_or_default(), 2),
            "total_volume": self.credits.iter().map(|c| u64::from(c.volume)).sum::<u64>(),
            "carbon_demand": mock::round_to(latest_demand, 3),
            "price_trend": if self.rng.gen_bool(0.5) { "up" } else { "down" },
        })
    }

    pub fn arbitrage(&mut self) -> Vec<markets::ArbitrageOpportunity> {
        markets::scan_cross_chain(
            &mut self.rng,
            ARBITRAGE_TRADE_AMOUNT,
            ARBITRAGE_SPREAD_PROBABILITY,
        )
    }

    pub fn recent_trades(&self) -> &[TradeRecord] {
        let start = self.trades.len().saturating_sub(RECENT_TRADES);
        &self.trades[start..]
    }
}

/// CO₂-weighted average of the per-type impact factors.
fn sustainability_impact(portfolio: &[PortfolioItem]) -> SustainabilityImpact {
    let total: f64 = portfolio.iter().map(|p| p.co2_tons).sum();
    if total <= 0.0 {
        return SustainabilityImpact::default();
    }
    let mut impact = SustainabilityImpact::default();
    for item in portfolio {
        let factors = item.kind.impact();
        let weight = item.co2_tons / total;
        impact.co2_reduction += factors.co2_reduction * weight;
        impact.biodiversity += factors.biodiversity * weight;
        impact.social_impact += factors.social_impact * weight;
    }
    SustainabilityImpact {
        co2_reduction: mock::round_to(impact.co2_reduction, 3),
        biodiversity: mock::round_to(impact.biodiversity, 3),
        social_impact: mock::round_to(impact.social_impact, 3),
    }
}

pub struct CarbonService;

impl DemoService for CarbonService {
    fn descriptor(&self) -> &'static ServiceDescriptor {
        &DESCRIPTOR
    }

    fn router(&self, rng: StdRng) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/api/credits", get(credits))
            .route("/api/credits/:id", get(credit))
            .route("/api/optimize-portfolio", post(optimize_portfolio))
            .route("/api/trade", post(trade))
            .route("/api/market-analytics", get(market_analytics))
            .route("/api/market-data", get(market_data))
            .route("/api/arbitrage-opportunities", get(arbitrage))
            .route("/api/trading-history", get(trading_history))
            .with_state(shared(CarbonMarket::new(rng)))
    }
}

async fn root() -> Json<Value> {
    Json(banner(&DESCRIPTOR))
}

async fn credits(State(market): State<Shared<CarbonMarket>>) -> Json<Value> {
    let market = market.lock().await;
    Json(json!({
        "success": true,
        "credits": market.credits(),
        "total_count": market.credits().len(),
    }))
}

async fn credit(
    State(market): State<Shared<CarbonMarket>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let mut market = market.lock().await;
    let credit = market
        .credit(&id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("Carbon credit not found"))?;
    let predicted = market.predict_price(&credit);
    Ok(Json(json!({
        "success": true,
        "credit": credit,
        "ai_predicted_price": predicted,
        "price_confidence": PRICE_CONFIDENCE,
    })))
}

async fn optimize_portfolio(
    State(market): State<Shared<CarbonMarket>>,
    Payload(request): Payload<OptimizeRequest>,
) -> ApiResult<Json<Value>> {
    let optimization = market.lock().await.optimize_portfolio(&request)?;
    Ok(Json(json!({"success": true, "optimization": optimization})))
}

async fn trade(
    State(market): State<Shared<CarbonMarket>>,
    Payload(request): Payload<TradeRequest>,
) -> ApiResult<Json<Value>> {
    let (record, remaining) = market.lock().await.execute_trade(request)?;
    Ok(Json(json!({
        "success": true,
        "trade_record": record,
        "remaining_volume": remaining,
    })))
}

async fn market_analytics(State(market): State<Shared<CarbonMarket>>) -> Json<Value> {
    let analytics = market.lock().await.market_analytics();
    Json(json!({"success": true, "analytics": analytics}))
}

async fn market_data(State(market): State<Shared<CarbonMarket>>) -> Json<Value> {
    let data = market.lock().await.market_data();
    Json(json!({"success": true, "market_data": data}))
}

async fn arbitrage(State(market): State<Shared<CarbonMarket>>) -> Json<Value> {
    let opportunities = market.lock().await.arbitrage();
    Json(json!({"success": true, "opportunities": opportunities}))
}

async fn trading_history(State(market): State<Shared<CarbonMarket>>) -> Json<Value> {
    let market = market.lock().await;
    Json(json!({"success": true, "trades": market.recent_trades()}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_app;
    use axum::http::StatusCode;
    use demo_core::testing;

    fn market() -> CarbonMarket {
        CarbonMarket::new(mock::seeded(Some(2024)))
    }

    fn optimize(budget: f64, goals: Vec<CreditType>) -> OptimizeRequest {
        OptimizeRequest {
            user_id: None,
            budget,
            risk_tolerance: 0.5,
            sustainability_goals: goals,
        }
    }

    #[test]
    fn test_initial_market() {
        let market = market();
        assert_eq!(market.credits().len(), 50);
        assert_eq!(market.credits()[0].id, "CC_000");
        assert_eq!(market.history.len(), 366);
        assert!(market.history.iter().all(|d| d.price >= MIN_PRICE));
        for credit in market.credits() {
            let base = credit.kind.base_price();
            assert!(credit.price >= base * 0.9 - 0.01 && credit.price <= base * 1.1 + 0.01);
        }
    }

    #[test]
    fn test_predicted_price_floor() {
        let mut market = market();
        let credits = market.credits().to_vec();
        for credit in &credits {
            assert!(market.predict_price(credit) >= MIN_PRICE);
        }
    }

    #[test]
    fn test_optimization_stays_within_budget() {
        let mut market = market();
        let result = market
            .optimize_portfolio(&optimize(10_000.0, vec![CreditType::Forest, CreditType::Ocean]))
            .unwrap();
        assert!(!result.portfolio.is_empty());
        assert!(result.total_cost <= 10_000.0 + 0.01);
        assert!(result.remaining_budget >= -0.01);
        assert!(result
            .portfolio
            .iter()
            .all(|p| matches!(p.kind, CreditType::Forest | CreditType::Ocean)));
        for pair in result.portfolio.windows(2) {
            assert!(pair[0].predicted_return >= pair[1].predicted_return);
        }
        assert!(result.diversification_score <= 0.5);
    }

    #[test]
    fn test_optimization_rejects_bad_input() {
        let mut market = market();
        assert!(market.optimize_portfolio(&optimize(0.0, vec![])).is_err());
        market.credits.retain(|c| c.kind != CreditType::Ocean);
        let err = market
            .optimize_portfolio(&optimize(1_000.0, vec![CreditType::Ocean]))
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_sustainability_impact_is_weighted() {
        let item = |kind, co2_tons| PortfolioItem {
            credit_id: "CC".to_string(),
            kind,
            quantity: 1,
            price_per_ton: 10.0,
            total_cost: 10.0,
            co2_tons,
            predicted_return: 1.0,
        };
        let impact = sustainability_impact(&[
            item(CreditType::Forest, 3.0),
            item(CreditType::Industrial, 1.0),
        ]);
        assert_eq!(impact.co2_reduction, 1.175);
        assert_eq!(impact.biodiversity, 0.875);
        assert_eq!(sustainability_impact(&[]), SustainabilityImpact::default());
    }

    #[test]
    fn test_trade_decrements_volume() {
        let mut market = market();
        let volume = market.credit("CC_005").unwrap().volume;
        let (record, remaining) = market
            .execute_trade(TradeRequest {
                credit_id: "CC_005".to_string(),
                quantity: 10,
                buyer_id: default_buyer(),
                price_per_ton: Some(20.0),
            })
            .unwrap();
        assert_eq!(record.trade_id, "TRADE_000001");
        assert_eq!(record.total_cost, 200.0);
        assert_eq!(remaining, volume - 10);
        assert_eq!(market.credit("CC_005").unwrap().volume, volume - 10);
    }

    #[test]
    fn test_market_analytics_window() {
        let market = market();
        let analytics = market.market_analytics();
        assert!(analytics.average_price >= MIN_PRICE);
        assert!(analytics.price_volatility > 0.0);
        assert!(analytics.total_volume >= 30 * 100);
    }

    #[tokio::test]
    async fn test_trade_errors() {
        let app = test_app(&CarbonService);
        let (status, _) = testing::post(
            &app,
            "/api/trade",
            json!({"credit_id": "CC_999", "quantity": 1}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = testing::post(
            &app,
            "/api/trade",
            json!({"credit_id": "CC_001", "quantity": 1_000_000}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Insufficient credit volume");

        let (status, body) = testing::get(&app, "/api/credits/CC_001").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["price_confidence"], 0.85);
    }
}
