//! AI trading bot: mock quotes and predictions over a cash-and-shares
//! portfolio that enforces funds and holdings on every trade.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use demo_core::{
    banner, mock, shared, ApiError, ApiResult, DemoService, Payload, Route, ServiceDescriptor,
    Shared,
};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const DESCRIPTOR: ServiceDescriptor = ServiceDescriptor {
    name: "trading-bot",
    title: "AI Trading Bot",
    tagline: "Advanced algorithmic trading platform",
    version: "1.0.0",
    default_port: 8002,
    features: &[
        "ML-powered price predictions",
        "Automated trading strategies",
        "Risk management systems",
        "Real-time market analysis",
        "Portfolio optimization",
    ],
    routes: &[
        Route::new("GET", "/api/market-data/:symbol", "Quote for a symbol"),
        Route::new("POST", "/api/predict", "Price prediction"),
        Route::new("POST", "/api/backtest", "Backtest a strategy"),
        Route::new("POST", "/api/trade", "Execute a trade"),
        Route::new("GET", "/api/portfolio", "Portfolio valuation"),
        Route::new("GET", "/api/strategies", "Available strategies"),
        Route::new("GET", "/api/trade-history", "Every trade attempt"),
    ],
};

pub const INITIAL_CASH: f64 = 100_000.0;

pub const STRATEGIES: [&str; 5] = [
    "LSTM Neural Network",
    "Random Forest",
    "Support Vector Machine",
    "Moving Average Crossover",
    "RSI Mean Reversion",
];

fn default_symbol() -> String {
    "AAPL".to_string()
}

fn default_strategy() -> String {
    STRATEGIES[0].to_string()
}

fn default_days() -> u32 {
    30
}

fn default_quantity() -> u32 {
    10
}

fn default_price() -> f64 {
    150.0
}

#[derive(Debug, Deserialize)]
pub struct StrategyRequest {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default = "default_days")]
    pub days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    #[default]
    Buy,
    Sell,
}

#[derive(Debug, Deserialize)]
pub struct TradeRequest {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default)]
    pub action: Action,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default = "default_price")]
    pub price: f64,
}

#[derive(Debug, Serialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub high: f64,
    pub low: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct Prediction {
    pub symbol: String,
    pub current_price: f64,
    pub predicted_price: f64,
    pub confidence: f64,
    pub strategy: String,
    pub direction: Action,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BacktestTrade {
    pub date: DateTime<Utc>,
    pub action: Action,
    pub price: f64,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct BacktestReport {
    pub strategy: String,
    pub symbol: String,
    pub period_days: u32,
    pub initial_price: f64,
    pub final_price: f64,
    pub return_percent: f64,
    pub total_trades: usize,
    pub win_rate: f64,
    pub max_drawdown: f64,
    pub trades: Vec<BacktestTrade>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub action: Action,
    pub quantity: u32,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct PortfolioStatus {
    pub cash: f64,
    pub positions: BTreeMap<String, u32>,
    pub total_value: f64,
    pub total_return: f64,
    pub return_percent: f64,
}

pub struct TradingBot {
    rng: StdRng,
    cash: f64,
    positions: BTreeMap<String, u32>,
    history: Vec<TradeRecord>,
}

impl TradingBot {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng,
            cash: INITIAL_CASH,
            positions: BTreeMap::new(),
            history: Vec::new(),
        }
    }

    pub fn quote(&mut self, symbol: &str) -> Quote {
        let rng = &mut self.rng;
        let price = mock::uniform(rng, 100.0, 300.0);
        let change = mock::uniform(rng, -0.05, 0.05);
        Quote {
            symbol: symbol.to_string(),
            price: mock::round_to(price, 2),
            change: mock::round_to(change, 4),
            change_percent: mock::round_to(change * 100.0, 2),
            volume: rng.gen_range(1_000_000..=10_000_000),
            high: mock::round_to(price * 1.02, 2),
            low: mock::round_to(price * 0.98, 2),
            timestamp: mock::now(),
        }
    }

    pub fn predict(&mut self, symbol: &str, strategy: String) -> Prediction {
        let current = self.quote(symbol).price;
        let predicted = mock::round_to(current * mock::uniform(&mut self.rng, 0.95, 1.05), 2);
        Prediction {
            symbol: symbol.to_string(),
            current_price: current,
            predicted_price: predicted,
            confidence: mock::uniform_rounded(&mut self.rng, 0.6, 0.95, 3),
            strategy,
            direction: if predicted > current {
                Action::Buy
            } else {
                Action::Sell
            },
            timestamp: mock::now(),
        }
    }

    pub fn backtest(&mut self, request: StrategyRequest) -> BacktestReport {
        let rng = &mut self.rng;
        let days = request.days.max(1);
        let initial = mock::uniform(rng, 100.0, 200.0);
        let final_price = initial * mock::uniform(rng, 0.8, 1.3);
        let trade_count = rng.gen_range(5..=15);
        let mut trades: Vec<BacktestTrade> = (0..trade_count)
            .map(|_| BacktestTrade {
                date: Utc::now() - Duration::days(rng.gen_range(1..=i64::from(days))),
                action: if rng.gen_bool(0.5) {
                    Action::Buy
                } else {
                    Action::Sell
                },
                price: mock::round_to(initial * mock::uniform(rng, 0.9, 1.1), 2),
                quantity: rng.gen_range(10..=100),
            })
            .collect();
        trades.sort_by_key(|t| t.date);

        BacktestReport {
            strategy: request.strategy,
            symbol: request.symbol,
            period_days: days,
            initial_price: mock::round_to(initial, 2),
            final_price: mock::round_to(final_price, 2),
            return_percent: mock::round_to((final_price - initial) / initial * 100.0, 2),
            total_trades: trades.len(),
            win_rate: mock::uniform_rounded(rng, 0.4, 0.8, 2),
            max_drawdown: mock::uniform_rounded(rng, -0.15, -0.05, 2),
            trades,
        }
    }

    /// Records every attempt. Failed attempts leave cash and positions
    /// untouched and carry the reason in `status`.
    pub fn execute(&mut self, request: TradeRequest) -> ApiResult<TradeRecord> {
        if request.quantity == 0 {
            return Err(ApiError::bad_request("Quantity must be positive"));
        }
        if !(request.price.is_finite() && request.price > 0.0) {
            return Err(ApiError::bad_request("Price must be positive"));
        }

        let amount = f64::from(request.quantity) * request.price;
        let status = match request.action {
            Action::Buy if amount <= self.cash => {
                let held = self.positions.get(&request.symbol).copied().unwrap_or(0);
                let Some(total) = held.checked_add(request.quantity) else {
                    return Err(ApiError::bad_request("Position size limit exceeded"));
                };
                self.cash -= amount;
                self.positions.insert(request.symbol.clone(), total);
                "EXECUTED"
            }
            Action::Buy => "FAILED - Insufficient funds",
            Action::Sell => match self.positions.get_mut(&request.symbol) {
                Some(held) if *held >= request.quantity => {
                    *held -= request.quantity;
                    if *held == 0 {
                        self.positions.remove(&request.symbol);
                    }
                    self.cash += amount;
                    "EXECUTED"
                }
                _ => "FAILED - Insufficient shares",
            },
        };

        let record = TradeRecord {
            symbol: request.symbol,
            action: request.action,
            quantity: request.quantity,
            price: request.price,
            timestamp: mock::now(),
            status: status.to_string(),
        };
        log::info!(
            "{:?} {} {} @ {}: {}",
            record.action,
            record.quantity,
            record.symbol,
            record.price,
            record.status
        );
        self.history.push(record.clone());
        Ok(record)
    }

    /// Revalues every position at a fresh quote.
    pub fn portfolio(&mut self) -> PortfolioStatus {
        let symbols: Vec<(String, u32)> =
            self.positions.iter().map(|(s, q)| (s.clone(), *q)).collect();
        let holdings: f64 = symbols
            .iter()
            .map(|(symbol, quantity)| f64::from(*quantity) * self.quote(symbol).price)
            .sum();
        let total_value = self.cash + holdings;
        PortfolioStatus {
            cash: mock::round_to(self.cash, 2),
            positions: self.positions.clone(),
            total_value: mock::round_to(total_value, 2),
            total_return: mock::round_to(total_value - INITIAL_CASH, 2),
            return_percent: mock::round_to((total_value - INITIAL_CASH) / INITIAL_CASH * 100.0, 2),
        }
    }

    pub fn history(&self) -> &[TradeRecord] {
        &self.history
    }
}

pub struct TradingBotService;

impl DemoService for TradingBotService {
    fn descriptor(&self) -> &'static ServiceDescriptor {
        &DESCRIPTOR
    }

    fn router(&self, rng: StdRng) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/api/market-data/:symbol", get(market_data))
            .route("/api/predict", post(predict))
            .route("/api/backtest", post(backtest))
            .route("/api/trade", post(trade))
            .route("/api/portfolio", get(portfolio))
            .route("/api/strategies", get(strategies))
            .route("/api/trade-history", get(trade_history))
            .with_state(shared(TradingBot::new(rng)))
    }
}

async fn root() -> Json<Value> {
    Json(banner(&DESCRIPTOR))
}

async fn market_data(
    State(bot): State<Shared<TradingBot>>,
    Path(symbol): Path<String>,
) -> Json<Value> {
    let data = bot.lock().await.quote(&symbol.to_uppercase());
    Json(json!({"success": true, "data": data}))
}

async fn predict(
    State(bot): State<Shared<TradingBot>>,
    Payload(request): Payload<StrategyRequest>,
) -> Json<Value> {
    let prediction = bot.lock().await.predict(&request.symbol, request.strategy);
    Json(json!({"success": true, "prediction": prediction}))
}

async fn backtest(
    State(bot): State<Shared<TradingBot>>,
    Payload(request): Payload<StrategyRequest>,
) -> Json<Value> {
    let results = bot.lock().await.backtest(request);
    Json(json!({"success": true, "results": results}))
}

async fn trade(
    State(bot): State<Shared<TradingBot>>,
    Payload(request): Payload<TradeRequest>,
) -> ApiResult<Json<Value>> {
    let trade = bot.lock().await.execute(request)?;
    Ok(Json(json!({"success": true, "trade": trade})))
}

async fn portfolio(State(bot): State<Shared<TradingBot>>) -> Json<Value> {
    let portfolio = bot.lock().await.portfolio();
    Json(json!({"success": true, "portfolio": portfolio}))
}

async fn strategies() -> Json<Value> {
    Json(json!({"success": true, "strategies": STRATEGIES}))
}

async fn trade_history(State(bot): State<Shared<TradingBot>>) -> Json<Value> {
    let bot = bot.lock().await;
    Json(json!({"success": true, "trades": bot.history()}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_app;
    use axum::http::StatusCode;
    use demo_core::testing;

    fn bot() -> TradingBot {
        TradingBot::new(mock::seeded(Some(12)))
    }

    fn order(action: Action, quantity: u32, price: f64) -> TradeRequest {
        TradeRequest {
            symbol: "AAPL".to_string(),
            action,
            quantity,
            price,
        }
    }

    #[test]
    fn test_buy_then_sell_updates_cash_and_positions() {
        let mut bot = bot();
        let trade = bot.execute(order(Action::Buy, 10, 150.0)).unwrap();
        assert_eq!(trade.status, "EXECUTED");
        assert_eq!(bot.cash, 98_500.0);
        assert_eq!(bot.positions["AAPL"], 10);

        let trade = bot.execute(order(Action::Sell, 4, 200.0)).unwrap();
        assert_eq!(trade.status, "EXECUTED");
        assert_eq!(bot.cash, 99_300.0);
        assert_eq!(bot.positions["AAPL"], 6);

        bot.execute(order(Action::Sell, 6, 100.0)).unwrap();
        assert!(!bot.positions.contains_key("AAPL"));
        assert_eq!(bot.history().len(), 3);
    }

    #[test]
    fn test_failed_trades_are_recorded_without_effect() {
        let mut bot = bot();
        let trade = bot.execute(order(Action::Buy, 1000, 150.0)).unwrap();
        assert_eq!(trade.status, "FAILED - Insufficient funds");
        let trade = bot.execute(order(Action::Sell, 1, 150.0)).unwrap();
        assert_eq!(trade.status, "FAILED - Insufficient shares");

        assert_eq!(bot.cash, INITIAL_CASH);
        assert!(bot.positions.is_empty());
        assert_eq!(bot.history().len(), 2);
    }

    #[test]
    fn test_buy_beyond_position_limit_is_rejected() {
        let mut bot = bot();
        let trade = bot.execute(order(Action::Buy, 4_000_000_000, 1e-6)).unwrap();
        assert_eq!(trade.status, "EXECUTED");
        let cash = bot.cash;

        let err = bot.execute(order(Action::Buy, 4_000_000_000, 1e-6)).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(bot.cash, cash);
        assert_eq!(bot.positions["AAPL"], 4_000_000_000);
        assert_eq!(bot.history().len(), 1);
    }

    #[test]
    fn test_empty_portfolio_has_zero_return() {
        let status = bot().portfolio();
        assert_eq!(status.total_value, INITIAL_CASH);
        assert_eq!(status.total_return, 0.0);
        assert_eq!(status.return_percent, 0.0);
    }

    #[test]
    fn test_prediction_direction_matches_prices() {
        let mut bot = bot();
        for _ in 0..50 {
            let p = bot.predict("MSFT", default_strategy());
            let expected = if p.predicted_price > p.current_price {
                Action::Buy
            } else {
                Action::Sell
            };
            assert_eq!(p.direction, expected);
        }
    }

    #[test]
    fn test_backtest_shape() {
        let mut bot = bot();
        let report = bot.backtest(StrategyRequest {
            symbol: "TSLA".to_string(),
            strategy: default_strategy(),
            days: 10,
        });
        assert!((5..=15).contains(&report.total_trades));
        assert_eq!(report.trades.len(), report.total_trades);
        assert_eq!(report.period_days, 10);
    }

    #[tokio::test]
    async fn test_trade_routes() {
        let app = test_app(&TradingBotService);
        let (status, body) = testing::post(
            &app,
            "/api/trade",
            json!({"symbol": "NVDA", "action": "BUY", "quantity": 2, "price": 500.0}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["trade"]["status"], "EXECUTED");

        let (status, _) =
            testing::post(&app, "/api/trade", json!({"action": "HOLD"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = testing::get(&app, "/api/portfolio").await;
        assert_eq!(body["portfolio"]["cash"], 99_000.0);
        assert_eq!(body["portfolio"]["positions"]["NVDA"], 2);

        let (_, body) = testing::get(&app, "/api/market-data/msft").await;
        assert_eq!(body["data"]["symbol"], "MSFT");
    }
}
