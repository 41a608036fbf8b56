//! NeuroTrade AI: per-symbol BUY/SELL/HOLD signals and a cash portfolio
//! trading against a fixed market snapshot.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use demo_core::{
    banner_with, mock, shared, ApiError, ApiResult, DemoService, Payload, Route,
    ServiceDescriptor, Shared,
};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const DESCRIPTOR: ServiceDescriptor = ServiceDescriptor {
    name: "neurotrade",
    title: "NeuroTrade AI",
    tagline: "Neural Network Trading System",
    version: "1.0.0",
    default_port: 8001,
    features: &[
        "Neural trading signals",
        "Batch predictions",
        "Market and limit orders",
        "Portfolio risk metrics",
    ],
    routes: &[
        Route::new("GET", "/api/signals", "Signals for every symbol"),
        Route::new("GET", "/api/signals/:symbol", "Signal for one symbol"),
        Route::new("POST", "/api/predict-batch", "Signals for a list of symbols"),
        Route::new("POST", "/api/trade", "Execute a market or limit order"),
        Route::new("GET", "/api/portfolio", "Portfolio performance"),
        Route::new("GET", "/api/market-data", "Market snapshot"),
        Route::new("GET", "/api/trading-history", "The 20 most recent trades"),
    ],
};

pub const INITIAL_CASH: f64 = 100_000.0;
const WINDOW: usize = 60;
const RECENT_TRADES: usize = 20;
const TRADING_DAYS: f64 = 252.0;

pub const SYMBOLS: [(&str, f64); 6] = [
    ("AAPL", 150.0),
    ("GOOGL", 2_800.0),
    ("MSFT", 300.0),
    ("TSLA", 800.0),
    ("BTC", 45_000.0),
    ("ETH", 3_000.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    #[default]
    Market,
    Limit,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketQuote {
    pub price: f64,
    pub volume: u64,
    pub change: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkOutput {
    pub buy_probability: f64,
    pub sell_probability: f64,
    pub hold_probability: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradingSignal {
    pub symbol: String,
    pub action: SignalAction,
    pub confidence: f64,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub neural_network_output: NetworkOutput,
}

#[derive(Debug, Deserialize)]
pub struct TradeOrder {
    pub symbol: String,
    pub action: OrderSide,
    pub quantity: u32,
    /// Required for limit orders.
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub order_type: OrderType,
}

/// `["AAPL", "TSLA"]` or `{"symbols": ["AAPL", "TSLA"]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BatchRequest {
    List(Vec<String>),
    Wrapped {
        #[serde(default)]
        symbols: Vec<String>,
    },
}

impl BatchRequest {
    fn into_symbols(self) -> Vec<String> {
        match self {
            BatchRequest::List(symbols) | BatchRequest::Wrapped { symbols } => symbols,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeRecord {
    pub trade_id: String,
    pub symbol: String,
    pub action: OrderSide,
    pub quantity: u32,
    pub price: f64,
    pub total_value: f64,
    pub timestamp: DateTime<Utc>,
    pub order_type: OrderType,
}

#[derive(Debug, Serialize)]
pub struct PortfolioPerformance {
    pub total_value: f64,
    pub cash: f64,
    pub total_return: f64,
    pub pnl: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub positions: BTreeMap<String, u32>,
    pub total_trades: usize,
}

/// Momentum over the window, in percent, decides the scores: positive
/// momentum favours BUY, negative favours SELL, and a flat window favours
/// HOLD. The scores are turned into probabilities with a softmax.
pub fn classify_window(closes: &[f64]) -> (SignalAction, NetworkOutput) {
    let momentum = match (closes.first(), closes.last()) {
        (Some(first), Some(last)) if *first > 0.0 => (last - first) / first * 100.0,
        _ => 0.0,
    };
    let scores = [momentum, -momentum, 1.0 - momentum.abs()];
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    let probs: Vec<f64> = exps.iter().map(|e| e / sum).collect();

    let actions = [SignalAction::Buy, SignalAction::Sell, SignalAction::Hold];
    let best = probs
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(2);

    (
        actions[best],
        NetworkOutput {
            buy_probability: mock::round_to(probs[0], 4),
            sell_probability: mock::round_to(probs[1], 4),
            hold_probability: mock::round_to(probs[2], 4),
        },
    )
}

pub struct NeuroTrade {
    rng: StdRng,
    market: BTreeMap<String, MarketQuote>,
    cash: f64,
    positions: BTreeMap<String, u32>,
    history: Vec<TradeRecord>,
}

impl NeuroTrade {
    pub fn new(mut rng: StdRng) -> Self {
        let market = SYMBOLS
            .iter()
            .map(|(symbol, base)| {
                let quote = MarketQuote {
                    price: mock::round_to(base * (1.0 + mock::uniform(&mut rng, -0.04, 0.04)), 2),
                    volume: rng.gen_range(1_000_000..=10_000_000),
                    change: mock::uniform_rounded(&mut rng, -0.04, 0.04, 4),
                    timestamp: mock::now(),
                };
                (symbol.to_string(), quote)
            })
            .collect();
        Self {
            rng,
            market,
            cash: INITIAL_CASH,
            positions: BTreeMap::new(),
            history: Vec::new(),
        }
    }

    pub fn market(&self) -> &BTreeMap<String, MarketQuote> {
        &self.market
    }

    fn price_of(&self, symbol: &str) -> ApiResult<f64> {
        self.market
            .get(symbol)
            .map(|q| q.price)
            .ok_or_else(|| ApiError::not_found(format!("No model available for {}", symbol)))
    }

    /// Synthetic recent closes around the current price.
    fn recent_window(&mut self, price: f64) -> Vec<f64> {
        let mut close = price;
        (0..WINDOW)
            .map(|_| {
                close *= 1.0 + mock::uniform(&mut self.rng, -0.01, 0.01);
                close
            })
            .collect()
    }

    pub fn signal(&mut self, symbol: &str) -> ApiResult<TradingSignal> {
        let symbol = symbol.to_uppercase();
        let price = self.price_of(&symbol)?;
        let window = self.recent_window(price);
        let (action, output) = classify_window(&window);
        let confidence = match action {
            SignalAction::Buy => output.buy_probability,
            SignalAction::Sell => output.sell_probability,
            SignalAction::Hold => output.hold_probability,
        };
        Ok(TradingSignal {
            symbol,
            action,
            confidence,
            price,
            timestamp: mock::now(),
            neural_network_output: output,
        })
    }

    /// Signals for `symbols`, skipping unknown ones.
    pub fn signals<'a>(&mut self, symbols: impl IntoIterator<Item = &'a str>) -> Vec<TradingSignal> {
        symbols
            .into_iter()
            .filter_map(|symbol| match self.signal(symbol) {
                Ok(signal) => Some(signal),
                Err(e) => {
                    log::warn!("Skipping signal for {}: {}", symbol, e);
                    None
                }
            })
            .collect()
    }

    pub fn execute(&mut self, order: TradeOrder) -> ApiResult<TradeRecord> {
        let symbol = order.symbol.to_uppercase();
        let market_price = self.price_of(&symbol)?;
        if order.quantity == 0 {
            return Err(ApiError::bad_request("Quantity must be positive"));
        }
        let price = match order.order_type {
            OrderType::Market => market_price,
            OrderType::Limit => match order.price {
                Some(p) if p.is_finite() && p > 0.0 => p,
                _ => return Err(ApiError::bad_request("Limit orders need a positive price")),
            },
        };
        let total = price * f64::from(order.quantity);

        match order.action {
            OrderSide::Buy => {
                if self.cash < total {
                    return Err(ApiError::bad_request("Insufficient cash"));
                }
                let held = self.positions.get(&symbol).copied().unwrap_or(0);
                let Some(position) = held.checked_add(order.quantity) else {
                    return Err(ApiError::bad_request("Position size limit exceeded"));
                };
                self.cash -= total;
                self.positions.insert(symbol.clone(), position);
            }
            OrderSide::Sell => {
                let held = self.positions.get(&symbol).copied().unwrap_or(0);
                if held < order.quantity {
                    return Err(ApiError::bad_request("Insufficient shares"));
                }
                self.cash += total;
                if held == order.quantity {
                    self.positions.remove(&symbol);
                } else {
                    self.positions.insert(symbol.clone(), held - order.quantity);
                }
            }
        }

        let record = TradeRecord {
            trade_id: format!("TRADE_{:06}", self.history.len() + 1),
            symbol,
            action: order.action,
            quantity: order.quantity,
            price,
            total_value: mock::round_to(total, 2),
            timestamp: mock::now(),
            order_type: order.order_type,
        };
        self.history.push(record.clone());
        Ok(record)
    }

    pub fn total_value(&self) -> f64 {
        self.cash
            + self
                .positions
                .iter()
                .filter_map(|(symbol, qty)| self.market.get(symbol).map(|q| q.price * f64::from(*qty)))
                .sum::<f64>()
    }

    pub fn performance(&mut self) -> PortfolioPerformance {
        let total_value = self.total_value();
        let pnl = total_value - INITIAL_CASH;

        let (volatility, sharpe_ratio) = if self.history.len() > 1 {
            let days = self.history.len().min(30) - 1;
            let returns: Vec<f64> = (0..days.max(2))
                .map(|_| mock::uniform(&mut self.rng, -0.033, 0.035))
                .collect();
            let sd = mock::std_dev(&returns).unwrap_or_default();
            let mean = mock::mean(&returns).unwrap_or_default();
            let annual_sd = sd * TRADING_DAYS.sqrt();
            let sharpe = if annual_sd > 0.0 {
                mean * TRADING_DAYS / annual_sd
            } else {
                0.0
            };
            (mock::round_to(annual_sd * 100.0, 2), mock::round_to(sharpe, 3))
        } else {
            (0.0, 0.0)
        };

        PortfolioPerformance {
            total_value: mock::round_to(total_value, 2),
            cash: mock::round_to(self.cash, 2),
            total_return: mock::round_to(pnl / INITIAL_CASH * 100.0, 3),
            pnl: mock::round_to(pnl, 2),
            volatility,
            sharpe_ratio,
            positions: self.positions.clone(),
            total_trades: self.history.len(),
        }
    }

    pub fn recent_trades(&self) -> &[TradeRecord] {
        let start = self.history.len().saturating_sub(RECENT_TRADES);
        &self.history[start..]
    }
}

pub struct NeuroTradeService;

impl DemoService for NeuroTradeService {
    fn descriptor(&self) -> &'static ServiceDescriptor {
        &DESCRIPTOR
    }

    fn router(&self, rng: StdRng) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/api/signals", get(all_signals))
            .route("/api/signals/:symbol", get(signal))
            .route("/api/predict-batch", post(predict_batch))
            .route("/api/trade", post(trade))
            .route("/api/portfolio", get(portfolio))
            .route("/api/market-data", get(market_data))
            .route("/api/trading-history", get(trading_history))
            .with_state(shared(NeuroTrade::new(rng)))
    }
}

async fn root() -> Json<Value> {
    Json(banner_with(&DESCRIPTOR, json!({"neural_models": SYMBOLS.len()})))
}

async fn all_signals(State(engine): State<Shared<NeuroTrade>>) -> Json<Value> {
    let signals = engine.lock().await.signals(SYMBOLS.iter().map(|(s, _)| *s));
    Json(json!({"success": true, "signals": signals}))
}

async fn signal(
    State(engine): State<Shared<NeuroTrade>>,
    Path(symbol): Path<String>,
) -> ApiResult<Json<Value>> {
    let signal = engine.lock().await.signal(&symbol)?;
    Ok(Json(json!({"success": true, "signal": signal})))
}

async fn predict_batch(
    State(engine): State<Shared<NeuroTrade>>,
    Payload(request): Payload<BatchRequest>,
) -> Json<Value> {
    let symbols = request.into_symbols();
    let predictions = engine
        .lock()
        .await
        .signals(symbols.iter().map(String::as_str));
    Json(json!({"success": true, "predictions": predictions}))
}

async fn trade(
    State(engine): State<Shared<NeuroTrade>>,
    Payload(order): Payload<TradeOrder>,
) -> ApiResult<Json<Value>> {
    let mut engine = engine.lock().await;
    let record = engine.execute(order)?;
    let portfolio = engine.performance();
    Ok(Json(json!({
        "success": true,
        "trade_record": record,
        "portfolio": portfolio,
    })))
}

async fn portfolio(State(engine): State<Shared<NeuroTrade>>) -> Json<Value> {
    let performance = engine.lock().await.performance();
    Json(json!({"success": true, "portfolio": performance}))
}

async fn market_data(State(engine): State<Shared<NeuroTrade>>) -> Json<Value> {
    let engine = engine.lock().await;
    Json(json!({"success": true, "market_data": engine.market()}))
}

async fn trading_history(State(engine): State<Shared<NeuroTrade>>) -> Json<Value> {
    let engine = engine.lock().await;
    Json(json!({"success": true, "trades": engine.recent_trades()}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_app;
    use axum::http::StatusCode;
    use demo_core::testing;

    fn engine() -> NeuroTrade {
        NeuroTrade::new(mock::seeded(Some(77)))
    }

    fn order(action: OrderSide, quantity: u32) -> TradeOrder {
        TradeOrder {
            symbol: "aapl".to_string(),
            action,
            quantity,
            price: None,
            order_type: OrderType::Market,
        }
    }

    #[test]
    fn test_classify_window() {
        let (action, output) = classify_window(&[100.0, 101.0, 103.0]);
        assert_eq!(action, SignalAction::Buy);
        assert!(output.buy_probability > output.sell_probability);

        let (action, _) = classify_window(&[100.0, 99.0, 96.0]);
        assert_eq!(action, SignalAction::Sell);

        let (action, output) = classify_window(&[100.0, 100.1, 100.0]);
        assert_eq!(action, SignalAction::Hold);
        let total = output.buy_probability + output.sell_probability + output.hold_probability;
        assert!((total - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_signal_confidence_matches_action() {
        let mut engine = engine();
        for _ in 0..20 {
            let signal = engine.signal("eth").unwrap();
            assert_eq!(signal.symbol, "ETH");
            let out = &signal.neural_network_output;
            let max = out
                .buy_probability
                .max(out.sell_probability)
                .max(out.hold_probability);
            assert_eq!(signal.confidence, max);
        }
        assert!(matches!(engine.signal("DOGE"), Err(ApiError::NotFound(_))));
        assert_eq!(engine.signals(["AAPL", "DOGE", "BTC"]).len(), 2);
    }

    #[test]
    fn test_market_orders_fill_at_market_price() {
        let mut engine = engine();
        let price = engine.market()["AAPL"].price;
        let record = engine.execute(order(OrderSide::Buy, 10)).unwrap();
        assert_eq!(record.price, price);
        assert!((engine.cash - (INITIAL_CASH - price * 10.0)).abs() < 1e-9);
        assert_eq!(engine.positions["AAPL"], 10);
        assert!((engine.total_value() - INITIAL_CASH).abs() < 1e-6);

        engine.execute(order(OrderSide::Sell, 10)).unwrap();
        assert!(engine.positions.is_empty());
        assert_eq!(engine.performance().total_trades, 2);
    }

    #[test]
    fn test_order_rejections() {
        let mut engine = engine();
        assert!(matches!(
            engine.execute(order(OrderSide::Sell, 1)),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            engine.execute(order(OrderSide::Buy, 10_000)),
            Err(ApiError::BadRequest(_))
        ));
        let mut limit = order(OrderSide::Buy, 1);
        limit.order_type = OrderType::Limit;
        assert!(engine.execute(limit).is_err());
        let mut unknown = order(OrderSide::Buy, 1);
        unknown.symbol = "DOGE".to_string();
        assert!(matches!(engine.execute(unknown), Err(ApiError::NotFound(_))));
        assert!(engine.history.is_empty());
    }

    #[test]
    fn test_limit_buy_beyond_position_limit_is_rejected() {
        let mut engine = engine();
        let big = || TradeOrder {
            price: Some(1e-6),
            order_type: OrderType::Limit,
            ..order(OrderSide::Buy, 4_000_000_000)
        };
        engine.execute(big()).unwrap();
        let cash = engine.cash;

        assert!(matches!(engine.execute(big()), Err(ApiError::BadRequest(_))));
        assert_eq!(engine.cash, cash);
        assert_eq!(engine.positions["AAPL"], 4_000_000_000);
        assert_eq!(engine.history.len(), 1);
    }

    #[tokio::test]
    async fn test_routes() {
        let app = test_app(&NeuroTradeService);
        let (_, body) = testing::get(&app, "/api/signals").await;
        assert_eq!(body["signals"].as_array().unwrap().len(), 6);

        let (status, _) = testing::get(&app, "/api/signals/DOGE").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = testing::post(&app, "/api/predict-batch", json!(["tsla", "nope"])).await;
        assert_eq!(body["predictions"].as_array().unwrap().len(), 1);
        let (_, body) =
            testing::post(&app, "/api/predict-batch", json!({"symbols": ["MSFT"]})).await;
        assert_eq!(body["predictions"][0]["symbol"], "MSFT");

        let (status, _) = testing::post(
            &app,
            "/api/trade",
            json!({"symbol": "AAPL", "action": "HODL", "quantity": 1}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = testing::post(
            &app,
            "/api/trade",
            json!({"symbol": "MSFT", "action": "BUY", "quantity": 2, "price": 250.0, "order_type": "LIMIT"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["trade_record"]["price"], 250.0);
        assert_eq!(body["portfolio"]["cash"], 99_500.0);
    }
}
