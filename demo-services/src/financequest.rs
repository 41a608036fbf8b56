//! FinanceQuest: a personal finance RPG.
//!
//! Players start with coins and debt, move coins into savings, pay down
//! debt and buy market assets. Quests check the player's state against a
//! single requirement and pay out coins, xp and knowledge.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use demo_core::{
    banner, mock, shared, ApiError, ApiResult, DemoService, Payload, Route, ServiceDescriptor,
    Shared,
};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

pub const DESCRIPTOR: ServiceDescriptor = ServiceDescriptor {
    name: "financequest",
    title: "FinanceQuest",
    tagline: "The Ultimate Finance Learning Adventure",
    version: "1.0.0",
    default_port: 8013,
    features: &[
        "RPG-style finance learning",
        "Interactive quest system",
        "Real market simulation",
        "Achievement system",
        "Multiplayer leaderboards",
    ],
    routes: &[
        Route::new("POST", "/api/create-player", "Create a player"),
        Route::new("GET", "/api/player/:id", "Fetch a player"),
        Route::new("GET", "/api/market", "Advance and show the market"),
        Route::new("POST", "/api/buy", "Buy a stock or crypto asset"),
        Route::new("POST", "/api/save", "Move coins into savings"),
        Route::new("POST", "/api/pay-debt", "Pay down debt"),
        Route::new("GET", "/api/quests", "Quests by realm"),
        Route::new("POST", "/api/complete-quest", "Claim a quest"),
        Route::new("GET", "/api/leaderboard", "Top ten players by xp"),
        Route::new("GET", "/api/game-stats", "Game-wide statistics"),
        Route::new("GET", "/api/achievements", "Achievement catalogue"),
    ],
};

pub const STARTING_COINS: f64 = 1_000.0;
pub const STARTING_DEBT: f64 = 2_000.0;
const XP_PER_LEVEL: u32 = 200;
const LEVEL_BONUS: f64 = 100.0;
const KNOWLEDGE_PER_QUEST: u32 = 50;
const LEADERBOARD_SIZE: usize = 10;
const STOCK_VOLATILITY: f64 = 0.05;
const CRYPTO_VOLATILITY: f64 = 0.08;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Stock,
    Crypto,
    Bond,
}

#[derive(Debug, Clone, Serialize)]
pub struct Asset {
    pub symbol: &'static str,
    pub name: &'static str,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
    #[serde(rename = "yield", skip_serializing_if = "Option::is_none")]
    pub yield_rate: Option<f64>,
}

impl Asset {
    const fn traded(symbol: &'static str, name: &'static str, price: f64, change: f64) -> Self {
        Self {
            symbol,
            name,
            price,
            change: Some(change),
            yield_rate: None,
        }
    }

    const fn bond(symbol: &'static str, name: &'static str, price: f64, yield_rate: f64) -> Self {
        Self {
            symbol,
            name,
            price,
            change: None,
            yield_rate: Some(yield_rate),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Market {
    pub stocks: Vec<Asset>,
    pub crypto: Vec<Asset>,
    pub bonds: Vec<Asset>,
}

impl Market {
    fn initial() -> Self {
        Self {
            stocks: vec![
                Asset::traded("AAPL", "Apple Inc.", 175.50, 2.30),
                Asset::traded("GOOGL", "Google", 2850.75, -15.25),
                Asset::traded("MSFT", "Microsoft", 340.20, 5.80),
                Asset::traded("TSLA", "Tesla", 245.90, -8.40),
                Asset::traded("NVDA", "NVIDIA", 420.15, 12.60),
            ],
            crypto: vec![
                Asset::traded("BTC", "Bitcoin", 43250.00, 1250.00),
                Asset::traded("ETH", "Ethereum", 2650.50, -85.25),
            ],
            bonds: vec![
                Asset::bond("US10Y", "10-Year Treasury", 98.50, 4.25),
                Asset::bond("US30Y", "30-Year Treasury", 95.20, 4.50),
            ],
        }
    }

    fn assets(&self, asset_type: AssetType) -> &[Asset] {
        match asset_type {
            AssetType::Stock => &self.stocks,
            AssetType::Crypto => &self.crypto,
            AssetType::Bond => &self.bonds,
        }
    }

    fn find(&self, asset_type: AssetType, symbol: &str) -> Option<&Asset> {
        self.assets(asset_type).iter().find(|a| a.symbol == symbol)
    }

    fn price_of(&self, symbol: &str) -> Option<f64> {
        self.stocks
            .iter()
            .chain(&self.crypto)
            .find(|a| a.symbol == symbol)
            .map(|a| a.price)
    }
}

/// What a quest checks on the player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// Savings of at least this many coins.
    Savings(f64),
    /// Minimum savings share of savings plus debt.
    BudgetBalance(f64),
    /// Distinct stocks held.
    StocksOwned(usize),
    /// Distinct assets held.
    PortfolioDiversity(usize),
    /// Debt paid off since the start.
    DebtReduced(f64),
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Reward {
    pub coins: f64,
    pub xp: u32,
    pub knowledge: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Quest {
    pub id: &'static str,
    #[serde(skip)]
    pub realm: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub difficulty: &'static str,
    pub reward: Reward,
    pub requirement: Requirement,
}

pub static QUESTS: [Quest; 5] = [
    Quest {
        id: "emergency_fund_quest",
        realm: "savings_kingdom",
        name: "Build Your Emergency Castle",
        description: "Save $1000 to build your first emergency fund castle!",
        difficulty: "Beginner",
        reward: Reward {
            coins: 500.0,
            xp: 100,
            knowledge: "Emergency Fund Basics",
        },
        requirement: Requirement::Savings(1000.0),
    },
    Quest {
        id: "budget_master_quest",
        realm: "savings_kingdom",
        name: "Master the Budget Scroll",
        description: "Create a balanced budget with 50/30/20 rule",
        difficulty: "Beginner",
        reward: Reward {
            coins: 300.0,
            xp: 75,
            knowledge: "Budgeting Principles",
        },
        requirement: Requirement::BudgetBalance(0.8),
    },
    Quest {
        id: "first_investment",
        realm: "investment_valley",
        name: "Your First Stock Adventure",
        description: "Buy your first stock and learn about market basics",
        difficulty: "Intermediate",
        reward: Reward {
            coins: 800.0,
            xp: 150,
            knowledge: "Stock Market Basics",
        },
        requirement: Requirement::StocksOwned(1),
    },
    Quest {
        id: "portfolio_diversity",
        realm: "investment_valley",
        name: "Diversify Your Treasure",
        description: "Build a diversified portfolio with 3 different assets",
        difficulty: "Intermediate",
        reward: Reward {
            coins: 1200.0,
            xp: 200,
            knowledge: "Portfolio Diversification",
        },
        requirement: Requirement::PortfolioDiversity(3),
    },
    Quest {
        id: "credit_card_dragon",
        realm: "debt_dungeon",
        name: "Slay the Credit Card Dragon",
        description: "Pay off $500 in credit card debt",
        difficulty: "Intermediate",
        reward: Reward {
            coins: 1000.0,
            xp: 180,
            knowledge: "Debt Management",
        },
        requirement: Requirement::DebtReduced(500.0),
    },
];

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub reward: f64,
}

pub static ACHIEVEMENTS: [Achievement; 5] = [
    Achievement {
        id: "first_save",
        name: "First Saver",
        description: "Save your first $100",
        reward: 100.0,
    },
    Achievement {
        id: "emergency_hero",
        name: "Emergency Fund Hero",
        description: "Build a 6-month emergency fund",
        reward: 500.0,
    },
    Achievement {
        id: "investment_novice",
        name: "Investment Novice",
        description: "Make your first investment",
        reward: 300.0,
    },
    Achievement {
        id: "portfolio_master",
        name: "Portfolio Master",
        description: "Build a diversified portfolio",
        reward: 800.0,
    },
    Achievement {
        id: "debt_free",
        name: "Debt Free Champion",
        description: "Eliminate all debt",
        reward: 1000.0,
    },
];

#[derive(Debug, Clone, Serialize)]
pub struct Holding {
    pub asset_type: AssetType,
    pub quantity: u32,
    pub avg_price: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerStats {
    pub financial_literacy: u32,
    pub risk_tolerance: u32,
    pub investment_skill: u32,
    pub saving_habit: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    #[serde(rename = "class")]
    pub class_type: String,
    pub level: u32,
    pub xp: u32,
    pub coins: f64,
    pub savings: f64,
    pub investments: BTreeMap<String, Holding>,
    pub debt: f64,
    pub portfolio_value: f64,
    pub knowledge_points: u32,
    pub completed_quests: Vec<String>,
    pub achievements: Vec<String>,
    pub current_realm: String,
    pub created_at: DateTime<Utc>,
    pub stats: PlayerStats,
}

impl Player {
    fn distinct_holdings(&self, asset_type: Option<AssetType>) -> usize {
        self.investments
            .values()
            .filter(|h| h.quantity > 0 && asset_type.map_or(true, |t| h.asset_type == t))
            .count()
    }

    pub fn meets(&self, requirement: Requirement) -> bool {
        match requirement {
            Requirement::Savings(min) => self.savings >= min,
            Requirement::BudgetBalance(ratio) => {
                let total = self.savings + self.debt;
                total > 0.0 && self.savings / total >= ratio
            }
            Requirement::StocksOwned(n) => self.distinct_holdings(Some(AssetType::Stock)) >= n,
            Requirement::PortfolioDiversity(n) => self.distinct_holdings(None) >= n,
            Requirement::DebtReduced(amount) => STARTING_DEBT - self.debt >= amount,
        }
    }

    fn qualifies_for(&self, achievement: &str) -> bool {
        match achievement {
            "first_save" => self.savings >= 100.0,
            "emergency_hero" => self.savings >= 6_000.0,
            "investment_novice" => self.distinct_holdings(None) >= 1,
            "portfolio_master" => self.distinct_holdings(None) >= 3,
            "debt_free" => self.debt <= 0.0,
            _ => false,
        }
    }
}

fn default_name() -> String {
    "Anonymous Player".to_string()
}

fn default_class() -> String {
    "Financial Novice".to_string()
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct CreatePlayerRequest {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(rename = "class", default = "default_class")]
    pub class_type: String,
}

#[derive(Debug, Deserialize)]
pub struct BuyRequest {
    pub player_id: String,
    pub asset_type: AssetType,
    pub symbol: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub player_id: String,
    pub amount: f64,
}

#[derive(Debug, Deserialize)]
pub struct QuestRequest {
    pub player_id: String,
    pub quest_id: String,
}

#[derive(Debug, Deserialize)]
pub struct QuestsQuery {
    pub player_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Transaction {
    pub asset: String,
    pub quantity: u32,
    pub price: f64,
    pub total_cost: f64,
}

#[derive(Debug, Serialize)]
pub struct QuestCompletion {
    pub message: String,
    pub rewards: Reward,
    pub level_up: bool,
    pub level: u32,
    pub achievements_unlocked: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct GameStats {
    pub total_players: usize,
    pub total_quests_completed: usize,
    pub total_coins_in_circulation: f64,
    pub average_level: f64,
    pub active_realms: usize,
}

fn validate_amount(amount: f64) -> ApiResult<f64> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(ApiError::bad_request("Amount must be positive"))
    }
}

pub struct FinanceQuest {
    rng: StdRng,
    players: Vec<Player>,
    market: Market,
}

impl FinanceQuest {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng,
            players: Vec::new(),
            market: Market::initial(),
        }
    }

    pub fn create_player(&mut self, request: CreatePlayerRequest) -> Player {
        let player = Player {
            id: format!("player_{}", self.players.len() + 1),
            name: request.name,
            class_type: request.class_type,
            level: 1,
            xp: 0,
            coins: STARTING_COINS,
            savings: 0.0,
            investments: BTreeMap::new(),
            debt: STARTING_DEBT,
            portfolio_value: 0.0,
            knowledge_points: 0,
            completed_quests: Vec::new(),
            achievements: Vec::new(),
            current_realm: QUESTS[0].realm.to_string(),
            created_at: mock::now(),
            stats: PlayerStats {
                financial_literacy: 10,
                risk_tolerance: 5,
                investment_skill: 5,
                saving_habit: 5,
            },
        };
        log::info!("New player {} ({})", player.id, player.name);
        self.players.push(player.clone());
        player
    }

    pub fn player(&self, id: &str) -> ApiResult<&Player> {
        self.players
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ApiError::not_found("Player not found"))
    }

    /// One random-walk step for every traded asset, then revalue portfolios.
    pub fn advance_market(&mut self) -> &Market {
        let rng = &mut self.rng;
        let steps = self
            .market
            .stocks
            .iter_mut()
            .map(|a| (a, STOCK_VOLATILITY))
            .chain(self.market.crypto.iter_mut().map(|a| (a, CRYPTO_VOLATILITY)));
        for (asset, volatility) in steps {
            let change = asset.price * mock::uniform(rng, -volatility, volatility);
            asset.price = mock::round_to((asset.price + change).max(1.0), 2);
            asset.change = Some(mock::round_to(change, 2));
        }
        for i in 0..self.players.len() {
            self.revalue(i);
        }
        &self.market
    }

    fn revalue(&mut self, index: usize) {
        let market = &self.market;
        let player = &mut self.players[index];
        player.portfolio_value = mock::round_to(
            player
                .investments
                .iter()
                .map(|(symbol, h)| f64::from(h.quantity) * market.price_of(symbol).unwrap_or(0.0))
                .sum(),
            2,
        );
    }

    fn index_of(&self, id: &str) -> ApiResult<usize> {
        self.players
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| ApiError::not_found("Player not found"))
    }

    pub fn buy(&mut self, request: BuyRequest) -> ApiResult<Transaction> {
        let index = self.index_of(&request.player_id)?;
        if request.asset_type == AssetType::Bond {
            return Err(ApiError::bad_request("Only stocks and crypto can be bought"));
        }
        if request.quantity == 0 {
            return Err(ApiError::bad_request("Quantity must be positive"));
        }
        let symbol = request.symbol.to_uppercase();
        let price = self
            .market
            .find(request.asset_type, &symbol)
            .map(|a| a.price)
            .ok_or_else(|| ApiError::not_found("Asset not found"))?;
        let total_cost = price * f64::from(request.quantity);

        let player = &mut self.players[index];
        if player.coins < total_cost {
            return Err(ApiError::bad_request("Insufficient coins"));
        }
        player.coins -= total_cost;
        let holding = player.investments.entry(symbol.clone()).or_insert(Holding {
            asset_type: request.asset_type,
            quantity: 0,
            avg_price: 0.0,
        });
        let new_quantity = holding.quantity + request.quantity;
        holding.avg_price = (f64::from(holding.quantity) * holding.avg_price + total_cost)
            / f64::from(new_quantity);
        holding.quantity = new_quantity;
        self.revalue(index);
        self.unlock_achievements(index);

        Ok(Transaction {
            asset: symbol,
            quantity: request.quantity,
            price,
            total_cost: mock::round_to(total_cost, 2),
        })
    }

    pub fn save(&mut self, player_id: &str, amount: f64) -> ApiResult<Player> {
        let amount = validate_amount(amount)?;
        let index = self.index_of(player_id)?;
        let player = &mut self.players[index];
        if player.coins < amount {
            return Err(ApiError::bad_request("Insufficient coins"));
        }
        player.coins -= amount;
        player.savings += amount;
        self.unlock_achievements(index);
        Ok(self.players[index].clone())
    }

    /// Pays at most the outstanding debt.
    pub fn pay_debt(&mut self, player_id: &str, amount: f64) -> ApiResult<Player> {
        let amount = validate_amount(amount)?;
        let index = self.index_of(player_id)?;
        let player = &mut self.players[index];
        if player.debt <= 0.0 {
            return Err(ApiError::conflict("No debt left to pay"));
        }
        let paid = amount.min(player.debt);
        if player.coins < paid {
            return Err(ApiError::bad_request("Insufficient coins"));
        }
        player.coins -= paid;
        player.debt -= paid;
        self.unlock_achievements(index);
        Ok(self.players[index].clone())
    }

    pub fn complete_quest(&mut self, player_id: &str, quest_id: &str) -> ApiResult<QuestCompletion> {
        let index = self.index_of(player_id)?;
        let quest = QUESTS
            .iter()
            .find(|q| q.id == quest_id)
            .ok_or_else(|| ApiError::not_found("Quest not found"))?;

        let player = &mut self.players[index];
        if player.completed_quests.iter().any(|q| q == quest.id) {
            return Err(ApiError::conflict("Quest already completed"));
        }
        if !player.meets(quest.requirement) {
            return Err(ApiError::bad_request("Quest requirements not met"));
        }

        player.completed_quests.push(quest.id.to_string());
        player.coins += quest.reward.coins;
        player.xp += quest.reward.xp;
        player.knowledge_points += KNOWLEDGE_PER_QUEST;
        player.stats.financial_literacy += 1;
        player.current_realm = quest.realm.to_string();

        let new_level = player.xp / XP_PER_LEVEL + 1;
        let level_up = new_level > player.level;
        if level_up {
            player.level = new_level;
            player.coins += LEVEL_BONUS * f64::from(new_level);
        }
        let level = player.level;
        let unlocked = self.unlock_achievements(index);

        Ok(QuestCompletion {
            message: format!("Quest '{}' completed!", quest.name),
            rewards: quest.reward,
            level_up,
            level,
            achievements_unlocked: unlocked,
        })
    }

    /// Grants every achievement the player newly qualifies for.
    fn unlock_achievements(&mut self, index: usize) -> Vec<&'static str> {
        let player = &mut self.players[index];
        let mut unlocked = Vec::new();
        for achievement in &ACHIEVEMENTS {
            if player.achievements.iter().any(|a| a == achievement.id)
                || !player.qualifies_for(achievement.id)
            {
                continue;
            }
            player.achievements.push(achievement.id.to_string());
            player.coins += achievement.reward;
            unlocked.push(achievement.id);
        }
        unlocked
    }

    /// Quests grouped by realm, with per-player completion when asked.
    pub fn quests(&self, player_id: Option<&str>) -> ApiResult<BTreeMap<&'static str, Vec<Value>>> {
        let completed: BTreeSet<&str> = match player_id {
            Some(id) => self
                .player(id)?
                .completed_quests
                .iter()
                .map(String::as_str)
                .collect(),
            None => BTreeSet::new(),
        };
        let mut realms: BTreeMap<&'static str, Vec<Value>> = BTreeMap::new();
        for quest in &QUESTS {
            let mut value = serde_json::to_value(quest)?;
            if let Some(obj) = value.as_object_mut() {
                obj.insert("completed".to_string(), json!(completed.contains(quest.id)));
            }
            realms.entry(quest.realm).or_default().push(value);
        }
        Ok(realms)
    }

    pub fn leaderboard(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.iter().collect();
        players.sort_by(|a, b| b.xp.cmp(&a.xp));
        players.truncate(LEADERBOARD_SIZE);
        players
    }

    pub fn stats(&self) -> GameStats {
        let levels: Vec<f64> = self.players.iter().map(|p| f64::from(p.level)).collect();
        let realms: BTreeSet<&str> = QUESTS.iter().map(|q| q.realm).collect();
        GameStats {
            total_players: self.players.len(),
            total_quests_completed: self.players.iter().map(|p| p.completed_quests.len()).sum(),
            total_coins_in_circulation: mock::round_to(self.players.iter().map(|p| p.coins).sum(), 2),
            average_level: mock::round_to(mock::mean(&levels).unwrap_or_default(), 2),
            active_realms: realms.len(),
        }
    }
}

pub struct FinanceQuestService;

impl DemoService for FinanceQuestService {
    fn descriptor(&self) -> &'static ServiceDescriptor {
        &DESCRIPTOR
    }

    fn router(&self, rng: StdRng) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/api/create-player", post(create_player))
            .route("/api/player/:id", get(player))
            .route("/api/market", get(market))
            .route("/api/buy", post(buy))
            .route("/api/save", post(save))
            .route("/api/pay-debt", post(pay_debt))
            .route("/api/quests", get(quests))
            .route("/api/complete-quest", post(complete_quest))
            .route("/api/leaderboard", get(leaderboard))
            .route("/api/game-stats", get(game_stats))
            .route("/api/achievements", get(achievements))
            .with_state(shared(FinanceQuest::new(rng)))
    }
}

async fn root() -> Json<Value> {
    Json(banner(&DESCRIPTOR))
}

async fn create_player(
    State(game): State<Shared<FinanceQuest>>,
    Payload(request): Payload<CreatePlayerRequest>,
) -> Json<Value> {
    let player = game.lock().await.create_player(request);
    Json(json!({"success": true, "player": player}))
}

async fn player(
    State(game): State<Shared<FinanceQuest>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let game = game.lock().await;
    let player = game.player(&id)?;
    Ok(Json(json!({"success": true, "player": player})))
}

async fn market(State(game): State<Shared<FinanceQuest>>) -> Json<Value> {
    let mut game = game.lock().await;
    let market = game.advance_market();
    Json(json!({"success": true, "market": market}))
}

async fn buy(
    State(game): State<Shared<FinanceQuest>>,
    Payload(request): Payload<BuyRequest>,
) -> ApiResult<Json<Value>> {
    let transaction = game.lock().await.buy(request)?;
    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Successfully bought {} {} for {:.2} coins",
            transaction.quantity, transaction.asset, transaction.total_cost
        ),
        "transaction": transaction,
    })))
}

async fn save(
    State(game): State<Shared<FinanceQuest>>,
    Payload(request): Payload<AmountRequest>,
) -> ApiResult<Json<Value>> {
    let player = game.lock().await.save(&request.player_id, request.amount)?;
    Ok(Json(json!({"success": true, "player": player})))
}

async fn pay_debt(
    State(game): State<Shared<FinanceQuest>>,
    Payload(request): Payload<AmountRequest>,
) -> ApiResult<Json<Value>> {
    let player = game.lock().await.pay_debt(&request.player_id, request.amount)?;
    Ok(Json(json!({"success": true, "player": player})))
}

async fn quests(
    State(game): State<Shared<FinanceQuest>>,
    query: Result<Query<QuestsQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let quests = game.lock().await.quests(query.player_id.as_deref())?;
    Ok(Json(json!({"success": true, "quests": quests})))
}

async fn complete_quest(
    State(game): State<Shared<FinanceQuest>>,
    Payload(request): Payload<QuestRequest>,
) -> ApiResult<Json<Value>> {
    let completion = game
        .lock()
        .await
        .complete_quest(&request.player_id, &request.quest_id)?;
    let mut body = serde_json::to_value(completion)?;
    if let Some(obj) = body.as_object_mut() {
        obj.insert("success".to_string(), json!(true));
    }
    Ok(Json(body))
}

async fn leaderboard(State(game): State<Shared<FinanceQuest>>) -> Json<Value> {
    let game = game.lock().await;
    Json(json!({"success": true, "leaderboard": game.leaderboard()}))
}

async fn game_stats(State(game): State<Shared<FinanceQuest>>) -> Json<Value> {
    let stats = game.lock().await.stats();
    Json(json!({"success": true, "stats": stats}))
}

async fn achievements() -> Json<Value> {
    Json(json!({"success": true, "achievements": ACHIEVEMENTS}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_app;
    use axum::http::StatusCode;
    use demo_core::testing;

    fn game_with_player() -> (FinanceQuest, String) {
        let mut game = FinanceQuest::new(mock::seeded(Some(13)));
        let player = game.create_player(CreatePlayerRequest {
            name: "Ada".to_string(),
            class_type: default_class(),
        });
        (game, player.id)
    }

    fn buy(symbol: &str, asset_type: AssetType, player_id: &str) -> BuyRequest {
        BuyRequest {
            player_id: player_id.to_string(),
            asset_type,
            symbol: symbol.to_string(),
            quantity: 1,
        }
    }

    #[test]
    fn test_new_player_defaults() {
        let (game, id) = game_with_player();
        assert_eq!(id, "player_1");
        let player = game.player(&id).unwrap();
        assert_eq!(player.coins, STARTING_COINS);
        assert_eq!(player.debt, STARTING_DEBT);
        assert_eq!(player.level, 1);
    }

    #[test]
    fn test_buy_tracks_average_price() {
        let (mut game, id) = game_with_player();
        let first = game.buy(buy("aapl", AssetType::Stock, &id)).unwrap();
        assert_eq!(first.price, 175.50);
        game.market.stocks[0].price = 180.0;
        game.buy(buy("AAPL", AssetType::Stock, &id)).unwrap();

        let player = game.player(&id).unwrap();
        let holding = &player.investments["AAPL"];
        assert_eq!(holding.quantity, 2);
        assert!((holding.avg_price - 177.75).abs() < 1e-9);
        assert_eq!(player.portfolio_value, 360.0);
        assert!(player.achievements.contains(&"investment_novice".to_string()));
    }

    #[test]
    fn test_buy_rejections() {
        let (mut game, id) = game_with_player();
        assert!(matches!(
            game.buy(buy("US10Y", AssetType::Bond, &id)),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            game.buy(buy("DOGE", AssetType::Crypto, &id)),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            game.buy(buy("BTC", AssetType::Crypto, &id)),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            game.buy(buy("AAPL", AssetType::Stock, "player_9")),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_requirements() {
        let (mut game, _) = game_with_player();
        let player = &mut game.players[0];
        assert!(!player.meets(Requirement::Savings(1000.0)));
        assert!(!player.meets(Requirement::BudgetBalance(0.8)));
        player.savings = 8000.0;
        assert!(player.meets(Requirement::Savings(1000.0)));
        assert!(player.meets(Requirement::BudgetBalance(0.8)));
        player.debt = 1500.0;
        assert!(player.meets(Requirement::DebtReduced(500.0)));
        assert!(!player.meets(Requirement::DebtReduced(600.0)));
    }

    #[test]
    fn test_quest_completion_levels_up_once() {
        let (mut game, id) = game_with_player();
        game.save(&id, 1000.0).unwrap();
        let coins_before = game.player(&id).unwrap().coins;

        let done = game.complete_quest(&id, "emergency_fund_quest").unwrap();
        assert!(!done.level_up);
        let player = game.player(&id).unwrap();
        assert_eq!(player.xp, 100);
        assert_eq!(player.knowledge_points, 50);
        assert_eq!(player.coins, coins_before + 500.0);

        let err = game.complete_quest(&id, "emergency_fund_quest").unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let err = game.complete_quest(&id, "portfolio_diversity").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        game.pay_debt(&id, 500.0).unwrap();
        let coins_before = game.player(&id).unwrap().coins;
        let done = game.complete_quest(&id, "credit_card_dragon").unwrap();
        assert!(done.level_up);
        assert_eq!(done.level, 2);
        let player = game.player(&id).unwrap();
        assert_eq!(player.xp, 280);
        assert_eq!(player.coins, coins_before + 1000.0 + 200.0);
    }

    #[test]
    fn test_completion_is_per_player() {
        let (mut game, first) = game_with_player();
        let second = game
            .create_player(CreatePlayerRequest {
                name: "Grace".to_string(),
                class_type: default_class(),
            })
            .id;
        game.save(&first, 1000.0).unwrap();
        game.complete_quest(&first, "emergency_fund_quest").unwrap();

        let quests = game.quests(Some(&second)).unwrap();
        assert_eq!(quests["savings_kingdom"][0]["completed"], false);
        let quests = game.quests(Some(&first)).unwrap();
        assert_eq!(quests["savings_kingdom"][0]["completed"], true);
        assert_eq!(quests.len(), 3);
    }

    #[test]
    fn test_pay_debt_caps_at_outstanding() {
        let (mut game, id) = game_with_player();
        game.players[0].coins = 5000.0;
        let player = game.pay_debt(&id, 3000.0).unwrap();
        assert_eq!(player.debt, 0.0);
        // 5000 - 2000 paid + 1000 debt_free achievement
        assert_eq!(player.coins, 4000.0);
        assert!(matches!(game.pay_debt(&id, 1.0), Err(ApiError::Conflict(_))));
        assert!(game.save(&id, -5.0).is_err());
    }

    #[test]
    fn test_market_moves_within_bounds() {
        let (mut game, _) = game_with_player();
        for _ in 0..20 {
            let before: Vec<f64> = game.market.stocks.iter().map(|s| s.price).collect();
            let market = game.advance_market();
            for (old, asset) in before.iter().zip(&market.stocks) {
                assert!(asset.price >= 1.0);
                assert!((asset.price - old).abs() <= old * 0.05 + 0.01);
            }
            assert_eq!(market.bonds[0].price, 98.50);
        }
    }

    #[tokio::test]
    async fn test_routes() {
        let app = test_app(&FinanceQuestService);
        let (_, body) = testing::post(&app, "/api/create-player", json!({"name": "Neo"})).await;
        assert_eq!(body["player"]["class"], "Financial Novice");
        assert_eq!(body["player"]["id"], "player_1");

        let (status, _) = testing::get(&app, "/api/player/player_2").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = testing::post(
            &app,
            "/api/buy",
            json!({"player_id": "player_1", "asset_type": "stock", "symbol": "MSFT", "quantity": 2}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["transaction"]["total_cost"], 680.4);

        let (_, body) = testing::post(
            &app,
            "/api/complete-quest",
            json!({"player_id": "player_1", "quest_id": "first_investment"}),
        )
        .await;
        assert_eq!(body["success"], true);
        assert_eq!(body["rewards"]["coins"], 800.0);

        let (_, body) = testing::get(&app, "/api/leaderboard").await;
        assert_eq!(body["leaderboard"][0]["xp"], 150);
        let (_, body) = testing::get(&app, "/api/game-stats").await;
        assert_eq!(body["stats"]["total_quests_completed"], 1);
        assert_eq!(body["stats"]["active_realms"], 3);

        let (status, body) =
            testing::get(&app, "/api/quests?player_id=player_1&player_id=player_2").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }
}
