use crate::{auth::{bearer_token, AuthUser}, error::ApiError, AppState};
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use core_types::{BadgeCounts, ChallengeWave, TradePin};
use database::repository::{
    Challenge, Collection, Cosmetic, LeaderboardEntry, Trade, TradeReceipt, UserProfile,
};
use database::DbError;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SignupBody {
    pub username: String,
    pub password_hash: String,
}

/// # POST /api/signup
/// A taken username comes back as the classified 401 duplicate response.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignupBody>,
) -> Result<Json<Value>, ApiError> {
    state.repo.create_user(&body.username, &body.password_hash).await?;
    Ok(Json(json!({ "username": body.username })))
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub username: String,
    pub password_hash: String,
}

/// # POST /api/login
/// Checks the stored credentials and issues a fresh session token. An
/// unknown username and a wrong hash produce the same response, so the
/// endpoint does not reveal which accounts exist.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginBody>,
) -> Result<Json<Value>, ApiError> {
    let credentials = match state.repo.get_credentials(&body.username).await {
        Ok(credentials) => credentials,
        Err(DbError::EmptyResults(_)) => return Err(ApiError::InvalidCredentials),
        Err(db_err) => return Err(db_err.into()),
    };
    if credentials.password_hash != body.password_hash {
        return Err(ApiError::InvalidCredentials);
    }
    let token = Uuid::new_v4().to_string();
    state.repo.create_session(&body.username, &token).await?;
    Ok(Json(json!({ "token": token })))
}

/// # POST /api/logout
/// Deleting an already-deleted session is fine, so logout never 404s.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let token = bearer_token(&headers)?;
    state.repo.delete_session(token).await?;
    Ok(Json(json!({ "loggedOut": true })))
}

/// # GET /api/profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(username): AuthUser,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state.repo.get_profile(&username).await?;
    Ok(Json(profile))
}

#[derive(Debug, Deserialize)]
pub struct AvatarBody {
    pub avatar: String,
}

/// # POST /api/avatar
pub async fn set_avatar(
    State(state): State<Arc<AppState>>,
    AuthUser(username): AuthUser,
    Json(body): Json<AvatarBody>,
) -> Result<Json<Value>, ApiError> {
    state.repo.set_active_avatar(&username, &body.avatar).await?;
    Ok(Json(json!({ "avatar": body.avatar })))
}

/// # GET /api/collection
pub async fn get_collection(
    State(state): State<Arc<AppState>>,
    AuthUser(username): AuthUser,
) -> Result<Json<Collection>, ApiError> {
    let collection = state.repo.get_collection(&username).await?;
    Ok(Json(collection))
}

/// # GET /api/badges
pub async fn get_badges(
    State(state): State<Arc<AppState>>,
    AuthUser(username): AuthUser,
) -> Result<Json<BadgeCounts>, ApiError> {
    let badges = state.repo.get_badges(&username).await?;
    Ok(Json(badges))
}

/// # GET /api/trades
pub async fn list_trades(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Trade>>, ApiError> {
    let trades = state.repo.list_open_trades().await?;
    Ok(Json(trades))
}

/// # GET /api/trades/:trade_id
pub async fn get_trade(
    State(state): State<Arc<AppState>>,
    Path(trade_id): Path<u64>,
) -> Result<Json<Trade>, ApiError> {
    let trade = state.repo.get_trade(trade_id).await?;
    Ok(Json(trade))
}

#[derive(Debug, Deserialize)]
pub struct CreateTradeBody {
    pub offer: Vec<TradePin>,
    pub request: Vec<TradePin>,
    #[serde(default)]
    pub trade_credits: u32,
    #[serde(default = "default_trade_hours")]
    pub duration_hours: u32,
}

fn default_trade_hours() -> u32 {
    48
}

/// # POST /api/trades
pub async fn create_trade(
    State(state): State<Arc<AppState>>,
    AuthUser(username): AuthUser,
    Json(body): Json<CreateTradeBody>,
) -> Result<Json<Value>, ApiError> {
    let trade_id = state
        .repo
        .create_trade(
            &username,
            body.offer,
            body.request,
            body.trade_credits,
            body.duration_hours,
        )
        .await?;
    Ok(Json(json!({ "tradeId": trade_id })))
}

/// # POST /api/trades/:trade_id/accept
pub async fn accept_trade(
    State(state): State<Arc<AppState>>,
    AuthUser(username): AuthUser,
    Path(trade_id): Path<u64>,
) -> Result<Json<TradeReceipt>, ApiError> {
    let receipt = state.repo.accept_trade(trade_id, &username).await?;
    Ok(Json(receipt))
}

/// # DELETE /api/trades/:trade_id
pub async fn close_trade(
    State(state): State<Arc<AppState>>,
    AuthUser(username): AuthUser,
    Path(trade_id): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    state.repo.close_trade(trade_id, &username).await?;
    Ok(Json(json!({ "closed": trade_id })))
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub gamemode: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

/// # GET /api/leaderboard
pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let entries = state
        .repo
        .get_leaderboard(&query.gamemode, query.limit)
        .await?;
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct GameReportBody {
    pub gamemode: String,
    pub score: u32,
    pub points: u32,
    /// Pin drops earned during the game, granted after the report lands.
    #[serde(default)]
    pub pins: Vec<TradePin>,
}

/// # POST /api/games/report
pub async fn save_game_report(
    State(state): State<Arc<AppState>>,
    AuthUser(username): AuthUser,
    Json(body): Json<GameReportBody>,
) -> Result<Json<Value>, ApiError> {
    let report_id = state
        .repo
        .save_game_report(&username, &body.gamemode, body.score, body.points)
        .await?;
    if !body.pins.is_empty() {
        state.repo.add_reward_pins(&username, body.pins).await?;
    }
    Ok(Json(json!({ "reportId": report_id })))
}

/// # GET /api/challenges/:challenge_id
pub async fn get_challenge(
    State(state): State<Arc<AppState>>,
    Path(challenge_id): Path<u64>,
) -> Result<Json<Challenge>, ApiError> {
    let challenge = state.repo.get_challenge(challenge_id).await?;
    Ok(Json(challenge))
}

#[derive(Debug, Deserialize)]
pub struct CreateChallengeBody {
    pub title: String,
    pub waves: Vec<ChallengeWave>,
}

/// # POST /api/challenges
pub async fn create_challenge(
    State(state): State<Arc<AppState>>,
    AuthUser(username): AuthUser,
    Json(body): Json<CreateChallengeBody>,
) -> Result<Json<Value>, ApiError> {
    let challenge_id = state
        .repo
        .create_challenge(&username, &body.title, &body.waves)
        .await?;
    Ok(Json(json!({ "challengeId": challenge_id })))
}

/// # GET /api/shop
pub async fn list_cosmetics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Cosmetic>>, ApiError> {
    let cosmetics = state.repo.list_cosmetics().await?;
    Ok(Json(cosmetics))
}

#[derive(Debug, Deserialize)]
pub struct PurchaseBody {
    pub name: String,
}

/// # POST /api/shop/purchase
pub async fn purchase_cosmetic(
    State(state): State<Arc<AppState>>,
    AuthUser(username): AuthUser,
    Json(body): Json<PurchaseBody>,
) -> Result<Json<Value>, ApiError> {
    state.repo.purchase_cosmetic(&username, &body.name).await?;
    Ok(Json(json!({ "purchased": body.name })))
}
