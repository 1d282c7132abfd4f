//! API Routes
//!
//! Request/response DTOs and handlers. Token amounts cross the wire as
//! decimal strings so the full u128 range survives JSON. Oracle payloads
//! arrive as opaque strings and are forwarded byte-for-byte.

use crate::wager::{
    unix_nanos_now, Amount, Asset, Bet, BetId, Direction, OwnerId, PlaceError, PlacementReceipt,
    PoolError, ResolutionOutcome, ResolveError, SettlementEngine, SimOracle, SqliteStore,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Shared service state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Mutex<SettlementEngine>>,
    pub store: Option<SqliteStore>,
    /// Present only when the service runs against the simulated oracle;
    /// enables the quote-push route.
    pub sim_oracle: Option<SimOracle>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/bets", post(place_bet).get(bets_of))
        .route("/api/bets/batch", get(get_bets))
        .route("/api/bets/:id/resolve", post(resolve_bet))
        .route("/api/pool", get(pool_balances))
        .route("/api/pool/fund", post(fund_pool))
        .route("/api/pool/withdraw", post(withdraw_pool))
        .route("/api/sim/quote", post(push_sim_quote))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn err(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

fn bad_request(message: impl Into<String>) -> ApiError {
    err(StatusCode::BAD_REQUEST, message)
}

fn parse_amount(s: &str, what: &str) -> Result<Amount, ApiError> {
    s.parse::<Amount>()
        .map_err(|_| bad_request(format!("{} must be a decimal amount string", what)))
}

fn place_status(e: &PlaceError) -> StatusCode {
    match e {
        PlaceError::InvalidAsset { .. }
        | PlaceError::BetTooSmall { .. }
        | PlaceError::BetTooLarge { .. } => StatusCode::BAD_REQUEST,
        PlaceError::InsufficientHouseFunds { .. } => StatusCode::CONFLICT,
        PlaceError::OracleUpdateFailed { .. } | PlaceError::StalePrice { .. } => {
            StatusCode::BAD_GATEWAY
        }
    }
}

fn resolve_status(e: &ResolveError) -> StatusCode {
    match e {
        ResolveError::NotFound { .. } => StatusCode::NOT_FOUND,
        ResolveError::AlreadyResolved { .. } | ResolveError::WindowExpired { .. } => {
            StatusCode::CONFLICT
        }
        ResolveError::TooEarly { .. } => StatusCode::PRECONDITION_FAILED,
        ResolveError::OracleUpdateFailed { .. }
        | ResolveError::PriceOutOfWindow { .. }
        | ResolveError::ExponentMismatch { .. }
        | ResolveError::SwapFailed { .. }
        | ResolveError::SwapBelowMinimum { .. } => StatusCode::BAD_GATEWAY,
    }
}

// =============================================================================
// PLACEMENT
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct PlaceRequest {
    pub owner: String,
    pub asset: String,
    pub direction: String,
    /// Decimal string in the stable asset's smallest unit.
    pub stake: String,
    pub oracle_payload: String,
    /// Decimal string; overpayment beyond the quoted fee is refunded.
    pub fee_funds: String,
}

pub async fn place_bet(
    State(state): State<AppState>,
    Json(req): Json<PlaceRequest>,
) -> Result<Json<PlacementReceipt>, ApiError> {
    let asset = Asset::parse(&req.asset)
        .ok_or_else(|| bad_request(format!("unknown asset {:?}", req.asset)))?;
    let direction = Direction::parse(&req.direction)
        .ok_or_else(|| bad_request(format!("unknown direction {:?}", req.direction)))?;
    let stake = parse_amount(&req.stake, "stake")?;
    let fee_funds = parse_amount(&req.fee_funds, "fee_funds")?;
    let owner = OwnerId::new(req.owner);
    let now = unix_nanos_now();

    let mut engine = state.engine.lock();
    let receipt = engine
        .place(&owner, asset, direction, stake, req.oracle_payload.as_bytes(), fee_funds, now)
        .map_err(|e| err(place_status(&e), e.to_string()))?;

    if let Some(store) = &state.store {
        let balances = engine.balances();
        match engine.lookup(receipt.bet_id) {
            Ok(bet) => {
                if let Err(e) = store.record_placement(bet, balances.stable, balances.payout) {
                    warn!(bet_id = receipt.bet_id, error = %e, "failed to persist placement");
                }
            }
            Err(e) => warn!(bet_id = receipt.bet_id, error = %e, "placed bet missing from ledger"),
        }
    }

    Ok(Json(receipt))
}

// =============================================================================
// RESOLUTION
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub oracle_payload: String,
    pub fee_funds: String,
}

pub async fn resolve_bet(
    State(state): State<AppState>,
    Path(id): Path<BetId>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<ResolutionOutcome>, ApiError> {
    let fee_funds = parse_amount(&req.fee_funds, "fee_funds")?;
    let now = unix_nanos_now();

    let mut engine = state.engine.lock();
    let outcome = engine
        .resolve(id, req.oracle_payload.as_bytes(), fee_funds, now)
        .map_err(|e| err(resolve_status(&e), e.to_string()))?;

    if let Some(store) = &state.store {
        let balances = engine.balances();
        if let Err(e) = store.record_resolution(
            id,
            outcome.won,
            outcome.payout_amount,
            balances.stable,
            balances.payout,
        ) {
            warn!(bet_id = id, error = %e, "failed to persist resolution");
        }
    }

    Ok(Json(outcome))
}

// =============================================================================
// QUERY SURFACE
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct BetsOfQuery {
    pub owner: String,
}

#[derive(Debug, Serialize)]
pub struct BetsOfResponse {
    pub owner: String,
    pub bet_ids: Vec<BetId>,
}

pub async fn bets_of(
    State(state): State<AppState>,
    Query(params): Query<BetsOfQuery>,
) -> Json<BetsOfResponse> {
    let engine = state.engine.lock();
    let bet_ids = engine.bets_of(&OwnerId::new(params.owner.clone())).to_vec();
    Json(BetsOfResponse {
        owner: params.owner,
        bet_ids,
    })
}

#[derive(Debug, Deserialize)]
pub struct GetBetsQuery {
    /// Comma-separated ids. Missing ids come back as zeroed records.
    pub ids: String,
}

#[derive(Debug, Serialize)]
pub struct GetBetsResponse {
    pub bets: Vec<Bet>,
}

pub async fn get_bets(
    State(state): State<AppState>,
    Query(params): Query<GetBetsQuery>,
) -> Result<Json<GetBetsResponse>, ApiError> {
    let ids = params
        .ids
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.trim().parse::<BetId>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| bad_request("ids must be comma-separated integers"))?;
    let engine = state.engine.lock();
    Ok(Json(GetBetsResponse {
        bets: engine.get_bets(&ids),
    }))
}

// =============================================================================
// FUNDING SURFACE
// =============================================================================

#[derive(Debug, Serialize)]
pub struct PoolResponse {
    pub stable: String,
    pub payout: String,
}

pub async fn pool_balances(State(state): State<AppState>) -> Json<PoolResponse> {
    let engine = state.engine.lock();
    let balances = engine.balances();
    Json(PoolResponse {
        stable: balances.stable.to_string(),
        payout: balances.payout.to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub struct FundRequest {
    pub amount: String,
}

pub async fn fund_pool(
    State(state): State<AppState>,
    Json(req): Json<FundRequest>,
) -> Result<Json<PoolResponse>, ApiError> {
    let amount = parse_amount(&req.amount, "amount")?;
    let mut engine = state.engine.lock();
    engine.fund(amount);
    persist_pool(&state, &engine);
    let balances = engine.balances();
    Ok(Json(PoolResponse {
        stable: balances.stable.to_string(),
        payout: balances.payout.to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub caller: String,
    pub amount: String,
}

pub async fn withdraw_pool(
    State(state): State<AppState>,
    Json(req): Json<WithdrawRequest>,
) -> Result<Json<PoolResponse>, ApiError> {
    let amount = parse_amount(&req.amount, "amount")?;
    let caller = OwnerId::new(req.caller);
    let mut engine = state.engine.lock();
    engine.withdraw(&caller, amount).map_err(|e| {
        let status = match e {
            PoolError::NotAuthorized { .. } => StatusCode::FORBIDDEN,
            PoolError::InsufficientBalance { .. } | PoolError::ReserveBreached { .. } => {
                StatusCode::CONFLICT
            }
        };
        err(status, e.to_string())
    })?;
    persist_pool(&state, &engine);
    let balances = engine.balances();
    Ok(Json(PoolResponse {
        stable: balances.stable.to_string(),
        payout: balances.payout.to_string(),
    }))
}

fn persist_pool(state: &AppState, engine: &SettlementEngine) {
    if let Some(store) = &state.store {
        let balances = engine.balances();
        if let Err(e) = store.record_pool(balances.stable, balances.payout) {
            warn!(error = %e, "failed to persist pool balances");
        }
    }
}

// =============================================================================
// SIM WIRING
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SimQuoteRequest {
    pub asset: String,
    pub price: i64,
    pub expo: i32,
    /// Defaults to the service clock.
    pub publish_time: Option<i64>,
}

/// Push a quote into the simulated oracle. Only available when the service
/// was started with the sim wiring.
pub async fn push_sim_quote(
    State(state): State<AppState>,
    Json(req): Json<SimQuoteRequest>,
) -> Result<StatusCode, ApiError> {
    let oracle = state
        .sim_oracle
        .as_ref()
        .ok_or_else(|| err(StatusCode::NOT_FOUND, "sim oracle not wired"))?;
    let asset = Asset::parse(&req.asset)
        .ok_or_else(|| bad_request(format!("unknown asset {:?}", req.asset)))?;
    let engine = state.engine.lock();
    let feed = engine
        .feeds()
        .feed_for(asset)
        .ok_or_else(|| bad_request(format!("no feed registered for {}", asset.as_str())))?;
    drop(engine);
    oracle.push_quote(feed, req.price, req.expo, req.publish_time.unwrap_or_else(unix_nanos_now));
    Ok(StatusCode::NO_CONTENT)
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
