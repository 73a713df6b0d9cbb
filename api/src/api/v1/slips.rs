use std::sync::Arc;

use chrono::Utc;
use hyper::{Body, Request, Response, StatusCode};
use routerify::prelude::RequestExt;
use routerify::Router;
use serde_json::json;
use sqlx::types::Json;
use uuid::Uuid;

use common::http::ext::{OptionExt, RequestGlobalExt, ResultExt};
use common::http::RouteError;
use common::make_response;

use crate::api::error::{ApiError, Result};
use crate::api::ext::{parse_body, require_admin};
use crate::database::slip::{self, Game, Slip};
use crate::database::{Plan, User};
use crate::global::GlobalState;

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlipResponse {
    id: Uuid,
    date: String,
    access: String,
    games: Vec<Game>,
    total_odds: f64,
}

impl From<Slip> for SlipResponse {
    fn from(slip: Slip) -> Self {
        Self {
            id: slip.id,
            date: slip.date,
            access: slip.access,
            total_odds: slip.total,
            games: slip.games.0,
        }
    }
}

/// Parses `page` and `limit` from the query string, clamping both to sane
/// bounds. Unparseable values fall back to the defaults.
fn parse_pagination(query: Option<&str>) -> (i64, i64) {
    let mut page = 1i64;
    let mut limit = 10i64;

    for pair in query.unwrap_or_default().split('&') {
        let mut parts = pair.splitn(2, '=');
        let key = parts.next().unwrap_or_default();
        let value = parts.next().unwrap_or_default();

        match key {
            "page" => page = value.parse().unwrap_or(page),
            "limit" => limit = value.parse().unwrap_or(limit),
            _ => {}
        }
    }

    // Both bounds matter: the offset below is page * limit, which must never
    // leave i64.
    (page.clamp(1, 1_000_000), limit.clamp(1, 100))
}

async fn list(req: Request<Body>) -> Result<Response<Body>> {
    let global = req.get_global::<GlobalState>()?;

    // Anonymous viewers get the free tier. Admins hold the vip rank, which
    // unlocks every tier below it.
    let viewer = match req.context::<User>() {
        Some(user) if user.is_admin() => Plan::Vip,
        Some(user) => user.effective_plan(Utc::now()),
        None => Plan::Free,
    };

    let tiers: Vec<String> = viewer
        .unlocked_tiers()
        .into_iter()
        .map(str::to_string)
        .collect();

    let (page, limit) = parse_pagination(req.uri().query());

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM slips WHERE access = ANY($1)")
        .bind(&tiers)
        .fetch_one(&global.db)
        .await
        .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch slips"))?;

    let slips: Vec<Slip> = sqlx::query_as(
        "SELECT * FROM slips WHERE access = ANY($1) ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(&tiers)
    .bind(limit)
    .bind((page - 1) * limit)
    .fetch_all(&global.db)
    .await
    .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch slips"))?;

    let slips: Vec<SlipResponse> = slips.into_iter().map(Into::into).collect();
    let pages = ((total + limit - 1) / limit).max(1);

    Ok(make_response!(
        StatusCode::OK,
        json!({
            "success": true,
            "slips": slips,
            "page": page,
            "pages": pages,
            "total": total,
        })
    ))
}

#[derive(serde::Deserialize)]
struct CreateSlipRequest {
    date: String,
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    games: Vec<Game>,
}

async fn create(mut req: Request<Body>) -> Result<Response<Body>> {
    require_admin(&req)?;
    let body: CreateSlipRequest = parse_body(&mut req).await?;
    let global = req.get_global::<GlobalState>()?;

    if body.date.trim().is_empty() || body.games.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Invalid slip data").into());
    }

    let access = match body.access.as_deref() {
        Some(access) => access
            .parse::<Plan>()
            .map_ignore_err_route((StatusCode::BAD_REQUEST, "unknown access tier"))?,
        None => Plan::Free,
    };

    let games: Vec<Game> = body
        .games
        .into_iter()
        .map(|mut game| {
            if game.result.is_empty() {
                game.result = "pending".to_string();
            }
            game
        })
        .collect();

    let slip: Slip = sqlx::query_as(
        "INSERT INTO slips (id, date, access, games, total) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(body.date.trim())
    .bind(access.as_str())
    .bind(Json(&games))
    .bind(slip::total_odds(&games))
    .fetch_one(&global.db)
    .await
    .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to create slip"))?;

    Ok(make_response!(
        StatusCode::OK,
        json!({ "success": true, "slip": SlipResponse::from(slip) })
    ))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateGameRequest {
    slip_id: Uuid,
    game_index: usize,
    result: Option<String>,
    over_under: Option<String>,
}

async fn update_game(mut req: Request<Body>) -> Result<Response<Body>> {
    require_admin(&req)?;
    let body: UpdateGameRequest = parse_body(&mut req).await?;
    let global = req.get_global::<GlobalState>()?;

    let mut slip = Slip::find_by_id(&global.db, body.slip_id)
        .await
        .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch slip"))?
        .map_err_route((StatusCode::NOT_FOUND, "Slip not found"))?;

    let Some(game) = slip.games.0.get_mut(body.game_index) else {
        return Err((StatusCode::BAD_REQUEST, "Invalid game index").into());
    };

    if let Some(result) = body.result {
        game.result = result;
    }
    if let Some(over_under) = body.over_under {
        game.over_under = over_under;
    }

    let game = game.clone();

    sqlx::query("UPDATE slips SET games = $2 WHERE id = $1")
        .bind(slip.id)
        .bind(Json(&slip.games.0))
        .execute(&global.db)
        .await
        .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to update slip"))?;

    Ok(make_response!(
        StatusCode::OK,
        json!({ "success": true, "game": game })
    ))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSlipTypeRequest {
    slip_id: Uuid,
    access: String,
}

async fn update_type(mut req: Request<Body>) -> Result<Response<Body>> {
    require_admin(&req)?;
    let body: UpdateSlipTypeRequest = parse_body(&mut req).await?;
    let global = req.get_global::<GlobalState>()?;

    let access: Plan = body
        .access
        .parse()
        .map_ignore_err_route((StatusCode::BAD_REQUEST, "unknown access tier"))?;

    let slip: Option<Slip> = sqlx::query_as("UPDATE slips SET access = $2 WHERE id = $1 RETURNING *")
        .bind(body.slip_id)
        .bind(access.as_str())
        .fetch_optional(&global.db)
        .await
        .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to update slip"))?;

    let slip = slip.map_err_route((StatusCode::NOT_FOUND, "Slip not found"))?;

    Ok(make_response!(
        StatusCode::OK,
        json!({ "success": true, "slip": SlipResponse::from(slip) })
    ))
}

pub fn routes(_global: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
    Router::builder()
        .get("/", list)
        .post("/", create)
        .post("/update-game", update_game)
        .post("/update-type", update_type)
        .build()
        .expect("failed to build router")
}
