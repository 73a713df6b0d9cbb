use std::sync::Arc;

use chrono::Utc;
use hyper::{Body, Request, Response, StatusCode};
use routerify::Router;
use serde_json::json;

use common::http::ext::{OptionExt, RequestGlobalExt, ResultExt};
use common::http::RouteError;
use common::make_response;

use crate::api::error::{ApiError, Result};
use crate::api::ext::{parse_body, require_admin};
use crate::database::{Plan, User};
use crate::global::GlobalState;

#[derive(serde::Deserialize)]
struct ApproveUserRequest {
    email: String,
}

#[derive(serde::Deserialize)]
struct ActivateUserRequest {
    email: String,
    plan: String,
}

async fn list(req: Request<Body>) -> Result<Response<Body>> {
    require_admin(&req)?;
    let global = req.get_global::<GlobalState>()?;

    let users: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY created_at")
        .fetch_all(&global.db)
        .await
        .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch users"))?;

    let users: Vec<_> = users.iter().map(User::profile).collect();

    Ok(make_response!(
        StatusCode::OK,
        json!({ "success": true, "users": users })
    ))
}

async fn approve(mut req: Request<Body>) -> Result<Response<Body>> {
    require_admin(&req)?;
    let body: ApproveUserRequest = parse_body(&mut req).await?;
    let global = req.get_global::<GlobalState>()?;

    let done = sqlx::query("UPDATE users SET approved = TRUE WHERE email = $1")
        .bind(&body.email)
        .execute(&global.db)
        .await
        .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to update user"))?;

    if done.rows_affected() == 0 {
        return Err((StatusCode::NOT_FOUND, "User not found").into());
    }

    Ok(make_response!(
        StatusCode::OK,
        json!({
            "success": true,
            "message": format!("{} approved successfully", body.email),
        })
    ))
}

async fn activate(mut req: Request<Body>) -> Result<Response<Body>> {
    require_admin(&req)?;
    let body: ActivateUserRequest = parse_body(&mut req).await?;
    let global = req.get_global::<GlobalState>()?;

    let plan: Plan = body
        .plan
        .parse()
        .map_ignore_err_route((StatusCode::BAD_REQUEST, "unknown plan"))?;

    let mut user = User::find_by_email(&global.db, &body.email)
        .await
        .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch user"))?
        .map_err_route((StatusCode::NOT_FOUND, "User not found"))?;

    if let Err(message) = user.activate(plan, Utc::now()) {
        return Err((StatusCode::BAD_REQUEST, message).into());
    }

    sqlx::query(
        "UPDATE users SET premium = $2, approved = $3, plan = $4, expires_at = $5 WHERE id = $1",
    )
    .bind(user.id)
    .bind(user.premium)
    .bind(user.approved)
    .bind(&user.plan)
    .bind(user.expires_at)
    .execute(&global.db)
    .await
    .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to update user"))?;

    Ok(make_response!(
        StatusCode::OK,
        json!({
            "success": true,
            "message": format!("{} activated on the {} plan", body.email, plan),
        })
    ))
}

pub fn routes(_global: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
    Router::builder()
        .get("/", list)
        .post("/approve", approve)
        .post("/activate", activate)
        .build()
        .expect("failed to build router")
}
