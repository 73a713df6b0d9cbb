use std::sync::Arc;

use chrono::{DateTime, Utc};
use hyper::{Body, Request, Response, StatusCode};
use routerify::Router;
use serde_json::json;
use uuid::Uuid;

use common::http::ext::{OptionExt, RequestGlobalExt, ResultExt};
use common::http::RouteError;
use common::make_response;

use crate::api::error::{ApiError, Result};
use crate::api::ext::{parse_body, require_admin};
use crate::database::subscription_request::{self, SubscriptionRequest};
use crate::database::{user, Plan, User};
use crate::global::GlobalState;

#[derive(serde::Deserialize)]
struct CreateRequest {
    email: String,
    plan: String,
    #[serde(default)]
    message: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestResponse {
    id: Uuid,
    email: String,
    plan: String,
    message: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl From<SubscriptionRequest> for RequestResponse {
    fn from(request: SubscriptionRequest) -> Self {
        Self {
            id: request.id,
            email: request.email,
            plan: request.plan,
            message: request.message,
            status: request.status,
            created_at: request.created_at,
        }
    }
}

async fn create(mut req: Request<Body>) -> Result<Response<Body>> {
    let body: CreateRequest = parse_body(&mut req).await?;
    let global = req.get_global::<GlobalState>()?;

    if let Err(message) = user::validate_email(&body.email) {
        return Err((StatusCode::BAD_REQUEST, message).into());
    }

    let plan: Plan = body
        .plan
        .parse()
        .map_ignore_err_route((StatusCode::BAD_REQUEST, "unknown plan"))?;

    if plan.duration().is_none() {
        return Err((StatusCode::BAD_REQUEST, "the free plan cannot be requested").into());
    }

    sqlx::query(
        "INSERT INTO subscription_requests (id, email, plan, message, status) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::new_v4())
    .bind(&body.email)
    .bind(plan.as_str())
    .bind(&body.message)
    .bind(subscription_request::STATUS_PENDING)
    .execute(&global.db)
    .await
    .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to create request"))?;

    Ok(make_response!(
        StatusCode::OK,
        json!({ "success": true, "message": "Subscription request received" })
    ))
}

async fn list(req: Request<Body>) -> Result<Response<Body>> {
    require_admin(&req)?;
    let global = req.get_global::<GlobalState>()?;

    let requests: Vec<SubscriptionRequest> = sqlx::query_as(
        "SELECT * FROM subscription_requests \
         ORDER BY (status = 'pending') DESC, created_at DESC",
    )
    .fetch_all(&global.db)
    .await
    .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch requests"))?;

    let requests: Vec<RequestResponse> = requests.into_iter().map(Into::into).collect();

    Ok(make_response!(
        StatusCode::OK,
        json!({ "success": true, "requests": requests })
    ))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApproveRequest {
    request_id: Uuid,
}

async fn approve(mut req: Request<Body>) -> Result<Response<Body>> {
    require_admin(&req)?;
    let body: ApproveRequest = parse_body(&mut req).await?;
    let global = req.get_global::<GlobalState>()?;

    let request = SubscriptionRequest::find_by_id(&global.db, body.request_id)
        .await
        .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch request"))?
        .map_err_route((StatusCode::NOT_FOUND, "Request not found"))?;

    if !request.is_pending() {
        return Err((StatusCode::BAD_REQUEST, "Request already approved").into());
    }

    // Requests are validated on creation, so the stored plan should always
    // parse to a paid tier.
    let plan = request
        .plan
        .parse::<Plan>()
        .map_ignore_err_route((StatusCode::INTERNAL_SERVER_ERROR, "request has an invalid plan"))?;

    let mut user = User::find_by_email(&global.db, &request.email)
        .await
        .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch user"))?
        .map_err_route((StatusCode::NOT_FOUND, "User not found"))?;

    // A payment request the admin signs off on both activates the plan and
    // approves the account in one step.
    if let Err(message) = user.activate_approved(plan, Utc::now()) {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, message).into());
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

    sqlx::query("UPDATE subscription_requests SET status = $2 WHERE id = $1")
        .bind(request.id)
        .bind(subscription_request::STATUS_APPROVED)
        .execute(&global.db)
        .await
        .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to update request"))?;

    Ok(make_response!(
        StatusCode::OK,
        json!({
            "success": true,
            "message": format!("{} approved successfully", request.email),
        })
    ))
}

pub fn routes(_global: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
    Router::builder()
        .post("/", create)
        .get("/", list)
        .post("/approve", approve)
        .build()
        .expect("failed to build router")
}
