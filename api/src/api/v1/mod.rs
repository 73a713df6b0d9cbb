use std::sync::Arc;

use hyper::Body;
use routerify::Router;

use common::http::RouteError;

use super::error::ApiError;
use crate::global::GlobalState;

pub mod auth;
pub mod health;
pub mod requests;
pub mod slips;
pub mod users;

pub fn routes(global: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
    Router::builder()
        .scope("/health", health::routes(global))
        .scope("/auth", auth::routes(global))
        .scope("/users", users::routes(global))
        .scope("/slips", slips::routes(global))
        .scope("/requests", requests::routes(global))
        .build()
        .expect("failed to build router")
}
