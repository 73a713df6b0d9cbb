use std::sync::Arc;

use hyper::header;
use hyper::{Body, StatusCode};
use routerify::prelude::RequestExt;
use routerify::Middleware;

use common::http::ext::{OptionExt, RequestGlobalExt, ResultExt};
use common::http::RouteError;

use crate::api::error::ApiError;
use crate::api::jwt::JwtState;
use crate::database::User;
use crate::global::GlobalState;

/// Resolves the `Authorization` header into a [`User`] stored on the request
/// context. Requests without the header pass through untouched, handlers that
/// need a user check the context themselves.
pub fn auth_middleware(_global: &Arc<GlobalState>) -> Middleware<Body, RouteError<ApiError>> {
    Middleware::pre(|req| async move {
        let Some(token) = req.headers().get(header::AUTHORIZATION) else {
            return Ok(req);
        };

        let global = req.get_global::<GlobalState>()?;

        let token = token
            .to_str()
            .map_ignore_err_route((StatusCode::UNAUTHORIZED, "invalid authentication token"))?;

        let Some(token) = token.strip_prefix("Bearer ") else {
            return Err((StatusCode::UNAUTHORIZED, "invalid authentication token").into());
        };

        let jwt = JwtState::verify(&global.config, token)
            .map_err_route((StatusCode::UNAUTHORIZED, "invalid authentication token"))?;

        let user = User::find_by_id(&global.db, jwt.user_id)
            .await
            .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch user"))?
            .map_err_route((StatusCode::UNAUTHORIZED, "invalid authentication token"))?;

        req.set_context(user);

        Ok(req)
    })
}
