use common::http::ext::{OptionExt, ResultExt};
use hyper::{Body, Request, StatusCode};
use routerify::prelude::RequestExt;
use serde::de::DeserializeOwned;

use super::error::Result;
use crate::database::User;

/// Reads and deserializes the JSON request body.
pub async fn parse_body<T: DeserializeOwned>(req: &mut Request<Body>) -> Result<T> {
    let body = hyper::body::to_bytes(req.body_mut())
        .await
        .map_err_route((StatusCode::BAD_REQUEST, "failed to read request body"))?;

    serde_json::from_slice(&body).map_err_route((StatusCode::BAD_REQUEST, "body is not valid json"))
}

/// The authenticated user, as stored by the auth middleware.
pub fn require_auth(req: &Request<Body>) -> Result<User> {
    req.context::<User>()
        .map_err_route((StatusCode::UNAUTHORIZED, "not logged in"))
}

/// The authenticated user, rejecting non-admins.
pub fn require_admin(req: &Request<Body>) -> Result<User> {
    let user = require_auth(req)?;

    if !user.is_admin() {
        return Err((StatusCode::FORBIDDEN, "admin access required").into());
    }

    Ok(user)
}
