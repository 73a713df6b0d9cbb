use std::sync::Arc;

use hyper::header;
use hyper::Body;
use routerify::Middleware;

use common::http::RouteError;

use crate::api::error::ApiError;
use crate::global::GlobalState;

pub fn cors_middleware(_: &Arc<GlobalState>) -> Middleware<Body, RouteError<ApiError>> {
    Middleware::post(|mut resp| async move {
        resp.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            "*".parse().expect("failed to parse header"),
        );
        resp.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            "GET, POST, OPTIONS".parse().expect("failed to parse header"),
        );
        resp.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            "Content-Type, Authorization"
                .parse()
                .expect("failed to parse header"),
        );

        Ok(resp)
    })
}
