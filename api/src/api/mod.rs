use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use hyper::{Body, Request, Response, Server, StatusCode};
use routerify::{Router, RouterService};

use common::http::RouteError;

use self::error::ApiError;
use crate::global::GlobalState;

pub mod error;
pub mod ext;
pub mod jwt;
pub mod middleware;
pub mod static_files;
pub mod v1;

async fn preflight(_: Request<Body>) -> error::Result<Response<Body>> {
    Ok(Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Body::empty())
        .expect("failed to build preflight response"))
}

pub fn routes(global: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
    let weak = Arc::downgrade(global);

    Router::builder()
        .data(weak)
        // Adds the CORS headers to every response.
        .middleware(middleware::cors::cors_middleware(global))
        // Resolves the Authorization header into a user on the request
        // context. Requests without a token pass through.
        .middleware(middleware::auth::auth_middleware(global))
        .scope("/v1", v1::routes(global))
        .options("/*", preflight)
        // Everything else falls through to the frontend build.
        .any(static_files::fallback)
        .err_handler_with_info(common::http::error_handler::<ApiError>)
        .build()
        .expect("failed to build router")
}

pub async fn run(global: Arc<GlobalState>) -> Result<()> {
    let addr: SocketAddr = global.config.bind_address.parse()?;

    tracing::info!("listening on http://{}", addr);

    let service = RouterService::new(routes(&global))
        .map_err(|err| anyhow!("failed to build router service: {}", err))?;

    let ctx = global.ctx.clone();

    Server::try_bind(&addr)?
        .serve(service)
        .with_graceful_shutdown(async move {
            ctx.done().await;
        })
        .await?;

    Ok(())
}
