use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use hyper::{Body, Request, Response, StatusCode};
use routerify::Router;
use serde_json::json;
use uuid::Uuid;

use common::http::ext::{OptionExt, RequestGlobalExt, ResultExt};
use common::http::RouteError;
use common::make_response;

use crate::api::error::{ApiError, Result};
use crate::api::ext::{parse_body, require_auth};
use crate::api::jwt::JwtState;
use crate::database::user::{self, User};
use crate::global::GlobalState;

#[derive(serde::Deserialize)]
struct CredentialsRequest {
    email: String,
    password: String,
}

/// Validates a registration attempt against the current state of the email.
/// A conflict is reported before anything is written, so a duplicate attempt
/// leaves the existing record untouched.
fn validate_registration(
    existing: Option<&User>,
    email: &str,
    password: &str,
) -> std::result::Result<(), &'static str> {
    user::validate_email(email)?;
    user::validate_password(password)?;

    if existing.is_some() {
        return Err("User already exists");
    }

    Ok(())
}

/// What a login attempt should do, decided before any token is issued.
#[derive(Debug, PartialEq, Eq)]
enum LoginOutcome {
    InvalidLogin,
    NotApproved,
    /// Issue a token; `downgrade` is set when a lapsed paid plan has to be
    /// reset first.
    LogIn { downgrade: bool },
}

fn login_outcome(user: Option<&User>, password: &str, now: DateTime<Utc>) -> LoginOutcome {
    let Some(user) = user else {
        return LoginOutcome::InvalidLogin;
    };

    if !user.verify_password(password) {
        return LoginOutcome::InvalidLogin;
    }

    if !user.approved {
        return LoginOutcome::NotApproved;
    }

    LoginOutcome::LogIn {
        downgrade: user.subscription_expired(now),
    }
}

async fn register(mut req: Request<Body>) -> Result<Response<Body>> {
    let body: CredentialsRequest = parse_body(&mut req).await?;
    let global = req.get_global::<GlobalState>()?;

    let existing = User::find_by_email(&global.db, &body.email)
        .await
        .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch user"))?;

    if let Err(message) = validate_registration(existing.as_ref(), &body.email, &body.password) {
        return Err((StatusCode::BAD_REQUEST, message).into());
    }

    let result = sqlx::query(
        "INSERT INTO users (id, email, password_hash, role, premium, approved) \
         VALUES ($1, $2, $3, 'user', FALSE, FALSE)",
    )
    .bind(Uuid::new_v4())
    .bind(&body.email)
    .bind(user::hash_password(&body.password))
    .execute(&global.db)
    .await;

    match result {
        Ok(_) => {}
        // Two registrations racing on the same email trip the unique index.
        Err(err) if err.as_database_error().is_some_and(|e| e.is_unique_violation()) => {
            return Err((StatusCode::BAD_REQUEST, "User already exists").into());
        }
        Err(err) => {
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "failed to create user", err).into());
        }
    }

    Ok(make_response!(
        StatusCode::OK,
        json!({
            "success": true,
            "message": "User registered successfully. Await admin approval.",
        })
    ))
}

async fn login(mut req: Request<Body>) -> Result<Response<Body>> {
    let body: CredentialsRequest = parse_body(&mut req).await?;
    let global = req.get_global::<GlobalState>()?;

    let user = User::find_by_email(&global.db, &body.email)
        .await
        .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch user"))?;

    let downgrade = match login_outcome(user.as_ref(), &body.password, Utc::now()) {
        LoginOutcome::InvalidLogin => {
            return Ok(make_response!(
                StatusCode::OK,
                json!({ "success": false, "message": "Invalid login" })
            ));
        }
        LoginOutcome::NotApproved => {
            return Ok(make_response!(
                StatusCode::OK,
                json!({ "success": false, "message": "Account not approved yet" })
            ));
        }
        LoginOutcome::LogIn { downgrade } => downgrade,
    };

    let mut user =
        user.map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch user"))?;

    // Lazy expiry: downgrade a lapsed paid plan before answering, rather than
    // waiting for the next sweep tick. Approval stays, the user just drops to
    // the free tier.
    if downgrade {
        sqlx::query("UPDATE users SET premium = FALSE, plan = NULL, expires_at = NULL WHERE id = $1")
            .bind(user.id)
            .execute(&global.db)
            .await
            .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to update user"))?;

        user.premium = false;
        user.plan = None;
        user.expires_at = None;
    }

    let token = JwtState::new(
        user.id,
        Duration::hours(global.config.jwt_expiry_hours as i64),
    )
    .serialize(&global.config)
    .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to issue token"))?;

    Ok(make_response!(
        StatusCode::OK,
        json!({
            "success": true,
            "token": token,
            "user": user.profile(),
        })
    ))
}

async fn profile(req: Request<Body>) -> Result<Response<Body>> {
    let user = require_auth(&req)?;

    Ok(make_response!(
        StatusCode::OK,
        json!({ "success": true, "user": user.profile() })
    ))
}

pub fn routes(_global: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
    Router::builder()
        .post("/register", register)
        .post("/login", login)
        .get("/profile", profile)
        .build()
        .expect("failed to build router")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(approved: bool) -> User {
        User {
            email: "user@example.com".to_string(),
            password_hash: user::hash_password("password123"),
            approved,
            ..Default::default()
        }
    }

    #[test]
    fn test_registration_duplicate_rejected() {
        let existing = account(true);

        // The conflict is caught before any insert happens
        assert_eq!(
            validate_registration(Some(&existing), "user@example.com", "password123"),
            Err("User already exists")
        );

        assert!(validate_registration(None, "user@example.com", "password123").is_ok());
        assert!(validate_registration(None, "not-an-email", "password123").is_err());
        assert!(validate_registration(None, "user@example.com", "short").is_err());
    }

    #[test]
    fn test_login_outcome_invalid() {
        let now = Utc::now();

        assert_eq!(
            login_outcome(None, "password123", now),
            LoginOutcome::InvalidLogin
        );
        assert_eq!(
            login_outcome(Some(&account(true)), "wrong password", now),
            LoginOutcome::InvalidLogin
        );
    }

    #[test]
    fn test_login_outcome_unapproved_gets_no_token() {
        // Correct password, but the account still awaits approval
        assert_eq!(
            login_outcome(Some(&account(false)), "password123", Utc::now()),
            LoginOutcome::NotApproved
        );
    }

    #[test]
    fn test_login_outcome_lapsed_plan_downgrades() {
        let now = Utc::now();
        let mut user = account(true);
        user.premium = true;
        user.plan = Some("weekly".to_string());

        user.expires_at = Some(now - Duration::days(1));
        assert_eq!(
            login_outcome(Some(&user), "password123", now),
            LoginOutcome::LogIn { downgrade: true }
        );

        user.expires_at = Some(now + Duration::days(1));
        assert_eq!(
            login_outcome(Some(&user), "password123", now),
            LoginOutcome::LogIn { downgrade: false }
        );
    }
}
