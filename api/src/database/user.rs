use std::fmt::{Display, Formatter};
use std::str::FromStr;

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Subscription tiers, ordered. A plan unlocks every slip tier at or below its
/// own rank, so `Monthly` content is a superset of `Weekly` content.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Weekly,
    Monthly,
    Vip,
}

impl Plan {
    pub const ALL: [Plan; 4] = [Plan::Free, Plan::Weekly, Plan::Monthly, Plan::Vip];

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Weekly => "weekly",
            Plan::Monthly => "monthly",
            Plan::Vip => "vip",
        }
    }

    /// How long an activation of this plan lasts. `None` for the free tier,
    /// which cannot be activated.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Plan::Free => None,
            Plan::Weekly => Some(Duration::days(7)),
            Plan::Monthly | Plan::Vip => Some(Duration::days(30)),
        }
    }

    /// Every slip tier a holder of this plan may see.
    pub fn unlocked_tiers(&self) -> Vec<&'static str> {
        Plan::ALL
            .iter()
            .filter(|tier| *tier <= self)
            .map(Plan::as_str)
            .collect()
    }
}

impl FromStr for Plan {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Plan::Free),
            "weekly" => Ok(Plan::Weekly),
            "monthly" => Ok(Plan::Monthly),
            "vip" => Ok(Plan::Vip),
            _ => Err("unknown plan"),
        }
    }
}

impl Display for Plan {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        match value {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct User {
    /// The unique identifier for the user.
    pub id: Uuid,
    /// The email of the user. Unique, doubles as the login name.
    pub email: String,
    /// The hashed password of the user. (argon2)
    pub password_hash: String,
    /// The role of the user. (user/admin)
    pub role: String,
    /// Whether the user currently holds a paid plan.
    pub premium: bool,
    /// Whether an admin has approved the account for login.
    pub approved: bool,
    /// The plan of the user, if any was ever activated.
    pub plan: Option<String>,
    /// When the paid plan lapses. Set whenever `premium` is true.
    pub expires_at: Option<DateTime<Utc>>,
    /// The time the user was created.
    pub created_at: DateTime<Utc>,
}

/// The public view of a user, as returned by login/profile/user listing.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub email: String,
    pub role: String,
    pub plan: Option<String>,
    pub premium: bool,
    pub approved: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        Role::from(self.role.as_str()) == Role::Admin
    }

    /// The plan the user is entitled to right now. A paid plan only counts
    /// while its expiry is in the future; a lapsed one falls back to free even
    /// if the sweep has not reset the record yet.
    pub fn effective_plan(&self, now: DateTime<Utc>) -> Plan {
        let plan = self
            .plan
            .as_deref()
            .and_then(|p| p.parse::<Plan>().ok())
            .unwrap_or_default();

        if plan == Plan::Free {
            return Plan::Free;
        }

        match self.expires_at {
            Some(expires_at) if expires_at > now => plan,
            _ => Plan::Free,
        }
    }

    /// Whether the expiry sweep should reset this user.
    pub fn subscription_expired(&self, now: DateTime<Utc>) -> bool {
        self.premium && self.expires_at.is_some_and(|expires_at| expires_at < now)
    }

    /// Puts the user on a paid plan. Activation starts the paid clock but
    /// clears approval, so the account needs a fresh admin sign-off before the
    /// next login.
    pub fn activate(&mut self, plan: Plan, now: DateTime<Utc>) -> Result<(), &'static str> {
        let Some(duration) = plan.duration() else {
            return Err("the free plan cannot be activated");
        };

        self.premium = true;
        self.approved = false;
        self.plan = Some(plan.as_str().to_string());
        self.expires_at = Some(now + duration);

        Ok(())
    }

    /// Activation for a confirmed payment: the account is approved in the same
    /// step instead of waiting for a separate sign-off.
    pub fn activate_approved(&mut self, plan: Plan, now: DateTime<Utc>) -> Result<(), &'static str> {
        self.activate(plan, now)?;
        self.approved = true;

        Ok(())
    }

    pub fn profile(&self) -> Profile {
        Profile {
            email: self.email.clone(),
            role: self.role.clone(),
            plan: self.plan.clone(),
            premium: self.premium,
            approved: self.approved,
            expires_at: self.expires_at,
        }
    }

    /// Uses argon2 to verify the password hash against the provided password.
    pub fn verify_password(&self, password: &str) -> bool {
        let hash = match PasswordHash::new(&self.password_hash) {
            Ok(hash) => hash,
            Err(err) => {
                tracing::error!("failed to parse password hash: {}", err);
                return false;
            }
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok()
    }

    pub async fn find_by_id(db: &sqlx::PgPool, id: Uuid) -> sqlx::Result<Option<Self>> {
        sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_email(db: &sqlx::PgPool, email: &str) -> sqlx::Result<Option<Self>> {
        sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(db)
            .await
    }
}

/// Generates a new password hash using argon2.
pub fn hash_password(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .expect("failed to hash password");

    hash.to_string()
}

/// Validates a password.
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters long");
    }

    if password.len() > 100 {
        return Err("Password must be at most 100 characters long");
    }

    Ok(())
}

/// Validates an email.
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.len() < 5 {
        return Err("Email must be at least 5 characters long");
    }

    if email.len() > 100 {
        return Err("Email must be at most 100 characters long");
    }

    if !email.contains('@') {
        return Err("Email must contain an @");
    }

    if !email.contains('.') {
        return Err("Email must contain a .");
    }

    if !email_address::EmailAddress::is_valid(email) {
        return Err("Email is not a valid email address");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(plan: Option<&str>, premium: bool, expires_in: Option<Duration>) -> User {
        User {
            plan: plan.map(str::to_string),
            premium,
            expires_at: expires_in.map(|d| Utc::now() + d),
            ..Default::default()
        }
    }

    #[test]
    fn test_plan_ordering() {
        assert!(Plan::Free < Plan::Weekly);
        assert!(Plan::Weekly < Plan::Monthly);
        assert!(Plan::Monthly < Plan::Vip);
    }

    #[test]
    fn test_plan_parse_roundtrip() {
        for plan in Plan::ALL {
            assert_eq!(plan.as_str().parse::<Plan>(), Ok(plan));
        }
        assert!("premium".parse::<Plan>().is_err());
        assert!("".parse::<Plan>().is_err());
    }

    #[test]
    fn test_plan_durations() {
        assert_eq!(Plan::Free.duration(), None);
        assert_eq!(Plan::Weekly.duration(), Some(Duration::days(7)));
        assert_eq!(Plan::Monthly.duration(), Some(Duration::days(30)));
        assert_eq!(Plan::Vip.duration(), Some(Duration::days(30)));
    }

    #[test]
    fn test_unlocked_tiers() {
        assert_eq!(Plan::Free.unlocked_tiers(), vec!["free"]);
        assert_eq!(Plan::Weekly.unlocked_tiers(), vec!["free", "weekly"]);
        assert_eq!(
            Plan::Vip.unlocked_tiers(),
            vec!["free", "weekly", "monthly", "vip"]
        );
    }

    #[test]
    fn test_effective_plan() {
        let now = Utc::now();

        // Active paid plan
        let u = user(Some("monthly"), true, Some(Duration::days(10)));
        assert_eq!(u.effective_plan(now), Plan::Monthly);

        // Lapsed paid plan counts as free
        let u = user(Some("monthly"), true, Some(Duration::days(-1)));
        assert_eq!(u.effective_plan(now), Plan::Free);

        // Paid plan without an expiry never counts
        let u = user(Some("vip"), true, None);
        assert_eq!(u.effective_plan(now), Plan::Free);

        // No plan at all
        let u = user(None, false, None);
        assert_eq!(u.effective_plan(now), Plan::Free);
    }

    #[test]
    fn test_subscription_expired() {
        let now = Utc::now();

        assert!(user(Some("weekly"), true, Some(Duration::days(-1))).subscription_expired(now));
        assert!(!user(Some("weekly"), true, Some(Duration::days(1))).subscription_expired(now));
        // Non-premium users are never swept
        assert!(!user(Some("weekly"), false, Some(Duration::days(-1))).subscription_expired(now));
        // Premium without an expiry is left alone, the sweep only matches set dates
        assert!(!user(Some("weekly"), true, None).subscription_expired(now));
    }

    #[test]
    fn test_activate_clears_approval() {
        let now = Utc::now();
        let mut u = User {
            approved: true,
            ..Default::default()
        };

        u.activate(Plan::Weekly, now).expect("paid plan");

        assert!(u.premium);
        assert!(!u.approved);
        assert_eq!(u.plan.as_deref(), Some("weekly"));
        assert_eq!(u.expires_at, Some(now + Duration::days(7)));

        assert!(User::default().activate(Plan::Free, now).is_err());
    }

    #[test]
    fn test_activate_approved_keeps_approval() {
        let now = Utc::now();
        let mut u = User::default();

        u.activate_approved(Plan::Monthly, now).expect("paid plan");

        assert!(u.premium);
        assert!(u.approved);
        assert_eq!(u.plan.as_deref(), Some("monthly"));
        assert_eq!(u.expires_at, Some(now + Duration::days(30)));
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse battery staple");
        let u = User {
            password_hash: hash,
            ..Default::default()
        };

        assert!(u.verify_password("correct horse battery staple"));
        assert!(!u.verify_password("wrong"));
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("not-an-email").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_role() {
        assert!(User {
            role: "admin".to_string(),
            ..Default::default()
        }
        .is_admin());
        assert!(!User {
            role: "user".to_string(),
            ..Default::default()
        }
        .is_admin());
    }
}
