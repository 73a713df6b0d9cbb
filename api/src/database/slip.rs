use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use super::Plan;

/// A single game prediction embedded in a slip. Games have no lifecycle of
/// their own, they live and die with their slip.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub home: String,
    pub away: String,
    pub odd: f64,
    /// Free-text market tag, e.g. "O2.5".
    #[serde(default)]
    pub over_under: String,
    /// Free-text status, e.g. pending/won/lost.
    #[serde(default)]
    pub result: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Slip {
    /// The unique identifier for the slip.
    pub id: Uuid,
    /// The date the slip is for, as entered by the admin.
    pub date: String,
    /// The minimum plan tier required to see this slip.
    pub access: String,
    /// The ordered list of game predictions.
    pub games: Json<Vec<Game>>,
    /// Product of the game odds, rounded to 2 decimals.
    pub total: f64,
    /// The time the slip was created.
    pub created_at: DateTime<Utc>,
}

impl Slip {
    pub fn access_tier(&self) -> Plan {
        self.access.parse().unwrap_or_default()
    }

    /// Whether a viewer holding `plan` may see this slip. Admins bypass this
    /// check entirely.
    pub fn visible_to(&self, plan: Plan) -> bool {
        plan >= self.access_tier()
    }

    pub async fn find_by_id(db: &sqlx::PgPool, id: Uuid) -> sqlx::Result<Option<Self>> {
        sqlx::query_as("SELECT * FROM slips WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
    }
}

/// Product of the game odds, rounded to 2 decimals. Odds that are missing or
/// not positive count as 1.0, so an empty slip totals 1.00.
pub fn total_odds(games: &[Game]) -> f64 {
    let product: f64 = games
        .iter()
        .map(|game| if game.odd > 0.0 { game.odd } else { 1.0 })
        .product();

    (product * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(odd: f64) -> Game {
        Game {
            home: "Team A".to_string(),
            away: "Team B".to_string(),
            odd,
            ..Default::default()
        }
    }

    fn slip(access: &str) -> Slip {
        Slip {
            id: Uuid::new_v4(),
            date: "2024-06-01".to_string(),
            access: access.to_string(),
            games: Json(vec![]),
            total: 1.0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_total_odds() {
        assert_eq!(total_odds(&[game(1.5), game(2.0)]), 3.0);
        assert_eq!(total_odds(&[game(1.33), game(1.33)]), 1.77);
        assert_eq!(total_odds(&[]), 1.0);
        assert_eq!(total_odds(&[game(1.0), game(1.0)]), 1.0);
        // Missing odds count as 1.0
        assert_eq!(total_odds(&[game(0.0), game(2.5)]), 2.5);
        assert_eq!(total_odds(&[game(-3.0), game(2.5)]), 2.5);
    }

    #[test]
    fn test_visibility_matrix() {
        let free = slip("free");
        let weekly = slip("weekly");
        let monthly = slip("monthly");
        let vip = slip("vip");

        // Free slips are visible to everyone
        for plan in Plan::ALL {
            assert!(free.visible_to(plan));
        }

        // Weekly-tier slips need any paid plan
        assert!(!weekly.visible_to(Plan::Free));
        assert!(weekly.visible_to(Plan::Weekly));
        assert!(weekly.visible_to(Plan::Monthly));
        assert!(weekly.visible_to(Plan::Vip));

        // Monthly content is a superset of weekly
        assert!(!monthly.visible_to(Plan::Weekly));
        assert!(monthly.visible_to(Plan::Monthly));

        // Vip slips are vip-only
        assert!(!vip.visible_to(Plan::Free));
        assert!(!vip.visible_to(Plan::Weekly));
        assert!(!vip.visible_to(Plan::Monthly));
        assert!(vip.visible_to(Plan::Vip));
    }

    #[test]
    fn test_unknown_access_defaults_to_free() {
        let s = slip("mystery");
        assert_eq!(s.access_tier(), Plan::Free);
        assert!(s.visible_to(Plan::Free));
    }

    #[test]
    fn test_game_serde_field_names() {
        let g = Game {
            home: "Team A".to_string(),
            away: "Team B".to_string(),
            odd: 1.5,
            over_under: "O2.5".to_string(),
            result: "pending".to_string(),
        };

        let value = serde_json::to_value(&g).unwrap();
        assert_eq!(value["overUnder"], "O2.5");
        assert_eq!(value["result"], "pending");

        let back: Game = serde_json::from_value(value).unwrap();
        assert_eq!(back, g);
    }
}
