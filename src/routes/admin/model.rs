use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::models::UserRole;

#[derive(Debug, Clone, Copy, Default, Serialize, FromRow)]
pub struct Totals {
    pub users: i64,
    pub reviews: i64,
    pub experts: i64,
    pub opportunities: i64,
    pub questions: i64,
    pub messages: i64,
}

#[derive(Debug, Serialize)]
pub struct AdminStats {
    #[serde(flatten)]
    pub totals: Totals,
    pub users_by_role: BTreeMap<String, i64>,
    pub connections_by_status: BTreeMap<String, i64>,
    pub sessions_by_status: BTreeMap<String, i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateActiveRequest {
    pub is_active: bool,
}

async fn grouped_counts(pool: &PgPool, sql: &str) -> Result<BTreeMap<String, i64>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, i64)>(sql)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().collect())
}

impl AdminStats {
    pub async fn collect(pool: &PgPool) -> Result<Self, sqlx::Error> {
        let totals = sqlx::query_as::<_, Totals>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM reviews) AS reviews,
                (SELECT COUNT(*) FROM experts) AS experts,
                (SELECT COUNT(*) FROM opportunities) AS opportunities,
                (SELECT COUNT(*) FROM questions) AS questions,
                (SELECT COUNT(*) FROM messages) AS messages
            "#,
        )
        .fetch_one(pool)
        .await?;

        let users_by_role = grouped_counts(
            pool,
            "SELECT role::TEXT, COUNT(*) FROM users GROUP BY role",
        )
        .await?;
        let connections_by_status = grouped_counts(
            pool,
            "SELECT status::TEXT, COUNT(*) FROM connections GROUP BY status",
        )
        .await?;
        let sessions_by_status = grouped_counts(
            pool,
            "SELECT status::TEXT, COUNT(*) FROM sessions GROUP BY status",
        )
        .await?;

        Ok(Self {
            totals,
            users_by_role,
            connections_by_status,
            sessions_by_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_serialize_totals_at_top_level() {
        let stats = AdminStats {
            totals: Totals {
                users: 3,
                ..Default::default()
            },
            users_by_role: BTreeMap::from([("mentee".to_string(), 2), ("mentor".to_string(), 1)]),
            connections_by_status: BTreeMap::new(),
            sessions_by_status: BTreeMap::new(),
        };

        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["users"], 3);
        assert_eq!(value["users_by_role"]["mentee"], 2);
        assert!(value.get("totals").is_none());
    }
}
