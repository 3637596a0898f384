// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! PostgreSQL `RouteRepository` backed by the `routes` table via `sqlx`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::repository::{RepositoryError, RouteRepository};
use crate::domain::route::{Route, RouteId, Shift};
use crate::domain::user::UserId;

pub struct PostgresRouteRepository {
    pool: PgPool,
}

impl PostgresRouteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_route(row: &PgRow) -> Result<Route, RepositoryError> {
    let shift_str: String = row.get("shift");
    let shift: Shift = shift_str
        .parse()
        .map_err(|_| RepositoryError::Serialization(format!("unknown shift: {shift_str}")))?;
    let driver_id: Option<uuid::Uuid> = row.get("driver_id");
    Ok(Route {
        id: RouteId(row.get("id")),
        code: row.get("code"),
        name: row.get("name"),
        description: row.get("description"),
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
        shift,
        max_capacity: row.get("max_capacity"),
        active: row.get("active"),
        driver_id: driver_id.map(UserId),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const SELECT_ROUTE: &str = r#"
    SELECT id, code, name, description, start_time, end_time, shift,
           max_capacity, active, driver_id, created_at, updated_at
    FROM routes
"#;

#[async_trait]
impl RouteRepository for PostgresRouteRepository {
    async fn save(&self, route: &Route) -> Result<Route, RepositoryError> {
        let mut row = route.clone();
        row.updated_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO routes (
                id, code, name, description, start_time, end_time, shift,
                max_capacity, active, driver_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                code = EXCLUDED.code,
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                start_time = EXCLUDED.start_time,
                end_time = EXCLUDED.end_time,
                shift = EXCLUDED.shift,
                max_capacity = EXCLUDED.max_capacity,
                active = EXCLUDED.active,
                driver_id = EXCLUDED.driver_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(row.id.0)
        .bind(&row.code)
        .bind(&row.name)
        .bind(&row.description)
        .bind(row.start_time)
        .bind(row.end_time)
        .bind(row.shift.as_str())
        .bind(row.max_capacity)
        .bind(row.active)
        .bind(row.driver_id.map(|d| d.0))
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("failed to save route: {e}")))?;

        Ok(row)
    }

    async fn find_by_id(&self, id: RouteId) -> Result<Option<Route>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_ROUTE} WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        row.as_ref().map(row_to_route).transpose()
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Route>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_ROUTE} WHERE code = $1"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        row.as_ref().map(row_to_route).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Route>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_ROUTE} ORDER BY code"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_route).collect()
    }

    async fn search_by_code(&self, term: &str) -> Result<Vec<Route>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_ROUTE} WHERE code ILIKE '%' || $1 || '%' ORDER BY code"
        ))
        .bind(term)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_route).collect()
    }

    async fn search_by_name(&self, term: &str) -> Result<Vec<Route>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_ROUTE} WHERE name ILIKE '%' || $1 || '%' ORDER BY name"
        ))
        .bind(term)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_route).collect()
    }

    async fn list_by_shift(&self, shift: Shift) -> Result<Vec<Route>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_ROUTE} WHERE shift = $1 ORDER BY code"))
            .bind(shift.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_route).collect()
    }

    async fn list_by_active(&self, active: bool) -> Result<Vec<Route>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_ROUTE} WHERE active = $1 ORDER BY code"))
            .bind(active)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_route).collect()
    }

    async fn list_by_driver(&self, driver_id: UserId) -> Result<Vec<Route>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_ROUTE} WHERE driver_id = $1 ORDER BY code"))
            .bind(driver_id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_route).collect()
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM routes WHERE code = $1)")
            .bind(code)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))
    }

    async fn count_all(&self) -> Result<u64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM routes")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(count as u64)
    }

    async fn count_by_active(&self, active: bool) -> Result<u64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM routes WHERE active = $1")
            .bind(active)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(count as u64)
    }

    async fn count_by_shift(&self, shift: Shift) -> Result<u64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM routes WHERE shift = $1")
            .bind(shift.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(count as u64)
    }

    async fn delete(&self, id: RouteId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(())
    }
}
