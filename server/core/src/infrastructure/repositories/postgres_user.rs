// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! PostgreSQL `UserRepository` backed by the `users` table via `sqlx`.
//! Translates between the `User` aggregate and its relational row; the
//! upsert stamps `updated_at` before every write.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::repository::{RepositoryError, UserRepository};
use crate::domain::user::{Role, User, UserId};

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &PgRow) -> Result<User, RepositoryError> {
    let role_str: String = row.get("role");
    let role: Role = role_str
        .parse()
        .map_err(|_| RepositoryError::Serialization(format!("unknown role: {role_str}")))?;
    Ok(User {
        id: UserId(row.get("id")),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        role,
        full_name: row.get("full_name"),
        email: row.get("email"),
        phone: row.get("phone"),
        national_id: row.get("national_id"),
        address: row.get("address"),
        city: row.get("city"),
        birth_date: row.get("birth_date"),
        license_number: row.get("license_number"),
        license_expiry: row.get("license_expiry"),
        license_class: row.get("license_class"),
        vehicle_plate: row.get("vehicle_plate"),
        emergency_contact_name: row.get("emergency_contact_name"),
        emergency_contact_phone: row.get("emergency_contact_phone"),
        active: row.get("active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const SELECT_USER: &str = r#"
    SELECT id, username, password_hash, role, full_name, email, phone,
           national_id, address, city, birth_date, license_number,
           license_expiry, license_class, vehicle_plate,
           emergency_contact_name, emergency_contact_phone, active,
           created_at, updated_at
    FROM users
"#;

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn save(&self, user: &User) -> Result<User, RepositoryError> {
        let mut row = user.clone();
        row.updated_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, password_hash, role, full_name, email, phone,
                national_id, address, city, birth_date, license_number,
                license_expiry, license_class, vehicle_plate,
                emergency_contact_name, emergency_contact_phone, active,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20)
            ON CONFLICT (id) DO UPDATE SET
                username = EXCLUDED.username,
                password_hash = EXCLUDED.password_hash,
                role = EXCLUDED.role,
                full_name = EXCLUDED.full_name,
                email = EXCLUDED.email,
                phone = EXCLUDED.phone,
                national_id = EXCLUDED.national_id,
                address = EXCLUDED.address,
                city = EXCLUDED.city,
                birth_date = EXCLUDED.birth_date,
                license_number = EXCLUDED.license_number,
                license_expiry = EXCLUDED.license_expiry,
                license_class = EXCLUDED.license_class,
                vehicle_plate = EXCLUDED.vehicle_plate,
                emergency_contact_name = EXCLUDED.emergency_contact_name,
                emergency_contact_phone = EXCLUDED.emergency_contact_phone,
                active = EXCLUDED.active,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(row.id.0)
        .bind(&row.username)
        .bind(&row.password_hash)
        .bind(row.role.as_str())
        .bind(&row.full_name)
        .bind(&row.email)
        .bind(&row.phone)
        .bind(&row.national_id)
        .bind(&row.address)
        .bind(&row.city)
        .bind(row.birth_date)
        .bind(&row.license_number)
        .bind(row.license_expiry)
        .bind(&row.license_class)
        .bind(&row.vehicle_plate)
        .bind(&row.emergency_contact_name)
        .bind(&row.emergency_contact_phone)
        .bind(row.active)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("failed to save user: {e}")))?;

        Ok(row)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_USER} WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_USER} WHERE username = $1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_USER} WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_USER} ORDER BY username"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_user).collect()
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_USER} WHERE role = $1 ORDER BY username"))
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_user).collect()
    }

    async fn list_by_role_and_active(
        &self,
        role: Role,
        active: bool,
    ) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_USER} WHERE role = $1 AND active = $2 ORDER BY username"
        ))
        .bind(role.as_str())
        .bind(active)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_user).collect()
    }

    async fn search_by_name(&self, term: &str) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_USER} WHERE full_name ILIKE '%' || $1 || '%' ORDER BY full_name"
        ))
        .bind(term)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_user).collect()
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))
    }

    async fn count_by_role(&self, role: Role) -> Result<u64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(count as u64)
    }

    async fn count_by_role_and_active(
        &self,
        role: Role,
        active: bool,
    ) -> Result<u64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE role = $1 AND active = $2",
        )
        .bind(role.as_str())
        .bind(active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(count as u64)
    }

    async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(())
    }
}
