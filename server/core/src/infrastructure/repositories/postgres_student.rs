// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! PostgreSQL `StudentRepository` backed by the `students` table via `sqlx`.
//!
//! The capacity-guarded writes run in a transaction that first locks the
//! route row with `SELECT ... FOR UPDATE`. Under READ COMMITTED two
//! concurrent guarded statements would each count against their own
//! snapshot and both pass near capacity; the row lock serializes them, so
//! the second counts the first's committed insert and is refused.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::repository::{RepositoryError, StudentRepository};
use crate::domain::route::RouteId;
use crate::domain::student::{Student, StudentId};
use crate::domain::user::UserId;

pub struct PostgresStudentRepository {
    pool: PgPool,
}

impl PostgresStudentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_student(row: &PgRow) -> Result<Student, RepositoryError> {
    let route_id: Option<uuid::Uuid> = row.get("route_id");
    Ok(Student {
        id: StudentId(row.get("id")),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        document: row.get("document"),
        birth_date: row.get("birth_date"),
        address: row.get("address"),
        phone: row.get("phone"),
        grade: row.get("grade"),
        institution: row.get("institution"),
        active: row.get("active"),
        parent_id: UserId(row.get("parent_id")),
        route_id: route_id.map(RouteId),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const SELECT_STUDENT: &str = r#"
    SELECT id, first_name, last_name, document, birth_date, address, phone,
           grade, institution, active, parent_id, route_id, created_at,
           updated_at
    FROM students
"#;

/// Takes the route's row lock for the rest of the transaction. Concurrent
/// capacity-guarded writes against the same route queue up here, so each
/// one counts the committed rows of the writes before it.
async fn lock_route(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    route_id: RouteId,
) -> Result<(), RepositoryError> {
    sqlx::query("SELECT id FROM routes WHERE id = $1 FOR UPDATE")
        .bind(route_id.0)
        .execute(&mut **tx)
        .await
        .map_err(|e| RepositoryError::Database(format!("failed to lock route: {e}")))?;
    Ok(())
}

#[async_trait]
impl StudentRepository for PostgresStudentRepository {
    async fn save(&self, student: &Student) -> Result<Student, RepositoryError> {
        let mut row = student.clone();
        row.updated_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO students (
                id, first_name, last_name, document, birth_date, address,
                phone, grade, institution, active, parent_id, route_id,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (id) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                document = EXCLUDED.document,
                birth_date = EXCLUDED.birth_date,
                address = EXCLUDED.address,
                phone = EXCLUDED.phone,
                grade = EXCLUDED.grade,
                institution = EXCLUDED.institution,
                active = EXCLUDED.active,
                parent_id = EXCLUDED.parent_id,
                route_id = EXCLUDED.route_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(row.id.0)
        .bind(&row.first_name)
        .bind(&row.last_name)
        .bind(&row.document)
        .bind(row.birth_date)
        .bind(&row.address)
        .bind(&row.phone)
        .bind(&row.grade)
        .bind(&row.institution)
        .bind(row.active)
        .bind(row.parent_id.0)
        .bind(row.route_id.map(|r| r.0))
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("failed to save student: {e}")))?;

        Ok(row)
    }

    async fn insert_assigned(
        &self,
        student: &Student,
        max_capacity: i32,
    ) -> Result<bool, RepositoryError> {
        let route_id = match student.route_id {
            Some(id) => id,
            None => {
                return Err(RepositoryError::Unknown(
                    "insert_assigned requires a route".to_string(),
                ))
            }
        };
        let mut row = student.clone();
        row.updated_at = Utc::now();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Database(format!("failed to begin transaction: {e}")))?;

        lock_route(&mut tx, route_id).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO students (
                id, first_name, last_name, document, birth_date, address,
                phone, grade, institution, active, parent_id, route_id,
                created_at, updated_at
            )
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14
            WHERE (SELECT COUNT(*) FROM students
                   WHERE route_id = $12 AND active) < $15
            "#,
        )
        .bind(row.id.0)
        .bind(&row.first_name)
        .bind(&row.last_name)
        .bind(&row.document)
        .bind(row.birth_date)
        .bind(&row.address)
        .bind(&row.phone)
        .bind(&row.grade)
        .bind(&row.institution)
        .bind(row.active)
        .bind(row.parent_id.0)
        .bind(route_id.0)
        .bind(row.created_at)
        .bind(row.updated_at)
        .bind(max_capacity as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Database(format!("failed to insert student: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Database(format!("failed to commit: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn assign_route(
        &self,
        id: StudentId,
        route_id: RouteId,
        max_capacity: i32,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Database(format!("failed to begin transaction: {e}")))?;

        lock_route(&mut tx, route_id).await?;

        let result = sqlx::query(
            r#"
            UPDATE students
            SET route_id = $2, updated_at = $3
            WHERE id = $1
              AND (SELECT COUNT(*) FROM students s2
                   WHERE s2.route_id = $2 AND s2.active AND s2.id <> $1) < $4
            "#,
        )
        .bind(id.0)
        .bind(route_id.0)
        .bind(Utc::now())
        .bind(max_capacity as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Database(format!("failed to assign route: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Database(format!("failed to commit: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(&self, id: StudentId) -> Result<Option<Student>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_STUDENT} WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        row.as_ref().map(row_to_student).transpose()
    }

    async fn find_by_document(&self, document: &str) -> Result<Option<Student>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_STUDENT} WHERE document = $1"))
            .bind(document)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        row.as_ref().map(row_to_student).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Student>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_STUDENT} ORDER BY last_name, first_name"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_student).collect()
    }

    async fn list_by_active(&self, active: bool) -> Result<Vec<Student>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_STUDENT} WHERE active = $1 ORDER BY last_name, first_name"
        ))
        .bind(active)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_student).collect()
    }

    async fn list_by_parent(&self, parent_id: UserId) -> Result<Vec<Student>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_STUDENT} WHERE parent_id = $1 ORDER BY last_name, first_name"
        ))
        .bind(parent_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_student).collect()
    }

    async fn list_by_parent_and_active(
        &self,
        parent_id: UserId,
        active: bool,
    ) -> Result<Vec<Student>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_STUDENT} WHERE parent_id = $1 AND active = $2 ORDER BY last_name, first_name"
        ))
        .bind(parent_id.0)
        .bind(active)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_student).collect()
    }

    async fn list_by_route(&self, route_id: RouteId) -> Result<Vec<Student>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_STUDENT} WHERE route_id = $1 ORDER BY last_name, first_name"
        ))
        .bind(route_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_student).collect()
    }

    async fn list_by_route_and_active(
        &self,
        route_id: RouteId,
        active: bool,
    ) -> Result<Vec<Student>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_STUDENT} WHERE route_id = $1 AND active = $2 ORDER BY last_name, first_name"
        ))
        .bind(route_id.0)
        .bind(active)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_student).collect()
    }

    async fn search_by_name(&self, term: &str) -> Result<Vec<Student>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_STUDENT} WHERE first_name ILIKE '%' || $1 || '%'
                OR last_name ILIKE '%' || $1 || '%'
             ORDER BY last_name, first_name"
        ))
        .bind(term)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_student).collect()
    }

    async fn exists_by_document(&self, document: &str) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM students WHERE document = $1)")
            .bind(document)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))
    }

    async fn count_by_active(&self, active: bool) -> Result<u64, RepositoryError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students WHERE active = $1")
                .bind(active)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(count as u64)
    }

    async fn count_by_parent(&self, parent_id: UserId) -> Result<u64, RepositoryError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students WHERE parent_id = $1")
                .bind(parent_id.0)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(count as u64)
    }

    async fn count_active_by_route(&self, route_id: RouteId) -> Result<u64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM students WHERE route_id = $1 AND active",
        )
        .bind(route_id.0)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(count as u64)
    }

    async fn count_all(&self) -> Result<u64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(count as u64)
    }

    async fn delete(&self, id: StudentId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(())
    }
}
