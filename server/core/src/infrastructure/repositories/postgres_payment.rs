// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! PostgreSQL `PaymentRepository` backed by the `payments` table via `sqlx`.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::payment::{Payment, PaymentId, PaymentStatus};
use crate::domain::repository::{PaymentRepository, RepositoryError};
use crate::domain::student::StudentId;
use crate::domain::user::UserId;

pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_payment(row: &PgRow) -> Result<Payment, RepositoryError> {
    let status_str: String = row.get("status");
    let status: PaymentStatus = status_str
        .parse()
        .map_err(|_| RepositoryError::Serialization(format!("unknown status: {status_str}")))?;
    Ok(Payment {
        id: PaymentId(row.get("id")),
        code: row.get("code"),
        amount: row.get("amount"),
        due_date: row.get("due_date"),
        payment_date: row.get("payment_date"),
        status,
        method: row.get("method"),
        month: row.get("month"),
        year: row.get("year"),
        concept: row.get("concept"),
        receipt: row.get("receipt"),
        student_id: StudentId(row.get("student_id")),
        parent_id: UserId(row.get("parent_id")),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const SELECT_PAYMENT: &str = r#"
    SELECT id, code, amount, due_date, payment_date, status, method, month,
           year, concept, receipt, student_id, parent_id, created_at,
           updated_at
    FROM payments
"#;

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn save(&self, payment: &Payment) -> Result<Payment, RepositoryError> {
        let mut row = payment.clone();
        row.updated_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, code, amount, due_date, payment_date, status, method,
                month, year, concept, receipt, student_id, parent_id,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15)
            ON CONFLICT (id) DO UPDATE SET
                code = EXCLUDED.code,
                amount = EXCLUDED.amount,
                due_date = EXCLUDED.due_date,
                payment_date = EXCLUDED.payment_date,
                status = EXCLUDED.status,
                method = EXCLUDED.method,
                month = EXCLUDED.month,
                year = EXCLUDED.year,
                concept = EXCLUDED.concept,
                receipt = EXCLUDED.receipt,
                student_id = EXCLUDED.student_id,
                parent_id = EXCLUDED.parent_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(row.id.0)
        .bind(&row.code)
        .bind(row.amount)
        .bind(row.due_date)
        .bind(row.payment_date)
        .bind(row.status.as_str())
        .bind(&row.method)
        .bind(&row.month)
        .bind(row.year)
        .bind(&row.concept)
        .bind(&row.receipt)
        .bind(row.student_id.0)
        .bind(row.parent_id.0)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("failed to save payment: {e}")))?;

        Ok(row)
    }

    async fn find_by_id(&self, id: PaymentId) -> Result<Option<Payment>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_PAYMENT} WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        row.as_ref().map(row_to_payment).transpose()
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Payment>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_PAYMENT} WHERE code = $1"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        row.as_ref().map(row_to_payment).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Payment>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_PAYMENT} ORDER BY code"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_payment).collect()
    }

    async fn list_by_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_PAYMENT} WHERE student_id = $1 ORDER BY code"
        ))
        .bind(student_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_payment).collect()
    }

    async fn list_by_parent(&self, parent_id: UserId) -> Result<Vec<Payment>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_PAYMENT} WHERE parent_id = $1 ORDER BY code"
        ))
        .bind(parent_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_payment).collect()
    }

    async fn list_by_status(
        &self,
        status: PaymentStatus,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_PAYMENT} WHERE status = $1 ORDER BY code"))
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_payment).collect()
    }

    async fn list_by_parent_and_status(
        &self,
        parent_id: UserId,
        status: PaymentStatus,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_PAYMENT} WHERE parent_id = $1 AND status = $2 ORDER BY code"
        ))
        .bind(parent_id.0)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_payment).collect()
    }

    async fn list_by_status_due_before(
        &self,
        status: PaymentStatus,
        date: NaiveDate,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_PAYMENT} WHERE status = $1 AND due_date < $2 ORDER BY due_date"
        ))
        .bind(status.as_str())
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_payment).collect()
    }

    async fn list_by_payment_date_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_PAYMENT} WHERE payment_date BETWEEN $1 AND $2 ORDER BY payment_date"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_payment).collect()
    }

    async fn list_by_status_and_payment_date_between(
        &self,
        status: PaymentStatus,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_PAYMENT} WHERE status = $1 AND payment_date BETWEEN $2 AND $3
             ORDER BY payment_date"
        ))
        .bind(status.as_str())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_payment).collect()
    }

    async fn search_by_code(&self, term: &str) -> Result<Vec<Payment>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_PAYMENT} WHERE code ILIKE '%' || $1 || '%' ORDER BY code"
        ))
        .bind(term)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.iter().map(row_to_payment).collect()
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM payments WHERE code = $1)")
            .bind(code)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))
    }

    async fn count_all(&self) -> Result<u64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM payments")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(count as u64)
    }

    async fn count_by_status(&self, status: PaymentStatus) -> Result<u64, RepositoryError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM payments WHERE status = $1")
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(count as u64)
    }

    async fn count_by_parent_and_status(
        &self,
        parent_id: UserId,
        status: PaymentStatus,
    ) -> Result<u64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM payments WHERE parent_id = $1 AND status = $2",
        )
        .bind(parent_id.0)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(count as u64)
    }

    async fn count_by_status_due_before(
        &self,
        status: PaymentStatus,
        date: NaiveDate,
    ) -> Result<u64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM payments WHERE status = $1 AND due_date < $2",
        )
        .bind(status.as_str())
        .bind(date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(count as u64)
    }

    async fn delete(&self, id: PaymentId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(())
    }
}
