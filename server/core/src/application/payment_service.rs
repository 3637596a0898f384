// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Billing: payment registration with generated `PAG-<year>-<seq>` codes,
//! confirmation, the overdue sweep, and the money tallies behind the
//! dashboard cards.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::domain::error::DomainError;
use crate::domain::payment::{
    NewPayment, Payment, PaymentId, PaymentStats, PaymentStatus, PaymentUpdate,
};
use crate::domain::repository::{PaymentRepository, StudentRepository, UserRepository};
use crate::domain::student::StudentId;
use crate::domain::user::{Role, UserId};

pub struct PaymentService {
    payments: Arc<dyn PaymentRepository>,
    students: Arc<dyn StudentRepository>,
    users: Arc<dyn UserRepository>,
}

impl PaymentService {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        students: Arc<dyn StudentRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            payments,
            students,
            users,
        }
    }

    /// Next free `PAG-<year>-<seq>` code, seeded from the current row count.
    async fn generate_code(&self) -> Result<String, DomainError> {
        let year = Utc::now().year();
        let mut seq = self.payments.count_all().await? + 1;
        loop {
            let code = format!("PAG-{year}-{seq:04}");
            if !self.payments.exists_by_code(&code).await? {
                return Ok(code);
            }
            seq += 1;
        }
    }

    pub async fn create_payment(&self, candidate: NewPayment) -> Result<Payment, DomainError> {
        candidate.validate()?;

        self.students
            .find_by_id(candidate.student_id)
            .await?
            .ok_or_else(|| DomainError::InvalidReference("student does not exist".into()))?;
        let parent = self
            .users
            .find_by_id(candidate.parent_id)
            .await?
            .ok_or_else(|| DomainError::InvalidReference("parent does not exist".into()))?;
        if parent.role != Role::Parent {
            return Err(DomainError::InvalidReference(format!(
                "user '{}' is not a parent account",
                parent.username
            )));
        }

        let code = match candidate.code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                if self.payments.exists_by_code(code).await? {
                    return Err(DomainError::DuplicateKey(format!(
                        "payment code '{code}' is already in use"
                    )));
                }
                code.to_string()
            }
            _ => self.generate_code().await?,
        };

        let payment = Payment::new(&candidate, code);
        Ok(self.payments.save(&payment).await?)
    }

    pub async fn get_payment(&self, id: PaymentId) -> Result<Payment, DomainError> {
        self.payments
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("payment"))
    }

    pub async fn get_by_code(&self, code: &str) -> Result<Payment, DomainError> {
        self.payments
            .find_by_code(code)
            .await?
            .ok_or_else(|| DomainError::not_found("payment"))
    }

    pub async fn list_payments(&self) -> Result<Vec<Payment>, DomainError> {
        Ok(self.payments.list_all().await?)
    }

    /// Pending payments whose due date already passed: the sweep's input.
    pub async fn list_due(&self, today: NaiveDate) -> Result<Vec<Payment>, DomainError> {
        Ok(self
            .payments
            .list_by_status_due_before(PaymentStatus::Pending, today)
            .await?)
    }

    pub async fn list_paid_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Payment>, DomainError> {
        Ok(self
            .payments
            .list_by_status_and_payment_date_between(PaymentStatus::Paid, from, to)
            .await?)
    }

    pub async fn list_by_parent(&self, parent_id: UserId) -> Result<Vec<Payment>, DomainError> {
        Ok(self.payments.list_by_parent(parent_id).await?)
    }

    pub async fn list_by_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<Payment>, DomainError> {
        Ok(self.payments.list_by_student(student_id).await?)
    }

    pub async fn list_by_status(
        &self,
        status: PaymentStatus,
    ) -> Result<Vec<Payment>, DomainError> {
        Ok(self.payments.list_by_status(status).await?)
    }

    pub async fn list_by_parent_and_status(
        &self,
        parent_id: UserId,
        status: PaymentStatus,
    ) -> Result<Vec<Payment>, DomainError> {
        Ok(self.payments.list_by_parent_and_status(parent_id, status).await?)
    }

    pub async fn search_by_code(&self, term: &str) -> Result<Vec<Payment>, DomainError> {
        Ok(self.payments.search_by_code(term).await?)
    }

    /// The parent's most recent payments, newest first.
    pub async fn recent_by_parent(
        &self,
        parent_id: UserId,
        limit: usize,
    ) -> Result<Vec<Payment>, DomainError> {
        let mut payments = self.payments.list_by_parent(parent_id).await?;
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        payments.truncate(limit);
        Ok(payments)
    }

    /// Confirms a payment. A second confirmation is rejected rather than
    /// silently overwriting the recorded date and method.
    pub async fn mark_paid(
        &self,
        id: PaymentId,
        method: Option<String>,
    ) -> Result<Payment, DomainError> {
        let mut payment = self.get_payment(id).await?;
        payment.mark_paid(method, Utc::now().date_naive())?;
        Ok(self.payments.save(&payment).await?)
    }

    pub async fn mark_overdue(&self, id: PaymentId) -> Result<Payment, DomainError> {
        let mut payment = self.get_payment(id).await?;
        payment.mark_overdue();
        Ok(self.payments.save(&payment).await?)
    }

    /// Moves every pending payment whose due date passed before `today`
    /// into `OVERDUE`. Re-running the sweep finds nothing new to do.
    pub async fn sweep_overdue(&self, today: NaiveDate) -> Result<usize, DomainError> {
        let stale = self
            .payments
            .list_by_status_due_before(PaymentStatus::Pending, today)
            .await?;
        let count = stale.len();
        for mut payment in stale {
            payment.mark_overdue();
            self.payments.save(&payment).await?;
        }
        Ok(count)
    }

    pub async fn update_payment(
        &self,
        id: PaymentId,
        update: PaymentUpdate,
    ) -> Result<Payment, DomainError> {
        let mut payment = self.get_payment(id).await?;
        if let Some(code) = &update.code {
            let code = code.trim();
            if code != payment.code && self.payments.exists_by_code(code).await? {
                return Err(DomainError::DuplicateKey(format!(
                    "payment code '{code}' is already in use"
                )));
            }
        }
        if let Some(amount) = update.amount {
            if amount <= Decimal::ZERO {
                return Err(DomainError::InvalidInput(
                    "amount must be greater than zero".into(),
                ));
            }
        }
        payment.apply_update(&update);
        Ok(self.payments.save(&payment).await?)
    }

    pub async fn delete_payment(&self, id: PaymentId) -> Result<(), DomainError> {
        self.get_payment(id).await?;
        self.payments.delete(id).await?;
        Ok(())
    }

    pub async fn stats(&self, today: NaiveDate) -> Result<PaymentStats, DomainError> {
        let paid = self.payments.list_by_status(PaymentStatus::Paid).await?;
        let total_collected: Decimal = paid.iter().map(|p| p.amount).sum();

        let month_start = today.with_day(1).unwrap_or(today);
        let collected_this_month: Decimal = self
            .payments
            .list_by_status_and_payment_date_between(PaymentStatus::Paid, month_start, today)
            .await?
            .iter()
            .map(|p| p.amount)
            .sum();

        let pending = self.payments.list_by_status(PaymentStatus::Pending).await?;
        let overdue = self.payments.list_by_status(PaymentStatus::Overdue).await?;
        let total_outstanding: Decimal = pending
            .iter()
            .chain(overdue.iter())
            .map(|p| p.amount)
            .sum();

        Ok(PaymentStats {
            total: self.payments.count_all().await?,
            pending: pending.len() as u64,
            overdue: overdue.len() as u64,
            paid: paid.len() as u64,
            total_collected,
            collected_this_month,
            total_outstanding,
        })
    }
}
