// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::student::StudentId;
use crate::domain::user::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(pub Uuid);

impl PaymentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Overdue => "OVERDUE",
            PaymentStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "OVERDUE" => Ok(PaymentStatus::Overdue),
            "CANCELLED" => Ok(PaymentStatus::Cancelled),
            other => Err(DomainError::InvalidInput(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

/// A billing record tied to one student and the paying parent.
///
/// `PAID` is terminal for `mark_paid`; the only programmatic transitions are
/// PENDING → PAID (confirmation) and PENDING → OVERDUE (sweep).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub code: String,
    pub amount: Decimal,
    pub due_date: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
    pub status: PaymentStatus,
    pub method: Option<String>,
    pub month: Option<String>,
    pub year: Option<i32>,
    pub concept: Option<String>,
    pub receipt: Option<String>,
    pub student_id: StudentId,
    pub parent_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
    /// Left empty to have a `PAG-<year>-<sequence>` code generated.
    #[serde(default)]
    pub code: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<PaymentStatus>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub concept: Option<String>,
    #[serde(default)]
    pub receipt: Option<String>,
    pub student_id: StudentId,
    pub parent_id: UserId,
}

impl NewPayment {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.amount <= Decimal::ZERO {
            return Err(DomainError::InvalidInput(
                "amount must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentUpdate {
    pub code: Option<String>,
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
    pub status: Option<PaymentStatus>,
    pub method: Option<String>,
    pub month: Option<String>,
    pub year: Option<i32>,
    pub concept: Option<String>,
    pub receipt: Option<String>,
}

impl Payment {
    pub fn new(candidate: &NewPayment, code: String) -> Self {
        let now = Utc::now();
        Self {
            id: PaymentId::new(),
            code,
            amount: candidate.amount,
            due_date: candidate.due_date,
            payment_date: None,
            status: candidate.status.unwrap_or(PaymentStatus::Pending),
            method: candidate.method.clone(),
            month: candidate.month.clone(),
            year: candidate.year,
            concept: candidate.concept.clone(),
            receipt: candidate.receipt.clone(),
            student_id: candidate.student_id,
            parent_id: candidate.parent_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        if self.status == PaymentStatus::Paid {
            return false;
        }
        match self.due_date {
            Some(due) => today > due,
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    /// Confirms the payment. Rejects a second confirmation.
    pub fn mark_paid(&mut self, method: Option<String>, today: NaiveDate) -> Result<(), DomainError> {
        if self.status == PaymentStatus::Paid {
            return Err(DomainError::InvalidState(
                format!("payment {} is already marked as paid", self.code),
            ));
        }
        self.status = PaymentStatus::Paid;
        self.payment_date = Some(today);
        if method.is_some() {
            self.method = method;
        }
        Ok(())
    }

    pub fn mark_overdue(&mut self) {
        self.status = PaymentStatus::Overdue;
    }

    pub fn apply_update(&mut self, update: &PaymentUpdate) {
        if let Some(code) = &update.code {
            self.code = code.trim().to_string();
        }
        if let Some(amount) = update.amount {
            self.amount = amount;
        }
        if let Some(due_date) = update.due_date {
            self.due_date = Some(due_date);
        }
        if let Some(payment_date) = update.payment_date {
            self.payment_date = Some(payment_date);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(method) = &update.method {
            self.method = Some(method.clone());
        }
        if let Some(month) = &update.month {
            self.month = Some(month.clone());
        }
        if let Some(year) = update.year {
            self.year = Some(year);
        }
        if let Some(concept) = &update.concept {
            self.concept = Some(concept.clone());
        }
        if let Some(receipt) = &update.receipt {
            self.receipt = Some(receipt.clone());
        }
    }
}

/// Money and count tallies for the billing dashboard card.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentStats {
    pub total: u64,
    pub pending: u64,
    pub overdue: u64,
    pub paid: u64,
    pub total_collected: Decimal,
    pub collected_this_month: Decimal,
    pub total_outstanding: Decimal,
}
