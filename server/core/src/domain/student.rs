// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::route::RouteId;
use crate::domain::user::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentId(pub Uuid);

impl StudentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for StudentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StudentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A rider. Owned by a parent account; optionally assigned to one route,
/// subject to the route being active and having spare capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub document: String,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub grade: Option<String>,
    pub institution: Option<String>,
    pub active: bool,
    pub parent_id: UserId,
    pub route_id: Option<RouteId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub document: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    pub parent_id: UserId,
    #[serde(default)]
    pub route_id: Option<RouteId>,
}

impl NewStudent {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.first_name.trim().is_empty() {
            return Err(DomainError::InvalidInput("first name is required".into()));
        }
        if self.last_name.trim().is_empty() {
            return Err(DomainError::InvalidInput("last name is required".into()));
        }
        if self.document.trim().is_empty() {
            return Err(DomainError::InvalidInput("document is required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub document: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub grade: Option<String>,
    pub institution: Option<String>,
    pub parent_id: Option<UserId>,
    pub route_id: Option<RouteId>,
    pub active: Option<bool>,
}

impl Student {
    pub fn new(candidate: &NewStudent) -> Self {
        let now = Utc::now();
        Self {
            id: StudentId::new(),
            first_name: candidate.first_name.trim().to_string(),
            last_name: candidate.last_name.trim().to_string(),
            document: candidate.document.trim().to_string(),
            birth_date: candidate.birth_date,
            address: candidate.address.clone(),
            phone: candidate.phone.clone(),
            grade: candidate.grade.clone(),
            institution: candidate.institution.clone(),
            active: true,
            parent_id: candidate.parent_id,
            route_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn age(&self, today: NaiveDate) -> Option<i32> {
        self.birth_date.map(|born| today.year() - born.year())
    }

    pub fn toggle_active(&mut self) {
        self.active = !self.active;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Applies every field except `route_id`; assignment changes go through
    /// the capacity-guarded path in the student service.
    pub fn apply_update(&mut self, update: &StudentUpdate) {
        if let Some(first_name) = &update.first_name {
            self.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = &update.last_name {
            self.last_name = last_name.trim().to_string();
        }
        if let Some(document) = &update.document {
            self.document = document.trim().to_string();
        }
        if let Some(birth_date) = update.birth_date {
            self.birth_date = Some(birth_date);
        }
        if let Some(address) = &update.address {
            self.address = Some(address.clone());
        }
        if let Some(phone) = &update.phone {
            self.phone = Some(phone.clone());
        }
        if let Some(grade) = &update.grade {
            self.grade = Some(grade.clone());
        }
        if let Some(institution) = &update.institution {
            self.institution = Some(institution.clone());
        }
        if let Some(parent_id) = update.parent_id {
            self.parent_id = parent_id;
        }
        if let Some(active) = update.active {
            self.active = active;
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentStats {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
}
