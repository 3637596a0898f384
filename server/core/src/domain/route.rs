// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::user::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteId(pub Uuid);

impl RouteId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for RouteId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RouteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Coarse time-of-day classification of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Shift {
    Morning,
    Afternoon,
    Night,
}

impl Shift {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shift::Morning => "MORNING",
            Shift::Afternoon => "AFTERNOON",
            Shift::Night => "NIGHT",
        }
    }
}

impl std::str::FromStr for Shift {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MORNING" => Ok(Shift::Morning),
            "AFTERNOON" => Ok(Shift::Afternoon),
            "NIGHT" => Ok(Shift::Night),
            other => Err(DomainError::InvalidInput(format!(
                "unknown shift: {other} (use MORNING, AFTERNOON or NIGHT)"
            ))),
        }
    }
}

/// A scheduled transport run. Owns a capacity ceiling over its actively
/// assigned students; the count itself lives with the students.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub shift: Shift,
    pub max_capacity: i32,
    pub active: bool,
    pub driver_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRoute {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    pub shift: Shift,
    pub max_capacity: i32,
    #[serde(default)]
    pub driver_id: Option<UserId>,
}

impl NewRoute {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.code.trim().is_empty() {
            return Err(DomainError::InvalidInput("route code is required".into()));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidInput("route name is required".into()));
        }
        if self.max_capacity <= 0 {
            return Err(DomainError::InvalidInput(
                "maximum capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteUpdate {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub shift: Option<Shift>,
    pub max_capacity: Option<i32>,
    pub driver_id: Option<UserId>,
    pub active: Option<bool>,
}

/// Search parameters for the route screen: the first non-empty filter wins,
/// an empty set returns everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteSearch {
    pub code: Option<String>,
    pub name: Option<String>,
    pub shift: Option<Shift>,
    pub active: Option<bool>,
}

impl Route {
    pub fn new(candidate: &NewRoute) -> Self {
        let now = Utc::now();
        Self {
            id: RouteId::new(),
            code: candidate.code.trim().to_string(),
            name: candidate.name.trim().to_string(),
            description: candidate.description.clone(),
            start_time: candidate.start_time,
            end_time: candidate.end_time,
            shift: candidate.shift,
            max_capacity: candidate.max_capacity,
            active: true,
            driver_id: candidate.driver_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn toggle_active(&mut self) {
        self.active = !self.active;
    }

    pub fn apply_update(&mut self, update: &RouteUpdate) {
        if let Some(code) = &update.code {
            self.code = code.trim().to_string();
        }
        if let Some(name) = &update.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = &update.description {
            self.description = Some(description.clone());
        }
        if let Some(start_time) = update.start_time {
            self.start_time = Some(start_time);
        }
        if let Some(end_time) = update.end_time {
            self.end_time = Some(end_time);
        }
        if let Some(shift) = update.shift {
            self.shift = shift;
        }
        if let Some(max_capacity) = update.max_capacity {
            self.max_capacity = max_capacity;
        }
        if let Some(driver_id) = update.driver_id {
            self.driver_id = Some(driver_id);
        }
        if let Some(active) = update.active {
            self.active = active;
        }
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn occupancy_percentage(&self, assigned_active: u64) -> f64 {
        if self.max_capacity <= 0 {
            return 0.0;
        }
        (assigned_active as f64 * 100.0) / self.max_capacity as f64
    }

    pub fn has_spare_capacity(&self, assigned_active: u64) -> bool {
        (assigned_active as i64) < self.max_capacity as i64
    }
}

/// Per-shift and active/inactive tallies for the route dashboard card.
#[derive(Debug, Clone, Serialize)]
pub struct RouteStats {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    pub morning: u64,
    pub afternoon: u64,
    pub night: u64,
}
