// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Account role. Carried as a tagged enum end-to-end; any wire format
/// (headers, session attributes) is translated at the presentation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Parent,
    Driver,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Parent => "PARENT",
            Role::Driver => "DRIVER",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "PARENT" => Ok(Role::Parent),
            "DRIVER" => Ok(Role::Driver),
            other => Err(DomainError::InvalidInput(format!("unknown role: {other}"))),
        }
    }
}

/// A user account: one identity, exactly one role, plus the role-conditional
/// profile blocks (driver licensing, parent emergency contact).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,

    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub birth_date: Option<NaiveDate>,

    // Driver-only fields
    pub license_number: Option<String>,
    pub license_expiry: Option<NaiveDate>,
    pub license_class: Option<String>,
    pub vehicle_plate: Option<String>,

    // Parent-only fields
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,

    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Candidate for account creation. The raw password is hashed by the user
/// service before a `User` ever exists.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub national_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub license_expiry: Option<NaiveDate>,
    #[serde(default)]
    pub license_class: Option<String>,
    #[serde(default)]
    pub vehicle_plate: Option<String>,
    #[serde(default)]
    pub emergency_contact_name: Option<String>,
    #[serde(default)]
    pub emergency_contact_phone: Option<String>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.username.trim().is_empty() {
            return Err(DomainError::InvalidInput("username is required".into()));
        }
        if self.password.is_empty() {
            return Err(DomainError::InvalidInput("password is required".into()));
        }
        if self.email.trim().is_empty() {
            return Err(DomainError::InvalidInput("email is required".into()));
        }
        if self.full_name.trim().is_empty() {
            return Err(DomainError::InvalidInput("full name is required".into()));
        }
        Ok(())
    }
}

/// Field set an account update may carry. `None` leaves the stored value
/// untouched; the password, when present, is re-hashed by the service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub license_number: Option<String>,
    pub license_expiry: Option<NaiveDate>,
    pub license_class: Option<String>,
    pub vehicle_plate: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub active: Option<bool>,
}

impl User {
    pub fn new(candidate: &NewUser, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            username: candidate.username.trim().to_string(),
            password_hash,
            role: candidate.role,
            full_name: candidate.full_name.trim().to_string(),
            email: candidate.email.trim().to_string(),
            phone: candidate.phone.clone(),
            national_id: candidate.national_id.clone(),
            address: candidate.address.clone(),
            city: candidate.city.clone(),
            birth_date: candidate.birth_date,
            license_number: candidate.license_number.clone(),
            license_expiry: candidate.license_expiry,
            license_class: candidate.license_class.clone(),
            vehicle_plate: candidate.vehicle_plate.clone(),
            emergency_contact_name: candidate.emergency_contact_name.clone(),
            emergency_contact_phone: candidate.emergency_contact_phone.clone(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn toggle_active(&mut self) {
        self.active = !self.active;
    }

    pub fn apply_update(&mut self, update: &UserUpdate) {
        if let Some(username) = &update.username {
            self.username = username.trim().to_string();
        }
        if let Some(role) = update.role {
            self.role = role;
        }
        if let Some(full_name) = &update.full_name {
            self.full_name = full_name.trim().to_string();
        }
        if let Some(email) = &update.email {
            self.email = email.trim().to_string();
        }
        if let Some(phone) = &update.phone {
            self.phone = Some(phone.clone());
        }
        if let Some(national_id) = &update.national_id {
            self.national_id = Some(national_id.clone());
        }
        if let Some(address) = &update.address {
            self.address = Some(address.clone());
        }
        if let Some(city) = &update.city {
            self.city = Some(city.clone());
        }
        if let Some(birth_date) = update.birth_date {
            self.birth_date = Some(birth_date);
        }
        if let Some(license_number) = &update.license_number {
            self.license_number = Some(license_number.clone());
        }
        if let Some(license_expiry) = update.license_expiry {
            self.license_expiry = Some(license_expiry);
        }
        if let Some(license_class) = &update.license_class {
            self.license_class = Some(license_class.clone());
        }
        if let Some(vehicle_plate) = &update.vehicle_plate {
            self.vehicle_plate = Some(vehicle_plate.clone());
        }
        if let Some(name) = &update.emergency_contact_name {
            self.emergency_contact_name = Some(name.clone());
        }
        if let Some(phone) = &update.emergency_contact_phone {
            self.emergency_contact_phone = Some(phone.clone());
        }
        if let Some(active) = update.active {
            self.active = active;
        }
    }
}

/// An already-authenticated caller: id plus exactly one role, resolved by
/// the external session layer before a request reaches the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
