use serde::{Deserialize, Serialize};

use super::claims::Role;
use crate::error::{AppError, AppResult};

/// Request body for registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub role: Role,
    pub message: String,
}

fn require(value: &str, message: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(message.into()));
    }
    Ok(())
}

impl RegisterRequest {
    pub fn validate(&self) -> AppResult<()> {
        require(&self.username, "Username is required")?;
        require(&self.password, "Password is required")
    }
}

impl LoginRequest {
    pub fn validate(&self) -> AppResult<()> {
        require(&self.username, "Username is required")?;
        require(&self.password, "Password is required")
    }
}

pub fn registered_message(role: Role) -> &'static str {
    match role {
        Role::Driver => "Driver registered successfully",
        Role::Rider => "User registered successfully",
    }
}

pub fn login_message(role: Role) -> &'static str {
    match role {
        Role::Driver => "Driver login successful",
        Role::Rider => "User login successful",
    }
}
