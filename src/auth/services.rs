use tracing::{info, warn};

use super::{
    claims::Role,
    dto::{login_message, AuthResponse, LoginRequest, RegisterRequest},
    jwt::JwtKeys,
    password,
    repo::AccountStore,
};
use crate::error::{AppError, AppResult};

/// Stores a new account with an argon2-encoded password. Returns the role
/// that was registered.
pub async fn register(accounts: &dyn AccountStore, req: RegisterRequest) -> AppResult<Role> {
    req.validate()?;

    if accounts.find_by_username(&req.username).await?.is_some() {
        warn!(username = %req.username, "username already registered");
        return Err(AppError::DuplicateUsername);
    }

    let hash = password::hash_blocking(req.password).await?;

    // a concurrent registration can still win between the check and the insert
    let account = accounts
        .create(&req.username, &hash, req.role)
        .await?
        .ok_or(AppError::DuplicateUsername)?;

    info!(account_id = %account.id, username = %account.username, role = %account.role, "account registered");
    Ok(account.role)
}

/// Checks credentials and issues a token carrying the stored role.
pub async fn login(
    accounts: &dyn AccountStore,
    keys: &JwtKeys,
    req: LoginRequest,
) -> AppResult<AuthResponse> {
    req.validate()?;

    let Some(account) = accounts.find_by_username(&req.username).await? else {
        warn!(username = %req.username, "login unknown username");
        return Err(AppError::InvalidCredentials);
    };

    if !password::verify_blocking(req.password, account.password_hash.clone()).await? {
        warn!(username = %account.username, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = keys.issue(&account.username, account.role)?;

    info!(username = %account.username, role = %account.role, "logged in");
    Ok(AuthResponse {
        token,
        role: account.role,
        message: login_message(account.role).to_string(),
    })
}
