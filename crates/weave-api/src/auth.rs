use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use weave_db::Database;
use weave_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};
use weave_types::models::{Role, User};

use crate::blocking;
use crate::error::ApiError;
use crate::validation;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    let username = validation::username(&req.username)?;
    let email = req.email.trim().to_lowercase();
    if !email.contains('@') || email.len() > 254 {
        return Err(ApiError::invalid("Email address is not valid"));
    }
    validation::password(&req.password)?;

    let response = blocking(&state, move |state| {
        if state.db.get_user_by_email(&email)?.is_some() {
            return Err(ApiError::Conflict("User with such email already exists".into()));
        }
        if state.db.get_user_by_username(&username)?.is_some() {
            return Err(ApiError::Conflict("Username is already taken".into()));
        }

        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| ApiError::OperationFailed(format!("password hashing failed: {}", e)))?
            .to_string();

        let user: User = state
            .db
            .create_user(Uuid::new_v4(), &username, &email, &password_hash, req.role)?
            .into();

        let token = create_token(state, user.id, &user.username, user.role)?;
        info!(user_id = %user.id, role = %user.role, "Registered user");
        Ok(AuthResponse { token, user })
    })
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();

    let response = blocking(&state, move |state| {
        let row = state
            .db
            .get_user_by_email(&email)?
            .ok_or(ApiError::Unauthenticated)?;

        // Verify password
        let parsed_hash = PasswordHash::new(&row.password)
            .map_err(|e| ApiError::OperationFailed(format!("stored hash unreadable: {}", e)))?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::Unauthenticated)?;

        let user: User = row.into();
        let token = create_token(state, user.id, &user.username, user.role)?;
        Ok(AuthResponse { token, user })
    })
    .await?;

    Ok(Json(response))
}

pub fn create_token(
    state: &AppStateInner,
    user_id: Uuid,
    username: &str,
    role: Role,
) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        role,
        exp: (chrono::Utc::now() + state.token_ttl).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::OperationFailed(format!("token signing failed: {}", e)))
}
