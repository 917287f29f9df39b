//! The endpoint for registering a new user.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;
use time::Duration;

use crate::{
    AppState, Error,
    auth::{
        AuthResponse, JwtKeys, PasswordHash, ValidatedPassword, parse_email,
        token::encode_token, user::create_user,
    },
    db::lock_connection,
};

/// The state needed to register a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The keys used to sign new tokens.
    pub jwt_keys: JwtKeys,
    /// How long new tokens are valid for.
    pub token_duration: Duration,
    /// The bcrypt cost for hashing the new user's password.
    pub password_hash_cost: u32,
    /// The database connection for storing users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            jwt_keys: state.jwt_keys.clone(),
            token_duration: state.token_duration,
            password_hash_cost: state.password_hash_cost,
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The body of a registration request.
#[derive(Deserialize)]
pub struct RegisterForm {
    /// The name shown for the user.
    pub username: String,
    /// The email the user will log in with.
    pub email: String,
    /// The new password in plain text.
    pub password: String,
}

/// A route handler for registering a new user, responds with an auth token for the new user.
pub async fn register_user(
    State(state): State<RegistrationState>,
    Json(form): Json<RegisterForm>,
) -> Result<(StatusCode, Json<AuthResponse>), Error> {
    let username = form.username.trim();

    if username.is_empty() {
        return Err(Error::Validation("username must not be empty".to_owned()));
    }

    let email = parse_email(&form.email)?;
    let password = ValidatedPassword::new(&form.password, &[username, &email])?;
    let password_hash = PasswordHash::new(password, state.password_hash_cost)?;

    let user = {
        let connection = lock_connection(&state.db_connection)?;
        create_user(username, &email, password_hash, &connection)?
    };

    let token = encode_token(user.id, &state.jwt_keys, state.token_duration)?;
    tracing::info!("registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}
