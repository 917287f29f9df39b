//! The log-in endpoint that exchanges an email and password for an auth token.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    auth::{JwtKeys, UserProfile, get_user_by_email, token::encode_token},
    db::lock_connection,
};

/// The state needed to check credentials and hand out tokens.
#[derive(Debug, Clone)]
pub struct LogInState {
    /// The keys used to sign new tokens.
    pub jwt_keys: JwtKeys,
    /// How long new tokens are valid for.
    pub token_duration: Duration,
    /// The database connection for looking up users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            jwt_keys: state.jwt_keys.clone(),
            token_duration: state.token_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The body of a log-in request.
#[derive(Deserialize)]
pub struct LogInForm {
    /// The email the user registered with.
    pub email: String,
    /// The user's password in plain text.
    pub password: String,
}

/// The response to a successful registration or log-in.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// The token to send in the `Authorization` header of later requests.
    pub token: String,
    /// The user the token belongs to.
    pub user: UserProfile,
}

/// A route handler for logging in a user.
///
/// An unknown email and a wrong password get the same [Error::InvalidCredentials]
/// response so that clients cannot find out which emails are registered.
pub async fn post_log_in(
    State(state): State<LogInState>,
    Json(form): Json<LogInForm>,
) -> Result<Json<AuthResponse>, Error> {
    let user = {
        let connection = lock_connection(&state.db_connection)?;

        match get_user_by_email(&form.email, &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => return Err(Error::InvalidCredentials),
            Err(error) => return Err(error),
        }
    };

    if !user.password_hash.verify(&form.password)? {
        tracing::debug!("wrong password for user {}", user.id);
        return Err(Error::InvalidCredentials);
    }

    let token = encode_token(user.id, &state.jwt_keys, state.token_duration)?;
    tracing::info!("user {} logged in", user.id);

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}
