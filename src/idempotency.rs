//! Middleware that makes write requests safe to retry.
//!
//! A client that may send the same request more than once, such as the offline replay queue,
//! sets the [IDEMPOTENCY_KEY_HEADER] to a value that is unique to the request. The first
//! successful response for a key is stored and sent back verbatim for any later request with
//! the same key, without running the route handler again.

use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::{FromRef, Request, State},
    http::{HeaderValue, Method, StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, OptionalExtension};
use time::{Duration, OffsetDateTime};

use crate::{
    AppState, Error,
    auth::UserID,
    db::{RowsAffected, lock_connection},
};

/// The request header that carries the idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// The response header that marks a stored response being sent again.
pub const IDEMPOTENT_REPLAYED_HEADER: &str = "idempotent-replayed";

const MAX_KEY_LENGTH: usize = 255;

/// How long a stored response is kept before [prune_idempotency_keys] removes it.
pub const KEY_RETENTION: Duration = Duration::days(7);

/// The state needed for the idempotency middleware.
#[derive(Debug, Clone)]
pub struct IdempotencyState {
    /// The database connection holding the stored responses.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for IdempotencyState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Create the table for the stored responses.
pub fn create_idempotency_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS idempotency_key (
            user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            method TEXT NOT NULL,
            path TEXT NOT NULL,
            status INTEGER NOT NULL,
            body BLOB NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, key)
        )",
        (),
    )?;

    Ok(())
}

/// Delete the stored responses that are older than [KEY_RETENTION] at `now`.
///
/// A request retried after this will be applied again.
pub fn prune_idempotency_keys(
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<RowsAffected, Error> {
    let rows_deleted = connection.execute(
        "DELETE FROM idempotency_key WHERE created_at < ?1",
        (now - KEY_RETENTION,),
    )?;

    if rows_deleted > 0 {
        tracing::info!("pruned {rows_deleted} expired idempotency keys");
    }

    Ok(rows_deleted)
}

#[derive(Debug, Clone, PartialEq)]
struct StoredResponse {
    method: String,
    path: String,
    status: u16,
    body: Vec<u8>,
}

impl StoredResponse {
    fn into_response(self) -> Response {
        let Ok(status) = StatusCode::from_u16(self.status) else {
            tracing::error!("stored response has invalid status {}", self.status);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        };

        let mut response = (status, Body::from(self.body)).into_response();
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(IDEMPOTENT_REPLAYED_HEADER, HeaderValue::from_static("true"));

        response
    }
}

fn get_stored_response(
    state: &IdempotencyState,
    user_id: UserID,
    key: &str,
) -> Result<Option<StoredResponse>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    connection
        .query_row(
            "SELECT method, path, status, body FROM idempotency_key \
             WHERE user_id = ?1 AND key = ?2",
            (user_id, key),
            |row| {
                Ok(StoredResponse {
                    method: row.get(0)?,
                    path: row.get(1)?,
                    status: row.get(2)?,
                    body: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
}

fn store_response(
    state: &IdempotencyState,
    user_id: UserID,
    key: &str,
    response: &StoredResponse,
) -> Result<(), Error> {
    let connection = lock_connection(&state.db_connection)?;

    connection.execute(
        "INSERT OR IGNORE INTO idempotency_key \
            (user_id, key, method, path, status, body, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            user_id,
            key,
            &response.method,
            &response.path,
            response.status,
            &response.body,
            OffsetDateTime::now_utc(),
        ),
    )?;

    Ok(())
}

/// Get the idempotency key of a request, if it has a usable one.
fn get_key(request: &Request) -> Result<Option<String>, Error> {
    let Some(value) = request.headers().get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };

    let key = value
        .to_str()
        .map_err(|_| Error::Validation("idempotency key must be ASCII".to_owned()))?
        .trim();

    if key.is_empty() || key.len() > MAX_KEY_LENGTH {
        return Err(Error::Validation(format!(
            "idempotency key must be between 1 and {MAX_KEY_LENGTH} characters"
        )));
    }

    Ok(Some(key.to_owned()))
}

/// Middleware function that stores and replays responses to requests with an idempotency key.
///
/// Requests without a key and `GET` requests pass through untouched. Only successful
/// responses are stored, so a request that failed can be retried with the same key.
/// Reusing a key for a different method or path gives [Error::IdempotencyKeyReused].
///
/// **Note**: This must run after [crate::auth::auth_guard] since keys are scoped to the user.
pub async fn idempotency_guard(
    State(state): State<IdempotencyState>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::GET || request.method() == Method::HEAD {
        return next.run(request).await;
    }

    let key = match get_key(&request) {
        Ok(Some(key)) => key,
        Ok(None) => return next.run(request).await,
        Err(error) => return error.into_response(),
    };

    let Some(user_id) = request.extensions().get::<UserID>().copied() else {
        tracing::error!("idempotency key sent to a route without a user ID");
        return Error::MissingToken.into_response();
    };

    let method = request.method().to_string();
    let path = request.uri().path().to_owned();

    match get_stored_response(&state, user_id, &key) {
        Ok(Some(stored)) if stored.method == method && stored.path == path => {
            tracing::info!("replaying stored response for idempotency key {key}");
            return stored.into_response();
        }
        Ok(Some(stored)) => {
            tracing::warn!(
                "idempotency key {key} was used for {} {} and now for {method} {path}",
                stored.method,
                stored.path
            );
            return Error::IdempotencyKeyReused.into_response();
        }
        Ok(None) => {}
        Err(error) => return error.into_response(),
    }

    let response = next.run(request).await;

    if !response.status().is_success() {
        return response;
    }

    let (parts, body) = response.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let stored = StoredResponse {
        method,
        path,
        status: parts.status.as_u16(),
        body: body_bytes.to_vec(),
    };

    // The write already happened, so the client still gets its response if storing fails.
    if let Err(error) = store_response(&state, user_id, &key, &stored) {
        tracing::error!("could not store response for idempotency key {key}: {error}");
    }

    Response::from_parts(parts, Body::from(body_bytes))
}
