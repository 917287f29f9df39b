//! Authentication middleware that checks the auth token sent with each request.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{
    AppState, Error,
    auth::{JwtKeys, UserID, token::decode_token},
};

/// The header older clients send the token in instead of `Authorization`.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// The state needed for the auth middleware
#[derive(Debug, Clone)]
pub struct AuthState {
    /// The keys for verifying auth tokens.
    pub jwt_keys: JwtKeys,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            jwt_keys: state.jwt_keys.clone(),
        }
    }
}

/// Get the raw token from the `Authorization: Bearer` header, falling back to [AUTH_TOKEN_HEADER].
async fn get_token(parts: &mut Parts) -> Option<String> {
    if let Ok(TypedHeader(Authorization(bearer))) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, &()).await
    {
        return Some(bearer.token().to_owned());
    }

    parts
        .headers
        .get(AUTH_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|token| token.trim().to_owned())
        .filter(|token| !token.is_empty())
}

/// Middleware function that checks for a valid auth token.
///
/// The user ID is placed into the request and then the request executed normally if the token
/// is valid, otherwise a 401 response is returned and the route handler never runs.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    let user_id: UserID = match get_token(&mut parts).await {
        Some(token) => match decode_token(&token, &state.jwt_keys) {
            Ok(claims) => claims.id,
            Err(error) => return error.into_response(),
        },
        None => {
            tracing::debug!("no auth token for {} {}", parts.method, parts.uri.path());
            return Error::MissingToken.into_response();
        }
    };

    parts.extensions.insert(user_id);
    next.run(Request::from_parts(parts, body)).await
}
