#![allow(missing_docs)]

use axum::http::StatusCode;
use axum_test::TestServer;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde_json::json;

use crate::{
    AppState, account::Account, auth::AuthResponse, build_router, endpoints, goal::Goal,
};

/// A password that zxcvbn rates as strong.
pub(crate) const TEST_PASSWORD: &str = "Xq7!mR2#vLp9@Tz";

/// App state backed by an in-memory database.
///
/// Uses the lowest bcrypt cost so that registering users in tests is fast.
pub(crate) fn test_state() -> AppState {
    let connection = Connection::open_in_memory().expect("Could not open database in memory.");
    let mut state = AppState::new(connection, "foobar").expect("Could not create app state.");
    state.password_hash_cost = 4;

    state
}

pub(crate) fn test_server() -> TestServer {
    TestServer::try_new(build_router(test_state())).expect("Could not create test server.")
}

/// Register a user with [TEST_PASSWORD] and return their auth token.
pub(crate) async fn must_register_user(server: &TestServer, email: &str) -> String {
    let username = email.split('@').next().unwrap_or(email);

    let response = server
        .post(endpoints::REGISTER)
        .json(&json!({
            "username": username,
            "email": email,
            "password": TEST_PASSWORD,
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    response.json::<AuthResponse>().token
}

pub(crate) async fn must_create_account(
    server: &TestServer,
    token: &str,
    name: &str,
    balance: Decimal,
) -> Account {
    let response = server
        .post(endpoints::ACCOUNTS)
        .authorization_bearer(token)
        .json(&json!({ "name": name, "balance": balance }))
        .await;

    response.assert_status(StatusCode::CREATED);
    response.json::<Account>()
}

/// Create a goal with a target of 1000 and nothing saved yet.
pub(crate) async fn must_create_goal(server: &TestServer, token: &str, name: &str) -> Goal {
    let response = server
        .post(endpoints::GOALS)
        .authorization_bearer(token)
        .json(&json!({ "name": name, "target_amount": 1000 }))
        .await;

    response.assert_status(StatusCode::CREATED);
    response.json::<Goal>()
}
