//! Defines the endpoint for deleting an account.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

use crate::{
    Error,
    account::core::{AccountId, AccountState, delete_account, get_owned_account},
    auth::UserID,
    db::lock_connection,
};

/// A route handler for deleting an account and its transactions.
///
/// Balances of other accounts are left as they are, including those that received
/// transfers from the deleted account.
pub async fn delete_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Value>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_owned_account(account_id, user_id, &connection)?;

    match delete_account(account_id, &connection)? {
        0 => Err(Error::NotFound),
        _ => {
            tracing::info!("user {user_id} deleted account {account_id}");
            Ok(Json(json!({ "message": "Account removed" })))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use rust_decimal_macros::dec;
    use serde_json::json;

    use crate::{
        endpoints::{self, format_endpoint},
        test_utils::{must_create_account, must_register_user, test_server},
    };

    #[tokio::test]
    async fn delete_account_removes_it_and_its_transactions() {
        let server = test_server();
        let token = must_register_user(&server, "alice@example.com").await;
        let account = must_create_account(&server, &token, "Giro", dec!(100)).await;
        server
            .post(endpoints::TRANSACTIONS)
            .authorization_bearer(&token)
            .json(&json!({
                "account_id": account.id,
                "amount": 10,
                "type": "expense",
                "description": "Lunch",
            }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .delete(&format_endpoint(endpoints::ACCOUNT, account.id))
            .authorization_bearer(&token)
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({ "message": "Account removed" }));
        server
            .get(&format_endpoint(endpoints::ACCOUNT, account.id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .get(&format_endpoint(endpoints::ACCOUNT_TRANSACTIONS, account.id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_other_users_account_is_unauthorized() {
        let server = test_server();
        let alice = must_register_user(&server, "alice@example.com").await;
        let bob = must_register_user(&server, "bob@example.com").await;
        let account = must_create_account(&server, &alice, "Giro", dec!(100)).await;

        server
            .delete(&format_endpoint(endpoints::ACCOUNT, account.id))
            .authorization_bearer(&bob)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn delete_missing_account_is_not_found() {
        let server = test_server();
        let token = must_register_user(&server, "alice@example.com").await;

        server
            .delete(&format_endpoint(endpoints::ACCOUNT, 12))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
