//! Defines the endpoint for refreshing an account balance from its bank.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::core::{Account, AccountId, AccountState, get_owned_account},
    auth::UserID,
    db::lock_connection,
};

/// The result of a sync request.
#[derive(Debug, Serialize, Deserialize)]
pub struct SyncResponse {
    /// A human readable description of what happened.
    pub message: String,
    /// Whether the account has a bank link that could be synced.
    pub linked: bool,
    /// The account after syncing.
    pub account: Account,
}

/// A route handler for syncing an account with its bank.
///
/// No bank providers are integrated, so the account is returned unchanged along with a
/// message saying whether it has a bank link.
pub async fn sync_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<SyncResponse>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let account = get_owned_account(account_id, user_id, &connection)?;

    let (message, linked) = match &account.bank_link {
        Some(link) => {
            tracing::info!(
                "sync requested for account {account_id} linked to {}",
                link.provider
            );
            (
                format!("Balance sync with {} is not available yet", link.provider),
                true,
            )
        }
        None => ("Account has no bank link to sync with".to_owned(), false),
    };

    Ok(Json(SyncResponse {
        message,
        linked,
        account,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use rust_decimal_macros::dec;
    use serde_json::json;

    use crate::{
        account::core::Account,
        endpoints::{self, format_endpoint},
        test_utils::{must_create_account, must_register_user, test_server},
    };

    use super::SyncResponse;

    #[tokio::test]
    async fn sync_reports_missing_bank_link() {
        let server = test_server();
        let token = must_register_user(&server, "alice@example.com").await;
        let account = must_create_account(&server, &token, "Cash", dec!(20)).await;

        let response = server
            .post(&format_endpoint(endpoints::ACCOUNT_SYNC, account.id))
            .authorization_bearer(&token)
            .await;

        response.assert_status_ok();
        let body = response.json::<SyncResponse>();
        assert!(!body.linked);
        assert_eq!(body.account.balance, dec!(20));
    }

    #[tokio::test]
    async fn sync_of_linked_account_keeps_key_private() {
        let server = test_server();
        let token = must_register_user(&server, "alice@example.com").await;
        let account = server
            .post(endpoints::ACCOUNTS)
            .authorization_bearer(&token)
            .json(&json!({
                "name": "Giro",
                "bank_link": { "provider": "ExampleBank", "api_key": "hunter2" }
            }))
            .await
            .json::<Account>();

        let response = server
            .post(&format_endpoint(endpoints::ACCOUNT_SYNC, account.id))
            .authorization_bearer(&token)
            .await;

        response.assert_status_ok();
        assert!(response.json::<SyncResponse>().linked);
        assert!(!response.text().contains("hunter2"));
    }

    #[tokio::test]
    async fn sync_other_users_account_is_unauthorized() {
        let server = test_server();
        let alice = must_register_user(&server, "alice@example.com").await;
        let bob = must_register_user(&server, "bob@example.com").await;
        let account = must_create_account(&server, &alice, "Giro", dec!(1)).await;

        server
            .post(&format_endpoint(endpoints::ACCOUNT_SYNC, account.id))
            .authorization_bearer(&bob)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
