//! Defines the endpoint for creating a new account.

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    Error,
    account::core::{Account, AccountState, AccountType, BankLink, NewAccount, create_account},
    auth::UserID,
    db::lock_connection,
    money::currency_or_default,
};

/// The body of a request to create an account.
#[derive(Deserialize)]
pub struct AccountForm {
    /// The display name of the account.
    pub name: String,
    /// The kind of account, defaults to checking.
    #[serde(default, rename = "type")]
    pub account_type: AccountType,
    /// The opening balance, defaults to zero.
    #[serde(default)]
    pub balance: Decimal,
    /// The ISO 4217 currency code, defaults to EUR.
    pub currency: Option<String>,
    /// The optional bank connection.
    pub bank_link: Option<BankLink>,
    /// Whether the account is in use, defaults to true.
    pub is_active: Option<bool>,
}

impl AccountForm {
    fn into_new_account(self) -> Result<NewAccount, Error> {
        let name = self.name.trim();

        if name.is_empty() {
            return Err(Error::Validation("account name must not be empty".to_owned()));
        }

        Ok(NewAccount {
            name: name.to_owned(),
            account_type: self.account_type,
            balance: self.balance,
            currency: currency_or_default(self.currency.as_deref())?,
            bank_link: self.bank_link,
            is_active: self.is_active.unwrap_or(true),
        })
    }
}

/// A route handler for creating a new account, responds with the stored account.
pub async fn create_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    Json(form): Json<AccountForm>,
) -> Result<(StatusCode, Json<Account>), Error> {
    let new_account = form.into_new_account()?;
    let connection = lock_connection(&state.db_connection)?;

    let account = create_account(user_id, new_account, &connection)?;
    tracing::info!("user {user_id} created account {}", account.id);

    Ok((StatusCode::CREATED, Json(account)))
}
