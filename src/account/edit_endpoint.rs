//! Defines the endpoint for updating an account.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    Error,
    account::core::{
        Account, AccountId, AccountState, AccountType, BankLink, get_owned_account,
        update_account,
    },
    auth::UserID,
    db::lock_connection,
    money::normalize_currency,
};

/// The body of a request to update an account. Omitted fields keep their stored value.
#[derive(Default, Deserialize)]
pub struct EditAccountForm {
    name: Option<String>,
    #[serde(rename = "type")]
    account_type: Option<AccountType>,
    balance: Option<Decimal>,
    currency: Option<String>,
    bank_link: Option<BankLink>,
    is_active: Option<bool>,
}

impl EditAccountForm {
    fn apply(self, mut account: Account) -> Result<Account, Error> {
        if let Some(name) = self.name {
            let name = name.trim();

            if name.is_empty() {
                return Err(Error::Validation("account name must not be empty".to_owned()));
            }

            account.name = name.to_owned();
        }

        if let Some(account_type) = self.account_type {
            account.account_type = account_type;
        }

        // A manual balance edit acts as a new opening balance.
        if let Some(balance) = self.balance {
            account.balance = balance;
        }

        if let Some(currency) = self.currency {
            account.currency = normalize_currency(&currency)?;
        }

        if let Some(mut bank_link) = self.bank_link {
            // The key is never sent to clients, so clients cannot send it back.
            if bank_link.api_key.is_none() {
                bank_link.api_key = account.bank_link.and_then(|link| link.api_key);
            }

            account.bank_link = Some(bank_link);
        }

        if let Some(is_active) = self.is_active {
            account.is_active = is_active;
        }

        Ok(account)
    }
}

/// A route handler for updating an account of the logged-in user.
pub async fn edit_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    Path(account_id): Path<AccountId>,
    Json(form): Json<EditAccountForm>,
) -> Result<Json<Account>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let account = get_owned_account(account_id, user_id, &connection)?;
    let account = update_account(form.apply(account)?, &connection)?;
    tracing::info!("user {user_id} updated account {account_id}");

    Ok(Json(account))
}


#[cfg(test)]
mod apply_tests {
    use rust_decimal_macros::dec;
    use time::OffsetDateTime;

    use crate::{
        account::core::{Account, AccountType, BankLink},
        auth::UserID,
    };

    use super::EditAccountForm;

    fn linked_account() -> Account {
        Account {
            id: 1,
            user_id: UserID::new(1),
            name: "Giro".to_owned(),
            account_type: AccountType::Checking,
            balance: dec!(5),
            currency: "EUR".to_owned(),
            bank_link: Some(BankLink {
                provider: "ExampleBank".to_owned(),
                external_account_id: Some("1".to_owned()),
                api_key: Some("secret".to_owned()),
            }),
            is_active: true,
            last_updated: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn new_bank_link_without_key_keeps_old_key() {
        let form = EditAccountForm {
            bank_link: Some(BankLink {
                provider: "OtherBank".to_owned(),
                external_account_id: None,
                api_key: None,
            }),
            ..Default::default()
        };

        let account = form.apply(linked_account()).unwrap();

        let bank_link = account.bank_link.unwrap();
        assert_eq!(bank_link.provider, "OtherBank");
        assert_eq!(bank_link.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn balance_edit_replaces_balance() {
        let form = EditAccountForm {
            balance: Some(dec!(-20)),
            ..Default::default()
        };

        let account = form.apply(linked_account()).unwrap();

        assert_eq!(account.balance, dec!(-20));
    }
}
