use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::{Connection, Row, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::UserID,
    db::{RowsAffected, sql_text_enum},
    money::get_decimal,
};

/// The database ID of an account.
pub type AccountId = i64;

/// The kind of account money is held in.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// An everyday bank account.
    #[default]
    Checking,
    /// A savings account.
    Savings,
    /// A credit card.
    Credit,
    /// Physical cash.
    Cash,
    /// Anything else.
    Other,
}

sql_text_enum!(AccountType {
    Checking => "checking",
    Savings => "savings",
    Credit => "credit",
    Cash => "cash",
    Other => "other",
});

/// The details needed to fetch an account's balance from a bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankLink {
    /// The name of the bank or aggregator.
    pub provider: String,
    /// The account's ID at the provider.
    #[serde(default)]
    pub external_account_id: Option<String>,
    /// The credential for the provider's API. Accepted in requests but never sent back.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

/// A bank account, credit card or cash wallet owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The user that owns the account.
    pub user_id: UserID,
    /// The display name of the account.
    pub name: String,
    /// The kind of account.
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// The current balance, may be negative.
    pub balance: Decimal,
    /// The ISO 4217 currency code of the balance.
    pub currency: String,
    /// The optional bank connection.
    pub bank_link: Option<BankLink>,
    /// Whether the account is still in use.
    pub is_active: bool,
    /// When the account or its balance last changed.
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

/// The fields of an account that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    /// The display name of the account.
    pub name: String,
    /// The kind of account.
    pub account_type: AccountType,
    /// The opening balance.
    pub balance: Decimal,
    /// The upper-case ISO 4217 currency code.
    pub currency: String,
    /// The optional bank connection.
    pub bank_link: Option<BankLink>,
    /// Whether the account is in use.
    pub is_active: bool,
}

/// The state needed by the account endpoints.
#[derive(Debug, Clone)]
pub struct AccountState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            account_type TEXT NOT NULL,
            balance TEXT NOT NULL,
            currency TEXT NOT NULL,
            bank_provider TEXT,
            bank_account_id TEXT,
            bank_api_key TEXT,
            is_active INTEGER NOT NULL,
            last_updated TEXT NOT NULL
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_account_user_id ON account(user_id)",
        (),
    )?;

    Ok(())
}

const SELECT_ACCOUNT: &str = "SELECT id, user_id, name, account_type, balance, currency, \
    bank_provider, bank_account_id, bank_api_key, is_active, last_updated FROM account";

pub fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    let bank_provider: Option<String> = row.get(6)?;
    let bank_link = match bank_provider {
        Some(provider) => Some(BankLink {
            provider,
            external_account_id: row.get(7)?,
            api_key: row.get(8)?,
        }),
        None => None,
    };

    Ok(Account {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        account_type: row.get(3)?,
        balance: get_decimal(row, 4)?,
        currency: row.get(5)?,
        bank_link,
        is_active: row.get(9)?,
        last_updated: row.get(10)?,
    })
}

/// Insert a new account for `user_id`.
///
/// # Errors
/// Returns [Error::SqlError] if the account could not be inserted.
pub fn create_account(
    user_id: UserID,
    account: NewAccount,
    connection: &Connection,
) -> Result<Account, Error> {
    let last_updated = OffsetDateTime::now_utc();
    let bank_link = account.bank_link.as_ref();

    connection.execute(
        "INSERT INTO account (user_id, name, account_type, balance, currency, bank_provider, \
            bank_account_id, bank_api_key, is_active, last_updated) \
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            user_id,
            account.name,
            account.account_type,
            account.balance.to_string(),
            account.currency,
            bank_link.map(|link| &link.provider),
            bank_link.and_then(|link| link.external_account_id.as_ref()),
            bank_link.and_then(|link| link.api_key.as_ref()),
            account.is_active,
            last_updated,
        ],
    )?;

    Ok(Account {
        id: connection.last_insert_rowid(),
        user_id,
        name: account.name,
        account_type: account.account_type,
        balance: account.balance,
        currency: account.currency,
        bank_link: account.bank_link,
        is_active: account.is_active,
        last_updated,
    })
}

/// Get an account regardless of who owns it.
///
/// # Errors
/// Returns [Error::NotFound] if there is no account with `id`.
pub fn get_account(id: AccountId, connection: &Connection) -> Result<Account, Error> {
    connection
        .prepare(&format!("{SELECT_ACCOUNT} WHERE id = :id"))?
        .query_row(&[(":id", &id)], map_row_to_account)
        .map_err(Error::from)
}

/// Get an account and check that it belongs to `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no account with `id`, or
/// [Error::Unauthorized] if the account belongs to another user.
pub fn get_owned_account(
    id: AccountId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Account, Error> {
    let account = get_account(id, connection)?;

    if account.user_id == user_id {
        Ok(account)
    } else {
        tracing::warn!("user {user_id} tried to access account {id} of another user");
        Err(Error::Unauthorized)
    }
}

/// Get all of the accounts owned by `user_id`, oldest first.
pub fn get_accounts_for_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Account>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_ACCOUNT} WHERE user_id = :user_id ORDER BY id ASC"
        ))?
        .query_map(&[(":user_id", &user_id)], map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(Error::from))
        .collect()
}

/// Overwrite every stored field of `account` and stamp it with the current time.
///
/// Returns the account as stored.
pub fn update_account(mut account: Account, connection: &Connection) -> Result<Account, Error> {
    account.last_updated = OffsetDateTime::now_utc();
    let bank_link = account.bank_link.as_ref();

    let rows_affected = connection.execute(
        "UPDATE account SET \
            name = ?1, \
            account_type = ?2, \
            balance = ?3, \
            currency = ?4, \
            bank_provider = ?5, \
            bank_account_id = ?6, \
            bank_api_key = ?7, \
            is_active = ?8, \
            last_updated = ?9 \
        WHERE id = ?10",
        params![
            account.name,
            account.account_type,
            account.balance.to_string(),
            account.currency,
            bank_link.map(|link| &link.provider),
            bank_link.and_then(|link| link.external_account_id.as_ref()),
            bank_link.and_then(|link| link.api_key.as_ref()),
            account.is_active,
            account.last_updated,
            account.id,
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(account)
}

/// Set the balance of account `id` and stamp `last_updated` with `now`.
pub fn set_account_balance(
    id: AccountId,
    balance: Decimal,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<RowsAffected, Error> {
    connection
        .execute(
            "UPDATE account SET balance = ?1, last_updated = ?2 WHERE id = ?3",
            params![balance.to_string(), now, id],
        )
        .map_err(Error::from)
}

/// Delete account `id`. Its transactions are deleted along with it.
pub fn delete_account(id: AccountId, connection: &Connection) -> Result<RowsAffected, Error> {
    connection
        .execute("DELETE FROM account WHERE id = :id", &[(":id", &id)])
        .map_err(Error::from)
}
