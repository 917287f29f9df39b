//! Defines the core data models and database queries for transactions.
//!
//! The functions here only touch the transaction table. Changes that must also
//! move money between accounts go through [crate::transaction::balance].

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::{Connection, Row, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    account::AccountId,
    db::{RowsAffected, sql_text_enum},
    money::get_decimal,
};

/// The database ID of a transaction.
pub type TransactionId = i64;

// ============================================================================
// MODELS
// ============================================================================

/// Whether a transaction brings money in, takes it out, or moves it between accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
    /// Money moved from one account to another.
    Transfer,
}

sql_text_enum!(TransactionType {
    Income => "income",
    Expense => "expense",
    Transfer => "transfer",
});

/// What a transaction was for.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Food and household supplies.
    Groceries,
    /// Rent, mortgage and utilities.
    Housing,
    /// Public transport, fuel and car costs.
    Transport,
    /// Going out, hobbies and subscriptions.
    Entertainment,
    /// Doctors, medicine and insurance.
    Health,
    /// Courses, books and tuition.
    Education,
    /// Salary and other earnings.
    Income,
    /// Anything else.
    #[default]
    Other,
}

sql_text_enum!(Category {
    Groceries => "groceries",
    Housing => "housing",
    Transport => "transport",
    Entertainment => "entertainment",
    Health => "health",
    Education => "education",
    Income => "income",
    Other => "other",
});

/// An expense, income or transfer recorded against an account.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The account the money comes from (or goes into, for income).
    pub account_id: AccountId,
    /// The amount of money, the type decides which way it moves.
    pub amount: Decimal,
    /// A text description of what the transaction was for.
    pub description: String,
    /// What the transaction was for.
    pub category: Category,
    /// When the transaction happened.
    pub date: Date,
    /// Whether the money came in, went out or moved between accounts.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The account that receives a transfer.
    pub transfer_to: Option<AccountId>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        account_id: AccountId,
        amount: Decimal,
        transaction_type: TransactionType,
        description: &str,
    ) -> TransactionBuilder {
        TransactionBuilder {
            account_id,
            amount,
            transaction_type,
            description: description.to_owned(),
            category: Category::default(),
            date: OffsetDateTime::now_utc().date(),
            transfer_to: None,
        }
    }

    /// The account that receives this transaction's money, if it is a transfer with a target.
    pub fn transfer_target(&self) -> Option<AccountId> {
        transfer_target(self.transaction_type, self.transfer_to)
    }
}

/// A builder for creating [Transaction] instances.
///
/// The category defaults to [Category::Other] and the date to today (UTC).
///
/// # Examples
///
/// ```ignore
/// use rust_decimal_macros::dec;
/// use time::macros::date;
///
/// use crate::transaction::{Category, Transaction, TransactionType};
///
/// let builder = Transaction::build(1, dec!(45.99), TransactionType::Expense, "Groceries")
///     .category(Category::Groceries)
///     .date(date!(2025 - 01 - 15));
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The account the transaction is recorded against.
    pub account_id: AccountId,
    /// The amount of money.
    pub amount: Decimal,
    /// Whether the money comes in, goes out or moves to another account.
    pub transaction_type: TransactionType,
    /// A human-readable description of the transaction.
    pub description: String,
    /// What the transaction was for.
    pub category: Category,
    /// The date when the transaction occurred.
    pub date: Date,
    /// The receiving account of a transfer. Ignored for other types.
    pub transfer_to: Option<AccountId>,
}

impl TransactionBuilder {
    /// Set the date of the transaction.
    pub fn date(mut self, date: Date) -> Self {
        self.date = date;
        self
    }

    /// Set the category of the transaction.
    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Set the receiving account of a transfer.
    pub fn transfer_to(mut self, transfer_to: Option<AccountId>) -> Self {
        self.transfer_to = transfer_to;
        self
    }

    /// The account that receives the money, if this is a transfer with a target.
    pub fn transfer_target(&self) -> Option<AccountId> {
        transfer_target(self.transaction_type, self.transfer_to)
    }
}

fn transfer_target(
    transaction_type: TransactionType,
    transfer_to: Option<AccountId>,
) -> Option<AccountId> {
    match transaction_type {
        TransactionType::Transfer => transfer_to,
        TransactionType::Income | TransactionType::Expense => None,
    }
}

/// The state needed by the transaction endpoints.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions and account balances.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Check that a description is not blank and trim it.
pub fn validate_description(description: &str) -> Result<String, Error> {
    let description = description.trim();

    if description.is_empty() {
        Err(Error::Validation(
            "transaction description must not be empty".to_owned(),
        ))
    } else {
        Ok(description.to_owned())
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                amount TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                date TEXT NOT NULL,
                transaction_type TEXT NOT NULL,
                transfer_to INTEGER,
                FOREIGN KEY(account_id) REFERENCES account(id) ON DELETE CASCADE,
                FOREIGN KEY(transfer_to) REFERENCES account(id) ON DELETE SET NULL
                )",
        (),
    )?;

    // Listing an account's transactions newest first is the main query.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_account_date ON \"transaction\"(account_id, date);",
        (),
    )?;

    Ok(())
}

const SELECT_TRANSACTION: &str = "SELECT id, account_id, amount, description, category, date, \
    transaction_type, transfer_to FROM \"transaction\"";

/// Map a database row to a [Transaction].
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        amount: get_decimal(row, 2)?,
        description: row.get(3)?,
        category: row.get(4)?,
        date: row.get(5)?,
        transaction_type: row.get(6)?,
        transfer_to: row.get(7)?,
    })
}

/// Insert a transaction row from a builder.
///
/// This does not touch any account balance.
///
/// # Errors
/// Returns [Error::SqlError] if the row could not be inserted, e.g. because the account does not exist.
pub fn insert_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transfer_to = builder.transfer_target();

    connection
        .prepare(
            "INSERT INTO \"transaction\" \
                (account_id, amount, description, category, date, transaction_type, transfer_to) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             RETURNING id, account_id, amount, description, category, date, transaction_type, transfer_to",
        )?
        .query_row(
            params![
                builder.account_id,
                builder.amount.to_string(),
                builder.description,
                builder.category,
                builder.date,
                builder.transaction_type,
                transfer_to,
            ],
            map_transaction_row,
        )
        .map_err(Error::from)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    connection
        .prepare(&format!("{SELECT_TRANSACTION} WHERE id = :id"))?
        .query_row(&[(":id", &id)], map_transaction_row)
        .map_err(Error::from)
}

/// Get the transactions recorded against `account_id`, newest first.
///
/// Transactions on the same date are ordered by most recently created first.
pub fn get_transactions_for_account(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_TRANSACTION} WHERE account_id = :account_id ORDER BY date DESC, id DESC"
        ))?
        .query_map(&[(":account_id", &account_id)], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Overwrite the stored fields of `transaction`, except for its account.
///
/// This does not touch any account balance.
pub fn update_transaction_row(
    transaction: &Transaction,
    connection: &Connection,
) -> Result<RowsAffected, Error> {
    connection
        .execute(
            "UPDATE \"transaction\" SET \
                amount = ?1, \
                description = ?2, \
                category = ?3, \
                date = ?4, \
                transaction_type = ?5, \
                transfer_to = ?6 \
            WHERE id = ?7",
            params![
                transaction.amount.to_string(),
                transaction.description,
                transaction.category,
                transaction.date,
                transaction.transaction_type,
                transaction.transfer_target(),
                transaction.id,
            ],
        )
        .map_err(Error::from)
}

/// Delete the transaction row with `id`.
///
/// This does not touch any account balance.
pub fn delete_transaction_row(
    id: TransactionId,
    connection: &Connection,
) -> Result<RowsAffected, Error> {
    connection
        .execute("DELETE FROM \"transaction\" WHERE id = :id", &[(":id", &id)])
        .map_err(Error::from)
}
