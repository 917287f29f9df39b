//! Defines the endpoint for recording a new transaction.

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    account::AccountId,
    auth::UserID,
    db::lock_connection,
    transaction::{
        balance::create_transaction,
        core::{Category, Transaction, TransactionState, TransactionType, validate_description},
    },
};

/// The body of a request to record a transaction.
#[derive(Debug, Deserialize)]
pub struct TransactionForm {
    /// The account the transaction is recorded against.
    pub account_id: AccountId,
    /// The amount of money.
    pub amount: Decimal,
    /// What the transaction was for.
    pub description: String,
    /// The category, defaults to other.
    #[serde(default)]
    pub category: Category,
    /// When the transaction happened, defaults to today.
    pub date: Option<Date>,
    /// Whether the money comes in, goes out or moves to another account.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The receiving account of a transfer.
    pub transfer_to: Option<AccountId>,
}

/// A route handler for recording a transaction and updating the account balances it affects.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Json(form): Json<TransactionForm>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    let description = validate_description(&form.description)?;
    let mut builder = Transaction::build(
        form.account_id,
        form.amount,
        form.transaction_type,
        &description,
    )
    .category(form.category)
    .transfer_to(form.transfer_to);

    if let Some(date) = form.date {
        builder = builder.date(date);
    }

    let connection = lock_connection(&state.db_connection)?;
    let transaction = create_transaction(user_id, builder, &connection)?;
    tracing::info!(
        "user {user_id} recorded transaction {} on account {}",
        transaction.id,
        transaction.account_id
    );

    Ok((StatusCode::CREATED, Json(transaction)))
}
