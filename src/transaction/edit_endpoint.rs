//! Defines the endpoint for changing a transaction.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    account::AccountId,
    auth::UserID,
    db::lock_connection,
    form::deserialize_nullable,
    transaction::{
        balance::{TransactionChanges, update_transaction},
        core::{Category, Transaction, TransactionId, TransactionState, TransactionType},
    },
};

/// The body of a request to change a transaction. Omitted fields keep their stored value.
/// A `null` `transfer_to` removes the receiving account of a transfer.
#[derive(Debug, Deserialize)]
pub struct EditTransactionForm {
    amount: Option<Decimal>,
    description: Option<String>,
    category: Option<Category>,
    date: Option<Date>,
    #[serde(rename = "type")]
    transaction_type: Option<TransactionType>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    transfer_to: Option<Option<AccountId>>,
}

impl From<EditTransactionForm> for TransactionChanges {
    fn from(form: EditTransactionForm) -> Self {
        Self {
            amount: form.amount,
            description: form.description,
            category: form.category,
            date: form.date,
            transaction_type: form.transaction_type,
            transfer_to: form.transfer_to,
        }
    }
}

/// A route handler for changing a transaction and moving the account balances to match.
pub async fn edit_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
    Json(form): Json<EditTransactionForm>,
) -> Result<Json<Transaction>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let transaction = update_transaction(user_id, transaction_id, form.into(), &connection)?;
    tracing::info!("user {user_id} updated transaction {transaction_id}");

    Ok(Json(transaction))
}
