//! Defines the endpoints for reading transactions.

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{
    Error,
    account::{AccountId, get_owned_account},
    auth::UserID,
    db::lock_connection,
    transaction::{
        balance::get_owned_transaction,
        core::{Transaction, TransactionId, TransactionState, get_transactions_for_account},
    },
};

/// A route handler that lists the transactions of one account, newest first.
pub async fn get_account_transactions_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_owned_account(account_id, user_id, &connection)?;
    get_transactions_for_account(account_id, &connection).map(Json)
}

/// A route handler that gets a single transaction.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<Transaction>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_owned_transaction(transaction_id, user_id, &connection).map(Json)
}
