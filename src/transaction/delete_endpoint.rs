//! Defines the endpoint for deleting a transaction.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

use crate::{
    Error,
    auth::UserID,
    db::lock_connection,
    transaction::{
        balance::delete_transaction,
        core::{TransactionId, TransactionState},
    },
};

/// A route handler for deleting a transaction and reversing its effect on account balances.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<Value>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_transaction(user_id, transaction_id, &connection)?;
    tracing::info!("user {user_id} deleted transaction {transaction_id}");

    Ok(Json(json!({ "message": "Transaction removed" })))
}
