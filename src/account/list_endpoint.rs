//! Defines the endpoints for reading accounts.

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{
    Error,
    account::core::{Account, AccountId, AccountState, get_accounts_for_user, get_owned_account},
    auth::UserID,
    db::lock_connection,
};

/// A route handler that lists the accounts of the logged-in user.
pub async fn get_accounts_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<Account>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_accounts_for_user(user_id, &connection).map(Json)
}

/// A route handler that gets a single account of the logged-in user.
pub async fn get_account_endpoint(
    State(state): State<AccountState>,
    Extension(user_id): Extension<UserID>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Account>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_owned_account(account_id, user_id, &connection).map(Json)
}
