//! Transaction management.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing and querying transactions
//! - The balance updater that keeps account balances in step with their transactions
//! - Route handlers for the transaction endpoints

mod balance;
mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod list_endpoint;

pub use balance::{
    TransactionChanges, create_transaction, delete_transaction, source_delta, update_transaction,
};
pub use core::{
    Category, Transaction, TransactionBuilder, TransactionId, TransactionType,
    create_transaction_table,
};
pub use create_endpoint::create_transaction_endpoint;
pub use delete_endpoint::delete_transaction_endpoint;
pub use edit_endpoint::edit_transaction_endpoint;
pub use list_endpoint::{get_account_transactions_endpoint, get_transaction_endpoint};
