//! Bank accounts, credit cards and cash wallets owned by users.

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod list_endpoint;
mod sync_endpoint;

pub use core::{
    Account, AccountId, AccountType, BankLink, create_account_table, get_account,
    get_owned_account, set_account_balance,
};
pub use create_endpoint::create_account_endpoint;
pub use delete_endpoint::delete_account_endpoint;
pub use edit_endpoint::edit_account_endpoint;
pub use list_endpoint::{get_account_endpoint, get_accounts_endpoint};
pub use sync_endpoint::sync_account_endpoint;
