//! Keeps account balances consistent with the transactions recorded against them.
//!
//! Every function here runs inside a single immediate SQLite transaction, so either the
//! transaction row and all the balance changes it implies are written, or none of them are.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use rust_decimal::Decimal;
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    account::{AccountId, get_account, get_owned_account, set_account_balance},
    auth::UserID,
    transaction::core::{
        Category, Transaction, TransactionBuilder, TransactionId, TransactionType,
        delete_transaction_row, get_transaction, insert_transaction, update_transaction_row,
        validate_description,
    },
};

/// How much the source account's balance moves for a transaction of `amount`.
pub fn source_delta(transaction_type: TransactionType, amount: Decimal) -> Decimal {
    match transaction_type {
        TransactionType::Income => amount,
        TransactionType::Expense | TransactionType::Transfer => -amount,
    }
}

/// Changes to apply to a stored transaction. `None` keeps the stored value.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TransactionChanges {
    /// The new amount.
    pub amount: Option<Decimal>,
    /// The new description.
    pub description: Option<String>,
    /// The new category.
    pub category: Option<Category>,
    /// The new date.
    pub date: Option<Date>,
    /// The new type.
    pub transaction_type: Option<TransactionType>,
    /// The new receiving account of a transfer, `Some(None)` to remove it.
    pub transfer_to: Option<Option<AccountId>>,
}

impl TransactionChanges {
    fn apply(self, mut transaction: Transaction) -> Result<Transaction, Error> {
        if let Some(amount) = self.amount {
            transaction.amount = amount;
        }

        if let Some(description) = self.description {
            transaction.description = validate_description(&description)?;
        }

        if let Some(category) = self.category {
            transaction.category = category;
        }

        if let Some(date) = self.date {
            transaction.date = date;
        }

        if let Some(transaction_type) = self.transaction_type {
            transaction.transaction_type = transaction_type;
        }

        if let Some(transfer_to) = self.transfer_to {
            transaction.transfer_to = transfer_to;
        }

        transaction.transfer_to = transaction.transfer_target();

        Ok(transaction)
    }
}

fn adjust_balance(
    account_id: AccountId,
    delta: Decimal,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    let account = get_account(account_id, connection)?;
    let balance = account.balance + delta;
    set_account_balance(account_id, balance, now, connection)?;

    tracing::debug!(
        "account {account_id} balance {} -> {balance}",
        account.balance
    );

    Ok(())
}

/// Check that a transfer from `source` to `target` is allowed for `user_id`.
fn check_transfer_target(
    target: AccountId,
    source: AccountId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    get_owned_account(target, user_id, connection)?;

    if target == source {
        return Err(Error::SelfTransfer);
    }

    Ok(())
}

/// Apply the balance changes of `transaction`, or reverse them if `direction` is negative.
///
/// A transfer target that no longer exists is skipped.
fn apply_effect(
    transaction_type: TransactionType,
    amount: Decimal,
    source: AccountId,
    target: Option<AccountId>,
    direction: Decimal,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    adjust_balance(
        source,
        direction * source_delta(transaction_type, amount),
        now,
        connection,
    )?;

    if let Some(target) = target {
        match adjust_balance(target, direction * amount, now, connection) {
            Ok(()) | Err(Error::NotFound) => {}
            Err(error) => return Err(error),
        }
    }

    Ok(())
}

/// Record a new transaction and apply it to the balances of the accounts involved.
///
/// # Errors
/// - [Error::NotFound] if the source account or the transfer target does not exist,
/// - [Error::Unauthorized] if either account belongs to another user,
/// - [Error::SelfTransfer] if a transfer names its own source as the target,
/// - [Error::SqlError] if there is some other SQL error.
///
/// Nothing is written if any error is returned.
pub fn create_transaction(
    user_id: UserID,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let sql_transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;
    let now = OffsetDateTime::now_utc();

    get_owned_account(builder.account_id, user_id, &sql_transaction)?;
    adjust_balance(
        builder.account_id,
        source_delta(builder.transaction_type, builder.amount),
        now,
        &sql_transaction,
    )?;

    if let Some(target) = builder.transfer_target() {
        check_transfer_target(target, builder.account_id, user_id, &sql_transaction)?;
        adjust_balance(target, builder.amount, now, &sql_transaction)?;
    }

    let transaction = insert_transaction(builder, &sql_transaction)?;
    sql_transaction.commit()?;

    Ok(transaction)
}

/// Get a transaction, checking that its account belongs to `user_id`.
pub fn get_owned_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = get_transaction(id, connection)?;
    get_owned_account(transaction.account_id, user_id, connection)?;

    Ok(transaction)
}

/// Change a stored transaction and move the account balances to match.
///
/// The old effect is reversed on the source account and on the old transfer target, if it
/// still exists, before the new effect is applied.
///
/// # Errors
/// The same errors as [create_transaction], plus [Error::NotFound] if there is no
/// transaction with `id`. Nothing is written if any error is returned.
pub fn update_transaction(
    user_id: UserID,
    id: TransactionId,
    changes: TransactionChanges,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let sql_transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;
    let now = OffsetDateTime::now_utc();

    let old = get_owned_transaction(id, user_id, &sql_transaction)?;
    apply_effect(
        old.transaction_type,
        old.amount,
        old.account_id,
        old.transfer_target(),
        Decimal::NEGATIVE_ONE,
        now,
        &sql_transaction,
    )?;

    let new = changes.apply(old)?;

    if let Some(target) = new.transfer_target() {
        check_transfer_target(target, new.account_id, user_id, &sql_transaction)?;
    }

    update_transaction_row(&new, &sql_transaction)?;
    apply_effect(
        new.transaction_type,
        new.amount,
        new.account_id,
        new.transfer_target(),
        Decimal::ONE,
        now,
        &sql_transaction,
    )?;

    sql_transaction.commit()?;

    Ok(new)
}

/// Delete a transaction and reverse its effect on the account balances.
///
/// # Errors
/// [Error::NotFound] if there is no transaction with `id`, [Error::Unauthorized] if it belongs
/// to another user's account. Nothing is written if any error is returned.
pub fn delete_transaction(
    user_id: UserID,
    id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let sql_transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;
    let now = OffsetDateTime::now_utc();

    let transaction = get_owned_transaction(id, user_id, &sql_transaction)?;
    apply_effect(
        transaction.transaction_type,
        transaction.amount,
        transaction.account_id,
        transaction.transfer_target(),
        Decimal::NEGATIVE_ONE,
        now,
        &sql_transaction,
    )?;
    delete_transaction_row(id, &sql_transaction)?;

    sql_transaction.commit()?;

    Ok(transaction)
}

#[cfg(test)]
mod balance_tests {
    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::OffsetDateTime;

    use crate::{
        Error,
        account::{AccountId, get_account},
        auth::{PasswordHash, UserID, create_user},
        db::initialize,
        transaction::core::{Transaction, TransactionType, get_transaction},
    };

    use super::{
        TransactionChanges, create_transaction, delete_transaction, source_delta,
        update_transaction,
    };

    struct Fixture {
        connection: Connection,
        alice: UserID,
        bob: UserID,
    }

    impl Fixture {
        fn new() -> Self {
            let connection = Connection::open_in_memory().unwrap();
            initialize(&connection).unwrap();
            let alice = create_user(
                "alice",
                "alice@example.com",
                PasswordHash::new_unchecked("hash"),
                &connection,
            )
            .unwrap()
            .id;
            let bob = create_user(
                "bob",
                "bob@example.com",
                PasswordHash::new_unchecked("hash"),
                &connection,
            )
            .unwrap()
            .id;

            Self {
                connection,
                alice,
                bob,
            }
        }

        #[track_caller]
        fn must_create_account(&self, owner: UserID, balance: Decimal) -> AccountId {
            self.connection
                .execute(
                    "INSERT INTO account (user_id, name, account_type, balance, currency, \
                        is_active, last_updated) \
                     VALUES (?1, 'Test', 'checking', ?2, 'EUR', 1, ?3)",
                    (owner, balance.to_string(), OffsetDateTime::now_utc()),
                )
                .unwrap();

            self.connection.last_insert_rowid()
        }

        #[track_caller]
        fn balance(&self, account_id: AccountId) -> Decimal {
            get_account(account_id, &self.connection).unwrap().balance
        }

        #[track_caller]
        fn reset_last_updated(&self) {
            self.connection
                .execute(
                    "UPDATE account SET last_updated = ?1",
                    (OffsetDateTime::UNIX_EPOCH,),
                )
                .unwrap();
        }

        #[track_caller]
        fn assert_stamped(&self, accounts: &[AccountId]) {
            for &account_id in accounts {
                let last_updated = get_account(account_id, &self.connection)
                    .unwrap()
                    .last_updated;
                assert!(
                    last_updated > OffsetDateTime::UNIX_EPOCH,
                    "account {account_id} was not stamped"
                );
            }
        }
    }

    #[test]
    fn source_delta_signs() {
        assert_eq!(source_delta(TransactionType::Income, dec!(5)), dec!(5));
        assert_eq!(source_delta(TransactionType::Expense, dec!(5)), dec!(-5));
        assert_eq!(source_delta(TransactionType::Transfer, dec!(5)), dec!(-5));
    }

    #[test]
    fn income_adds_to_balance() {
        let fixture = Fixture::new();
        let account = fixture.must_create_account(fixture.alice, dec!(100));

        create_transaction(
            fixture.alice,
            Transaction::build(account, dec!(25.50), TransactionType::Income, "Salary"),
            &fixture.connection,
        )
        .unwrap();

        assert_eq!(fixture.balance(account), dec!(125.50));
    }

    #[test]
    fn expense_then_delete_restores_balance() {
        let fixture = Fixture::new();
        let account = fixture.must_create_account(fixture.alice, dec!(100));

        let transaction = create_transaction(
            fixture.alice,
            Transaction::build(account, dec!(30), TransactionType::Expense, "Shoes"),
            &fixture.connection,
        )
        .unwrap();
        assert_eq!(fixture.balance(account), dec!(70));

        delete_transaction(fixture.alice, transaction.id, &fixture.connection).unwrap();
        assert_eq!(fixture.balance(account), dec!(100));
        assert_eq!(
            get_transaction(transaction.id, &fixture.connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn transfer_moves_money_between_accounts() {
        let fixture = Fixture::new();
        let x = fixture.must_create_account(fixture.alice, dec!(200));
        let y = fixture.must_create_account(fixture.alice, dec!(0));

        let transfer = create_transaction(
            fixture.alice,
            Transaction::build(x, dec!(50), TransactionType::Transfer, "Savings")
                .transfer_to(Some(y)),
            &fixture.connection,
        )
        .unwrap();

        assert_eq!(fixture.balance(x), dec!(150));
        assert_eq!(fixture.balance(y), dec!(50));

        delete_transaction(fixture.alice, transfer.id, &fixture.connection).unwrap();

        assert_eq!(fixture.balance(x), dec!(200));
        assert_eq!(fixture.balance(y), dec!(0));
    }

    #[test]
    fn transfer_without_target_only_debits_source() {
        let fixture = Fixture::new();
        let x = fixture.must_create_account(fixture.alice, dec!(200));

        create_transaction(
            fixture.alice,
            Transaction::build(x, dec!(50), TransactionType::Transfer, "Cash out"),
            &fixture.connection,
        )
        .unwrap();

        assert_eq!(fixture.balance(x), dec!(150));
    }

    #[test]
    fn update_changes_balance_by_difference() {
        let fixture = Fixture::new();
        let account = fixture.must_create_account(fixture.alice, dec!(100));
        let transaction = create_transaction(
            fixture.alice,
            Transaction::build(account, dec!(30), TransactionType::Expense, "Shoes"),
            &fixture.connection,
        )
        .unwrap();

        let updated = update_transaction(
            fixture.alice,
            transaction.id,
            TransactionChanges {
                amount: Some(dec!(45)),
                ..Default::default()
            },
            &fixture.connection,
        )
        .unwrap();

        assert_eq!(updated.amount, dec!(45));
        assert_eq!(updated.description, "Shoes");
        assert_eq!(fixture.balance(account), dec!(55));
    }

    #[test]
    fn update_type_flips_effect() {
        let fixture = Fixture::new();
        let account = fixture.must_create_account(fixture.alice, dec!(100));
        let transaction = create_transaction(
            fixture.alice,
            Transaction::build(account, dec!(10), TransactionType::Expense, "Refundable"),
            &fixture.connection,
        )
        .unwrap();

        update_transaction(
            fixture.alice,
            transaction.id,
            TransactionChanges {
                transaction_type: Some(TransactionType::Income),
                ..Default::default()
            },
            &fixture.connection,
        )
        .unwrap();

        assert_eq!(fixture.balance(account), dec!(110));
    }

    #[test]
    fn update_moves_transfer_to_new_target() {
        let fixture = Fixture::new();
        let x = fixture.must_create_account(fixture.alice, dec!(200));
        let y = fixture.must_create_account(fixture.alice, dec!(0));
        let z = fixture.must_create_account(fixture.alice, dec!(0));
        let transfer = create_transaction(
            fixture.alice,
            Transaction::build(x, dec!(50), TransactionType::Transfer, "Move")
                .transfer_to(Some(y)),
            &fixture.connection,
        )
        .unwrap();

        update_transaction(
            fixture.alice,
            transfer.id,
            TransactionChanges {
                transfer_to: Some(Some(z)),
                amount: Some(dec!(60)),
                ..Default::default()
            },
            &fixture.connection,
        )
        .unwrap();

        assert_eq!(fixture.balance(x), dec!(140));
        assert_eq!(fixture.balance(y), dec!(0));
        assert_eq!(fixture.balance(z), dec!(60));
    }

    #[test]
    fn removing_transfer_target_reverses_its_credit() {
        let fixture = Fixture::new();
        let x = fixture.must_create_account(fixture.alice, dec!(200));
        let y = fixture.must_create_account(fixture.alice, dec!(0));
        let transfer = create_transaction(
            fixture.alice,
            Transaction::build(x, dec!(50), TransactionType::Transfer, "Move")
                .transfer_to(Some(y)),
            &fixture.connection,
        )
        .unwrap();

        let updated = update_transaction(
            fixture.alice,
            transfer.id,
            TransactionChanges {
                transfer_to: Some(None),
                ..Default::default()
            },
            &fixture.connection,
        )
        .unwrap();

        assert_eq!(updated.transfer_to, None);
        assert_eq!(fixture.balance(x), dec!(150));
        assert_eq!(fixture.balance(y), dec!(0));
    }

    #[test]
    fn transfer_to_other_users_account_writes_nothing() {
        let fixture = Fixture::new();
        let x = fixture.must_create_account(fixture.alice, dec!(200));
        let bobs = fixture.must_create_account(fixture.bob, dec!(0));

        let result = create_transaction(
            fixture.alice,
            Transaction::build(x, dec!(50), TransactionType::Transfer, "Sneaky")
                .transfer_to(Some(bobs)),
            &fixture.connection,
        );

        assert_eq!(result, Err(Error::Unauthorized));
        // The source was debited before the target check failed, so this checks the rollback.
        assert_eq!(fixture.balance(x), dec!(200));
        assert_eq!(fixture.balance(bobs), dec!(0));
        let count: i64 = fixture
            .connection
            .query_row("SELECT COUNT(*) FROM \"transaction\"", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn transfer_to_missing_account_is_not_found() {
        let fixture = Fixture::new();
        let x = fixture.must_create_account(fixture.alice, dec!(200));

        let result = create_transaction(
            fixture.alice,
            Transaction::build(x, dec!(50), TransactionType::Transfer, "Nowhere")
                .transfer_to(Some(999)),
            &fixture.connection,
        );

        assert_eq!(result, Err(Error::NotFound));
        assert_eq!(fixture.balance(x), dec!(200));
    }

    #[test]
    fn transfer_to_self_is_rejected() {
        let fixture = Fixture::new();
        let x = fixture.must_create_account(fixture.alice, dec!(200));

        let result = create_transaction(
            fixture.alice,
            Transaction::build(x, dec!(50), TransactionType::Transfer, "Loop")
                .transfer_to(Some(x)),
            &fixture.connection,
        );

        assert_eq!(result, Err(Error::SelfTransfer));
        assert_eq!(fixture.balance(x), dec!(200));
    }

    #[test]
    fn other_users_cannot_touch_transactions() {
        let fixture = Fixture::new();
        let account = fixture.must_create_account(fixture.alice, dec!(100));
        let transaction = create_transaction(
            fixture.alice,
            Transaction::build(account, dec!(30), TransactionType::Expense, "Shoes"),
            &fixture.connection,
        )
        .unwrap();

        assert_eq!(
            create_transaction(
                fixture.bob,
                Transaction::build(account, dec!(1), TransactionType::Income, "Gift"),
                &fixture.connection,
            ),
            Err(Error::Unauthorized)
        );
        assert_eq!(
            delete_transaction(fixture.bob, transaction.id, &fixture.connection),
            Err(Error::Unauthorized)
        );
        assert_eq!(
            update_transaction(
                fixture.bob,
                transaction.id,
                TransactionChanges::default(),
                &fixture.connection
            ),
            Err(Error::Unauthorized)
        );
        assert_eq!(fixture.balance(account), dec!(70));
    }

    #[test]
    fn failed_update_rolls_back_reversal() {
        let fixture = Fixture::new();
        let account = fixture.must_create_account(fixture.alice, dec!(100));
        let transaction = create_transaction(
            fixture.alice,
            Transaction::build(account, dec!(30), TransactionType::Expense, "Shoes"),
            &fixture.connection,
        )
        .unwrap();

        let result = update_transaction(
            fixture.alice,
            transaction.id,
            TransactionChanges {
                description: Some("   ".to_owned()),
                amount: Some(dec!(1)),
                ..Default::default()
            },
            &fixture.connection,
        );

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(fixture.balance(account), dec!(70));
    }

    #[test]
    fn delete_skips_target_deleted_since() {
        let fixture = Fixture::new();
        let x = fixture.must_create_account(fixture.alice, dec!(200));
        let y = fixture.must_create_account(fixture.alice, dec!(0));
        let transfer = create_transaction(
            fixture.alice,
            Transaction::build(x, dec!(50), TransactionType::Transfer, "Move")
                .transfer_to(Some(y)),
            &fixture.connection,
        )
        .unwrap();
        fixture
            .connection
            .execute("DELETE FROM account WHERE id = ?1", (y,))
            .unwrap();

        delete_transaction(fixture.alice, transfer.id, &fixture.connection).unwrap();

        assert_eq!(fixture.balance(x), dec!(200));
    }

    #[test]
    fn every_change_stamps_source_and_target() {
        let fixture = Fixture::new();
        let x = fixture.must_create_account(fixture.alice, dec!(200));
        let y = fixture.must_create_account(fixture.alice, dec!(0));

        fixture.reset_last_updated();
        let transfer = create_transaction(
            fixture.alice,
            Transaction::build(x, dec!(50), TransactionType::Transfer, "Move")
                .transfer_to(Some(y)),
            &fixture.connection,
        )
        .unwrap();
        fixture.assert_stamped(&[x, y]);

        fixture.reset_last_updated();
        update_transaction(
            fixture.alice,
            transfer.id,
            TransactionChanges {
                amount: Some(dec!(60)),
                ..Default::default()
            },
            &fixture.connection,
        )
        .unwrap();
        fixture.assert_stamped(&[x, y]);

        fixture.reset_last_updated();
        delete_transaction(fixture.alice, transfer.id, &fixture.connection).unwrap();
        fixture.assert_stamped(&[x, y]);
    }
}
