use crate::repository::StoreTransaction;
use crate::{CoreError, CoreResult};
use altis_shared::Account;
use tracing::debug;

/// Balance bookkeeping for customer accounts. Every method works inside the
/// caller's transaction so balance changes commit together with the
/// reservation change that caused them.
pub struct AccountLedger;

impl AccountLedger {
    /// Opens a new account funded with `initial_balance`.
    pub async fn open<T: StoreTransaction>(
        tx: &mut T,
        username: &str,
        password: &str,
        initial_balance: i64,
    ) -> CoreResult<Account> {
        if initial_balance < 0 {
            return Err(CoreError::InvalidInitialBalance(initial_balance));
        }

        let account = Account::new(username, password, initial_balance);
        if !tx.insert_account_if_absent(&account).await? {
            return Err(CoreError::DuplicateUsername(username.to_string()));
        }

        Ok(account)
    }

    /// Withdraws `amount`, refusing to take the balance below zero.
    /// Returns the new balance.
    pub async fn debit<T: StoreTransaction>(
        tx: &mut T,
        username: &str,
        amount: i64,
    ) -> CoreResult<i64> {
        let account = Self::load(tx, username).await?;
        if !account.can_afford(amount) {
            return Err(CoreError::InsufficientFunds {
                balance: account.balance,
                cost: amount,
            });
        }

        let balance = account.balance - amount;
        tx.set_balance(username, balance).await?;
        debug!(amount, balance, "Account debited");
        Ok(balance)
    }

    /// Deposits `amount` and returns the new balance.
    pub async fn credit<T: StoreTransaction>(
        tx: &mut T,
        username: &str,
        amount: i64,
    ) -> CoreResult<i64> {
        let account = Self::load(tx, username).await?;
        let balance = account.balance + amount;
        tx.set_balance(username, balance).await?;
        debug!(amount, balance, "Account credited");
        Ok(balance)
    }

    async fn load<T: StoreTransaction>(tx: &mut T, username: &str) -> CoreResult<Account> {
        tx.account(username)
            .await?
            .ok_or_else(|| CoreError::Internal("account of the active session no longer exists".to_string()))
    }
}
