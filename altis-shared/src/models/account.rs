use crate::pii::Masked;
use serde::{Deserialize, Serialize};

/// A customer account and its spendable balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password: Masked<String>,
    pub balance: i64,
}

impl Account {
    pub fn new(username: impl Into<String>, password: impl Into<String>, balance: i64) -> Self {
        Self {
            username: username.into(),
            password: Masked::new(password.into()),
            balance,
        }
    }

    // Plain comparison: credential hashing belongs to the identity provider, not this engine.
    pub fn verify_password(&self, candidate: &str) -> bool {
        self.password.expose() == candidate
    }

    pub fn can_afford(&self, amount: i64) -> bool {
        self.balance >= amount
    }
}
