use crate::payment::AccountLedger;
use crate::repository::{commit_or_rollback, StoreTransaction, TransactionalStore};
use crate::retry::RetryPolicy;
use crate::{CoreError, CoreResult};
use altis_shared::{Account, Itinerary, Masked};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// State of one interactive session: who is logged in and which
/// itineraries the last search produced.
///
/// The session is handed explicitly to every engine call, so nothing about
/// the acting user lives in shared state.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    username: Option<String>,
    itineraries: Vec<Itinerary>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            username: None,
            itineraries: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.username.is_some()
    }

    /// The acting user, or `NotLoggedIn`.
    pub fn require_login(&self) -> CoreResult<&str> {
        self.username().ok_or(CoreError::NotLoggedIn)
    }

    fn bind(&mut self, username: &str) -> CoreResult<()> {
        if self.is_logged_in() {
            return Err(CoreError::AlreadyLoggedIn);
        }
        self.username = Some(username.to_string());
        Ok(())
    }

    pub fn itineraries(&self) -> &[Itinerary] {
        &self.itineraries
    }

    /// Looks up an itinerary of the most recent search.
    pub fn itinerary(&self, index: i64) -> CoreResult<&Itinerary> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.itineraries.get(i))
            .ok_or(CoreError::NoSuchItinerary(index))
    }

    /// Installs a new search result. The previous list is discarded, never
    /// extended.
    pub fn replace_itineraries(&mut self, itineraries: Vec<Itinerary>) {
        self.itineraries = itineraries;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Account signup and login against the account store.
pub struct SessionManager<S> {
    store: Arc<S>,
    retry: RetryPolicy,
}

impl<S: TransactionalStore> SessionManager<S> {
    pub fn new(store: Arc<S>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub async fn create_account(
        &self,
        username: &str,
        password: &str,
        initial_balance: i64,
    ) -> CoreResult<Account> {
        if initial_balance < 0 {
            return Err(CoreError::InvalidInitialBalance(initial_balance));
        }

        let account = self
            .retry
            .run("create_account", move || self.try_create_account(username, password, initial_balance))
            .await?;

        info!(username = %Masked::new(username), initial_balance, "Account created");
        Ok(account)
    }

    async fn try_create_account(
        &self,
        username: &str,
        password: &str,
        initial_balance: i64,
    ) -> CoreResult<Account> {
        let mut tx = self.store.begin().await?;
        let outcome = AccountLedger::open(&mut tx, username, password, initial_balance).await;
        commit_or_rollback(tx, outcome).await
    }

    /// Binds `session` to `username` when the credentials match an account.
    pub async fn login(&self, session: &mut Session, username: &str, password: &str) -> CoreResult<()> {
        if session.is_logged_in() {
            return Err(CoreError::AlreadyLoggedIn);
        }

        let account = self
            .retry
            .run("login", move || self.try_find_account(username))
            .await?;

        match account {
            Some(account) if account.verify_password(password) => {
                session.bind(username)?;
                info!(session_id = %session.id(), username = %Masked::new(username), "Logged in");
                Ok(())
            }
            _ => {
                warn!(session_id = %session.id(), "Login rejected");
                Err(CoreError::InvalidCredentials)
            }
        }
    }

    async fn try_find_account(&self, username: &str) -> CoreResult<Option<Account>> {
        let mut tx = self.store.begin().await?;
        let outcome = tx.account(username).await.map_err(CoreError::from);
        commit_or_rollback(tx, outcome).await
    }
}
