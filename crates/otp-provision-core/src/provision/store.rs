//! Destination for submitted accounts.

use std::sync::Mutex;

use crate::provision::types::TotpAccount;

/// Persists accounts produced by the provisioning flow.
pub trait AccountStore: Send + Sync {
    fn add_account(&self, account: TotpAccount) -> Result<(), String>;

    fn list_accounts(&self) -> Result<Vec<TotpAccount>, String>;
}

/// Process-local store. Rejects an account whose issuer, label and secret
/// all match one already held.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: Mutex<Vec<TotpAccount>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountStore for InMemoryAccountStore {
    fn add_account(&self, account: TotpAccount) -> Result<(), String> {
        let mut accounts = self
            .accounts
            .lock()
            .map_err(|_| "account store lock poisoned".to_string())?;
        let duplicate = accounts.iter().any(|a| {
            a.issuer.eq_ignore_ascii_case(&account.issuer)
                && a.label == account.label
                && a.secret == account.secret
        });
        if duplicate {
            return Err(format!(
                "An account for {} ({}) already exists",
                account.issuer, account.label
            ));
        }
        accounts.push(account);
        Ok(())
    }

    fn list_accounts(&self) -> Result<Vec<TotpAccount>, String> {
        self.accounts
            .lock()
            .map(|a| a.clone())
            .map_err(|_| "account store lock poisoned".to_string())
    }
}
