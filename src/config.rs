//! Explicit configuration for the query façade.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use time_tz::{TimeZone, Tz};

use crate::{
    Error,
    account::{AccountId, AccountType},
    timezone::{REFERENCE_TIMEZONE, get_timezone},
};

/// Which account a query is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountSelector {
    /// The account configured as the transactional account.
    Transactional,
    /// The account configured as the savings account.
    Savings,
    /// An explicit account ID.
    Id(AccountId),
}

impl From<AccountType> for AccountSelector {
    fn from(value: AccountType) -> Self {
        match value {
            AccountType::Transactional => Self::Transactional,
            AccountType::Savings => Self::Savings,
        }
    }
}

/// The settings a [crate::Ledger] is constructed with.
///
/// The account mapping is optional: a query that needs a missing mapping
/// fails with [Error::ConfigurationMissing] instead of silently querying
/// every account.
#[derive(Clone)]
pub struct LedgerConfig {
    /// The ID of the everyday transactional account.
    pub transactional_account: Option<AccountId>,
    /// The ID of the savings account.
    pub savings_account: Option<AccountId>,
    timezone: &'static Tz,
}

impl LedgerConfig {
    /// Create a config with the given account mapping, using the
    /// [REFERENCE_TIMEZONE] for calendar periods.
    ///
    /// # Errors
    /// Returns an [Error::InvalidTimezone] if the timezone database does not
    /// contain the reference timezone.
    pub fn new(
        transactional_account: Option<AccountId>,
        savings_account: Option<AccountId>,
    ) -> Result<Self, Error> {
        Ok(Self {
            transactional_account: non_empty(transactional_account),
            savings_account: non_empty(savings_account),
            timezone: get_timezone(REFERENCE_TIMEZONE)?,
        })
    }

    /// The timezone calendar periods are evaluated in.
    pub fn timezone(&self) -> &'static Tz {
        self.timezone
    }

    /// The configured ID for `account_type`.
    ///
    /// # Errors
    /// Returns an [Error::ConfigurationMissing] if no ID is configured.
    pub fn account_id(&self, account_type: AccountType) -> Result<&str, Error> {
        let account_id = match account_type {
            AccountType::Transactional => &self.transactional_account,
            AccountType::Savings => &self.savings_account,
        };

        account_id.as_deref().ok_or_else(|| {
            Error::ConfigurationMissing(format!("no {account_type} account ID has been configured"))
        })
    }

    /// Resolve `selector` to an account ID.
    ///
    /// # Errors
    /// Returns an [Error::ConfigurationMissing] if `selector` names an account
    /// type with no configured ID.
    pub fn resolve<'a>(&'a self, selector: &'a AccountSelector) -> Result<&'a str, Error> {
        match selector {
            AccountSelector::Transactional => self.account_id(AccountType::Transactional),
            AccountSelector::Savings => self.account_id(AccountType::Savings),
            AccountSelector::Id(account_id) => Ok(account_id),
        }
    }
}

impl Debug for LedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("transactional_account", &self.transactional_account)
            .field("savings_account", &self.savings_account)
            .field("timezone", &self.timezone.name())
            .finish()
    }
}

fn non_empty(account_id: Option<AccountId>) -> Option<AccountId> {
    account_id.filter(|id| !id.trim().is_empty())
}
