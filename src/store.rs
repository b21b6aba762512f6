//! Storage contracts and built-in account store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	account::{Account, AccountId, LongLivedTokenUpdate, Page},
};

/// Boxed future returned by [`AccountStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for accounts, their long-lived tokens, and their pages.
pub trait AccountStore
where
	Self: Send + Sync,
{
	/// Returns the active account, if any.
	fn current_account(&self) -> StoreFuture<'_, Option<Account>>;

	/// Lists every stored account in insertion order.
	fn list_accounts(&self) -> StoreFuture<'_, Vec<Account>>;

	/// Inserts the account or replaces the one with the same id.
	fn save_account(&self, account: Account) -> StoreFuture<'_, ()>;

	/// Marks an existing account as the active one.
	fn set_current_account<'a>(&'a self, id: &'a AccountId) -> StoreFuture<'a, ()>;

	/// Persists a long-lived token and its expiry; returns `false` for unknown accounts.
	fn update_account_tokens<'a>(
		&'a self,
		id: &'a AccountId,
		update: LongLivedTokenUpdate,
	) -> StoreFuture<'a, bool>;

	/// Updates an already registered page in place; returns `false` when the account or page
	/// is unknown. Never appends a new page.
	fn update_account_page<'a>(&'a self, id: &'a AccountId, page: Page) -> StoreFuture<'a, bool>;
}

/// Error type produced by [`AccountStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// The referenced account does not exist.
	#[error("Account `{account_id}` does not exist.")]
	UnknownAccount {
		/// Requested account identifier.
		account_id: String,
	},
}

/// Serializable snapshot shared by the built-in stores.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
	/// Account selected as current, if one was chosen explicitly.
	#[serde(default)]
	pub current_account_id: Option<AccountId>,
	/// Stored accounts.
	#[serde(default)]
	pub accounts: Vec<Account>,
}
impl AccountSnapshot {
	/// Returns the selected account, falling back to the first stored account.
	pub fn current(&self) -> Option<&Account> {
		match &self.current_account_id {
			Some(id) => self.account(id),
			None => self.accounts.first(),
		}
	}

	/// Finds an account by id.
	pub fn account(&self, id: &AccountId) -> Option<&Account> {
		self.accounts.iter().find(|account| &account.id == id)
	}

	pub(crate) fn save(&mut self, account: Account) {
		match self.accounts.iter_mut().find(|existing| existing.id == account.id) {
			Some(existing) => *existing = account,
			None => self.accounts.push(account),
		}
	}

	pub(crate) fn select(&mut self, id: &AccountId) -> Result<(), StoreError> {
		if self.account(id).is_none() {
			return Err(StoreError::UnknownAccount { account_id: id.to_string() });
		}

		self.current_account_id = Some(id.clone());

		Ok(())
	}

	pub(crate) fn update_tokens(&mut self, id: &AccountId, update: LongLivedTokenUpdate) -> bool {
		match self.account_mut(id) {
			Some(account) => {
				account.apply_tokens(update);

				true
			},
			None => false,
		}
	}

	pub(crate) fn update_page(&mut self, id: &AccountId, page: Page) -> bool {
		self.account_mut(id).is_some_and(|account| account.apply_page(page))
	}

	fn account_mut(&mut self, id: &AccountId) -> Option<&mut Account> {
		self.accounts.iter_mut().find(|account| &account.id == id)
	}
}
