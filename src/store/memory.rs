//! Thread-safe in-memory [`AccountStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	account::{Account, AccountId, LongLivedTokenUpdate, Page},
	store::{AccountSnapshot, AccountStore, StoreError, StoreFuture},
};

type SnapshotCell = Arc<RwLock<AccountSnapshot>>;

/// Storage backend that keeps accounts in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(SnapshotCell);
impl MemoryStore {
	/// Creates a store pre-populated with `accounts`; the first one becomes current.
	pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
		let snapshot =
			AccountSnapshot { current_account_id: None, accounts: accounts.into_iter().collect() };

		Self(Arc::new(RwLock::new(snapshot)))
	}

	/// Returns a copy of the current contents.
	pub fn snapshot(&self) -> AccountSnapshot {
		self.0.read().clone()
	}

	fn save_now(cell: SnapshotCell, account: Account) {
		cell.write().save(account);
	}

	fn select_now(cell: SnapshotCell, id: AccountId) -> Result<(), StoreError> {
		cell.write().select(&id)
	}

	fn update_tokens_now(cell: SnapshotCell, id: AccountId, update: LongLivedTokenUpdate) -> bool {
		cell.write().update_tokens(&id, update)
	}

	fn update_page_now(cell: SnapshotCell, id: AccountId, page: Page) -> bool {
		cell.write().update_page(&id, page)
	}
}
impl AccountStore for MemoryStore {
	fn current_account(&self) -> StoreFuture<'_, Option<Account>> {
		let cell = self.0.clone();

		Box::pin(async move { Ok(cell.read().current().cloned()) })
	}

	fn list_accounts(&self) -> StoreFuture<'_, Vec<Account>> {
		let cell = self.0.clone();

		Box::pin(async move { Ok(cell.read().accounts.clone()) })
	}

	fn save_account(&self, account: Account) -> StoreFuture<'_, ()> {
		let cell = self.0.clone();

		Box::pin(async move {
			Self::save_now(cell, account);

			Ok(())
		})
	}

	fn set_current_account<'a>(&'a self, id: &'a AccountId) -> StoreFuture<'a, ()> {
		let cell = self.0.clone();
		let id = id.to_owned();

		Box::pin(async move { Self::select_now(cell, id) })
	}

	fn update_account_tokens<'a>(
		&'a self,
		id: &'a AccountId,
		update: LongLivedTokenUpdate,
	) -> StoreFuture<'a, bool> {
		let cell = self.0.clone();
		let id = id.to_owned();

		Box::pin(async move { Ok(Self::update_tokens_now(cell, id, update)) })
	}

	fn update_account_page<'a>(&'a self, id: &'a AccountId, page: Page) -> StoreFuture<'a, bool> {
		let cell = self.0.clone();
		let id = id.to_owned();

		Box::pin(async move { Ok(Self::update_page_now(cell, id, page)) })
	}
}
