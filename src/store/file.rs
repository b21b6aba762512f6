//! File-backed [`AccountStore`] that keeps `accounts.json` in sync after each mutation.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	account::{Account, AccountId, LongLivedTokenUpdate, Page},
	store::{AccountSnapshot, AccountStore, StoreError, StoreFuture},
};

/// Persists the account snapshot to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<AccountSnapshot>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the backing JSON file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<AccountSnapshot, StoreError> {
		if !path.exists() {
			return Ok(AccountSnapshot::default());
		}

		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(AccountSnapshot::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &AccountSnapshot) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize account snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	/// Applies `mutate` under the write lock and persists only when it reports a change.
	fn mutate<T>(
		&self,
		mutate: impl FnOnce(&mut AccountSnapshot) -> Result<(T, bool), StoreError>,
	) -> Result<T, StoreError> {
		let mut guard = self.inner.write();
		let (value, changed) = mutate(&mut guard)?;

		if changed {
			self.persist_locked(&guard)?;
		}

		Ok(value)
	}
}
impl AccountStore for FileStore {
	fn current_account(&self) -> StoreFuture<'_, Option<Account>> {
		Box::pin(async move { Ok(self.inner.read().current().cloned()) })
	}

	fn list_accounts(&self) -> StoreFuture<'_, Vec<Account>> {
		Box::pin(async move { Ok(self.inner.read().accounts.clone()) })
	}

	fn save_account(&self, account: Account) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.mutate(|snapshot| {
				snapshot.save(account);

				Ok(((), true))
			})
		})
	}

	fn set_current_account<'a>(&'a self, id: &'a AccountId) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.mutate(|snapshot| {
				snapshot.select(id)?;

				Ok(((), true))
			})
		})
	}

	fn update_account_tokens<'a>(
		&'a self,
		id: &'a AccountId,
		update: LongLivedTokenUpdate,
	) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			self.mutate(|snapshot| {
				let updated = snapshot.update_tokens(id, update);

				Ok((updated, updated))
			})
		})
	}

	fn update_account_page<'a>(&'a self, id: &'a AccountId, page: Page) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			self.mutate(|snapshot| {
				let updated = snapshot.update_page(id, page);

				Ok((updated, updated))
			})
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;
	use crate::account::{PageId, TokenSecret};

	fn temp_path(label: &str) -> PathBuf {
		let unique = format!(
			"leadgen_broker_file_store_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	fn build_account() -> Account {
		let page = Page::new(
			PageId::new("101").expect("Failed to build page fixture."),
			"Page A",
			TokenSecret::new("ta"),
		);

		Account::new(AccountId::new("main").expect("Failed to build account fixture."), "Main")
			.with_long_lived_token("long-lived")
			.with_page(page)
	}

	#[test]
	fn save_and_reload_round_trip() {
		let path = temp_path("round_trip");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let account = build_account();
		let second = Account::new(
			AccountId::new("second").expect("Failed to build account fixture."),
			"Second",
		);
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.save_account(account.clone()))
			.expect("Failed to save fixture account to file store.");
		rt.block_on(store.save_account(second.clone()))
			.expect("Failed to save second account to file store.");
		rt.block_on(store.set_current_account(&second.id))
			.expect("Failed to select second account.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let accounts = rt
			.block_on(reopened.list_accounts())
			.expect("Failed to list accounts from file store.");
		let current = rt
			.block_on(reopened.current_account())
			.expect("Failed to read current account from file store.")
			.expect("File store lost the current account after reopen.");

		assert_eq!(accounts, vec![account, second.clone()]);
		assert_eq!(current, second);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn unknown_page_update_leaves_file_untouched() {
		let path = temp_path("unknown_page");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let account = build_account();
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.save_account(account.clone()))
			.expect("Failed to save fixture account to file store.");

		let before = fs::read(&path).expect("Failed to read persisted snapshot.");
		let page = Page::new(
			PageId::new("999").expect("Failed to build page fixture."),
			"X",
			TokenSecret::new("tx"),
		);
		let updated = rt
			.block_on(store.update_account_page(&account.id, page))
			.expect("Updating an unknown page should not fail.");

		assert!(!updated);
		assert_eq!(fs::read(&path).expect("Failed to re-read persisted snapshot."), before);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn empty_file_opens_as_empty_store() {
		let path = temp_path("empty");

		File::create(&path).expect("Failed to create empty snapshot file.");

		let store = FileStore::open(&path).expect("Empty snapshot files should open.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		assert!(
			rt.block_on(store.current_account())
				.expect("Reading an empty store should succeed.")
				.is_none()
		);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
