//! Injectable token cache consulted when the account store has nothing better.

// self
use crate::{
	_prelude::*,
	account::{PageId, TokenSecret},
	resolver::{PinnedCredentials, ResolvedTokenSet},
};

/// Partial token set merged into the [`TokenCache`] by [`TokenResolver::update`].
///
/// [`TokenResolver::update`]: crate::resolver::TokenResolver::update
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenUpdate {
	/// Newly obtained long-lived token.
	pub long_lived_token: Option<TokenSecret>,
	/// Newly obtained page token.
	pub page_token: Option<TokenSecret>,
	/// Page the page token belongs to.
	pub page_id: Option<PageId>,
	/// Position of the selected page in the account's page list; `Some(None)` clears it.
	pub page_index: Option<Option<usize>>,
}
impl TokenUpdate {
	/// Sets the long-lived token; empty strings are ignored.
	pub fn with_long_lived_token(mut self, token: impl Into<String>) -> Self {
		self.long_lived_token = TokenSecret::non_empty(token);

		self
	}

	/// Sets the page token; empty strings are ignored.
	pub fn with_page_token(mut self, token: impl Into<String>) -> Self {
		self.page_token = TokenSecret::non_empty(token);

		self
	}

	/// Sets the page identifier.
	pub fn with_page_id(mut self, page_id: PageId) -> Self {
		self.page_id = Some(page_id);

		self
	}

	/// Sets the selected page index.
	pub fn with_page_index(mut self, index: usize) -> Self {
		self.page_index = Some(Some(index));

		self
	}

	/// Clears the cached page index, for pages the account does not register.
	pub fn without_page_index(mut self) -> Self {
		self.page_index = Some(None);

		self
	}

	/// Returns `true` when no field is set.
	pub fn is_empty(&self) -> bool {
		self.long_lived_token.is_none()
			&& self.page_token.is_none()
			&& self.page_id.is_none()
			&& self.page_index.is_none()
	}
}

/// Shared, cloneable token cache with a read/merge contract.
///
/// Clones share the same underlying state, so one cache can be handed to every request
/// handler while tests build a fresh one per case.
#[derive(Clone, Debug, Default)]
pub struct TokenCache(Arc<RwLock<ResolvedTokenSet>>);
impl TokenCache {
	/// Creates a cache seeded with `initial`.
	pub fn new(initial: ResolvedTokenSet) -> Self {
		Self(Arc::new(RwLock::new(initial)))
	}

	/// Returns a copy of the cached values.
	pub fn snapshot(&self) -> ResolvedTokenSet {
		self.0.read().clone()
	}

	/// Merges the present fields of `update`, then re-applies pins for the merged page.
	///
	/// Returns the cache contents before and after the merge.
	pub fn merge(
		&self,
		update: &TokenUpdate,
		pinned: &PinnedCredentials,
	) -> (ResolvedTokenSet, ResolvedTokenSet) {
		let mut guard = self.0.write();
		let before = guard.clone();

		if let Some(token) = &update.long_lived_token {
			guard.long_lived_token = Some(token.clone());
		}
		if let Some(token) = &update.page_token {
			guard.page_token = Some(token.clone());
		}
		if let Some(page_id) = &update.page_id {
			guard.page_id = Some(page_id.clone());
		}
		if let Some(index) = update.page_index {
			guard.page_index = index;
		}
		if let Some(token) = guard.page_id.as_deref().and_then(|id| pinned.token_for(id)) {
			guard.page_token = Some(token.clone());
		}

		(before, guard.clone())
	}
}
