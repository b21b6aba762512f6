//! Token resolution: which long-lived and page token apply to the next Graph call.
//!
//! [`TokenResolver::resolve`] combines the current account from the [`AccountStore`], the
//! shared [`TokenCache`], and the [`PinnedCredentials`] policy, in that priority order:
//!
//! 1. A pinned page (from the cached page id or the account page at the cached index) forces its
//!    token into both token fields.
//! 2. An account with a long-lived token supplies that token, plus the page at the cached index
//!    when the index is in range.
//! 3. Otherwise the cache is returned as-is.
//!
//! [`TokenResolver::update`] merges new tokens into the cache and writes them back to the
//! current account. Resolution never fails; missing values are `None` and callers treat them
//! as "not ready".

pub mod cache;
pub mod pinned;

pub use cache::*;
pub use pinned::*;

// self
use crate::{
	_prelude::*,
	account::{Account, AccountId, LongLivedTokenUpdate, Page, PageId, TokenSecret},
	obs,
	store::AccountStore,
};

/// Token set handed to callers building an outbound Graph request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedTokenSet {
	/// Long-lived user token.
	pub long_lived_token: Option<TokenSecret>,
	/// Page-scoped token for `page_id`.
	pub page_token: Option<TokenSecret>,
	/// Page the page token belongs to.
	pub page_id: Option<PageId>,
	/// Selected position in the account's page list.
	pub page_index: Option<usize>,
}

/// Resolves the token set for `account` (if any) against the cached values and pins.
///
/// This is the pure core of [`TokenResolver::resolve`].
pub fn resolve_with(
	account: Option<&Account>,
	cached: &ResolvedTokenSet,
	pinned: &PinnedCredentials,
) -> ResolvedTokenSet {
	let indexed_page =
		account.zip(cached.page_index).and_then(|(account, index)| account.page_at(index));
	let active_pin = cached
		.page_id
		.as_deref()
		.and_then(|id| pinned.get(id))
		.or_else(|| indexed_page.and_then(|page| pinned.get(&page.id)));

	if let Some(pin) = active_pin {
		return ResolvedTokenSet {
			long_lived_token: Some(pin.token.clone()),
			page_token: Some(pin.token.clone()),
			page_id: Some(pin.page_id.clone()),
			page_index: cached.page_index,
		};
	}

	let Some((account, long_lived)) =
		account.and_then(|account| account.long_lived_token().map(|token| (account, token)))
	else {
		return cached.clone();
	};

	if let Some((index, page)) =
		cached.page_index.and_then(|index| account.page_at(index).map(|page| (index, page)))
	{
		return ResolvedTokenSet {
			long_lived_token: Some(long_lived.clone()),
			page_token: page.token().cloned(),
			page_id: Some(page.id.clone()),
			page_index: Some(index),
		};
	}

	ResolvedTokenSet {
		long_lived_token: Some(long_lived.clone()),
		page_token: cached.page_token.clone(),
		page_id: cached.page_id.clone(),
		page_index: None,
	}
}

/// How a token field changed during an update, safe to log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeMark {
	/// A new value was supplied.
	Updated,
	/// No value was supplied; the previous one remains.
	Unchanged,
	/// Neither a new nor a previous value exists.
	Empty,
}
impl ChangeMark {
	fn classify(supplied: bool, previous: bool) -> Self {
		match (supplied, previous) {
			(true, _) => Self::Updated,
			(false, true) => Self::Unchanged,
			(false, false) => Self::Empty,
		}
	}

	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Updated => "[updated]",
			Self::Unchanged => "[unchanged]",
			Self::Empty => "[empty]",
		}
	}
}
impl Display for ChangeMark {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Masked description of a cache update; carries token presence, never token values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenChangeSummary {
	/// Long-lived token change.
	pub long_lived_token: ChangeMark,
	/// Page token change.
	pub page_token: ChangeMark,
	/// Page id after the merge.
	pub page_id: Option<PageId>,
	/// Page index after the merge.
	pub page_index: Option<usize>,
}
impl TokenChangeSummary {
	/// Summarizes `update` relative to the cache contents `before` and `after` the merge.
	pub fn new(before: &ResolvedTokenSet, update: &TokenUpdate, after: &ResolvedTokenSet) -> Self {
		Self {
			long_lived_token: ChangeMark::classify(
				update.long_lived_token.is_some(),
				before.long_lived_token.is_some(),
			),
			page_token: ChangeMark::classify(
				update.page_token.is_some(),
				before.page_token.is_some(),
			),
			page_id: after.page_id.clone(),
			page_index: after.page_index,
		}
	}
}

/// What [`TokenResolver::update`] wrote back to the account store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateReport {
	/// Account that received the writes, if one was active.
	pub account_id: Option<AccountId>,
	/// Expiry persisted alongside a new long-lived token.
	pub long_lived_expiry: Option<OffsetDateTime>,
	/// Whether a registered page had its token replaced.
	pub page_persisted: bool,
}

/// Resolves and records tokens for outbound Graph calls.
///
/// Updates for the same account run under one async guard so the cache merge and the
/// store writes of concurrent requests never interleave.
#[derive(Clone)]
pub struct TokenResolver {
	store: Arc<dyn AccountStore>,
	cache: TokenCache,
	pinned: Arc<PinnedCredentials>,
	guards: Arc<Mutex<HashMap<AccountId, Arc<AsyncMutex<()>>>>>,
}
impl TokenResolver {
	/// Creates a resolver over the provided store, cache, and pin policy.
	pub fn new(store: Arc<dyn AccountStore>, cache: TokenCache, pinned: PinnedCredentials) -> Self {
		Self { store, cache, pinned: Arc::new(pinned), guards: Default::default() }
	}

	/// Account store used for reads and write-backs.
	pub fn store(&self) -> &Arc<dyn AccountStore> {
		&self.store
	}

	/// Shared token cache.
	pub fn cache(&self) -> &TokenCache {
		&self.cache
	}

	/// Pin policy applied during resolution and updates.
	pub fn pinned(&self) -> &PinnedCredentials {
		&self.pinned
	}

	/// Produces the token set for the next outbound call.
	pub async fn resolve(&self) -> ResolvedTokenSet {
		let account = self.current_account().await;

		resolve_with(account.as_ref(), &self.cache.snapshot(), &self.pinned)
	}

	/// Records newly obtained tokens, stamping long-lived tokens with the current time.
	pub async fn update(&self, update: TokenUpdate) -> Result<UpdateReport> {
		self.update_at(update, OffsetDateTime::now_utc()).await
	}

	/// Records newly obtained tokens as of `now`.
	///
	/// The cache merge is applied first and is not rolled back if a store write fails.
	pub async fn update_at(&self, update: TokenUpdate, now: OffsetDateTime) -> Result<UpdateReport> {
		let account = self.current_account().await;
		let guard = account.as_ref().map(|account| self.guard(&account.id));
		let _exclusive = match &guard {
			Some(guard) => Some(guard.lock().await),
			None => None,
		};
		let (before, after) = self.cache.merge(&update, &self.pinned);

		obs::record_token_update(&TokenChangeSummary::new(&before, &update, &after));

		let Some(account) = account else {
			return Ok(UpdateReport::default());
		};
		let mut report = UpdateReport { account_id: Some(account.id.clone()), ..Default::default() };

		if let Some(token) = &update.long_lived_token {
			let write = LongLivedTokenUpdate::issued_at(token.clone(), now);
			let expires_at = write.expires_at;

			if self.store.update_account_tokens(&account.id, write).await? {
				report.long_lived_expiry = Some(expires_at);
			}
		}
		if let (Some(token), Some(page_id)) = (&update.page_token, &update.page_id) {
			report.page_persisted = self.persist_page(&account, page_id, token).await?;
		}

		Ok(report)
	}

	async fn persist_page(
		&self,
		account: &Account,
		page_id: &PageId,
		token: &TokenSecret,
	) -> Result<bool> {
		let Some(existing) = account.page(page_id) else {
			tracing::debug!(
				account = %account.id,
				page_id = %page_id,
				"Page is not registered on the account; skipping page token write."
			);

			return Ok(false);
		};
		let access_token = self.pinned.token_for(page_id).unwrap_or(token).clone();
		let page = Page::new(page_id.clone(), existing.name.clone(), access_token);

		Ok(self.store.update_account_page(&account.id, page).await?)
	}

	async fn current_account(&self) -> Option<Account> {
		match self.store.current_account().await {
			Ok(account) => account,
			Err(e) => {
				tracing::warn!(error = %e, "Account store unavailable; resolving from the token cache.");

				None
			},
		}
	}

	fn guard(&self, id: &AccountId) -> Arc<AsyncMutex<()>> {
		let mut guards = self.guards.lock();

		guards.entry(id.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
impl Debug for TokenResolver {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenResolver")
			.field("pinned_pages", &self.pinned.len())
			.field("cache", &self.cache.snapshot())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::store::{MemoryStore, StoreError, StoreFuture};

	const PINNED_ID: &str = "101245016125462";
	const PIN: &str = "PINNED-TOKEN";

	fn page_id(value: &str) -> PageId {
		PageId::new(value).expect("Page fixture should be valid.")
	}

	fn page(id: &str, token: &str) -> Page {
		Page::new(page_id(id), format!("Page {id}"), TokenSecret::new(token))
	}

	fn account(pages: impl IntoIterator<Item = Page>) -> Account {
		let mut account =
			Account::new(AccountId::new("main").expect("Account fixture should be valid."), "Main")
				.with_long_lived_token("account-long");

		for page in pages {
			account = account.with_page(page);
		}

		account
	}

	fn pinned() -> PinnedCredentials {
		PinnedCredentials::default().pin(page_id(PINNED_ID), TokenSecret::new(PIN))
	}

	fn resolver(store: MemoryStore, cached: ResolvedTokenSet) -> TokenResolver {
		TokenResolver::new(Arc::new(store), TokenCache::new(cached), pinned())
	}

	fn cached_index(index: usize) -> ResolvedTokenSet {
		ResolvedTokenSet { page_index: Some(index), ..Default::default() }
	}

	fn exposed(token: &Option<TokenSecret>) -> Option<&str> {
		token.as_ref().map(TokenSecret::expose)
	}

	struct FailingStore;
	impl AccountStore for FailingStore {
		fn current_account(&self) -> StoreFuture<'_, Option<Account>> {
			Box::pin(async { Err(StoreError::Backend { message: "offline".into() }) })
		}

		fn list_accounts(&self) -> StoreFuture<'_, Vec<Account>> {
			Box::pin(async { Err(StoreError::Backend { message: "offline".into() }) })
		}

		fn save_account(&self, _account: Account) -> StoreFuture<'_, ()> {
			Box::pin(async { Err(StoreError::Backend { message: "offline".into() }) })
		}

		fn set_current_account<'a>(&'a self, _id: &'a AccountId) -> StoreFuture<'a, ()> {
			Box::pin(async { Err(StoreError::Backend { message: "offline".into() }) })
		}

		fn update_account_tokens<'a>(
			&'a self,
			_id: &'a AccountId,
			_update: LongLivedTokenUpdate,
		) -> StoreFuture<'a, bool> {
			Box::pin(async { Err(StoreError::Backend { message: "offline".into() }) })
		}

		fn update_account_page<'a>(
			&'a self,
			_id: &'a AccountId,
			_page: Page,
		) -> StoreFuture<'a, bool> {
			Box::pin(async { Err(StoreError::Backend { message: "offline".into() }) })
		}
	}

	#[tokio::test]
	async fn indexed_page_pairs_with_account_long_lived_token() {
		let store = MemoryStore::with_accounts([account([page("101", "ta"), page("202", "tb")])]);
		let resolved = resolver(store, cached_index(1)).resolve().await;

		assert_eq!(exposed(&resolved.long_lived_token), Some("account-long"));
		assert_eq!(exposed(&resolved.page_token), Some("tb"));
		assert_eq!(resolved.page_id, Some(page_id("202")));
		assert_eq!(resolved.page_index, Some(1));
	}

	#[tokio::test]
	async fn out_of_range_index_degrades_to_cached_page() {
		let store = MemoryStore::with_accounts([account([page("101", "ta")])]);
		let cached = ResolvedTokenSet {
			long_lived_token: Some(TokenSecret::new("cached-long")),
			page_token: Some(TokenSecret::new("cached-page")),
			page_id: Some(page_id("303")),
			page_index: Some(5),
		};
		let resolved = resolver(store, cached).resolve().await;

		assert_eq!(exposed(&resolved.long_lived_token), Some("account-long"));
		assert_eq!(exposed(&resolved.page_token), Some("cached-page"));
		assert_eq!(resolved.page_id, Some(page_id("303")));
		assert_eq!(resolved.page_index, None);
	}

	#[tokio::test]
	async fn pinned_page_wins_via_cached_page_id() {
		let store = MemoryStore::with_accounts([account([page("101", "ta")])]);
		let cached = ResolvedTokenSet {
			long_lived_token: Some(TokenSecret::new("cached-long")),
			page_token: Some(TokenSecret::new("stale")),
			page_id: Some(page_id(PINNED_ID)),
			page_index: Some(0),
		};
		let resolved = resolver(store, cached).resolve().await;

		assert_eq!(exposed(&resolved.long_lived_token), Some(PIN));
		assert_eq!(exposed(&resolved.page_token), Some(PIN));
		assert_eq!(resolved.page_id, Some(page_id(PINNED_ID)));
		assert_eq!(resolved.page_index, Some(0));
	}

	#[tokio::test]
	async fn pinned_page_wins_via_indexed_account_page() {
		let store =
			MemoryStore::with_accounts([account([page("101", "ta"), page(PINNED_ID, "stored")])]);
		let resolved = resolver(store, cached_index(1)).resolve().await;

		assert_eq!(exposed(&resolved.long_lived_token), Some(PIN));
		assert_eq!(exposed(&resolved.page_token), Some(PIN));
		assert_eq!(resolved.page_id, Some(page_id(PINNED_ID)));
		assert_eq!(resolved.page_index, Some(1));
	}

	#[tokio::test]
	async fn pinned_page_elsewhere_in_list_does_not_apply() {
		let store =
			MemoryStore::with_accounts([account([page("101", "ta"), page(PINNED_ID, "stored")])]);
		let resolved = resolver(store, cached_index(0)).resolve().await;

		assert_eq!(exposed(&resolved.page_token), Some("ta"));
		assert_eq!(resolved.page_id, Some(page_id("101")));
	}

	#[tokio::test]
	async fn empty_cache_without_account_is_returned_unchanged() {
		let resolved = resolver(MemoryStore::default(), ResolvedTokenSet::default()).resolve().await;

		assert_eq!(resolved, ResolvedTokenSet::default());
	}

	#[tokio::test]
	async fn account_without_long_lived_token_uses_cache() {
		let account =
			Account::new(AccountId::new("bare").expect("Account fixture should be valid."), "Bare")
				.with_page(page("101", "ta"));
		let cached = ResolvedTokenSet {
			long_lived_token: Some(TokenSecret::new("cached-long")),
			page_index: Some(0),
			..Default::default()
		};
		let resolved = resolver(MemoryStore::with_accounts([account]), cached.clone()).resolve().await;

		assert_eq!(resolved, cached);
	}

	#[tokio::test]
	async fn unavailable_store_degrades_to_cache() {
		let cached = ResolvedTokenSet {
			long_lived_token: Some(TokenSecret::new("cached-long")),
			..Default::default()
		};
		let resolver = TokenResolver::new(
			Arc::new(FailingStore),
			TokenCache::new(cached.clone()),
			PinnedCredentials::default(),
		);

		assert_eq!(resolver.resolve().await, cached);
	}

	#[tokio::test]
	async fn resolve_is_idempotent() {
		let store = MemoryStore::with_accounts([account([page("101", "ta"), page("202", "tb")])]);
		let resolver = resolver(store, cached_index(0));

		assert_eq!(resolver.resolve().await, resolver.resolve().await);
	}

	#[tokio::test]
	async fn pinned_update_overrides_explicit_page_token() {
		let resolver = resolver(MemoryStore::default(), ResolvedTokenSet::default());

		resolver
			.update(
				TokenUpdate::default().with_page_id(page_id(PINNED_ID)).with_page_token("anything"),
			)
			.await
			.expect("Cache-only updates should succeed.");

		let resolved = resolver.resolve().await;

		assert_eq!(exposed(&resolved.page_token), Some(PIN));
		assert_eq!(exposed(&resolver.cache().snapshot().page_token), Some(PIN));
	}

	#[tokio::test]
	async fn long_lived_update_persists_sixty_day_expiry() {
		let store = MemoryStore::with_accounts([account([])]);
		let resolver = resolver(store.clone(), ResolvedTokenSet::default());
		let now = macros::datetime!(2025-11-10 12:00 UTC);
		let report = resolver
			.update_at(TokenUpdate::default().with_long_lived_token("T"), now)
			.await
			.expect("Long-lived token update should succeed.");
		let stored = store.snapshot().accounts.remove(0);

		assert_eq!(exposed(&stored.long_lived_token), Some("T"));
		assert_eq!(stored.long_lived_token_expiry, Some(now + Duration::days(60)));
		assert_eq!(
			stored.long_lived_token_expiry.map(|expiry| (expiry - now).whole_milliseconds()),
			Some(5_184_000_000)
		);
		assert_eq!(report.long_lived_expiry, stored.long_lived_token_expiry);
	}

	#[tokio::test]
	async fn page_update_for_unknown_page_leaves_pages_unchanged() {
		let store = MemoryStore::with_accounts([account([page("101", "ta")])]);
		let resolver = resolver(store.clone(), ResolvedTokenSet::default());
		let report = resolver
			.update(TokenUpdate::default().with_page_token("P").with_page_id(page_id("999")))
			.await
			.expect("Unknown page updates should not fail.");

		assert!(!report.page_persisted);
		assert_eq!(store.snapshot().accounts[0].pages, vec![page("101", "ta")]);
		assert_eq!(exposed(&resolver.cache().snapshot().page_token), Some("P"));
	}

	#[tokio::test]
	async fn page_update_for_known_page_updates_in_place() {
		let store = MemoryStore::with_accounts([account([page("101", "ta"), page(PINNED_ID, "old")])]);
		let resolver = resolver(store.clone(), ResolvedTokenSet::default());

		resolver
			.update(TokenUpdate::default().with_page_token("ta-2").with_page_id(page_id("101")))
			.await
			.expect("Known page update should succeed.");
		resolver
			.update(TokenUpdate::default().with_page_token("fresh").with_page_id(page_id(PINNED_ID)))
			.await
			.expect("Pinned page update should succeed.");

		let pages = store.snapshot().accounts.remove(0).pages;

		assert_eq!(pages.len(), 2);
		assert_eq!(pages[0].access_token.expose(), "ta-2");
		assert_eq!(pages[0].name, "Page A");
		assert_eq!(pages[1].access_token.expose(), PIN);
	}

	#[tokio::test]
	async fn page_token_without_page_id_is_cache_only() {
		let store = MemoryStore::with_accounts([account([page("101", "ta")])]);
		let resolver = resolver(store.clone(), ResolvedTokenSet::default());
		let report = resolver
			.update(TokenUpdate::default().with_page_token("lonely"))
			.await
			.expect("Cache-only page token update should succeed.");

		assert!(!report.page_persisted);
		assert_eq!(store.snapshot().accounts[0].pages, vec![page("101", "ta")]);
	}

	#[tokio::test]
	async fn concurrent_updates_serialize_per_account() {
		let store = MemoryStore::with_accounts([account([page("101", "ta")])]);
		let resolver = resolver(store.clone(), ResolvedTokenSet::default());
		let first = resolver.update(TokenUpdate::default().with_long_lived_token("one"));
		let second = resolver.update(TokenUpdate::default().with_long_lived_token("two"));
		let (first, second) = tokio::join!(first, second);

		first.expect("First concurrent update should succeed.");
		second.expect("Second concurrent update should succeed.");

		let cached = resolver.cache().snapshot();
		let stored = store.snapshot().accounts.remove(0);

		assert_eq!(stored.long_lived_token, cached.long_lived_token);
	}

	#[test]
	fn change_summary_never_carries_token_values() {
		let before = ResolvedTokenSet {
			page_token: Some(TokenSecret::new("secret-page")),
			..Default::default()
		};
		let update = TokenUpdate::default().with_long_lived_token("secret-long");
		let after = ResolvedTokenSet {
			long_lived_token: Some(TokenSecret::new("secret-long")),
			page_token: Some(TokenSecret::new("secret-page")),
			..Default::default()
		};
		let summary = TokenChangeSummary::new(&before, &update, &after);
		let rendered = format!("{summary:?}");

		assert_eq!(summary.long_lived_token, ChangeMark::Updated);
		assert_eq!(summary.page_token, ChangeMark::Unchanged);
		assert!(!rendered.contains("secret-long"));
		assert!(!rendered.contains("secret-page"));
		assert_eq!(
			TokenChangeSummary::new(
				&ResolvedTokenSet::default(),
				&TokenUpdate::default(),
				&ResolvedTokenSet::default()
			)
			.page_token
			.as_str(),
			"[empty]"
		);
	}
}
