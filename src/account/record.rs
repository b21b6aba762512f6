//! Account records and the long-lived token writes applied to them.

// self
use crate::{
	_prelude::*,
	account::{AccountId, Page, PageId, TokenSecret},
};

/// Locally managed account owning a long-lived token and its pages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
	/// Local account identifier.
	pub id: AccountId,
	/// Human-readable account label.
	pub name: String,
	/// Long-lived user token, once one has been exchanged.
	#[serde(default)]
	pub long_lived_token: Option<TokenSecret>,
	/// Instant after which the long-lived token should be considered stale.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub long_lived_token_expiry: Option<OffsetDateTime>,
	/// Pages managed through this account, unique by page id.
	#[serde(default)]
	pub pages: Vec<Page>,
}
impl Account {
	/// Creates an account without tokens or pages.
	pub fn new(id: AccountId, name: impl Into<String>) -> Self {
		Self {
			id,
			name: name.into(),
			long_lived_token: None,
			long_lived_token_expiry: None,
			pages: Vec::new(),
		}
	}

	/// Sets the long-lived token without an expiry.
	pub fn with_long_lived_token(mut self, token: impl Into<String>) -> Self {
		self.long_lived_token = TokenSecret::non_empty(token);

		self
	}

	/// Appends a page, replacing an existing entry with the same id.
	pub fn with_page(mut self, page: Page) -> Self {
		match self.pages.iter_mut().find(|existing| existing.id == page.id) {
			Some(existing) => *existing = page,
			None => self.pages.push(page),
		}

		self
	}

	/// Returns the long-lived token unless it is missing or empty.
	pub fn long_lived_token(&self) -> Option<&TokenSecret> {
		self.long_lived_token.as_ref().filter(|token| !token.is_empty())
	}

	/// Finds a page by id.
	pub fn page(&self, id: &str) -> Option<&Page> {
		self.pages.iter().find(|page| page.id.as_str() == id)
	}

	/// Returns the page at `index`, if it is in range.
	pub fn page_at(&self, index: usize) -> Option<&Page> {
		self.pages.get(index)
	}

	/// Applies a long-lived token write.
	pub fn apply_tokens(&mut self, update: LongLivedTokenUpdate) {
		self.long_lived_token = Some(update.token);
		self.long_lived_token_expiry = Some(update.expires_at);
	}

	/// Token-free view of the account; `current` marks the active one.
	pub fn summary(&self, current: bool) -> AccountSummary {
		AccountSummary {
			id: self.id.clone(),
			name: self.name.clone(),
			current,
			has_long_lived_token: self.long_lived_token().is_some(),
			long_lived_token_expiry: self.long_lived_token_expiry,
			pages: self
				.pages
				.iter()
				.map(|page| PageSummary { id: page.id.clone(), name: page.name.clone() })
				.collect(),
		}
	}

	/// Replaces the stored page with the same id; returns `false` when no such page exists.
	pub fn apply_page(&mut self, page: Page) -> bool {
		match self.pages.iter_mut().find(|existing| existing.id == page.id) {
			Some(existing) => {
				*existing = page;

				true
			},
			None => false,
		}
	}
}

/// Long-lived token write persisted to an [`Account`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LongLivedTokenUpdate {
	/// Newly exchanged long-lived token.
	pub token: TokenSecret,
	/// Computed expiry instant.
	pub expires_at: OffsetDateTime,
}
impl LongLivedTokenUpdate {
	/// Horizon applied to freshly exchanged long-lived tokens.
	pub const LIFETIME: Duration = Duration::days(60);

	/// Builds an update whose expiry is [`Self::LIFETIME`] after `issued_at`.
	pub fn issued_at(token: TokenSecret, issued_at: OffsetDateTime) -> Self {
		Self { token, expires_at: issued_at + Self::LIFETIME }
	}
}

/// Account listing entry that never carries token values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
	/// Local account identifier.
	pub id: AccountId,
	/// Human-readable account label.
	pub name: String,
	/// Whether this is the active account.
	pub current: bool,
	/// Whether a long-lived token is stored.
	pub has_long_lived_token: bool,
	/// Stored long-lived token expiry.
	#[serde(with = "time::serde::rfc3339::option")]
	pub long_lived_token_expiry: Option<OffsetDateTime>,
	/// Registered pages.
	pub pages: Vec<PageSummary>,
}

/// Page listing entry without its token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PageSummary {
	/// Page identifier.
	pub id: PageId,
	/// Page display name.
	pub name: String,
}
