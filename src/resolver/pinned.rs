//! Pinned page credentials that override whatever the store or cache holds.

// self
use crate::{
	_prelude::*,
	account::{IdentifierError, PageId, TokenSecret},
	graph::LeadForm,
};

/// Error raised while parsing pinned credential declarations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum PinnedCredentialError {
	/// An entry was not of the form `page_id=token`.
	#[error("Pinned credential entry `{entry}` must look like `page_id=token`.")]
	MalformedEntry {
		/// Offending entry with the token portion removed.
		entry: String,
	},
	/// The page identifier portion was invalid.
	#[error("Pinned credential page id is invalid.")]
	InvalidPageId(#[from] IdentifierError),
}

/// Token forced for one page, plus forms to serve if the Graph API fails for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PinnedCredential {
	/// Pinned page.
	pub page_id: PageId,
	/// Token used for both the long-lived and page token while this page is active.
	pub token: TokenSecret,
	/// Forms returned when listing forms for this page fails upstream.
	pub fallback_forms: Vec<LeadForm>,
}

/// Policy mapping page ids to forced tokens, checked first during resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PinnedCredentials(BTreeMap<PageId, PinnedCredential>);
impl PinnedCredentials {
	/// Pins `token` for `page_id`, replacing an earlier pin but keeping its fallback forms.
	pub fn pin(mut self, page_id: PageId, token: TokenSecret) -> Self {
		let fallback_forms =
			self.0.remove(page_id.as_str()).map(|pin| pin.fallback_forms).unwrap_or_default();

		self.0.insert(page_id.clone(), PinnedCredential { page_id, token, fallback_forms });

		self
	}

	/// Attaches fallback forms to an already pinned page; unpinned pages are ignored.
	pub fn with_fallback_forms(mut self, page_id: &str, forms: Vec<LeadForm>) -> Self {
		if let Some(pin) = self.0.get_mut(page_id) {
			pin.fallback_forms = forms;
		}

		self
	}

	/// Parses comma-separated `page_id=token` pairs; blank input yields an empty policy.
	pub fn parse(spec: &str) -> Result<Self, PinnedCredentialError> {
		let mut pinned = Self::default();

		for entry in spec.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
			let (page_id, token) = entry
				.split_once('=')
				.map(|(id, token)| (id.trim(), token.trim()))
				.filter(|(id, token)| !id.is_empty() && !token.is_empty())
				.ok_or_else(|| PinnedCredentialError::MalformedEntry {
					entry: entry.split('=').next().unwrap_or_default().to_owned(),
				})?;

			pinned = pinned.pin(PageId::new(page_id)?, TokenSecret::new(token));
		}

		Ok(pinned)
	}

	/// Returns the pin for `page_id`, if any.
	pub fn get(&self, page_id: &str) -> Option<&PinnedCredential> {
		self.0.get(page_id)
	}

	/// Returns the forced token for `page_id`, if any.
	pub fn token_for(&self, page_id: &str) -> Option<&TokenSecret> {
		self.get(page_id).map(|pin| &pin.token)
	}

	/// Returns the fallback forms for `page_id` when it is pinned and has any.
	pub fn fallback_forms(&self, page_id: &str) -> Option<&[LeadForm]> {
		self.get(page_id).map(|pin| pin.fallback_forms.as_slice()).filter(|forms| !forms.is_empty())
	}

	/// Returns `true` when no page is pinned.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Number of pinned pages.
	pub fn len(&self) -> usize {
		self.0.len()
	}
}
