//! Managed page records shared by the store and the Graph client.

// self
use crate::{
	_prelude::*,
	account::{PageId, TokenSecret},
};

/// Managed page with its page-scoped access token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
	/// Graph page identifier; unique within an account.
	pub id: PageId,
	/// Display name reported by the Graph API.
	#[serde(default)]
	pub name: String,
	/// Page access token; empty when the Graph listing omits it. Callers must avoid logging it.
	#[serde(default)]
	pub access_token: TokenSecret,
}
impl Page {
	/// Creates a page record.
	pub fn new(id: PageId, name: impl Into<String>, access_token: TokenSecret) -> Self {
		Self { id, name: name.into(), access_token }
	}

	/// Returns the page token unless it is empty.
	pub fn token(&self) -> Option<&TokenSecret> {
		Some(&self.access_token).filter(|token| !token.is_empty())
	}
}
