//! Identifiers: local account slugs and numeric Graph object ids.
//!
//! Account ids name entries in `accounts.json` and appear in API paths and CLI arguments, so they
//! are restricted to ASCII letters, digits, `-`, `_`, and `.`. Page and form ids come from the
//! Graph API, which issues them as decimal strings.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const ACCOUNT_ID_MAX_LEN: usize = 64;
const GRAPH_ID_MAX_LEN: usize = 32;

/// Error returned when an identifier is rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// Nothing was supplied.
	#[error("{kind} id cannot be empty.")]
	Empty {
		/// `account`, `page`, or `form`.
		kind: &'static str,
	},
	/// Longer than the kind allows.
	#[error("{kind} id exceeds {max} characters.")]
	TooLong {
		/// `account`, `page`, or `form`.
		kind: &'static str,
		/// Maximum permitted length.
		max: usize,
	},
	/// Account slug with a character outside `[A-Za-z0-9._-]`.
	#[error("{kind} id contains `{found}`; use letters, digits, `-`, `_`, or `.`.")]
	InvalidCharacter {
		/// `account`.
		kind: &'static str,
		/// First offending character.
		found: char,
	},
	/// Graph id that is not a decimal number.
	#[error("{kind} id `{value}` is not a numeric Graph id.")]
	NotNumeric {
		/// `page` or `form`.
		kind: &'static str,
		/// Rejected input.
		value: String,
	},
}

macro_rules! def_id {
	($(#[$meta:meta])* $name:ident, $kind:literal, $check:path) => {
		$(#[$meta])*
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String")]
		pub struct $name(String);
		impl $name {
			/// Validates and wraps `value`.
			pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
				let value = value.into();

				$check($kind, &value)?;

				Ok(Self(value))
			}

			/// Returns the raw id.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &str {
				&self.0
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, "{}({})", stringify!($name), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

def_id! {
	/// Slug of a locally managed account, e.g. `main` or `agency-2`.
	AccountId, "account", check_slug
}
def_id! {
	/// Graph id of a managed page.
	PageId, "page", check_graph_id
}
def_id! {
	/// Graph id of a lead-generation form.
	FormId, "form", check_graph_id
}

fn check_slug(kind: &'static str, value: &str) -> Result<(), IdentifierError> {
	if value.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if value.len() > ACCOUNT_ID_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: ACCOUNT_ID_MAX_LEN });
	}
	if let Some(found) =
		value.chars().find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
	{
		return Err(IdentifierError::InvalidCharacter { kind, found });
	}

	Ok(())
}

fn check_graph_id(kind: &'static str, value: &str) -> Result<(), IdentifierError> {
	if value.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if value.len() > GRAPH_ID_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: GRAPH_ID_MAX_LEN });
	}
	if !value.bytes().all(|b| b.is_ascii_digit()) {
		return Err(IdentifierError::NotNumeric { kind, value: value.to_owned() });
	}

	Ok(())
}
