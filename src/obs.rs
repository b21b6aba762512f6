//! Observability helpers for Graph calls and token updates.
//!
//! # Feature Flags
//!
//! - Spans named `leadgen_broker.graph` carry the `call` and `stage` fields; token updates emit a
//!   masked `leadgen_broker.tokens` event.
//! - Enable `metrics` to increment the `leadgen_broker_graph_call_total` counter for every
//!   attempt/success/failure, labeled by `call` + `outcome`.

mod metrics;
mod tracing;

pub use self::{metrics::*, tracing::*};

// self
use crate::_prelude::*;

/// Graph API calls observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GraphCall {
	/// Short-lived to long-lived token exchange.
	ExchangeToken,
	/// `me/accounts` page listing.
	ListPages,
	/// Page token validation read.
	InspectPage,
	/// Lead-generation form listing.
	ListLeadForms,
	/// Lead listing for one form.
	ListLeads,
}
impl GraphCall {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			GraphCall::ExchangeToken => "exchange_token",
			GraphCall::ListPages => "list_pages",
			GraphCall::InspectPage => "inspect_page",
			GraphCall::ListLeadForms => "list_lead_forms",
			GraphCall::ListLeads => "list_leads",
		}
	}
}
impl Display for GraphCall {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Request about to be sent.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
