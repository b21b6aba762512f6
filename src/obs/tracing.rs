// crates.io
use tracing::{Instrument, instrument::Instrumented};
// self
use crate::{_prelude::*, obs::GraphCall, resolver::TokenChangeSummary};

/// A span builder used around Graph calls.
#[derive(Clone, Debug)]
pub struct CallSpan {
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the provided call + stage.
	pub fn new(call: GraphCall, stage: &'static str) -> Self {
		Self { span: tracing::info_span!("leadgen_broker.graph", call = call.as_str(), stage) }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.span.clone())
	}
}

/// Logs which token fields an update touched. Token values are never recorded.
pub fn record_token_update(summary: &TokenChangeSummary) {
	tracing::info!(
		target: "leadgen_broker.tokens",
		long_lived_token = summary.long_lived_token.as_str(),
		page_token = summary.page_token.as_str(),
		page_id = summary.page_id.as_deref().unwrap_or("[empty]"),
		page_index = ?summary.page_index,
		"Token cache updated."
	);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::resolver::ChangeMark;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = CallSpan::new(GraphCall::ListLeads, "instrument_wraps_future");
		let value = CallSpan::instrument(&span, async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[test]
	fn token_update_event_accepts_empty_summary() {
		record_token_update(&TokenChangeSummary {
			long_lived_token: ChangeMark::Empty,
			page_token: ChangeMark::Empty,
			page_id: None,
			page_index: None,
		});
	}
}
