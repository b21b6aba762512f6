// self
use crate::obs::{CallOutcome, GraphCall};

/// Records a Graph call outcome via the global metrics recorder (when enabled).
pub fn record_call_outcome(call: GraphCall, outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"leadgen_broker_graph_call_total",
			"call" => call.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (call, outcome);
	}
}
