// self
use crate::obs::{FlowKind, FlowOutcome};

/// Counter incremented once per recorded flow outcome.
pub const FLOW_COUNTER: &str = "session_client_flow_total";

/// Records a flow outcome against [`FLOW_COUNTER`], labeled by `flow` + `outcome`.
///
/// A no-op without the `metrics` feature; with it, increments land in whatever global recorder
/// the host installed.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		let (flow, outcome) = (kind.as_str(), outcome.as_str());

		metrics::counter!(FLOW_COUNTER, "flow" => flow, "outcome" => outcome).increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}
