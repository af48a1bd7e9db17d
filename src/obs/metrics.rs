// self
use crate::{
	_prelude::*,
	obs::{FlowKind, FlowOutcome},
};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"storefront_client_flow_total",
		"flow" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Counts one backend response, labeled by flow and status class (`2xx`, `4xx`, ...).
///
/// 401s are labeled `401` on their own since they drive the refresh path.
pub fn record_response_status(kind: FlowKind, status: StatusCode) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"storefront_client_response_total",
		"flow" => kind.as_str(),
		"status" => status_class(status)
	)
	.increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = (kind, status);
}

/// Label used for `status` in `storefront_client_response_total`.
pub fn status_class(status: StatusCode) -> &'static str {
	match status.as_u16() {
		401 => "401",
		100..=199 => "1xx",
		200..=299 => "2xx",
		300..=399 => "3xx",
		400..=499 => "4xx",
		_ => "5xx",
	}
}
