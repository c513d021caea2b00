//! Optional observability helpers for network operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `iajson.operation` with the `operation`
//!   and `stage` (call site) fields.
//! - Enable `metrics` to increment the `iajson_operation_total` counter for every
//!   attempt/success/failure, labeled by `operation` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Network operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Descriptor discovery.
	Discovery,
	/// Agent registration request.
	Registration,
	/// Registration verification.
	Verification,
	/// Authorization code exchange.
	CodeExchange,
	/// Refresh token grant.
	TokenRefresh,
	/// Endpoint invocation through the client.
	EndpointCall,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::Discovery => "discovery",
			OperationKind::Registration => "registration",
			OperationKind::Verification => "verification",
			OperationKind::CodeExchange => "code_exchange",
			OperationKind::TokenRefresh => "token_refresh",
			OperationKind::EndpointCall => "endpoint_call",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OperationOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationOutcome::Attempt => "attempt",
			OperationOutcome::Success => "success",
			OperationOutcome::Failure => "failure",
		}
	}
}
impl Display for OperationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside an operation span, recording attempt and outcome counters around it.
pub(crate) async fn observe<T, Fut>(kind: OperationKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = OperationSpan::new(kind, stage);

	record_operation_outcome(kind, OperationOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => record_operation_outcome(kind, OperationOutcome::Success),
		Err(_) => record_operation_outcome(kind, OperationOutcome::Failure),
	}

	result
}
