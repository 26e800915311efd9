//! Values exchanged between the host runtime, operators and stages.

mod event;
mod operator_status;
mod phase;
#[cfg(test)]
mod phase_test;
mod query_record;

pub use event::{Event, InputEvent, Metadata};
pub use operator_status::OperatorStatus;
pub use phase::Phase;
pub use query_record::{QueryFailure, QueryOutputs, QueryRecord};
