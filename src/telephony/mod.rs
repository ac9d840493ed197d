//! Telephony boundary: inbound call events, the outbound action
//! interface the dispatcher drives, and the Telnyx client behind it.

pub mod actions;
pub mod event;
pub mod telnyx;

pub use actions::{mask_number, TelephonyActions, TelephonyError};
pub use event::{CallDirection, CallEvent, EventKind};
pub use telnyx::TelnyxClient;
