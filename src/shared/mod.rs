//! Shared protocol machinery used by both client and server.

pub mod codec;
pub mod protocol;
pub mod ws;

pub use codec::{encode_frame, parse_error_response, parse_frame, Frame};
pub use protocol::PendingRequests;
