//! Standard response envelope and the per-request responder.

pub mod body;
pub mod responder;
pub mod status;

pub use body::{build, Envelope, ResponseInput};
pub use responder::{ApiResponse, Responder};
pub use status::ResponseStatus;
