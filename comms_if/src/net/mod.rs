//! # Network Module
//!
//! This module provides the transport abstraction between the simulator and the controller.
//!
//! The core loop only needs a step-synchronous, lossless and order-preserving request/response
//! exchange, which is captured by the [`Link`] trait. Any transport meeting those requirements
//! (a direct in-process call, a channel to another thread, a socket) can be used.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod channel;

pub use channel::{channel_link, ChannelClient, ChannelServer};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// An ordered request/response link.
///
/// Each call to `exchange` blocks until the response to the given request is available. Responses
/// are never reordered or dropped.
pub trait Link<Req, Rep> {
    /// Send a request and wait for its response.
    fn exchange(&mut self, request: Req) -> Result<Rep, LinkError>;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LinkError {
    #[error("The other end of the link has disconnected")]
    Disconnected,

    #[error("Response out of order: expected step {expected}, found step {found}")]
    OutOfOrder { expected: u64, found: u64 },
}
