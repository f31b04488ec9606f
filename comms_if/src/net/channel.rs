//! # Channel transport
//!
//! An in-process implementation of [`Link`] over a pair of rendezvous channels, allowing the
//! controller to run on its own thread.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use log::trace;

use super::{Link, LinkError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The requesting end of a channel link.
pub struct ChannelClient<Req, Rep> {
    req_tx: SyncSender<Req>,
    rep_rx: Receiver<Rep>,
}

/// The responding end of a channel link.
pub struct ChannelServer<Req, Rep> {
    req_rx: Receiver<Req>,
    rep_tx: SyncSender<Rep>,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Create a connected client/server pair.
///
/// Both channels have a capacity of one message, so the client can never get more than one
/// request ahead of the server.
pub fn channel_link<Req, Rep>() -> (ChannelClient<Req, Rep>, ChannelServer<Req, Rep>) {
    let (req_tx, req_rx) = sync_channel(1);
    let (rep_tx, rep_rx) = sync_channel(1);

    (
        ChannelClient { req_tx, rep_rx },
        ChannelServer { req_rx, rep_tx },
    )
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<Req, Rep> Link<Req, Rep> for ChannelClient<Req, Rep> {
    fn exchange(&mut self, request: Req) -> Result<Rep, LinkError> {
        self.req_tx
            .send(request)
            .map_err(|_| LinkError::Disconnected)?;

        self.rep_rx.recv().map_err(|_| LinkError::Disconnected)
    }
}

impl<Req, Rep> ChannelServer<Req, Rep> {
    /// Serve requests with the given handler until the client disconnects.
    ///
    /// Returns the number of requests served.
    pub fn serve<F>(self, mut handler: F) -> usize
    where
        F: FnMut(Req) -> Rep,
    {
        let mut num_served = 0;

        for request in self.req_rx.iter() {
            let response = handler(request);

            if self.rep_tx.send(response).is_err() {
                break;
            }

            num_served += 1;
        }

        trace!("Channel server finished after {} requests", num_served);

        num_served
    }
}
