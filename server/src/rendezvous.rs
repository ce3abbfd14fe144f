//! Single-slot rendezvous between session proxies and the server loop
//!
//! One `Slot` holds at most one request and one response. Three tokens
//! serialize access to it:
//! - `turn` (one permit): ownership of the slot for a whole cycle
//! - `client_ready`: a request has been written
//! - `server_ready`: a response has been written
//!
//! A cycle runs: acquire `turn`, write the request, signal `client_ready`,
//! wait for `server_ready`, read the response, release `turn`. The server loop
//! waits for `client_ready`, takes the request, and publishes the answer with
//! `server_ready`.
//!
//! The turn is a guard, so a holder that panics or is cancelled still gives it
//! back. A holder waits for the answer at most one lease; after that it
//! abandons the cycle. Every request carries a fence number that the server
//! echoes, and a holder only accepts the response stamped with its own fence,
//! so a late answer to an abandoned cycle is discarded rather than read by the
//! next holder.

use hangman_shared::{Request, Response};
use log::{debug, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::{timeout_at, Instant};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RendezvousError {
    #[error("rendezvous closed")]
    Closed,
    #[error("no answer within the turn lease of {0:?}")]
    LeaseExpired(Duration),
}

/// A slot entry stamped with the fence of the cycle that wrote it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posted<T> {
    pub fence: u64,
    pub body: T,
}

#[derive(Debug, Default)]
struct Slot {
    request: Option<Posted<Request>>,
    response: Option<Posted<Response>>,
}

#[derive(Debug)]
pub struct Rendezvous {
    slot: Mutex<Slot>,
    turn: Semaphore,
    client_ready: Semaphore,
    server_ready: Semaphore,
    next_fence: AtomicU64,
    lease: Duration,
}

impl Rendezvous {
    pub fn new(lease: Duration) -> Self {
        Self {
            slot: Mutex::new(Slot::default()),
            turn: Semaphore::new(1),
            client_ready: Semaphore::new(0),
            server_ready: Semaphore::new(0),
            next_fence: AtomicU64::new(1),
            lease,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits for exclusive ownership of the slot
    pub async fn acquire(&self) -> Result<Turn<'_>, RendezvousError> {
        let permit = self
            .turn
            .acquire()
            .await
            .map_err(|_| RendezvousError::Closed)?;

        Ok(Turn {
            rendezvous: self,
            _permit: permit,
        })
    }

    /// Server side: waits for a client to signal and takes its request
    ///
    /// Returns `Ok(None)` when the signal belonged to an abandoned cycle whose
    /// request was already consumed. Cancellation safe.
    pub async fn next_request(&self) -> Result<Option<Posted<Request>>, RendezvousError> {
        self.client_ready
            .acquire()
            .await
            .map_err(|_| RendezvousError::Closed)?
            .forget();

        Ok(self.slot().request.take())
    }

    /// Server side: writes the answer for `fence` and wakes the turn holder
    pub fn publish(&self, fence: u64, response: Response) {
        self.slot().response = Some(Posted {
            fence,
            body: response,
        });
        self.server_ready.add_permits(1);
    }

    /// Leaves `notice` in the slot and closes every token
    ///
    /// All current and future waiters get `RendezvousError::Closed`.
    pub fn close(&self, notice: Response) {
        {
            let mut slot = self.slot();
            slot.request = None;
            slot.response = Some(Posted {
                fence: 0,
                body: notice,
            });
        }

        self.turn.close();
        self.client_ready.close();
        self.server_ready.close();
    }

    pub fn is_closed(&self) -> bool {
        self.turn.is_closed()
    }

    /// Last notice left by `close`, if any
    pub fn closing_notice(&self) -> Option<Response> {
        let slot = self.slot();
        match &slot.response {
            Some(posted) if posted.fence == 0 => Some(posted.body.clone()),
            _ => None,
        }
    }

    pub fn lease(&self) -> Duration {
        self.lease
    }
}

/// Exclusive ownership of the slot for one or more cycles
///
/// Dropping the guard releases the turn.
#[derive(Debug)]
pub struct Turn<'a> {
    rendezvous: &'a Rendezvous,
    _permit: SemaphorePermit<'a>,
}

impl Turn<'_> {
    /// Writes `request`, signals the server and waits for the matching answer
    pub async fn exchange(&mut self, request: Request) -> Result<Response, RendezvousError> {
        let rendezvous = self.rendezvous;
        let fence = rendezvous.next_fence.fetch_add(1, Ordering::Relaxed);

        {
            let mut slot = rendezvous.slot();
            slot.request = Some(Posted {
                fence,
                body: request,
            });
            slot.response = None;
        }
        rendezvous.client_ready.add_permits(1);

        let deadline = Instant::now() + rendezvous.lease;
        loop {
            let permit = timeout_at(deadline, rendezvous.server_ready.acquire())
                .await
                .map_err(|_| {
                    warn!(
                        "Client {} gave up its turn after {:?}",
                        request.client_id, rendezvous.lease
                    );
                    RendezvousError::LeaseExpired(rendezvous.lease)
                })?
                .map_err(|_| RendezvousError::Closed)?;
            permit.forget();

            match rendezvous.slot().response.take() {
                Some(posted) if posted.fence == fence => return Ok(posted.body),
                Some(stale) => {
                    debug!("Discarding stale response for fence {}", stale.fence);
                }
                None => debug!("Server ready without a response"),
            }
        }
    }
}
