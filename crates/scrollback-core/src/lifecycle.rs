//! Request epochs and supersession of in-flight page fetches.
//!
//! Every page fetch takes a [`RequestTicket`] from [`RequestLifecycle::begin`],
//! which cancels whatever fetch was in flight before it. When the fetch
//! resolves, [`RequestLifecycle::settle`] decides whether its result may be
//! applied: only the ticket carrying the current epoch is `Resolved`, every
//! older ticket is `Cancelled` or `Stale` regardless of the order in which
//! the network delivered them.

use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Handle for one issued page request
#[derive(Debug, Clone)]
pub struct RequestTicket {
    epoch: u64,
    cancel: CancellationToken,
}

impl RequestTicket {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Token to hand to the transport
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Outcome of settling a request against the current epoch
#[derive(Debug)]
pub enum Settled<T> {
    /// The request is still current; its result may be applied
    Resolved(Result<T>),
    /// Superseded, and the transport honoured the cancellation
    Cancelled,
    /// Superseded, but a result arrived anyway
    Stale,
}

/// Issues request epochs and tracks the single in-flight page request.
#[derive(Debug, Default)]
pub struct RequestLifecycle {
    epoch: u64,
    in_flight: Option<CancellationToken>,
}

impl RequestLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, cancelling the one in flight (best effort).
    pub fn begin(&mut self) -> RequestTicket {
        if let Some(previous) = self.in_flight.take() {
            previous.cancel();
            tracing::debug!("Cancelled page request {}", self.epoch);
        }

        self.epoch += 1;
        let cancel = CancellationToken::new();
        self.in_flight = Some(cancel.clone());
        RequestTicket {
            epoch: self.epoch,
            cancel,
        }
    }

    /// Decide what happens to the result of `ticket`'s request.
    pub fn settle<T>(&mut self, ticket: &RequestTicket, result: Result<T>) -> Settled<T> {
        if self.is_current(ticket.epoch) {
            self.in_flight = None;
            return Settled::Resolved(result);
        }

        match result {
            Err(e) if e.is_aborted() => Settled::Cancelled,
            _ => Settled::Stale,
        }
    }

    /// Release the in-flight slot of a request that will never settle
    /// (its future was dropped).
    pub fn abandon(&mut self, epoch: u64) {
        if self.is_current(epoch) {
            if let Some(token) = self.in_flight.take() {
                token.cancel();
            }
        }
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        epoch == self.epoch
    }

    /// Supersede whatever is in flight without starting a new request.
    /// Its result will settle as cancelled or stale.
    pub fn invalidate(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        self.epoch += 1;
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_epochs_increase_monotonically() {
        let mut lifecycle = RequestLifecycle::new();
        let a = lifecycle.begin();
        let b = lifecycle.begin();
        assert!(b.epoch() > a.epoch());
        assert!(lifecycle.is_current(b.epoch()));
        assert!(!lifecycle.is_current(a.epoch()));
    }

    #[test]
    fn test_begin_cancels_previous_token() {
        let mut lifecycle = RequestLifecycle::new();
        let a = lifecycle.begin();
        assert!(!a.cancel_token().is_cancelled());

        let b = lifecycle.begin();
        assert!(a.cancel_token().is_cancelled());
        assert!(!b.cancel_token().is_cancelled());
    }

    #[test]
    fn test_current_request_resolves() {
        let mut lifecycle = RequestLifecycle::new();
        let ticket = lifecycle.begin();
        assert!(lifecycle.is_in_flight());

        match lifecycle.settle(&ticket, Ok(7)) {
            Settled::Resolved(Ok(7)) => {}
            other => panic!("unexpected: {:?}", other),
        }
        assert!(!lifecycle.is_in_flight());
    }

    #[test]
    fn test_superseded_result_is_stale_even_if_it_arrives_last() {
        let mut lifecycle = RequestLifecycle::new();
        let a = lifecycle.begin();
        let b = lifecycle.begin();

        assert!(matches!(lifecycle.settle(&b, Ok("b")), Settled::Resolved(Ok("b"))));
        assert!(matches!(lifecycle.settle(&a, Ok("a")), Settled::Stale));
    }

    #[test]
    fn test_superseded_result_arriving_first_does_not_release_newer() {
        let mut lifecycle = RequestLifecycle::new();
        let a = lifecycle.begin();
        let _b = lifecycle.begin();

        assert!(matches!(lifecycle.settle(&a, Ok(())), Settled::Stale));
        assert!(lifecycle.is_in_flight());
    }

    #[test]
    fn test_aborted_superseded_request_is_cancelled() {
        let mut lifecycle = RequestLifecycle::new();
        let a = lifecycle.begin();
        let _b = lifecycle.begin();

        let result: Result<()> = Err(Error::Transport(scrollback_client::Error::Aborted));
        assert!(matches!(lifecycle.settle(&a, result), Settled::Cancelled));
    }

    #[test]
    fn test_current_error_is_resolved_for_caller() {
        let mut lifecycle = RequestLifecycle::new();
        let a = lifecycle.begin();
        let result: Result<()> = Err(Error::Transport(scrollback_client::Error::api(500, "boom")));
        assert!(matches!(lifecycle.settle(&a, result), Settled::Resolved(Err(_))));
        assert!(!lifecycle.is_in_flight());
    }

    #[test]
    fn test_invalidate_supersedes_in_flight_request() {
        let mut lifecycle = RequestLifecycle::new();
        let a = lifecycle.begin();
        lifecycle.invalidate();

        assert!(!lifecycle.is_in_flight());
        assert!(a.cancel_token().is_cancelled());
        assert!(matches!(lifecycle.settle(&a, Ok(1)), Settled::Stale));
    }

    #[test]
    fn test_abandon_only_releases_current() {
        let mut lifecycle = RequestLifecycle::new();
        let a = lifecycle.begin();
        let b = lifecycle.begin();

        lifecycle.abandon(a.epoch());
        assert!(lifecycle.is_in_flight());

        lifecycle.abandon(b.epoch());
        assert!(!lifecycle.is_in_flight());
        assert!(b.cancel_token().is_cancelled());
    }
}
