//! In-flight request coalescing.
//!
//! A [`RequestCoalescer`] owns a map from key to the single pending call for
//! that key (a "ticket"). Callers that arrive while a ticket exists attach to
//! it and receive a clone of its result; the underlying call is issued once.
//!
//! The call runs as a spawned task, so a caller that stops waiting never
//! cancels it. The ticket is removed by a drop guard inside that task, which
//! runs before the task's result becomes visible to any waiter and also runs
//! if the call panics.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tracing::debug;

/// The spawned call never produced a value (it panicked or the runtime shut down).
#[derive(Debug, Clone, Error)]
#[error("coalesced call did not settle: {0}")]
pub struct CallAborted(pub String);

type Ticket<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;
type TicketMap<K, T, E> = Arc<Mutex<HashMap<K, Ticket<T, E>>>>;

pub struct RequestCoalescer<K, T, E> {
    in_flight: TicketMap<K, T, E>,
}

impl<K, T, E> Clone for RequestCoalescer<K, T, E> {
    fn clone(&self) -> Self {
        Self {
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<K, T, E> Default for RequestCoalescer<K, T, E> {
    fn default() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, T, E> RequestCoalescer<K, T, E>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + From<CallAborted> + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `call` unless a call for `key` is already in flight, in which case
    /// the existing result is awaited instead.
    ///
    /// `call` is invoked while the ticket map is locked and must only build the
    /// future; it must not call back into this coalescer.
    pub async fn execute<F, Fut>(&self, key: K, call: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let ticket = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match in_flight.get(&key) {
                Some(ticket) => {
                    debug!(?key, "attaching to in-flight call");
                    ticket.clone()
                }
                None => {
                    let ticket = self.launch(key.clone(), call());
                    in_flight.insert(key, ticket.clone());
                    ticket
                }
            }
        };
        ticket.await
    }

    /// Number of tickets currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn launch<Fut>(&self, key: K, call: Fut) -> Ticket<T, E>
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let guard = TicketGuard {
            key,
            in_flight: Arc::clone(&self.in_flight),
        };
        let handle = tokio::spawn(async move {
            let _guard = guard;
            call.await
        });
        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(E::from(CallAborted(e.to_string()))))
        }
        .boxed()
        .shared()
    }
}

/// Removes its ticket when dropped, whichever way the call ended.
struct TicketGuard<K: Eq + Hash, T, E> {
    key: K,
    in_flight: TicketMap<K, T, E>,
}

impl<K: Eq + Hash, T, E> Drop for TicketGuard<K, T, E> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
