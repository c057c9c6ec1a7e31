//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus distributes lifecycle notifications to whoever is listening
//! (mailers, audit sinks, search indexers). It is fire-and-forget from the
//! point of view of the request that triggered it:
//!
//! - **After commit**: publish only once the storage mutation succeeded
//! - **No persistence**: the bus is for distribution, not storage
//! - **Best effort**: a publish failure never fails the request

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use crate::LifecycleEvent;

/// A subscription to an event stream.
///
/// Each subscription gets a copy of every message published after it was
/// created (broadcast semantics). Intended for a single consuming thread.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Domain-agnostic event bus (pub/sub abstraction).
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}

/// Object-safe, fire-and-forget view of a lifecycle event bus.
///
/// Publish errors are logged and swallowed.
pub trait LifecycleNotifier: Send + Sync {
    fn notify(&self, event: LifecycleEvent);
}

impl<B> LifecycleNotifier for B
where
    B: EventBus<LifecycleEvent>,
{
    fn notify(&self, event: LifecycleEvent) {
        let event_type = event.event_type().to_string();
        let organization_id = event.organization_id();
        if let Err(e) = self.publish(event) {
            tracing::warn!(
                event_type = %event_type,
                organization_id = %organization_id,
                error = ?e,
                "lifecycle notification dropped"
            );
        }
    }
}
