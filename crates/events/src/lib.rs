//! Lifecycle notifications emitted after committed mutations.

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, LifecycleNotifier, Subscription};
pub use event::{LifecycleEvent, event_type};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
