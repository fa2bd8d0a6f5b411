//! Domain events and their distribution mechanics.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod in_memory_bus;
pub mod notice;

pub use bus::{EventBus, Subscription};
pub use envelope::{EnvelopeHeader, EventEnvelope};
pub use event::Event;
pub use handler::execute;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use notice::{NoticeDraft, Notifiable, StatusNotice};
