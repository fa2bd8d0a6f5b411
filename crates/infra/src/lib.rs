//! Infrastructure layer: event store, command dispatch, document numbering,
//! configuration and the lifecycle engine that ties the domain crates together.

pub mod command_dispatcher;
pub mod config;
pub mod engine;
pub mod event_store;
pub mod numbering;

mod integration_tests;

pub use command_dispatcher::{CommandDispatcher, Committed, DispatchError};
pub use config::{ConfigError, EngineConfig};
pub use engine::{
    CreateReapproInput, Engine, EventSourced, PlaceProOrderInput, SubmitProRequestInput,
};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore};
pub use numbering::{DocumentNumberAllocator, InMemoryDocumentNumbers, NumberingError};

/// Process start-up: install logging, then read the engine configuration.
pub fn init_from_env() -> anyhow::Result<EngineConfig> {
    comptoir_observability::init();
    config::load()
}
