//! `comptoir-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod history;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult, require_text};
pub use history::HistoryEntry;
pub use id::{AggregateId, ProductId, TenantId, UserId};
pub use value_object::{DiscountRate, ValueObject};
