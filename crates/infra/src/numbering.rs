//! Human-readable document numbers (`FAC-2026-00042`, `REA-2026-00007`, ...).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use comptoir_core::TenantId;

#[derive(Debug, Error)]
pub enum NumberingError {
    #[error("document number allocator unavailable: {0}")]
    Unavailable(String),
}

/// Hands out per-tenant, per-prefix, per-year sequences.
///
/// Numbers are never reused; a number allocated for a command that later
/// fails is simply skipped.
pub trait DocumentNumberAllocator: Send + Sync {
    /// Next sequence value (starting at 1) for `(tenant, prefix, year)`.
    fn next_sequence(&self, tenant_id: TenantId, prefix: &str, year: i32) -> Result<u64, NumberingError>;

    /// Next formatted number, `{prefix}-{year}-{seq:05}`.
    fn next_number(&self, tenant_id: TenantId, prefix: &str, year: i32) -> Result<String, NumberingError> {
        let seq = self.next_sequence(tenant_id, prefix, year)?;
        Ok(format_document_number(prefix, year, seq))
    }
}

impl<T> DocumentNumberAllocator for Arc<T>
where
    T: DocumentNumberAllocator + ?Sized,
{
    fn next_sequence(&self, tenant_id: TenantId, prefix: &str, year: i32) -> Result<u64, NumberingError> {
        (**self).next_sequence(tenant_id, prefix, year)
    }
}

pub fn format_document_number(prefix: &str, year: i32, seq: u64) -> String {
    format!("{prefix}-{year}-{seq:05}")
}

/// In-memory allocator; sequences live as long as the process.
#[derive(Debug, Default)]
pub struct InMemoryDocumentNumbers {
    counters: Mutex<HashMap<(TenantId, String, i32), u64>>,
}

impl InMemoryDocumentNumbers {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentNumberAllocator for InMemoryDocumentNumbers {
    fn next_sequence(&self, tenant_id: TenantId, prefix: &str, year: i32) -> Result<u64, NumberingError> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| NumberingError::Unavailable("lock poisoned".to_string()))?;

        let counter = counters
            .entry((tenant_id, prefix.to_string(), year))
            .or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_are_scoped_by_tenant_prefix_and_year() {
        let numbers = InMemoryDocumentNumbers::new();
        let tenant = TenantId::new();

        assert_eq!(numbers.next_number(tenant, "FAC", 2026).unwrap(), "FAC-2026-00001");
        assert_eq!(numbers.next_number(tenant, "FAC", 2026).unwrap(), "FAC-2026-00002");
        assert_eq!(numbers.next_number(tenant, "REA", 2026).unwrap(), "REA-2026-00001");
        assert_eq!(numbers.next_number(tenant, "FAC", 2027).unwrap(), "FAC-2027-00001");
        assert_eq!(numbers.next_number(TenantId::new(), "FAC", 2026).unwrap(), "FAC-2026-00001");
    }

    #[test]
    fn wide_sequences_are_not_truncated() {
        assert_eq!(format_document_number("CMD", 2026, 123_456), "CMD-2026-123456");
    }
}
