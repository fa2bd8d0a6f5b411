//! Pro (B2B) orders domain module (event-sourced).
//!
//! Pro orders carry a negotiated discount frozen at placement, a partial
//! payment ledger and a one-time invoice number. Pure domain logic: no IO,
//! no HTTP, no storage.

pub mod order;
pub mod payment;

pub use order::{
    AddInternalNotes, AssignInvoiceNumber, CancelProOrder, InternalNotesAdded,
    InvoiceNumberAssigned, OrderOrigin, PaymentRecorded, PlaceProOrder, ProOrder,
    ProOrderCancelled, ProOrderCommand, ProOrderEvent, ProOrderId, ProOrderLine,
    ProOrderLineInput, ProOrderPlaced, ProOrderStatus, ProOrderStatusChanged, ProOrderType,
    RecordPayment, UpdateProOrderStatus,
};
pub use payment::PaymentStatus;
