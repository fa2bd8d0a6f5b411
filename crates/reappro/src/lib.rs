//! Replenishment ("reappro") requests raised by Pro customers.
//!
//! A request is reviewed line by line, may be partially approved, and is
//! finally converted into a Pro order. The cross-aggregate part of the
//! conversion is orchestrated in `comptoir-infra`.

pub mod conversion;
pub mod request;

pub use conversion::{ConversionPlan, conversion_order_id};
pub use request::{
    AddReapproNotes, ApproveReapproRequest, CancelReapproRequest, CreateReapproRequest,
    DeliveryMethod, GeneratedOrderLinked, ItemApproval, LineDecision, LinkGeneratedOrder,
    Priority, ReapproInternalNotesAdded, ReapproLine, ReapproLineInput, ReapproRequest,
    ReapproRequestApproved, ReapproRequestCancelled, ReapproRequestCommand,
    ReapproRequestCreated, ReapproRequestEvent, ReapproRequestId, ReapproRequestRejected,
    ReapproRequestSubmitted, ReapproStatus, ReapproStatusChanged, RejectReapproRequest,
    SubmitReapproRequest, UpdateReapproStatus,
};
