//! Accounts domain module (customer commercial tier and Pro upgrade requests).
//!
//! Business rules are deterministic domain logic only (no IO, no storage).
//! Approving a request and granting the tier are two aggregates; the workflow
//! that chains them lives in `comptoir-infra`.

pub mod customer;
pub mod pro_request;
pub mod profile;

pub use customer::{
    Customer, CustomerCommand, CustomerEvent, CustomerId, CustomerRegistered, GrantPro,
    ProGranted, ProProfileUpdated, ProReinstated, ProSuspended, RegisterCustomer, ReinstatePro,
    SuspendPro, UpdateProProfile,
};
pub use pro_request::{
    ApproveProRequest, CancelProRequest, CompanyIdentity, ContactDetails, ProRequest,
    ProRequestApproved, ProRequestCancelled, ProRequestCommand, ProRequestEvent, ProRequestId,
    ProRequestRejected, ProRequestStatus, ProRequestSubmitted, RejectProRequest,
    SubmitProRequest,
};
pub use profile::{PartnershipType, ProInfo, ProStatus};
