//! Retail click-and-collect orders (event-sourced).
//!
//! Customers reserve online and pay when they collect at a pickup point.
//! This crate contains the order lifecycle as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod order;

pub use order::{
    MarkCollectedAndPaid, MarkPaid, MarkReadyForPickup, OrderCollectedAndPaid, OrderPaid,
    OrderReadyForPickup, PickupPoint, PlaceRetailOrder, RetailItem, RetailOrder,
    RetailOrderCommand, RetailOrderEvent, RetailOrderId, RetailOrderPlaced, RetailOrderStatus,
    RetailStatusSet, SetRetailStatus,
};
