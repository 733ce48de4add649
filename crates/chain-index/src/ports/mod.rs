//! # Ports Layer
//!
//! Defines the port traits for the chain index.
//!
//! ## Hexagonal Architecture
//!
//! - `inbound.rs` - Driving ports (API exposed to ingestion and monitoring)
//! - `outbound.rs` - Driven ports (the ordered key-value store)

pub mod inbound;
pub mod outbound;
