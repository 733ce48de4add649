//! # Domain Layer
//!
//! Pure domain logic for the chain index. Nothing here touches storage.
//!
//! ## Modules
//!
//! - `entities` - Rows, composite keys and materialized views
//! - `unit` - The per-block record set written atomically
//! - `keys` - Key layout in the ordered key-value store
//! - `ordering` - Ordered associations and their index rules
//! - `linkage` - Parent resolution and fork-choice planning
//! - `metrics` - Range metric weights
//! - `config` - Index configuration
//! - `errors` - Domain error types

pub mod config;
pub mod entities;
pub mod errors;
pub mod keys;
pub mod linkage;
pub mod metrics;
pub mod ordering;
pub mod unit;
