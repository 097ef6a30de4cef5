//! `forgehr-core`: identity building blocks shared by the decision engine.
//!
//! This crate contains **pure** primitives (no IO, no async, no model access).

pub mod error;
pub mod id;
pub mod tenant;

pub use error::{CoreError, CoreResult};
pub use id::{CompanyId, DecisionId, EntityId, RequestId};
pub use tenant::TenantContext;
