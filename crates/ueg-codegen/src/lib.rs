//! Backend lowering for validated graph fragments.
//!
//! # Modules
//!
//! - [`capability`] -- backend capabilities and the tag-derived gating table
//! - [`backend`] -- the per-kind emitter trait
//! - [`backends`] -- built-in Rust, Go, Zig and Python emitters
//! - [`dispatch`] -- ordering, gating and per-node failure collection
//! - [`types`] -- front-end type annotations to target type syntax
//! - [`pipeline`] -- gate, validate and lower in one place

pub mod backend;
pub mod backends;
pub mod capability;
pub mod dispatch;
pub mod error;
pub mod pipeline;
pub mod types;

pub use backend::{Backend, EmitContext, Unsupported};
pub use capability::{Capability, CapabilitySet, EnforcedConstraint, GateRule, GatingPolicy, Trigger};
pub use dispatch::{Dispatcher, EmittedNode, FailureCause, Lowering, NodeFailure};
pub use error::LowerError;
pub use pipeline::Pipeline;
pub use types::{parse_type, TypeDialect, TypeExpr};
