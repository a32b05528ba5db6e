//! Router - role resolution and fallback execution
//!
//! The router maps a logical role ("coder", "routing", "default") to an
//! ordered plan of concrete models and executes calls against that plan,
//! retrying transient failures and falling back to the next candidate.
//!
//! # Module Structure
//!
//! - `types`: role specs, overrides, candidates and router settings
//! - `router_impl`: `ModelRouter` (resolve + call)
//! - `mock`: scripted `MockModelClient` for tests

mod mock;
mod router_impl;
mod types;


pub use mock::{MockFailure, MockModelClient};
pub use router_impl::ModelRouter;
pub use types::{
    ModelCandidate, ModelOverrides, ModelPlan, RoleModelSpec, RouterConfig, DEFAULT_ROLE,
    HARD_DEFAULT_MODEL,
};
