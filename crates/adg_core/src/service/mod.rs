//! Use-case services over the repository layer.
//!
//! # Responsibility
//! - Validate caller input and sequence repository calls per operation.
//! - Keep relation, option and comment invariants above raw storage.

pub mod decision_service;
pub mod link_graph;
pub mod model_service;
