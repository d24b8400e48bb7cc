//! Node façade shared by the HTTP API and the CLI

#[allow(clippy::module_inception)]
pub mod node;

pub use node::{Node, NodeError, NodeStatus};
