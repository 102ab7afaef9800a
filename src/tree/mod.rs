//! Hierarchies of targetable objects.
mod builder;
mod node_tree;

pub use builder::{TargetSource, TargetType, TreeBuilder};
pub use node_tree::NodeTree;
