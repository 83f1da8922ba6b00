mod depth;
mod error;
mod rbtree;

pub use crate::depth::Depth;
pub use crate::error::RbtreeError;
pub use crate::rbtree::{Iter, NodeId, Rbtree, Stats};

#[cfg(test)]
mod rbtree_test;
