pub mod context;
pub mod ops_arrange;
pub mod ops_resolve;
pub mod ops_tree;
