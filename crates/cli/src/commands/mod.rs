//! CLI command implementations

pub mod inspect;
pub mod predict;
pub mod replay;
