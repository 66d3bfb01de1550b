//! Shared pieces of the amengen and amenfind binaries

pub mod authoring;
pub mod output;
