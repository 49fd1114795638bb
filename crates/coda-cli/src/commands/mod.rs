//! CLI subcommand implementations.

pub mod check_rel;
pub mod columns;
pub mod import_legacy;
pub mod kappa;
pub mod make_rel;
pub mod merge;
pub mod nest;
pub mod resample;
pub mod validate;
