//! Target-side vocabulary: builtin variables, intrinsic names, reserved words and types.
pub mod builtins;
pub mod intrinsics;
pub mod keywords;
pub mod types;
