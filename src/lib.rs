//! Source-to-source conversion of HLSL shader syntax trees into GLSL ones.
//!
//! A front end hands over a [Program] describing an HLSL shader. [convert] picks the
//! entry point named by the [Configuration], removes everything it cannot reach, and
//! rewrites the rest in the vocabulary of the selected GLSL profile:
//!
//! - [convert::samplers] pairs textures with sampler states into combined samplers
//! - [convert::rewrite] rewrites function bodies (intrinsics, sampling methods, matrix
//!   element order, `[unroll]` loops, brace initializers) and turns the entry point into
//!   `void main()` reading and writing stage globals
//! - [convert::layout] assigns varying locations and uniform/sampler bindings
//! - [convert::finish] applies storage qualifiers, maps type names and escapes
//!   identifiers that collide with GLSL reserved words
//!
//! The result carries the converted [Program], a [convert::layout::LayoutReport] for the
//! host, and the diagnostics of the run. Printing GLSL text is left to the caller;
//! [ast::display] renders a debug form.

pub mod ast;
pub mod config;
pub mod convert;
pub mod error;
pub mod glsl;
pub mod hlsl;

pub use ast::Program;
pub use config::Configuration;
pub use convert::{convert, ConvertResult};
