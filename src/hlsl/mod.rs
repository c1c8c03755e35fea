//! Source-side vocabulary: the small grammars embedded in HLSL declarations.
//!
//! The front end hands semantics, register hints and matrix accessors over as raw text.
//! This module parses them with `nom`.
use std::num::ParseIntError;

use nom::{
    error::{ErrorKind, FromExternalError, ParseError},
    IResult,
};

pub mod semantic;
pub mod syntax;

#[derive(Debug, PartialEq)]
pub enum SyntaxError<I> {
    Nom(I, ErrorKind),
    ParseIntError(ParseIntError),
    BadComponent(char),
}
impl<I> ParseError<I> for SyntaxError<I> {
    fn from_error_kind(input: I, kind: ErrorKind) -> Self {
        SyntaxError::Nom(input, kind)
    }

    fn append(_: I, _: ErrorKind, other: Self) -> Self {
        other
    }
}
impl<I> FromExternalError<I, ParseIntError> for SyntaxError<I> {
    fn from_external_error(_: I, _: ErrorKind, e: ParseIntError) -> Self {
        SyntaxError::ParseIntError(e)
    }
}

pub type SyntaxResult<'a, T> = IResult<&'a str, T, SyntaxError<&'a str>>;
