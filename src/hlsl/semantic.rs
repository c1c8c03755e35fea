use std::fmt::{Display, Formatter};

use nom::{
    bytes::complete::take_while,
    character::complete::satisfy,
    combinator::{all_consuming, recognize},
    sequence::pair,
};

use super::{SyntaxError, SyntaxResult};
use crate::error::ConvertError;

/// Modifiers accepted on a semantic and otherwise ignored, lowercase.
const SEMANTIC_MODIFIERS: [&str; 3] = ["_centroid", "_pp", "_sat"];

/// A parsed semantic: `SV_Target1` is `("SV_Target", 1)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Semantic {
    pub name: String,
    pub index: u32,
}
impl Semantic {
    pub fn new(name: &str, index: u32) -> Self {
        Self {
            name: name.to_string(),
            index,
        }
    }

    /// Parse a semantic as written, dropping a trailing `_pp`, `_sat` or `_centroid` modifier.
    pub fn parse(text: &str) -> Result<Semantic, ConvertError> {
        let lower = text.to_ascii_lowercase();
        let trimmed = SEMANTIC_MODIFIERS
            .iter()
            .find(|m| lower.ends_with(*m) && lower.len() > m.len())
            .map_or(text, |m| &text[..text.len() - m.len()]);

        match all_consuming(parse_semantic)(trimmed) {
            Ok((_, semantic)) => Ok(semantic),
            Err(_) => Err(ConvertError::InvalidSemantic(text.to_string())),
        }
    }

    /// Case-insensitive key used for table lookups
    pub fn key(&self) -> String {
        self.name.to_ascii_uppercase()
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}
impl Display for Semantic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.name, self.index)
    }
}

fn parse_semantic(data: &str) -> SyntaxResult<Semantic> {
    // [a-zA-Z_][a-zA-Z0-9_]*
    let (rest, ident) = recognize(pair(
        satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(data)?;

    // The index is the run of digits at the very end of the identifier
    let name = ident.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &ident[name.len()..];
    let index = if digits.is_empty() {
        0
    } else {
        digits
            .parse::<u32>()
            .map_err(|e| nom::Err::Error(SyntaxError::ParseIntError(e)))?
    };
    Ok((
        rest,
        Semantic {
            name: name.to_string(),
            index,
        },
    ))
}
