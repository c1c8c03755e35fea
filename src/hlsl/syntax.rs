//! Register hints, vector swizzles and matrix accessors.
use arrayvec::ArrayVec;
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case},
    character::complete::{anychar, char, digit1, one_of, satisfy, space0},
    combinator::{all_consuming, map_res, opt},
    multi::many_m_n,
    sequence::{delimited, preceded, tuple},
};

use super::{SyntaxError, SyntaxResult};
use crate::error::ConvertError;

/// `register(s3)`, `register(c[4])`, `register(t0, space1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterHint {
    /// Register class, lowercase: `s`, `t`, `c`, `b`, `u`
    pub class: char,
    pub index: u32,
}
impl RegisterHint {
    pub fn parse(text: &str) -> Result<Self, ConvertError> {
        match all_consuming(parse_register)(text.trim()) {
            Ok((_, reg)) => Ok(reg),
            Err(_) => Err(ConvertError::InvalidRegister(text.to_string())),
        }
    }
}

fn parse_register(data: &str) -> SyntaxResult<RegisterHint> {
    let (data, class) = satisfy(|c: char| c.is_ascii_alphabetic())(data)?;
    let (data, index) = alt((
        map_res(digit1, str::parse::<u32>),
        delimited(char('['), map_res(digit1, str::parse::<u32>), char(']')),
    ))(data)?;
    // Register spaces only matter to D3D12 root signatures
    let (data, _) = opt(preceded(
        tuple((space0, char(','), space0, tag_no_case("space"))),
        digit1,
    ))(data)?;
    Ok((
        data,
        RegisterHint {
            class: class.to_ascii_lowercase(),
            index,
        },
    ))
}

/// One element of a matrix, zero-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatrixElement {
    pub row: u8,
    pub col: u8,
}
impl MatrixElement {
    pub fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
    pub fn transposed(self) -> Self {
        Self {
            row: self.col,
            col: self.row,
        }
    }
}

pub type MatrixAccessor = ArrayVec<MatrixElement, 4>;

/// Decode `_m00_m12` (zero-based) or `_11_23` (one-based) accessors.
/// Returns `None` for anything else, including plain swizzles.
pub fn parse_matrix_accessor(text: &str) -> Option<MatrixAccessor> {
    let (_, elems) = all_consuming(many_m_n(1, 4, alt((zero_based_element, one_based_element))))(text).ok()?;
    Some(elems.into_iter().collect())
}

fn zero_based_element(data: &str) -> SyntaxResult<MatrixElement> {
    let (data, _) = tag("_m")(data)?;
    let (data, row) = one_of("0123")(data)?;
    let (data, col) = one_of("0123")(data)?;
    Ok((data, MatrixElement::new(digit(row), digit(col))))
}

fn one_based_element(data: &str) -> SyntaxResult<MatrixElement> {
    let (data, _) = char('_')(data)?;
    let (data, row) = one_of("1234")(data)?;
    let (data, col) = one_of("1234")(data)?;
    Ok((data, MatrixElement::new(digit(row) - 1, digit(col) - 1)))
}

fn digit(c: char) -> u8 {
    c as u8 - b'0'
}

/// Component indices of a vector swizzle (`xyzw` or `rgba` set).
pub fn parse_swizzle(text: &str) -> Option<ArrayVec<u8, 4>> {
    let (_, comps) = all_consuming(many_m_n(1, 4, swizzle_component))(text).ok()?;
    Some(comps.into_iter().collect())
}

fn swizzle_component(data: &str) -> SyntaxResult<u8> {
    let (data, c) = anychar(data)?;
    let idx = match c {
        'x' | 'r' => 0,
        'y' | 'g' => 1,
        'z' | 'b' => 2,
        'w' | 'a' => 3,
        _ => return Err(nom::Err::Error(SyntaxError::BadComponent(c))),
    };
    Ok((data, idx))
}
