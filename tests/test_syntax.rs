use std::collections::HashSet;

use hlsl2glsl::{
    config::MatrixLayout,
    convert::rewrite::apply_layout,
    glsl::keywords::{escape_identifier, escape_unique, is_reserved},
    hlsl::{
        semantic::Semantic,
        syntax::{parse_matrix_accessor, parse_swizzle, MatrixElement, RegisterHint},
    },
};

#[test]
fn test_semantic_indices() {
    assert_eq!(Semantic::parse("TEXCOORD3").unwrap(), Semantic::new("TEXCOORD", 3));
    assert_eq!(Semantic::parse("SV_Target").unwrap(), Semantic::new("SV_Target", 0));
    assert_eq!(Semantic::parse("COLOR1").unwrap().to_string(), "COLOR1");
}

#[test]
fn test_semantic_modifiers() {
    assert_eq!(Semantic::parse("COLOR0_centroid").unwrap(), Semantic::new("COLOR", 0));
    assert_eq!(Semantic::parse("TEXCOORD2_pp").unwrap(), Semantic::new("TEXCOORD", 2));
    assert!(Semantic::parse("0COLOR").is_err());
    assert!(Semantic::parse("").is_err());
}

#[test]
fn test_register_hints() {
    assert_eq!(RegisterHint::parse("s2").unwrap(), RegisterHint { class: 's', index: 2 });
    assert_eq!(RegisterHint::parse("c[4]").unwrap(), RegisterHint { class: 'c', index: 4 });
    assert_eq!(RegisterHint::parse("t0, space1").unwrap(), RegisterHint { class: 't', index: 0 });
    assert_eq!(RegisterHint::parse("B3").unwrap().class, 'b');
    assert!(RegisterHint::parse("s").is_err());
}

#[test]
fn test_matrix_accessors() {
    let zero_based = parse_matrix_accessor("_m01_m10").unwrap();
    assert_eq!(zero_based.as_slice(), &[MatrixElement::new(0, 1), MatrixElement::new(1, 0)]);

    let one_based = parse_matrix_accessor("_11_24").unwrap();
    assert_eq!(one_based.as_slice(), &[MatrixElement::new(0, 0), MatrixElement::new(1, 3)]);

    assert!(parse_matrix_accessor("xyz").is_none());
    assert!(parse_matrix_accessor("_m44").is_none());
}

#[test]
fn test_swizzles() {
    assert_eq!(parse_swizzle("xyzw").unwrap().as_slice(), &[0, 1, 2, 3]);
    assert_eq!(parse_swizzle("bgr").unwrap().as_slice(), &[2, 1, 0]);
    assert!(parse_swizzle("xyzwx").is_none());
    assert!(parse_swizzle("q").is_none());
}

#[test]
fn test_matrix_layout_is_involution() {
    for row in 0..4 {
        for col in 0..4 {
            let e = MatrixElement::new(row, col);
            assert_eq!(apply_layout(MatrixLayout::RowsAsColumns, e), e);
            let once = apply_layout(MatrixLayout::PreserveRows, e);
            assert_eq!(once, MatrixElement::new(col, row));
            assert_eq!(apply_layout(MatrixLayout::PreserveRows, once), e);
        }
    }
}

#[test]
fn test_reserved_identifiers() {
    assert!(is_reserved("input"));
    assert_eq!(escape_identifier("input"), "_input");
    assert_eq!(escape_identifier("texture"), "_texture");
    assert_eq!(escape_identifier("a__b"), "a_0b");
    assert_eq!(escape_identifier("albedo"), "albedo");
}

#[test]
fn test_escaped_names_skip_taken_identifiers() {
    let mut taken: HashSet<String> = ["input", "_input", "_input1"].iter().map(|s| s.to_string()).collect();
    assert_eq!(escape_unique("input", &mut taken), "_input2");
    assert!(taken.contains("_input2"));
    assert_eq!(escape_unique("input", &mut taken), "_input3");
    assert_eq!(escape_unique("albedo", &mut taken), "albedo");
    assert_eq!(escape_unique("texture", &mut taken), "_texture");
}
