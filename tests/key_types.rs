//! Integration tests for key validation and conversion

use path_templates::keys::{IntegerRules, FORMAT_STRINGS};
use path_templates::{ErrorKind, FieldValue, KeyDefault, KeyKind, TemplateKey};

#[test]
fn test_strict_integer_padding() {
    let key = TemplateKey::integer("v").format_spec("03").build().unwrap();
    let rules: &IntegerRules = key.integer_rules().unwrap();
    assert!(rules.strict_matching());
    assert_eq!(rules.format_spec(), Some("03"));

    for accepted in ["007", "123", "1000"] {
        assert!(key.value_from_str(accepted).is_ok(), "{} should be accepted", accepted);
    }
    for rejected in ["07", "0007", "7", "x07"] {
        assert!(key.value_from_str(rejected).is_err(), "{} should be rejected", rejected);
    }
    assert_eq!(key.value_from_str("007").unwrap(), FieldValue::Int(7));
}

#[test]
fn test_loose_integer_matching() {
    let key = TemplateKey::integer("v").build().unwrap();
    assert_eq!(key.value_from_str("7").unwrap(), FieldValue::Int(7));
    assert_eq!(key.value_from_str("007").unwrap(), FieldValue::Int(7));
    assert!(key.value_from_str("7a").is_err());
    assert!(!key.integer_rules().unwrap().strict_matching());
}

#[test]
fn test_strict_matching_needs_format_spec() {
    let err = TemplateKey::integer("v").strict_matching(true).build().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_sequence_format_resolution() {
    let key = TemplateKey::sequence("frame").format_spec("04").build().unwrap();
    assert_eq!(
        key.str_from_value(Some(&FieldValue::from("FORMAT: %d")), false).unwrap(),
        "%04d"
    );
    assert_eq!(
        key.str_from_value(Some(&FieldValue::from("FORMAT: @")), false).unwrap(),
        "@@@@"
    );
    assert_eq!(
        key.str_from_value(Some(&FieldValue::from("FORMAT: $F")), false).unwrap(),
        "$F4"
    );

    let KeyKind::Sequence(rules) = key.kind() else {
        panic!("expected a sequence key");
    };
    assert_eq!(rules.frame_specs().len(), FORMAT_STRINGS.len());
    assert!(rules.frame_specs().contains(&"####".to_string()));
}

#[test]
fn test_sequence_range_literal_is_opaque() {
    let key = TemplateKey::sequence("frame").format_spec("04").build().unwrap();
    assert_eq!(
        key.value_from_str("[1001-1100]").unwrap(),
        FieldValue::from("[1001-1100]")
    );
    assert!(key.value_from_str("[1100-1001]").is_ok());
    assert!(key.value_from_str("[1001-]").is_err());
}

#[test]
fn test_fixed_length() {
    let key = TemplateKey::string("code").length(3).build().unwrap();
    assert!(key.value_from_str("abc").is_ok());
    assert!(key.value_from_str("ab").is_err());
    assert!(key.value_from_str("abcd").is_err());
}

#[test]
fn test_choices_and_exclusions_ignore_case() {
    let key = TemplateKey::string("ext")
        .choices(["ma", "mb"])
        .exclusions(["MB"])
        .build()
        .unwrap();
    assert!(key.is_valid(&FieldValue::from("MA")));
    assert!(!key.is_valid(&FieldValue::from("mb")));
    assert!(!key.is_valid(&FieldValue::from("nk")));
}

#[test]
fn test_string_filters() {
    let alpha = TemplateKey::string("name").filter_by("alpha").build().unwrap();
    assert!(alpha.is_valid(&FieldValue::from("Über")));
    assert!(!alpha.is_valid(&FieldValue::from("main2")));

    let custom = TemplateKey::string("name").filter_by("[a-z]+").build().unwrap();
    assert!(custom.is_valid(&FieldValue::from("main")));
    assert!(!custom.is_valid(&FieldValue::from("Main")));
}

#[test]
fn test_subset_format_output_only() {
    let key = TemplateKey::string("user")
        .subset(r"(\w)\w* (\w)\w*")
        .subset_format("{0}{1}")
        .build()
        .unwrap();
    assert_eq!(
        key.str_from_value(Some(&FieldValue::from("Ada Lovelace")), false).unwrap(),
        "AL"
    );
}

#[test]
fn test_timestamp_defaults() {
    let key = TemplateKey::timestamp("now").default_value("now").build().unwrap();
    assert_eq!(key.default(), Some(&KeyDefault::CurrentLocalTime));

    let key = TemplateKey::timestamp("day")
        .format_spec("%Y-%m-%d")
        .default_value("2024-02-29")
        .build()
        .unwrap();
    assert_eq!(key.str_from_value(None, false).unwrap(), "2024-02-29");

    let err = TemplateKey::timestamp("day")
        .format_spec("%Y-%m-%d")
        .default_value("29/02/2024")
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_validation_error_identifies_key() {
    let key = TemplateKey::integer("version").format_spec("03").build().unwrap();
    let err = key.value_from_str("7").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    insta::assert_snapshot!(
        err.to_string(),
        @"invalid value '7' for key 'version': expected an integer strictly matching format '03'"
    );
}
