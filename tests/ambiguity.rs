//! Ambiguity detection and bounded parse cost on repetitive inputs

use std::sync::Arc;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;

use path_templates::{FieldValue, Fields, Platform, Template, TemplateError, TemplateKey};

fn word_key(name: &str) -> Arc<TemplateKey> {
    Arc::new(
        TemplateKey::string(name)
            .filter_by("[A-Za-z0-9_]+")
            .build()
            .unwrap(),
    )
}

#[test]
fn test_two_keys_one_separator_too_many() {
    let t = Template::string("{a}_{b}", vec![word_key("a"), word_key("b")])
        .unwrap()
        .with_name("pair");
    let err = t.get_fields("x_y_z", &[]).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"ambiguous match of 'x_y_z' against <TemplateString pair: {a}_{b}>: key 'a' could be any of [x, x_y]"
    );
}

#[test]
fn test_unambiguous_when_segments_match_keys() {
    let t = Template::string("{a}_{b}", vec![word_key("a"), word_key("b")]).unwrap();
    let expected: Fields = [
        ("a".to_string(), FieldValue::from("x")),
        ("b".to_string(), FieldValue::from("y")),
    ]
    .into_iter()
    .collect();
    assert_eq!(t.get_fields("x_y", &[]).unwrap(), expected);
}

#[test]
fn test_ambiguity_later_in_the_path() {
    let keys = vec![
        Arc::new(TemplateKey::string("Shot").filter_by("alphanumeric").build().unwrap()),
        word_key("a"),
        word_key("b"),
    ];
    let t = Template::path_for(Platform::Linux, "{Shot}/{a}_{b}", keys, "/proj").unwrap();
    match t.get_fields("/proj/ABC/x_y_z", &[]).unwrap_err() {
        TemplateError::Ambiguous { key, candidates, .. } => {
            assert_eq!(key, "a");
            assert_eq!(candidates, vec!["x", "x_y"]);
        }
        other => panic!("expected ambiguity, got {:?}", other),
    }
}

#[test]
fn test_ambiguity_beats_deeper_mismatch() {
    // the long variation is ambiguous, the short one cannot place '-' anywhere
    let whole_word = |name: &str| {
        Arc::new(
            TemplateKey::string(name)
                .filter_by("[A-Za-z0-9_]+$")
                .build()
                .unwrap(),
        )
    };
    let keys = vec![whole_word("a"), whole_word("b"), whole_word("c")];
    let t = Template::string("{a}_{b}[-{c}]", keys).unwrap();
    assert!(matches!(
        t.get_fields("x_y_z-w", &[]),
        Err(TemplateError::Ambiguous { .. })
    ));
}

#[test]
fn test_repeated_separators_stay_fast() {
    let names = ["a", "b", "c", "d", "e", "f"];
    let keys: Vec<_> = names.iter().map(|n| word_key(n)).collect();
    let definition = names
        .iter()
        .map(|n| format!("{{{}}}", n))
        .collect::<Vec<_>>()
        .join("_");
    let t = Template::string(&definition, keys).unwrap();

    let input = (0..30)
        .map(|i| format!("s{}", i))
        .collect::<Vec<_>>()
        .join("_");

    let started = Instant::now();
    let result = t.get_fields(&input, &[]);
    let elapsed = started.elapsed();

    assert!(matches!(result, Err(TemplateError::Ambiguous { .. })));
    assert!(
        elapsed < Duration::from_secs(2),
        "parse took {:?}",
        elapsed
    );
}

#[test]
fn test_repeated_keys_stay_fast() {
    let keys = vec![word_key("a")];
    let definition = vec!["{a}"; 8].join("_");
    let t = Template::string(&definition, keys).unwrap();

    let input = vec!["x"; 8].join("_");
    let started = Instant::now();
    let fields = t.get_fields(&input, &[]).unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(fields["a"], FieldValue::from("x"));

    let mismatched = format!("{}_y", vec!["x"; 7].join("_"));
    assert!(t.get_fields(&mismatched, &[]).is_err());
}
