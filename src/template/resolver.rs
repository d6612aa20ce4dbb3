//! Inverse resolution - recovers key values from a rendered string
//!
//! A variation is a sequence `T0 K1 T1 ... Kn Tn` of static tokens and keys.
//! Parsing finds every split of the input that reproduces this sequence, with
//! each key value validating for its key, and accepts the result only when
//! exactly one split survives.
//!
//! The search runs in two phases:
//! 1. Every occurrence of every static token is located (case-insensitively,
//!    overlaps included) and pruned against its neighbours, so token `i` can
//!    only sit where token `i-1` can precede it and token `i+1` can follow it.
//! 2. Candidate values are enumerated key by key. Each candidate carries the
//!    candidates of the next key; sub-searches that depend only on the key
//!    index, start offset and values already fixed for repeated keys are
//!    memoized, which keeps repeated separators from blowing up the search.
//!
//! Resolution then walks the candidate tree from the left: a key with a single
//! fully resolved candidate is accepted, none is a mismatch, several is an
//! ambiguity.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::keys::{FieldValue, Fields, TemplateKey};

/// Why a variation did not parse an input
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Mismatch {
    /// `progress` is the byte offset the search got to before failing
    NoMatch { progress: usize, reason: String },
    Ambiguous { key: String, candidates: Vec<String> },
}

impl Mismatch {
    fn no_match(progress: usize, reason: impl Into<String>) -> Self {
        Mismatch::NoMatch {
            progress,
            reason: reason.into(),
        }
    }

    /// Ambiguity outranks any plain mismatch; between mismatches the deeper one wins
    pub(crate) fn is_more_specific_than(&self, other: &Mismatch) -> bool {
        match (self, other) {
            (Mismatch::Ambiguous { .. }, Mismatch::NoMatch { .. }) => true,
            (Mismatch::NoMatch { progress: a, .. }, Mismatch::NoMatch { progress: b, .. }) => a > b,
            _ => false,
        }
    }
}

/// Lower-case every character whose lower-case form has the same UTF-8 length
///
/// Byte offsets in the folded string are valid in the original.
pub(crate) fn fold_case(s: &str) -> String {
    s.chars()
        .map(|c| {
            let mut lower = c.to_lowercase();
            match (lower.next(), lower.next()) {
                (Some(l), None) if l.len_utf8() == c.len_utf8() => l,
                _ => c,
            }
        })
        .collect()
}

/// Parser for one variation
pub(crate) struct PathParser<'a> {
    keys: &'a [Arc<TemplateKey>],
    tokens: Vec<String>,
    separator: char,
}

impl<'a> PathParser<'a> {
    /// `tokens` must hold exactly one more entry than `keys`
    pub(crate) fn new(keys: &'a [Arc<TemplateKey>], tokens: &[String], separator: char) -> Self {
        debug_assert_eq!(tokens.len(), keys.len() + 1);
        Self {
            keys,
            tokens: tokens.iter().map(|t| fold_case(t)).collect(),
            separator,
        }
    }

    /// Recover key values from `input`; keys named in `skip_keys` are matched but not returned
    pub(crate) fn parse(&self, input: &str, skip_keys: &[&str]) -> Result<Fields, Mismatch> {
        let folded = fold_case(input);

        if self.keys.is_empty() {
            return if folded == self.tokens[0] {
                Ok(Fields::new())
            } else {
                Err(Mismatch::no_match(0, "input does not match the static definition"))
            };
        }

        let positions = self.token_positions(&folded)?;
        debug!(
            keys = self.keys.len(),
            candidates = positions.iter().map(Vec::len).sum::<usize>(),
            "token positions located"
        );

        let mut search = Search::new(self, input, positions, skip_keys);
        let root = search.candidates(0, self.tokens[0].len());
        search.resolve(root)
    }

    fn token_positions(&self, folded: &str) -> Result<Vec<Vec<usize>>, Mismatch> {
        let n = self.keys.len();
        let last = &self.tokens[n];

        let mut positions = Vec::with_capacity(n + 1);
        for (i, token) in self.tokens.iter().enumerate() {
            let found = if i == 0 {
                if !folded.starts_with(token.as_str()) {
                    return Err(Mismatch::no_match(0, format!("input does not start with '{}'", token)));
                }
                vec![0]
            } else if i == n {
                if !folded.ends_with(last.as_str()) {
                    return Err(Mismatch::no_match(0, format!("input does not end with '{}'", last)));
                }
                vec![folded.len() - last.len()]
            } else {
                occurrences(folded, token)
            };
            positions.push(found);
        }

        // every key value is at least one byte long
        for i in 1..=n {
            let earliest = match positions[i - 1].first() {
                Some(&first) => first + self.tokens[i - 1].len() + 1,
                None => return Err(self.missing_token(i - 1)),
            };
            positions[i].retain(|&p| p >= earliest);
            if positions[i].is_empty() {
                return Err(self.missing_token(i));
            }
        }
        for i in (0..n).rev() {
            let latest = match positions[i + 1].last() {
                Some(&last) => last,
                None => return Err(self.missing_token(i + 1)),
            };
            let len = self.tokens[i].len();
            positions[i].retain(|&p| p + len < latest);
            if positions[i].is_empty() {
                return Err(self.missing_token(i));
            }
        }

        Ok(positions)
    }

    fn missing_token(&self, i: usize) -> Mismatch {
        let reason = match (i, self.keys.get(i.wrapping_sub(1))) {
            (0, _) | (_, None) => format!("cannot place '{}'", self.tokens[i]),
            (_, Some(key)) => format!(
                "cannot find '{}' after a value for key '{}'",
                self.tokens[i],
                key.name()
            ),
        };
        Mismatch::no_match(0, reason)
    }
}

/// Overlapping occurrences of `token`; an empty token sits at every character boundary
fn occurrences(haystack: &str, token: &str) -> Vec<usize> {
    if token.is_empty() {
        return haystack
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(haystack.len()))
            .collect();
    }
    let mut found = Vec::new();
    let mut from = 0;
    while let Some(offset) = haystack[from..].find(token) {
        let at = from + offset;
        found.push(at);
        from = at + haystack[at..].chars().next().map_or(1, char::len_utf8);
    }
    found
}

/// One possible value of a key and the candidates of the keys after it
struct Candidate {
    start: usize,
    end: usize,
    value: Option<FieldValue>,
    next: Option<Rc<Branch>>,
    fully_resolved: bool,
}

struct Branch {
    candidates: Vec<Candidate>,
}

type MemoKey = (usize, usize, Vec<String>);

/// State of a single parse call
struct Search<'p> {
    keys: &'p [Arc<TemplateKey>],
    input: &'p str,
    token_lens: Vec<usize>,
    positions: Vec<Vec<usize>>,
    separator: char,
    skipped: Vec<bool>,
    /// Per key index, names already seen earlier that occur again from here on
    recurring: Vec<Vec<&'p str>>,
    committed: Vec<(&'p str, &'p str)>,
    memo: HashMap<MemoKey, Rc<Branch>>,
    deepest: Option<(usize, String)>,
}

impl<'p> Search<'p> {
    fn new(
        parser: &'p PathParser<'_>,
        input: &'p str,
        positions: Vec<Vec<usize>>,
        skip_keys: &[&str],
    ) -> Self {
        let keys = parser.keys;
        let skipped = keys.iter().map(|k| skip_keys.contains(&k.name())).collect();
        let recurring = (0..keys.len())
            .map(|idx| {
                let mut names: Vec<&str> = keys[idx..]
                    .iter()
                    .map(|k| k.name())
                    .filter(|name| keys[..idx].iter().any(|k| k.name() == *name))
                    .collect();
                names.dedup();
                names
            })
            .collect();

        Self {
            keys,
            input,
            token_lens: parser.tokens.iter().map(String::len).collect(),
            positions,
            separator: parser.separator,
            skipped,
            recurring,
            committed: Vec::new(),
            memo: HashMap::new(),
            deepest: None,
        }
    }

    fn reject(&mut self, progress: usize, reason: String) {
        trace!(progress, %reason, "candidate rejected");
        if self.deepest.as_ref().map_or(true, |(p, _)| progress > *p) {
            self.deepest = Some((progress, reason));
        }
    }

    fn memo_key(&self, idx: usize, start: usize) -> MemoKey {
        let fixed = self.recurring[idx]
            .iter()
            .map(|name| {
                self.committed
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| v.to_string())
                    .unwrap_or_default()
            })
            .collect();
        (idx, start, fixed)
    }

    /// Candidates for key `idx` whose value starts at byte `start`
    fn candidates(&mut self, idx: usize, start: usize) -> Rc<Branch> {
        let memo_key = self.memo_key(idx, start);
        if let Some(branch) = self.memo.get(&memo_key) {
            return Rc::clone(branch);
        }

        let keys = self.keys;
        let input = self.input;
        let key = &keys[idx];
        let skipped = self.skipped[idx];
        let is_last = idx + 1 == keys.len();
        let ends: Vec<usize> = self.positions[idx + 1]
            .iter()
            .copied()
            .filter(|&end| end > start)
            .collect();

        let mut candidates = Vec::new();
        for end in ends {
            let raw = &input[start..end];

            if raw.contains(self.separator) {
                // every later end includes this separator too
                self.reject(start, format!("value '{}' for key '{}' spans a path separator", raw, key.name()));
                break;
            }
            if !skipped {
                if let Some(length) = key.length() {
                    if raw.chars().count() != length {
                        self.reject(start, format!(
                            "value '{}' for key '{}' is not {} characters long",
                            raw,
                            key.name(),
                            length
                        ));
                        continue;
                    }
                }
            }
            if self
                .committed
                .iter()
                .any(|(name, value)| *name == key.name() && *value != raw)
            {
                self.reject(start, format!(
                    "value '{}' for key '{}' conflicts with an earlier occurrence",
                    raw,
                    key.name()
                ));
                continue;
            }

            let value = if skipped {
                None
            } else {
                match key.value_from_str(raw) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        self.reject(start, e.to_string());
                        continue;
                    }
                }
            };

            let (next, fully_resolved) = if is_last {
                (None, end + self.token_lens[idx + 1] == input.len())
            } else {
                self.committed.push((key.name(), raw));
                let branch = self.candidates(idx + 1, end + self.token_lens[idx + 1]);
                self.committed.pop();
                let resolved = branch.candidates.iter().any(|c| c.fully_resolved);
                (Some(branch), resolved)
            };

            candidates.push(Candidate {
                start,
                end,
                value,
                next,
                fully_resolved,
            });
        }

        let branch = Rc::new(Branch { candidates });
        self.memo.insert(memo_key, Rc::clone(&branch));
        branch
    }

    /// Walk the candidate tree left to right, requiring one fully resolved value per key
    fn resolve(self, root: Rc<Branch>) -> Result<Fields, Mismatch> {
        let mut fields = Fields::new();
        let mut branch = Some(root);
        let mut idx = 0;

        while let Some(current) = branch {
            let key = &self.keys[idx];
            let resolved: Vec<&Candidate> = current
                .candidates
                .iter()
                .filter(|c| c.fully_resolved)
                .collect();

            let chosen = match resolved.as_slice() {
                [] => {
                    return Err(match self.deepest {
                        Some((progress, reason)) => Mismatch::NoMatch { progress, reason },
                        None => Mismatch::no_match(0, format!("no valid value for key '{}'", key.name())),
                    })
                }
                [only] => *only,
                many => {
                    let candidates: Vec<String> = many
                        .iter()
                        .map(|c| self.input[c.start..c.end].to_string())
                        .collect();
                    debug!(key = key.name(), ?candidates, "ambiguous key value");
                    return Err(Mismatch::Ambiguous {
                        key: key.name().to_string(),
                        candidates,
                    });
                }
            };

            if let Some(value) = &chosen.value {
                fields.insert(key.name().to_string(), value.clone());
            }
            branch = chosen.next.clone();
            idx += 1;
        }

        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn string_key(name: &str) -> Arc<TemplateKey> {
        Arc::new(TemplateKey::string(name).build().unwrap())
    }

    fn tokens(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn fields(pairs: &[(&str, FieldValue)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_fold_case_keeps_byte_offsets() {
        assert_eq!(fold_case("ShOT_É"), "shot_é");
        // 'İ' lower-cases to two chars and is left alone
        assert_eq!(fold_case("İx").len(), "İx".len());
    }

    #[test]
    fn test_occurrences_overlap() {
        assert_eq!(occurrences("aaaa", "aa"), vec![0, 1, 2]);
        assert_eq!(occurrences("ab", ""), vec![0, 1, 2]);
    }

    #[test]
    fn test_simple_path() {
        let keys = vec![
            string_key("Shot"),
            Arc::new(TemplateKey::integer("version").format_spec("03").build().unwrap()),
        ];
        let parser = PathParser::new(&keys, &tokens(&["/proj/shots/", "/v", ".ma"]), '/');
        let result = parser.parse("/proj/shots/ABC/v003.ma", &[]).unwrap();
        assert_eq!(
            result,
            fields(&[("Shot", FieldValue::from("ABC")), ("version", FieldValue::from(3))])
        );
    }

    #[test]
    fn test_static_tokens_match_case_insensitively() {
        let keys = vec![string_key("Shot")];
        let parser = PathParser::new(&keys, &tokens(&["/Proj/", ""]), '/');
        let result = parser.parse("/proj/AbC", &[]).unwrap();
        assert_eq!(result, fields(&[("Shot", FieldValue::from("AbC"))]));
    }

    #[test]
    fn test_ambiguous_split() {
        let keys = vec![string_key("a"), string_key("b")];
        let parser = PathParser::new(&keys, &tokens(&["", "_", ""]), '/');
        let err = parser.parse("x_y_z", &[]).unwrap_err();
        assert_eq!(
            err,
            Mismatch::Ambiguous {
                key: "a".to_string(),
                candidates: vec!["x".to_string(), "x_y".to_string()],
            }
        );
    }

    #[test]
    fn test_validation_disambiguates() {
        let keys = vec![
            Arc::new(TemplateKey::string("a").filter_by("alpha").build().unwrap()),
            string_key("b"),
        ];
        let parser = PathParser::new(&keys, &tokens(&["", "_", ""]), '/');
        let result = parser.parse("x_y_z", &[]).unwrap();
        assert_eq!(
            result,
            fields(&[("a", FieldValue::from("x")), ("b", FieldValue::from("y_z"))])
        );
    }

    #[test]
    fn test_separator_never_inside_value() {
        let keys = vec![string_key("a"), string_key("b")];
        let parser = PathParser::new(&keys, &tokens(&["", "_", ""]), '/');
        let result = parser.parse("x/y_z", &[]);
        assert!(matches!(result, Err(Mismatch::NoMatch { .. })));
    }

    #[test]
    fn test_repeated_key_must_agree() {
        let keys = vec![string_key("Shot"), string_key("Shot")];
        let parser = PathParser::new(&keys, &tokens(&["", "/", ".ma"]), '/');
        assert_eq!(
            parser.parse("ABC/ABC.ma", &[]).unwrap(),
            fields(&[("Shot", FieldValue::from("ABC"))])
        );
        assert!(parser.parse("ABC/XYZ.ma", &[]).is_err());
    }

    #[test]
    fn test_fixed_length_prunes_candidates() {
        let keys = vec![
            Arc::new(TemplateKey::string("code").length(3).build().unwrap()),
            string_key("rest"),
        ];
        let parser = PathParser::new(&keys, &tokens(&["", "_", ""]), '/');
        let result = parser.parse("abc_d_e", &[]).unwrap();
        assert_eq!(
            result,
            fields(&[("code", FieldValue::from("abc")), ("rest", FieldValue::from("d_e"))])
        );
    }

    #[test]
    fn test_skipped_keys_are_consumed_not_returned() {
        let keys = vec![
            Arc::new(TemplateKey::integer("version").format_spec("03").build().unwrap()),
            string_key("ext"),
        ];
        let parser = PathParser::new(&keys, &tokens(&["v", ".", ""]), '/');
        let result = parser.parse("v*.ma", &["version"]).unwrap();
        assert_eq!(result, fields(&[("ext", FieldValue::from("ma"))]));
    }

    #[test]
    fn test_keyless_exact_match() {
        let parser = PathParser::new(&[], &tokens(&["/proj/assets"]), '/');
        assert_eq!(parser.parse("/PROJ/assets", &[]).unwrap(), Fields::new());
        assert!(parser.parse("/proj/assets/x", &[]).is_err());
    }

    #[test]
    fn test_deepest_failure_reported() {
        let keys = vec![
            string_key("Shot"),
            Arc::new(TemplateKey::integer("version").format_spec("03").build().unwrap()),
        ];
        let parser = PathParser::new(&keys, &tokens(&["", "_v", ".ma"]), '/');
        match parser.parse("ABC_v07.ma", &[]) {
            Err(Mismatch::NoMatch { progress, reason }) => {
                assert_eq!(progress, 5);
                assert!(reason.contains("version"), "{}", reason);
            }
            other => panic!("expected a mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_mismatch_ranking() {
        let shallow = Mismatch::no_match(1, "a");
        let deep = Mismatch::no_match(7, "b");
        let ambiguous = Mismatch::Ambiguous {
            key: "k".to_string(),
            candidates: vec![],
        };
        assert!(deep.is_more_specific_than(&shallow));
        assert!(!shallow.is_more_specific_than(&deep));
        assert!(ambiguous.is_more_specific_than(&deep));
        assert!(!deep.is_more_specific_than(&ambiguous));
    }
}
