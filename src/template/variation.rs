//! Variation expansion: one concrete definition per combination of optional sections

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::TemplateError;
use crate::keys::{Fields, TemplateKey};
use crate::parser::{Atom, Definition, Node};

/// A definition with every optional section either kept or dropped
///
/// `pieces` holds the static text around the keys, so there is always one
/// more piece than key occurrences and interleaving them reproduces
/// `definition` exactly.
#[derive(Debug, Clone)]
pub struct Variation {
    definition: String,
    ordered_keys: Vec<Arc<TemplateKey>>,
    keys: HashMap<String, Arc<TemplateKey>>,
    pieces: Vec<String>,
}

impl Variation {
    fn from_atoms(
        atoms: &[&Atom],
        lookup: &HashMap<String, Arc<TemplateKey>>,
    ) -> Result<Self, TemplateError> {
        let mut definition = String::new();
        let mut ordered_keys = Vec::new();
        let mut keys = HashMap::new();
        let mut pieces = vec![String::new()];

        for atom in atoms {
            atom.write_to(&mut definition);
            match atom {
                Atom::Literal(text) => {
                    if let Some(last) = pieces.last_mut() {
                        last.push_str(text);
                    }
                }
                Atom::Key(name) => {
                    let key = lookup.get(&name.node).ok_or_else(|| {
                        TemplateError::configuration(format!(
                            "definition references unknown key '{}'",
                            name.node
                        ))
                    })?;
                    keys.insert(name.node.clone(), Arc::clone(key));
                    ordered_keys.push(Arc::clone(key));
                    pieces.push(String::new());
                }
            }
        }

        Ok(Self {
            definition,
            ordered_keys,
            keys,
            pieces,
        })
    }

    /// This variation's definition, brackets removed
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Key occurrences in definition order; a key used twice appears twice
    pub fn ordered_keys(&self) -> &[Arc<TemplateKey>] {
        &self.ordered_keys
    }

    pub fn keys(&self) -> &HashMap<String, Arc<TemplateKey>> {
        &self.keys
    }

    /// Static text before, between and after the keys
    pub fn pieces(&self) -> &[String] {
        &self.pieces
    }

    /// Interleave static text with one rendered value per key occurrence
    pub(crate) fn render(&self, values: &[String]) -> String {
        let mut out = String::with_capacity(self.definition.len());
        for (i, piece) in self.pieces.iter().enumerate() {
            out.push_str(piece);
            if let Some(value) = values.get(i) {
                out.push_str(value);
            }
        }
        out
    }

    /// Names of keys this variation needs but `fields` does not supply
    ///
    /// With `skip_defaults`, keys that have a default are not reported.
    pub fn missing_keys(&self, fields: &Fields, skip_defaults: bool) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        for key in &self.ordered_keys {
            let name = key.name();
            if fields.contains_key(name) || missing.iter().any(|m| m == name) {
                continue;
            }
            if !skip_defaults || !key.has_default() {
                missing.push(name.to_string());
            }
        }
        missing
    }
}

/// Expand a parsed definition into its variations, most keys first
///
/// Each optional section doubles the set: every partial definition is forked
/// into one that drops the section and one that keeps its contents.
pub(crate) fn expand(
    definition: &Definition,
    lookup: &HashMap<String, Arc<TemplateKey>>,
) -> Result<Vec<Variation>, TemplateError> {
    let mut expansions: Vec<Vec<&Atom>> = vec![Vec::new()];

    for node in &definition.nodes {
        match node {
            Node::Atom(atom) => {
                for expansion in &mut expansions {
                    expansion.push(atom);
                }
            }
            Node::Optional(section) => {
                let mut forked = Vec::with_capacity(expansions.len() * 2);
                for expansion in expansions {
                    let mut with_section = expansion.clone();
                    with_section.extend(section.node.iter());
                    forked.push(expansion);
                    forked.push(with_section);
                }
                expansions = forked;
            }
        }
    }

    let mut variations = expansions
        .iter()
        .map(|atoms| Variation::from_atoms(atoms, lookup))
        .collect::<Result<Vec<_>, _>>()?;

    // stable: equal-sized variations keep their expansion order
    variations.sort_by(|a, b| {
        b.ordered_keys
            .len()
            .cmp(&a.ordered_keys.len())
            .then(b.definition.len().cmp(&a.definition.len()))
    });
    let mut seen = HashSet::new();
    variations.retain(|v| seen.insert(v.definition.clone()));

    Ok(variations)
}
