//! Token tree for template definitions

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Content allowed both at the top level and inside an optional section
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    /// Literal text
    Literal(String),
    /// `{name}` placeholder
    Key(Spanned<String>),
}

/// Top-level element of a definition
///
/// Optional sections hold atoms only, so nesting cannot be represented.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Atom(Atom),
    /// `[...]` section that each variation either keeps or drops
    Optional(Spanned<Vec<Atom>>),
}

/// Parsed definition string
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Definition {
    pub nodes: Vec<Node>,
}

impl Definition {
    /// Key names in order of first appearance, optional sections included
    pub fn key_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for node in &self.nodes {
            let atoms: &[Atom] = match node {
                Node::Atom(atom) => std::slice::from_ref(atom),
                Node::Optional(section) => &section.node,
            };
            for atom in atoms {
                if let Atom::Key(name) = atom {
                    if !names.contains(&name.node.as_str()) {
                        names.push(name.node.as_str());
                    }
                }
            }
        }
        names
    }

    /// Number of optional sections
    pub fn optional_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Optional(_)))
            .count()
    }
}

impl Atom {
    /// Write this atom back in definition syntax
    pub fn write_to(&self, out: &mut String) {
        match self {
            Atom::Literal(text) => out.push_str(text),
            Atom::Key(name) => {
                out.push('{');
                out.push_str(&name.node);
                out.push('}');
            }
        }
    }
}
