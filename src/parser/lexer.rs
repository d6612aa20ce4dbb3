//! Lexer for template definitions using logos

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    // Key placeholder, braces stripped
    #[regex(r"\{[a-zA-Z0-9_ .]+\}", |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    Key(String),

    // Optional section delimiters
    #[token("[")]
    OpenOptional,
    #[token("]")]
    CloseOptional,

    // Everything else is literal text. A brace that does not open a valid
    // placeholder is kept as text.
    #[regex(r"[^\[\]{]+", |lex| lex.slice().to_string())]
    #[token("{", |lex| lex.slice().to_string())]
    Literal(String),
}

/// Lex a definition string into tokens with spans
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
}
