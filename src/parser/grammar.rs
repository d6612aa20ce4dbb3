//! Definition parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::DefinitionError;
use crate::parser::ast::*;
use crate::parser::lexer::Token;

/// Parse a definition string into its token tree
pub fn parse(input: &str) -> Result<Definition, Vec<DefinitionError>> {
    let len = input.len();

    // Create a logos lexer and convert to token stream
    let token_iter = crate::parser::lexer::lex(input).map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    definition_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn definition_parser<'a, I>() -> impl Parser<'a, I, Definition, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let literal = select! {
        Token::Literal(text) => Atom::Literal(text),
    };

    let key = select! {
        Token::Key(name) => name,
    }
    .map_with(|name, e| Atom::Key(Spanned::new(name, span_range(&e.span()))));

    let atom = choice((literal, key));

    // `[...]` holds atoms only and must contain at least one key
    let optional = atom
        .clone()
        .repeated()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::OpenOptional), just(Token::CloseOptional))
        .try_map(|atoms: Vec<Atom>, span: SimpleSpan| {
            if atoms.iter().any(|a| matches!(a, Atom::Key(_))) {
                Ok(Node::Optional(Spanned::new(atoms, span_range(&span))))
            } else {
                Err(Rich::custom(
                    span,
                    "optional section must contain a key",
                ))
            }
        });

    choice((atom.map(Node::Atom), optional))
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(end())
        .map(|nodes| Definition { nodes })
}
