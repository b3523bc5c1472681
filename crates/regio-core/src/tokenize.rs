//! Region-expression tokenizer.
//!
//! Converts a region specification string into tokens. `(`, `)`, `|` and
//! `~` are operator symbols; a signed integer literal is a half-space
//! reference; whitespace separates operands. Intersection has no written
//! symbol: adjacency implies it, and a second pass inserts the operator
//! tokens the compiler needs.

use logos::Logos;

use crate::error::GeometryError;
use crate::token::{Operator, Token};

/// Lexer for the region grammar.
///
/// The minus sign is exclusively an orientation marker: `-2` is the
/// negative half-space of surface 2, never "subtract". A leading `+` is
/// accepted and redundant. Literals that fail to parse as i32 (overflow)
/// become error tokens, like any character outside the grammar.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum RawToken {
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("|")]
    Union,
    #[token("~")]
    Complement,
    #[regex(r"[+-]?[0-9]+", |lex| lex.slice().parse::<i32>().ok())]
    Halfspace(i32),
}

/// Tokenize a region specification for the named cell.
///
/// Produces the infix token sequence with implicit intersections already
/// inserted. The empty (or all-whitespace) specification is legal and
/// yields no tokens: the cell is unconstrained.
pub fn tokenize(cell_id: i32, region_spec: &str) -> Result<Vec<Token>, GeometryError> {
    let mut tokens = Vec::new();
    let mut lexer = RawToken::lexer(region_spec);
    while let Some(raw) = lexer.next() {
        let token = match raw {
            Ok(RawToken::LeftParen) => Token::Op(Operator::LeftParen),
            Ok(RawToken::RightParen) => Token::Op(Operator::RightParen),
            Ok(RawToken::Union) => Token::Op(Operator::Union),
            Ok(RawToken::Complement) => Token::Op(Operator::Complement),
            Ok(RawToken::Halfspace(r)) => Token::Surface(r),
            Err(()) => {
                let character = lexer.slice().chars().next().unwrap_or('\0');
                return Err(GeometryError::InvalidCharacter {
                    cell: cell_id,
                    character,
                });
            }
        };
        tokens.push(token);
    }
    Ok(insert_implicit_intersections(tokens))
}

/// Insert intersection between adjacent tokens the grammar lets stand
/// next to each other: an operand or `)` on the left, an operand, `(` or
/// `~` on the right.
fn insert_implicit_intersections(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len() * 2);
    for token in tokens {
        if let Some(prev) = out.last() {
            let left_compat = prev.is_operand() || prev.is_right_paren();
            let right_compat = token.is_operand() || token.is_left_paren() || token.is_complement();
            if left_compat && right_compat {
                out.push(Token::Op(Operator::Intersection));
            }
        }
        out.push(token);
    }
    out
}
