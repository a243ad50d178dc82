//! Tokenizer for the DOT graph language.
//!
//! Quoted strings are returned with their quotes and escapes intact, because node names are
//! cleaned later with [`crate::store::clean_name`].

use crate::core::{ClosureError, Result};

/// A DOT token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Identifier, numeral, or quoted string (quotes included)
    Id(String),
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `=`
    Equals,
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// `->`
    DirectedEdge,
    /// `--`
    UndirectedEdge,
}

/// A token with the line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    /// The token
    pub token: Token,
    /// 1-based line number
    pub line: usize,
}

/// Split DOT source text into tokens.
///
/// # Errors
///
/// Returns [`ClosureError::GraphParse`] for unterminated strings or comments, HTML labels,
/// and characters outside the DOT grammar.
pub fn tokenize(input: &str) -> Result<Vec<Spanned>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    let mut line = 1;
    let mut at_line_start = true;

    while let Some((start, c)) = chars.next() {
        let token_line = line;
        let push = |tokens: &mut Vec<Spanned>, token| {
            tokens.push(Spanned {
                token,
                line: token_line,
            });
        };

        match c {
            '\n' => {
                line += 1;
                at_line_start = true;
                continue;
            }
            c if c.is_whitespace() => continue,
            // preprocessor-style lines are ignored
            '#' if at_line_start => {
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                        break;
                    }
                }
                continue;
            }
            '/' if chars.peek().is_some_and(|&(_, n)| n == '/') => {
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                        break;
                    }
                }
                at_line_start = true;
                continue;
            }
            '/' if chars.peek().is_some_and(|&(_, n)| n == '*') => {
                chars.next();
                let mut prev = '\0';
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                    }
                    if prev == '*' && c == '/' {
                        closed = true;
                        break;
                    }
                    prev = c;
                }
                if !closed {
                    return Err(parse_error(token_line, "unterminated comment"));
                }
                at_line_start = false;
                continue;
            }
            '{' => push(&mut tokens, Token::LBrace),
            '}' => push(&mut tokens, Token::RBrace),
            '[' => push(&mut tokens, Token::LBracket),
            ']' => push(&mut tokens, Token::RBracket),
            '=' => push(&mut tokens, Token::Equals),
            ';' => push(&mut tokens, Token::Semicolon),
            ',' => push(&mut tokens, Token::Comma),
            '-' if chars.peek().is_some_and(|&(_, n)| n == '>') => {
                chars.next();
                push(&mut tokens, Token::DirectedEdge);
            }
            '-' if chars.peek().is_some_and(|&(_, n)| n == '-') => {
                chars.next();
                push(&mut tokens, Token::UndirectedEdge);
            }
            '"' => {
                let mut end = None;
                let mut escaped = false;
                for (i, c) in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                    }
                    if escaped {
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == '"' {
                        end = Some(i);
                        break;
                    }
                }
                let end = end.ok_or_else(|| parse_error(token_line, "unterminated string"))?;
                push(&mut tokens, Token::Id(input[start..=end].to_string()));
            }
            '<' => return Err(parse_error(token_line, "HTML labels are not supported")),
            c if is_id_char(c) || c == '-' || c == '.' => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, n)) = chars.peek() {
                    if is_id_char(n) || n == '.' {
                        end = i + n.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                push(&mut tokens, Token::Id(input[start..end].to_string()));
            }
            other => {
                return Err(parse_error(token_line, format!("unexpected character '{other}'")));
            }
        }
        at_line_start = false;
    }

    Ok(tokens)
}

fn is_id_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || !c.is_ascii()
}

pub(crate) fn parse_error(line: usize, message: impl Into<String>) -> ClosureError {
    ClosureError::GraphParse {
        line,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_tokenize_edge_statement() {
        assert_eq!(
            kinds(r#""a-b-1" -> "c-d-2" [color = "red"];"#),
            vec![
                Token::Id("\"a-b-1\"".to_string()),
                Token::DirectedEdge,
                Token::Id("\"c-d-2\"".to_string()),
                Token::LBracket,
                Token::Id("color".to_string()),
                Token::Equals,
                Token::Id("\"red\"".to_string()),
                Token::RBracket,
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn test_tokenize_keeps_escaped_quotes() {
        assert_eq!(kinds(r#""say \"hi\"""#), vec![Token::Id(r#""say \"hi\"""#.to_string())]);
    }

    #[test]
    fn test_tokenize_numerals_and_comments() {
        assert_eq!(
            kinds("# preamble\nx = -1.5 // trailing\n/* block\n */ y"),
            vec![
                Token::Id("x".to_string()),
                Token::Equals,
                Token::Id("-1.5".to_string()),
                Token::Id("y".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_tracks_lines() {
        let tokens = tokenize("digraph G {\n\n}").unwrap();
        assert_eq!(tokens.last().unwrap().line, 3);
    }

    #[test]
    fn test_tokenize_unterminated_string() {
        let err = tokenize("digraph G {\n\"abc").unwrap_err();
        assert!(matches!(err, ClosureError::GraphParse { line: 2, .. }));
    }
}
