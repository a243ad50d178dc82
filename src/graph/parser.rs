//! Recursive-descent parser producing a DOT syntax tree.
//!
//! Supported grammar (a subset of DOT large enough for store graph output):
//!
//! ```text
//! graph     = [ "strict" ] ( "graph" | "digraph" ) [ ID ] "{" { stmt [ ";" ] } "}"
//! stmt      = ID "=" ID
//!           | ( "graph" | "node" | "edge" ) attr_list
//!           | ID { edge_op ID } [ attr_list ]
//! attr_list = "[" [ ID [ "=" ID ] { ( "," | ";" ) ID [ "=" ID ] } ] "]" { attr_list }
//! ```
//!
//! Subgraphs and ports are rejected as syntax errors.

use super::lexer::{Spanned, Token, parse_error, tokenize};
use crate::core::Result;

/// Attribute list as written, in order.
pub type Attrs = Vec<(String, String)>;

/// Parsed DOT document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphAst {
    /// `strict` keyword present
    pub strict: bool,
    /// `digraph` (true) or `graph` (false)
    pub directed: bool,
    /// Optional graph ID
    pub id: Option<String>,
    /// Statements in document order
    pub stmts: Vec<Stmt>,
}

/// A single DOT statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `ID [attrs]`
    Node {
        /// Raw node ID
        id: String,
        /// Attributes
        attrs: Attrs,
        /// Source line
        line: usize,
    },
    /// `ID op ID op ID ... [attrs]`
    Edge {
        /// Chain of node IDs, at least two
        chain: Vec<String>,
        /// Whether `->` (true) or `--` (false) was used
        directed: bool,
        /// Attributes
        attrs: Attrs,
        /// Source line
        line: usize,
    },
    /// `graph|node|edge [attrs]`
    Attr {
        /// `graph`, `node` or `edge`
        kind: String,
        /// Attributes
        attrs: Attrs,
    },
    /// `ID = ID`
    Assign {
        /// Left-hand side
        key: String,
        /// Right-hand side
        value: String,
    },
}

/// Parse DOT text into a [`GraphAst`].
///
/// # Errors
///
/// Returns [`crate::core::ClosureError::GraphParse`] with the line of the offending token.
pub fn parse(input: &str) -> Result<GraphAst> {
    let tokens = tokenize(input)?;
    Parser {
        tokens,
        pos: 0,
    }
    .graph()
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |s| s.line)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<()> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, what: &str) -> crate::core::ClosureError {
        match self.peek() {
            Some(token) => parse_error(self.line(), format!("expected {what}, found {token:?}")),
            None => parse_error(self.line(), format!("expected {what}, found end of input")),
        }
    }

    fn id(&mut self, what: &str) -> Result<String> {
        match self.peek() {
            Some(Token::Id(_)) => match self.next() {
                Some(Token::Id(id)) => Ok(id),
                _ => Err(self.unexpected(what)),
            },
            _ => Err(self.unexpected(what)),
        }
    }

    fn keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(Token::Id(id)) if id.eq_ignore_ascii_case(keyword) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn graph(mut self) -> Result<GraphAst> {
        let strict = self.keyword("strict");
        let directed = if self.keyword("digraph") {
            true
        } else if self.keyword("graph") {
            false
        } else {
            return Err(self.unexpected("'graph' or 'digraph'"));
        };

        let id = match self.peek() {
            Some(Token::Id(_)) => Some(self.id("graph ID")?),
            _ => None,
        };

        self.expect(Token::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RBrace) => {
                    self.pos += 1;
                    break;
                }
                Some(Token::Semicolon) => self.pos += 1,
                Some(Token::Id(_)) => stmts.push(self.stmt()?),
                Some(Token::LBrace) => {
                    return Err(parse_error(self.line(), "subgraphs are not supported"));
                }
                _ => return Err(self.unexpected("statement or '}'")),
            }
        }

        if self.peek().is_some() {
            return Err(self.unexpected("end of input"));
        }

        Ok(GraphAst {
            strict,
            directed,
            id,
            stmts,
        })
    }

    fn stmt(&mut self) -> Result<Stmt> {
        let line = self.line();
        for kind in ["graph", "node", "edge"] {
            let is_kind = matches!(self.peek(), Some(Token::Id(id)) if id.eq_ignore_ascii_case(kind));
            if is_kind && self.tokens.get(self.pos + 1).map(|s| &s.token) == Some(&Token::LBracket)
            {
                self.pos += 1;
                return Ok(Stmt::Attr {
                    kind: kind.to_string(),
                    attrs: self.attr_lists()?,
                });
            }
        }

        let first = self.id("node ID")?;
        if self.eat(&Token::Equals) {
            return Ok(Stmt::Assign {
                key: first,
                value: self.id("value")?,
            });
        }

        let mut chain = vec![first];
        let mut directed = None;
        loop {
            let op = match self.peek() {
                Some(Token::DirectedEdge) => true,
                Some(Token::UndirectedEdge) => false,
                _ => break,
            };
            self.pos += 1;
            if directed.is_some_and(|d| d != op) {
                return Err(parse_error(self.line(), "mixed '->' and '--' in one edge statement"));
            }
            directed = Some(op);
            if self.peek() == Some(&Token::LBrace) {
                return Err(parse_error(self.line(), "subgraphs are not supported"));
            }
            chain.push(self.id("node ID after edge operator")?);
        }

        let attrs = self.attr_lists()?;
        Ok(match directed {
            Some(directed) => Stmt::Edge {
                chain,
                directed,
                attrs,
                line,
            },
            None => Stmt::Node {
                id: chain.remove(0),
                attrs,
                line,
            },
        })
    }

    fn attr_lists(&mut self) -> Result<Attrs> {
        let mut attrs = Vec::new();
        while self.eat(&Token::LBracket) {
            loop {
                if self.eat(&Token::RBracket) {
                    break;
                }
                let key = self.id("attribute name")?;
                let value = if self.eat(&Token::Equals) {
                    self.id("attribute value")?
                } else {
                    "true".to_string()
                };
                attrs.push((key, value));
                if !self.eat(&Token::Comma) {
                    self.eat(&Token::Semicolon);
                }
            }
        }
        Ok(attrs)
    }
}
