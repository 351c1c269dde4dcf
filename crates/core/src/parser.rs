//! Recursive-descent parser from script tokens to the parse tree.
//!
//! The file root is a [`NodeValue::List`] of statements. A word followed by
//! `=` becomes an assignment; anything else stands on its own.
//!
//! [`NodeValue::List`]: crate::ast::NodeValue::List

use crate::ast::Node;
use crate::error::Diagnostic;
use crate::lexer::{self, Spanned, Token};

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    filename: String,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned], filename: &str) -> Self {
        Parser {
            tokens,
            pos: 0,
            filename: filename.to_owned(),
        }
    }

    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn cur_line(&self) -> u32 {
        self.cur().line
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn err(&self, msg: impl Into<String>) -> Diagnostic {
        Diagnostic::format(msg)
            .in_file(&self.filename)
            .at_line(Some(self.cur_line()))
    }

    /// Statements up to end of input, or up to the `}` closing a block
    /// opened on `opened_at`.
    fn statements(&mut self, opened_at: Option<u32>) -> Result<Vec<Node>, Diagnostic> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                Token::Eof => {
                    if let Some(line) = opened_at {
                        return Err(self.err(format!(
                            "unexpected end of file: '{{' opened at line {} is never closed",
                            line
                        )));
                    }
                    return Ok(items);
                }
                Token::RBrace => {
                    if opened_at.is_none() {
                        return Err(self.err("unexpected '}' without matching '{'"));
                    }
                    self.advance();
                    return Ok(items);
                }
                Token::Eq => return Err(self.err("'=' without a key")),
                _ => items.push(self.statement()?),
            }
        }
    }

    fn statement(&mut self) -> Result<Node, Diagnostic> {
        let line = self.cur_line();
        let key = match self.peek() {
            Token::Word(w) | Token::Str(w) => Some(w.clone()),
            _ => None,
        };
        if let Some(key) = key {
            let is_string = matches!(self.peek(), Token::Str(_));
            self.advance();
            if self.peek() == &Token::Eq {
                self.advance();
                let value = self.value(&key)?;
                return Ok(Node::assignment(key, value).at(line));
            }
            let node = if is_string {
                Node::string(key)
            } else {
                Node::identifier(key)
            };
            return Ok(node.at(line));
        }
        self.value("")
    }

    fn value(&mut self, key: &str) -> Result<Node, Diagnostic> {
        let line = self.cur_line();
        match self.peek().clone() {
            Token::Word(w) => {
                self.advance();
                Ok(Node::identifier(w).at(line))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Node::string(s).at(line))
            }
            Token::LBrace => {
                self.advance();
                let items = self.statements(Some(line))?;
                Ok(Node::list(items).at(line))
            }
            other => Err(self.err(format!(
                "expected a value after '{} =', got {:?}",
                key, other
            ))),
        }
    }
}

/// Parse a token stream ending in [`Token::Eof`].
pub fn parse(tokens: &[Spanned], filename: &str) -> Result<Node, Diagnostic> {
    if tokens.last().map(|t| &t.token) != Some(&Token::Eof) {
        return Err(
            Diagnostic::format("token stream does not end with end of file").in_file(filename),
        );
    }
    let mut parser = Parser::new(tokens, filename);
    let items = parser.statements(None)?;
    Ok(Node::list(items).at(1))
}

/// Lex and parse one script file.
pub fn parse_script(src: &str, filename: &str) -> Result<Node, Diagnostic> {
    let tokens = lexer::lex(src, filename)?;
    parse(&tokens, filename)
}
