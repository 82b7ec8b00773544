//! Parser for the block language.

use std::collections::{BTreeMap, HashMap};

use super::ast::*;
use super::lexer::{parse_value, Lexer, Token, TokenKind};
use crate::circuit::TriState;
use crate::error::{LogicSimError, Result};

/// Project and context names used when blocks appear before any directive.
pub const DEFAULT_PROJECT: &str = "Main";
pub const DEFAULT_CONTEXT: &str = "Main";

/// Parser for the block language.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    project: String,
}

impl<'a> Parser<'a> {
    /// Create a new parser with the given lexer.
    pub fn new(mut lexer: Lexer<'a>) -> Result<Self> {
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            project: DEFAULT_PROJECT.to_string(),
        })
    }

    /// Parse the entire diagram description.
    pub fn parse(&mut self) -> Result<CircuitAst> {
        let mut ast = CircuitAst::new();

        while self.current.kind != TokenKind::Eof {
            match self.current.kind {
                TokenKind::Newline => {
                    self.advance()?;
                    continue;
                }
                TokenKind::Directive => self.parse_directive(&mut ast)?,
                TokenKind::Identifier => {
                    if self.current.text.eq_ignore_ascii_case("WIRE") {
                        let wire = self.parse_wire()?;
                        self.current_context(&mut ast).wires.push(wire);
                    } else {
                        let block = self.parse_block()?;
                        self.current_context(&mut ast).blocks.push(block);
                    }
                }
                _ => {
                    return Err(LogicSimError::parse(
                        self.current.line,
                        format!("unexpected token: {:?}", self.current.text),
                    ));
                }
            }

            match self.current.kind {
                TokenKind::Newline => self.advance()?,
                TokenKind::Eof => {}
                _ => {
                    return Err(LogicSimError::parse(
                        self.current.line,
                        format!("unexpected trailing token: {:?}", self.current.text),
                    ));
                }
            }
        }

        Ok(ast)
    }

    fn current_context<'b>(&self, ast: &'b mut CircuitAst) -> &'b mut ContextDef {
        if ast.contexts.is_empty() {
            ast.contexts
                .push(ContextDef::new(self.project.clone(), DEFAULT_CONTEXT, self.current.line));
        }
        let last = ast.contexts.len() - 1;
        &mut ast.contexts[last]
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn at_line_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Newline | TokenKind::Eof)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.current.kind == kind {
            let tok = self.current.clone();
            self.advance()?;
            Ok(tok)
        } else {
            Err(LogicSimError::parse(
                self.current.line,
                format!("expected {:?}, got {:?}", kind, self.current.kind),
            ))
        }
    }

    fn parse_directive(&mut self, ast: &mut CircuitAst) -> Result<()> {
        let directive = self.current.text.clone();
        let line = self.current.line;
        self.advance()?;

        match directive.to_lowercase().as_str() {
            ".solution" => {
                ast.solution = Some(self.expect(TokenKind::Identifier)?.text);
            }
            ".project" => {
                self.project = self.expect(TokenKind::Identifier)?.text;
            }
            ".context" => {
                let name = self.expect(TokenKind::Identifier)?.text;
                ast.contexts
                    .push(ContextDef::new(self.project.clone(), name, line));
            }
            ".tag" => {
                let tag = self.parse_tag(line)?;
                ast.tags.push(tag);
            }
            _ => {
                return Err(LogicSimError::parse(
                    line,
                    format!("unknown directive: {}", directive),
                ));
            }
        }

        Ok(())
    }

    /// `.tag <name> [initial] [key=value]...`
    fn parse_tag(&mut self, line: usize) -> Result<TagDef> {
        let name = self.expect(TokenKind::Identifier)?.text;
        let mut initial = TriState::Unknown;
        let mut properties = BTreeMap::new();

        while !self.at_line_end() {
            let text = match self.current.kind {
                TokenKind::Identifier | TokenKind::Number => self.current.text.clone(),
                _ => {
                    return Err(LogicSimError::parse(
                        line,
                        format!("unexpected token in tag: {:?}", self.current.text),
                    ))
                }
            };
            self.advance()?;

            if self.current.kind == TokenKind::Equals {
                self.advance()?;
                let value = match self.current.kind {
                    TokenKind::Identifier | TokenKind::Number => self.current.text.clone(),
                    _ => return Err(LogicSimError::parse(line, "expected property value")),
                };
                self.advance()?;
                properties.insert(text.to_lowercase(), value);
            } else {
                initial = TriState::parse(&text).ok_or_else(|| {
                    LogicSimError::parse(line, format!("invalid initial value: {}", text))
                })?;
            }
        }

        Ok(TagDef {
            name,
            initial,
            properties,
            line,
        })
    }

    /// `<KIND> <name> [value] [tag] [key=value]...`
    fn parse_block(&mut self) -> Result<BlockDef> {
        let kind = self.current.text.clone();
        let line = self.current.line;
        self.advance()?;
        let name = self.expect(TokenKind::Identifier)?.text;

        let mut value = None;
        let mut tag_ref = None;
        let mut params = HashMap::new();

        while !self.at_line_end() {
            let tok = self.current.clone();
            self.advance()?;
            match tok.kind {
                TokenKind::Identifier if self.current.kind == TokenKind::Equals => {
                    self.advance()?;
                    let val_text = self.current.text.clone();
                    self.advance()?;
                    let v = parse_value(&val_text).ok_or_else(|| {
                        LogicSimError::parse(line, format!("invalid number: {}", val_text))
                    })?;
                    params.insert(tok.text.to_lowercase(), v);
                }
                TokenKind::Identifier if tag_ref.is_none() => tag_ref = Some(tok.text),
                TokenKind::Number if value.is_none() => {
                    value = Some(parse_value(&tok.text).ok_or_else(|| {
                        LogicSimError::parse(line, format!("invalid number: {}", tok.text))
                    })?);
                }
                _ => {
                    return Err(LogicSimError::invalid_block(
                        &name,
                        line,
                        format!("unexpected argument {:?}", tok.text),
                    ));
                }
            }
        }

        Ok(BlockDef {
            kind,
            name,
            value,
            tag_ref,
            params,
            line,
        })
    }

    /// `WIRE [!]<point> [!]<point>`
    fn parse_wire(&mut self) -> Result<WireDef> {
        let line = self.current.line;
        self.advance()?;
        let start = self.parse_point()?;
        let end = self.parse_point()?;
        Ok(WireDef { start, end, line })
    }

    fn parse_point(&mut self) -> Result<PointRef> {
        let inverted = if self.current.kind == TokenKind::Bang {
            self.advance()?;
            true
        } else {
            false
        };
        let block = self.expect(TokenKind::Identifier)?.text;
        let point = if self.current.kind == TokenKind::Colon {
            self.advance()?;
            match self.current.kind {
                TokenKind::Identifier | TokenKind::Number => {
                    let text = self.current.text.clone();
                    self.advance()?;
                    Some(text)
                }
                _ => {
                    return Err(LogicSimError::parse(
                        self.current.line,
                        "expected connection point after ':'",
                    ))
                }
            }
        } else {
            None
        };
        Ok(PointRef {
            block,
            point,
            inverted,
        })
    }
}
