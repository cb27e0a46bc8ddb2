use crate::ast::*;
use crate::lexer::{LexError, Lexer, Token};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),
    #[error("Unexpected token: {0:?}, expected {1}")]
    Unexpected(Token, &'static str),
    #[error("Unexpected end of input")]
    UnexpectedEof,
}

const VISIBILITIES: [&str; 3] = ["public", "private", "protected"];

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Self { tokens, pos: 0 })
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> &Token {
        let tok = self.tokens.get(self.pos).unwrap_or(&Token::Eof);
        self.pos += 1;
        tok
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.advance().clone() {
            Token::Ident(s) => Ok(s),
            Token::Eof => Err(ParseError::UnexpectedEof),
            tok => Err(ParseError::Unexpected(tok, "identifier")),
        }
    }

    /// Identifier or quoted name (`"Detalle Venta"`).
    fn expect_name(&mut self) -> Result<String, ParseError> {
        match self.advance().clone() {
            Token::Ident(s) | Token::Str(s) => Ok(s),
            Token::Eof => Err(ParseError::UnexpectedEof),
            tok => Err(ParseError::Unexpected(tok, "name")),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        let tok = self.advance().clone();
        if tok == expected {
            Ok(())
        } else if tok == Token::Eof {
            Err(ParseError::UnexpectedEof)
        } else {
            Err(ParseError::Unexpected(tok, "specific token"))
        }
    }

    fn check_ident(&self, name: &str) -> bool {
        matches!(self.peek(), Token::Ident(s) if s == name)
    }

    pub fn parse(&mut self) -> Result<Source, ParseError> {
        let mut classes = Vec::new();
        let mut relations = Vec::new();

        while *self.peek() != Token::Eof {
            if self.check_ident("class") {
                self.advance();
                classes.push(self.parse_class()?);
            } else if self.check_ident("rel") {
                self.advance();
                relations.extend(self.parse_rel_block()?);
            } else {
                return Err(ParseError::Unexpected(self.peek().clone(), "class or rel"));
            }
        }

        Ok(Source { classes, relations })
    }

    fn parse_class(&mut self) -> Result<ClassDecl, ParseError> {
        let name = self.expect_name()?;

        let mut associates = None;
        if self.check_ident("associates") {
            self.advance();
            let a = self.expect_name()?;
            self.expect(Token::Comma)?;
            let b = self.expect_name()?;
            associates = Some((a, b));
        }

        self.expect(Token::LBrace)?;
        let mut attributes = Vec::new();
        while *self.peek() != Token::RBrace {
            if *self.peek() == Token::Eof {
                return Err(ParseError::UnexpectedEof);
            }
            attributes.push(self.parse_attribute()?);
        }
        self.expect(Token::RBrace)?;

        Ok(ClassDecl {
            name,
            attributes,
            associates,
        })
    }

    fn parse_attribute(&mut self) -> Result<AttributeDecl, ParseError> {
        // `private nombre String` vs an attribute that is itself called `private`
        let mut visibility = None;
        if let Token::Ident(word) = self.peek() {
            if VISIBILITIES.contains(&word.as_str())
                && matches!(self.peek_at(2), Token::Ident(_))
                && matches!(self.peek_at(1), Token::Ident(_) | Token::Str(_))
            {
                visibility = Some(word.clone());
                self.advance();
            }
        }

        let name = self.expect_name()?;
        let typ = self.expect_ident()?;

        Ok(AttributeDecl {
            name,
            typ,
            visibility,
        })
    }

    fn parse_rel_block(&mut self) -> Result<Vec<RelationDecl>, ParseError> {
        self.expect(Token::LBrace)?;
        let mut rels = Vec::new();

        while *self.peek() != Token::RBrace {
            if *self.peek() == Token::Eof {
                return Err(ParseError::UnexpectedEof);
            }
            rels.push(self.parse_relation()?);
        }

        self.expect(Token::RBrace)?;
        Ok(rels)
    }

    fn parse_relation(&mut self) -> Result<RelationDecl, ParseError> {
        let source = self.expect_name()?;
        let source_cardinality = self.parse_cardinality()?;
        self.expect(Token::Link)?;
        let target_cardinality = self.parse_cardinality()?;
        let target = self.expect_name()?;

        let mut kind = None;
        if *self.peek() == Token::Colon {
            self.advance();
            kind = Some(self.expect_ident()?);
        }

        Ok(RelationDecl {
            source,
            source_cardinality,
            target,
            target_cardinality,
            kind,
        })
    }

    fn parse_cardinality(&mut self) -> Result<Cardinality, ParseError> {
        match self.advance().clone() {
            Token::Mult(cardinality) => Ok(cardinality),
            Token::Eof => Err(ParseError::UnexpectedEof),
            tok => Err(ParseError::Unexpected(tok, "multiplicity (1, 0..1, *, 1..*)")),
        }
    }
}
