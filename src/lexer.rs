use crate::ast::Cardinality;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    /// Quoted name with escapes resolved.
    Str(String),
    /// `1`, `0..1`, `*`, `1..*`. `0..*` reads as `*`.
    Mult(Cardinality),

    LBrace, // {
    RBrace, // }
    Comma,  // ,
    Colon,  // :
    Link,   // --

    Eof,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("Unexpected character {ch:?} on line {line}")]
    UnexpectedChar { ch: char, line: usize },
    #[error("Unterminated string starting on line {line}")]
    UnterminatedString { line: usize },
    #[error("Invalid multiplicity {text:?} on line {line}")]
    InvalidMultiplicity { text: String, line: usize },
}

/// Byte-offset lexer over the class-diagram notation. `#` and `//` start
/// line comments.
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0, line: 1 }
    }

    fn rest(&self) -> &'a str {
        let src = self.src;
        &src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        let src = self.src;
        &src[start..self.pos]
    }

    fn skip_trivia(&mut self) {
        loop {
            let rest = self.rest();
            if rest.starts_with('#') || rest.starts_with("//") {
                self.take_while(|c| c != '\n');
            } else if rest.starts_with(char::is_whitespace) {
                self.take_while(char::is_whitespace);
            } else {
                break;
            }
        }
    }

    fn string(&mut self, line: usize) -> Result<String, LexError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => break,
                },
                Some(c) => out.push(c),
                None => break,
            }
        }
        Err(LexError::UnterminatedString { line })
    }

    fn multiplicity(&mut self, line: usize) -> Result<Cardinality, LexError> {
        match self.take_while(|c| c.is_ascii_digit() || c == '.' || c == '*') {
            "1" => Ok(Cardinality::One),
            "0..1" => Ok(Cardinality::ZeroOrOne),
            "*" | "0..*" => Ok(Cardinality::Many),
            "1..*" => Ok(Cardinality::OneOrMore),
            text => Err(LexError::InvalidMultiplicity {
                text: text.to_string(),
                line,
            }),
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia();
        let line = self.line;
        let Some(c) = self.peek() else {
            return Ok(Token::Eof);
        };

        if self.rest().starts_with("--") {
            self.pos += 2;
            return Ok(Token::Link);
        }

        let punct = match c {
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            ',' => Some(Token::Comma),
            ':' => Some(Token::Colon),
            _ => None,
        };
        if let Some(tok) = punct {
            self.bump();
            return Ok(tok);
        }

        match c {
            '"' => {
                self.bump();
                self.string(line).map(Token::Str)
            }
            '*' | '0'..='9' => self.multiplicity(line).map(Token::Mult),
            c if c.is_alphabetic() || c == '_' => {
                let ident = self.take_while(|c| c.is_alphanumeric() || c == '_');
                Ok(Token::Ident(ident.to_string()))
            }
            _ => Err(LexError::UnexpectedChar { ch: c, line }),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let done = tok == Token::Eof;
            tokens.push(tok);
            if done {
                return Ok(tokens);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize().unwrap()
    }

    #[test]
    fn test_class_tokens() {
        assert_eq!(
            lex("class Curso { nombre String }"),
            vec![
                Token::Ident("class".into()),
                Token::Ident("Curso".into()),
                Token::LBrace,
                Token::Ident("nombre".into()),
                Token::Ident("String".into()),
                Token::RBrace,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_accented_ident() {
        let tokens = lex("class Categoría { descripción String }");
        assert_eq!(tokens[1], Token::Ident("Categoría".into()));
        assert_eq!(tokens[3], Token::Ident("descripción".into()));
    }

    #[test]
    fn test_both_comment_styles() {
        let tokens = lex("# header\nclass Persona { // inline\n}");
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[3], Token::RBrace);
    }

    #[test]
    fn test_relation_line() {
        assert_eq!(
            lex("A 0..1 -- 1..* B : composition"),
            vec![
                Token::Ident("A".into()),
                Token::Mult(Cardinality::ZeroOrOne),
                Token::Link,
                Token::Mult(Cardinality::OneOrMore),
                Token::Ident("B".into()),
                Token::Colon,
                Token::Ident("composition".into()),
                Token::Eof,
            ]
        );
        assert_eq!(lex("0..*")[0], Token::Mult(Cardinality::Many));
    }

    #[test]
    fn test_quoted_name_escapes() {
        assert_eq!(lex(r#""Detalle \"X\"\tVenta""#)[0], Token::Str("Detalle \"X\"\tVenta".into()));
    }

    #[test]
    fn test_errors_carry_line() {
        assert_eq!(
            Lexer::new("A 1 - * B").tokenize(),
            Err(LexError::UnexpectedChar { ch: '-', line: 1 })
        );
        assert_eq!(
            Lexer::new("rel {\n  A 2 -- * B\n}").tokenize(),
            Err(LexError::InvalidMultiplicity { text: "2".into(), line: 2 })
        );
        assert_eq!(
            Lexer::new("\n\nclass \"open").tokenize(),
            Err(LexError::UnterminatedString { line: 3 })
        );
    }
}
