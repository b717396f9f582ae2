use crate::runtime::error::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Fn,
    If,
    Else,
    While,
    Return,
    True,
    False,
    Nil,
    And,
    Or,
    Not,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    BangEq,
    Bang,
    Lt,
    Le,
    Gt,
    Ge,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
}

fn keyword(ident: &str) -> Option<TokenKind> {
    Some(match ident {
        "fn" => TokenKind::Fn,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "return" => TokenKind::Return,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "nil" => TokenKind::Nil,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        _ => return None,
    })
}

/// Split source text into tokens. The last token is always `Eof`.
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut line = 1u32;
    let mut pos = 0usize;

    while pos < chars.len() {
        let c = chars[pos];
        let next = chars.get(pos + 1).copied();
        let single = move |kind| Token { kind, line };

        match c {
            '\n' => {
                line += 1;
                pos += 1;
                continue;
            }
            c if c.is_whitespace() => {
                pos += 1;
                continue;
            }
            '#' => {
                while pos < chars.len() && chars[pos] != '\n' {
                    pos += 1;
                }
                continue;
            }
            '(' => tokens.push(single(TokenKind::LParen)),
            ')' => tokens.push(single(TokenKind::RParen)),
            '{' => tokens.push(single(TokenKind::LBrace)),
            '}' => tokens.push(single(TokenKind::RBrace)),
            '[' => tokens.push(single(TokenKind::LBracket)),
            ']' => tokens.push(single(TokenKind::RBracket)),
            ',' => tokens.push(single(TokenKind::Comma)),
            ';' => tokens.push(single(TokenKind::Semicolon)),
            '+' => tokens.push(single(TokenKind::Plus)),
            '-' => tokens.push(single(TokenKind::Minus)),
            '*' => tokens.push(single(TokenKind::Star)),
            '/' => tokens.push(single(TokenKind::Slash)),
            '%' => tokens.push(single(TokenKind::Percent)),
            '=' | '!' | '<' | '>' => {
                let (kind, width) = match (c, next) {
                    ('=', Some('=')) => (TokenKind::EqEq, 2),
                    ('=', _) => (TokenKind::Assign, 1),
                    ('!', Some('=')) => (TokenKind::BangEq, 2),
                    ('!', _) => (TokenKind::Bang, 1),
                    ('<', Some('=')) => (TokenKind::Le, 2),
                    ('<', _) => (TokenKind::Lt, 1),
                    ('>', Some('=')) => (TokenKind::Ge, 2),
                    _ => (TokenKind::Gt, 1),
                };
                tokens.push(single(kind));
                pos += width;
                continue;
            }
            '"' => {
                let start_line = line;
                let mut text = String::new();
                pos += 1;
                loop {
                    let Some(&c) = chars.get(pos) else {
                        return Err(SyntaxError::new(start_line, "unterminated string literal"));
                    };
                    pos += 1;
                    match c {
                        '"' => break,
                        '\\' => {
                            let escaped = match chars.get(pos) {
                                Some('n') => '\n',
                                Some('t') => '\t',
                                Some('\\') => '\\',
                                Some('"') => '"',
                                Some(other) => {
                                    return Err(SyntaxError::new(
                                        line,
                                        format!("unknown escape sequence '\\{}'", other),
                                    ))
                                }
                                None => {
                                    return Err(SyntaxError::new(
                                        start_line,
                                        "unterminated string literal",
                                    ))
                                }
                            };
                            text.push(escaped);
                            pos += 1;
                        }
                        '\n' => {
                            line += 1;
                            text.push('\n');
                        }
                        other => text.push(other),
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Str(text),
                    line: start_line,
                });
                continue;
            }
            c if c.is_ascii_digit() => {
                let start = pos;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
                let is_float = chars.get(pos) == Some(&'.')
                    && chars.get(pos + 1).is_some_and(|c| c.is_ascii_digit());
                if is_float {
                    pos += 1;
                    while pos < chars.len() && chars[pos].is_ascii_digit() {
                        pos += 1;
                    }
                }
                let text: String = chars[start..pos].iter().collect();
                let kind = if is_float {
                    TokenKind::Float(text.parse().map_err(|_| {
                        SyntaxError::new(line, format!("invalid float literal '{}'", text))
                    })?)
                } else {
                    TokenKind::Int(text.parse().map_err(|_| {
                        SyntaxError::new(line, format!("integer literal '{}' is too large", text))
                    })?)
                };
                tokens.push(Token { kind, line });
                continue;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = pos;
                while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                    pos += 1;
                }
                let ident: String = chars[start..pos].iter().collect();
                let kind = keyword(&ident).unwrap_or(TokenKind::Ident(ident));
                tokens.push(Token { kind, line });
                continue;
            }
            other => {
                return Err(SyntaxError::new(
                    line,
                    format!("unexpected character '{}'", other),
                ))
            }
        }
        pos += 1;
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        line,
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn tokenizes_operators_and_keywords() {
        assert_eq!(
            kinds("x = a <= 2 and not b;"),
            vec![
                TokenKind::Ident("x".into()),
                TokenKind::Assign,
                TokenKind::Ident("a".into()),
                TokenKind::Le,
                TokenKind::Int(2),
                TokenKind::And,
                TokenKind::Not,
                TokenKind::Ident("b".into()),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tracks_lines_and_skips_comments() {
        let tokens = tokenize("# header\na\n\n  b # trailing\n").unwrap();
        let lines: Vec<u32> = tokens.iter().map(|token| token.line).collect();
        assert_eq!(lines, vec![2, 4, 5]);
    }

    #[test]
    fn reads_string_escapes_and_floats() {
        assert_eq!(
            kinds(r#""a\n\"b\"" 1.5 3"#)[..3],
            [
                TokenKind::Str("a\n\"b\"".into()),
                TokenKind::Float(1.5),
                TokenKind::Int(3),
            ]
        );
    }

    #[test]
    fn reports_unterminated_strings() {
        let err = tokenize("x = \"oops").unwrap_err();
        assert_eq!(err, SyntaxError::new(1, "unterminated string literal"));
    }
}
