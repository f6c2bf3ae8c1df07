/// SQL/JSON path tokenizer.
///
/// Keywords (`lax`, `strict`, `to`, `last`, `exists`, `starts`, `with`,
/// `like_regex`, `flag`, `is`, `unknown`, `true`, `false`, `null`, method
/// names) are lexed as plain identifiers and resolved by the parser —
/// jsonpath allows any of them as a member name after `.`, so the lexer
/// cannot commit.
use anyhow::{Result, bail};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Dollar,             // $
    DollarVar(String),  // $name / $"name"
    At,                 // @
    Dot,                // .
    LBrack,             // [
    RBrack,             // ]
    LBrace,             // {
    RBrace,             // }
    LParen,             // (
    RParen,             // )
    Comma,              // ,
    Question,           // ?
    Bang,               // !
    AndAnd,             // &&
    OrOr,               // ||
    // Comparison operators
    Eq, // ==
    Ne, // != or <>
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=
    // Arithmetic
    Plus,     // +
    Minus,    // -
    Star,     // *
    StarStar, // **
    Slash,    // /
    Percent,  // %
    // Literals and identifiers
    Ident(String),
    Str(String),
    Int(i64),
    Numeric(String),
}

pub fn lex(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        // Skip whitespace
        if bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }

        // Two-char operators first
        if i + 1 < bytes.len() {
            let two = (bytes[i], bytes[i + 1]);
            let tok = match two {
                (b'=', b'=') => Some(Token::Eq),
                (b'!', b'=') => Some(Token::Ne),
                (b'<', b'>') => Some(Token::Ne),
                (b'<', b'=') => Some(Token::Le),
                (b'>', b'=') => Some(Token::Ge),
                (b'&', b'&') => Some(Token::AndAnd),
                (b'|', b'|') => Some(Token::OrOr),
                (b'*', b'*') => Some(Token::StarStar),
                _ => None,
            };
            if let Some(tok) = tok {
                tokens.push(tok);
                i += 2;
                continue;
            }
        }

        // Single-char tokens
        let tok = match bytes[i] {
            b'@' => Some(Token::At),
            b'.' => Some(Token::Dot),
            b'[' => Some(Token::LBrack),
            b']' => Some(Token::RBrack),
            b'{' => Some(Token::LBrace),
            b'}' => Some(Token::RBrace),
            b'(' => Some(Token::LParen),
            b')' => Some(Token::RParen),
            b',' => Some(Token::Comma),
            b'?' => Some(Token::Question),
            b'!' => Some(Token::Bang),
            b'<' => Some(Token::Lt),
            b'>' => Some(Token::Gt),
            b'+' => Some(Token::Plus),
            b'-' => Some(Token::Minus),
            b'*' => Some(Token::Star),
            b'/' => Some(Token::Slash),
            b'%' => Some(Token::Percent),
            _ => None,
        };
        if let Some(tok) = tok {
            tokens.push(tok);
            i += 1;
            continue;
        }

        // Variable: $name, $"quoted name", or bare $
        if bytes[i] == b'$' {
            i += 1;
            if i < bytes.len() && bytes[i] == b'"' {
                let (name, consumed) = lex_string(bytes, i)?;
                tokens.push(Token::DollarVar(name));
                i += consumed;
            } else {
                let start = i;
                while i < bytes.len() && is_ident_byte(bytes[i]) {
                    i += 1;
                }
                if i > start {
                    tokens.push(Token::DollarVar(input[start..i].to_string()));
                } else {
                    tokens.push(Token::Dollar);
                }
            }
            continue;
        }

        // String literal
        if bytes[i] == b'"' {
            let (s, consumed) = lex_string(bytes, i)?;
            tokens.push(Token::Str(s));
            i += consumed;
            continue;
        }

        // Number
        if bytes[i].is_ascii_digit() {
            let (tok, consumed) = lex_number(bytes, i)?;
            tokens.push(tok);
            i += consumed;
            continue;
        }

        // Identifier (keywords included)
        if bytes[i].is_ascii_alphabetic() || bytes[i] == b'_' {
            let start = i;
            while i < bytes.len() && is_ident_byte(bytes[i]) {
                i += 1;
            }
            tokens.push(Token::Ident(input[start..i].to_string()));
            continue;
        }

        bail!(
            "unexpected character '{}' at position {i} in jsonpath",
            bytes[i] as char
        );
    }

    Ok(tokens)
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn lex_string(bytes: &[u8], start: usize) -> Result<(String, usize)> {
    debug_assert_eq!(bytes[start], b'"');
    let mut i = start + 1;
    let mut s = String::new();

    while i < bytes.len() {
        match bytes[i] {
            b'"' => return Ok((s, i + 1 - start)),
            b'\\' => {
                i += 1;
                if i >= bytes.len() {
                    bail!("unterminated string escape in jsonpath");
                }
                match bytes[i] {
                    b'"' => s.push('"'),
                    b'\\' => s.push('\\'),
                    b'/' => s.push('/'),
                    b'n' => s.push('\n'),
                    b'r' => s.push('\r'),
                    b't' => s.push('\t'),
                    b'b' => s.push('\x08'),
                    b'f' => s.push('\x0c'),
                    b'u' => {
                        if i + 4 >= bytes.len() {
                            bail!("incomplete \\u escape in jsonpath string");
                        }
                        let hex = std::str::from_utf8(&bytes[i + 1..i + 5])?;
                        let cp = u16::from_str_radix(hex, 16)?;
                        if let Some(c) = char::from_u32(cp as u32) {
                            s.push(c);
                        }
                        i += 4;
                    }
                    c => bail!("unknown escape '\\{}' in jsonpath string", c as char),
                }
                i += 1;
            }
            _ => {
                let chunk_start = i;
                while i < bytes.len() && bytes[i] != b'"' && bytes[i] != b'\\' {
                    i += 1;
                }
                s.push_str(std::str::from_utf8(&bytes[chunk_start..i])?);
            }
        }
    }
    bail!("unterminated string starting at position {start} in jsonpath");
}

/// Integers that fit i64 become `Int`; everything else (decimals,
/// exponents, oversized integers) keeps its text as `Numeric`.
fn lex_number(bytes: &[u8], start: usize) -> Result<(Token, usize)> {
    let mut i = start;
    let mut is_decimal = false;

    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }

    // Fractional part — but not a trailing method call like `1.type()`
    if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
        is_decimal = true;
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            is_decimal = true;
            i = j;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
    }

    let text = std::str::from_utf8(&bytes[start..i])?;
    let consumed = i - start;

    if is_decimal {
        return Ok((Token::Numeric(text.to_string()), consumed));
    }
    match text.parse::<i64>() {
        Ok(n) => Ok((Token::Int(n), consumed)),
        Err(_) => Ok((Token::Numeric(text.to_string()), consumed)),
    }
}
