use crate::error::Diagnostic;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Bare word: identifiers, numbers and dates are not distinguished here
    Word(String),
    /// Quoted string literal (content without quotes, escapes resolved)
    Str(String),
    Eq,
    LBrace,
    RBrace,
    // End of input
    Eof,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
}

fn is_word_char(c: char) -> bool {
    !(c.is_whitespace() || matches!(c, '=' | '{' | '}' | '"' | '#'))
}

pub fn lex(src: &str, filename: &str) -> Result<Vec<Spanned>, Diagnostic> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut pos = 0usize;
    let mut line: u32 = 1;

    while pos < chars.len() {
        let c = chars[pos];

        // Line comment
        if c == '#' {
            while pos < chars.len() && chars[pos] != '\n' {
                pos += 1;
            }
            continue;
        }

        // Whitespace (a leading BOM counts)
        if c.is_whitespace() || c == '\u{feff}' {
            if c == '\n' {
                line += 1;
            }
            pos += 1;
            continue;
        }

        let tok_line = line;

        // String literal
        if c == '"' {
            pos += 1;
            let mut s = String::new();
            loop {
                if pos >= chars.len() {
                    return Err(unterminated(filename, tok_line));
                }
                let sc = chars[pos];
                if sc == '"' {
                    pos += 1;
                    break;
                }
                if sc == '\\' && pos + 1 < chars.len() && matches!(chars[pos + 1], '"' | '\\') {
                    s.push(chars[pos + 1]);
                    pos += 2;
                    continue;
                }
                if sc == '\n' {
                    return Err(unterminated(filename, tok_line));
                }
                s.push(sc);
                pos += 1;
            }
            tokens.push(Spanned {
                token: Token::Str(s),
                line: tok_line,
            });
            continue;
        }

        let punct = match c {
            '=' => Some(Token::Eq),
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            _ => None,
        };
        if let Some(token) = punct {
            tokens.push(Spanned {
                token,
                line: tok_line,
            });
            pos += 1;
            continue;
        }

        let start = pos;
        while pos < chars.len() && is_word_char(chars[pos]) {
            pos += 1;
        }
        let word: String = chars[start..pos].iter().collect();
        tokens.push(Spanned {
            token: Token::Word(word),
            line: tok_line,
        });
    }

    tokens.push(Spanned {
        token: Token::Eof,
        line,
    });
    Ok(tokens)
}

fn unterminated(filename: &str, line: u32) -> Diagnostic {
    Diagnostic::format("unterminated string literal")
        .in_file(filename)
        .at_line(Some(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        lex(src, "test.txt")
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn words_and_punctuation() {
        assert_eq!(
            kinds("owner=ENG\n1836.1.1 = { add_core = FRA }"),
            vec![
                Token::Word("owner".into()),
                Token::Eq,
                Token::Word("ENG".into()),
                Token::Word("1836.1.1".into()),
                Token::Eq,
                Token::LBrace,
                Token::Word("add_core".into()),
                Token::Eq,
                Token::Word("FRA".into()),
                Token::RBrace,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped_and_lines_counted() {
        let tokens = lex("# header\nowner = ENG # trailing\n\nlife_rating = 35", "t.txt").unwrap();
        let lines: Vec<u32> = tokens.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![2, 2, 2, 4, 4, 4, 4]);
    }

    #[test]
    fn strings_resolve_quote_escapes() {
        assert_eq!(
            kinds(r#"name = "The \"Old\" Country""#),
            vec![
                Token::Word("name".into()),
                Token::Eq,
                Token::Str("The \"Old\" Country".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_is_a_format_error() {
        let err = lex("name = \"open\nowner = ENG", "bad.txt").unwrap_err();
        assert_eq!(err.kind, crate::error::DiagnosticKind::Format);
        assert_eq!(err.line, Some(1));
        assert_eq!(err.file.as_deref(), Some("bad.txt"));
    }

    #[test]
    fn negative_numbers_and_decimals_are_words() {
        assert_eq!(
            kinds("prestige = -2.5"),
            vec![
                Token::Word("prestige".into()),
                Token::Eq,
                Token::Word("-2.5".into()),
                Token::Eof,
            ]
        );
    }
}
