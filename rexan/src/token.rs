use clr1::Lexeme;

/// Tokenizes a pattern into the flat lexeme sequence the regex grammar is
/// written over.  A single pass with a one-byte escape state: after `\\`
/// the next byte is always an ordinary CHAR, whatever it is.
pub fn lex(pattern: &str) -> Vec<Lexeme> {
    let mut stream = Vec::with_capacity(pattern.len());
    let mut escape = false;
    for byte in pattern.bytes() {
        let text = char::from(byte).to_string();
        if escape {
            stream.push(Lexeme::new("CHAR", &text));
            escape = false;
            continue;
        }
        match byte {
            b'\\' => {
                stream.push(Lexeme::new("SLASH", "\\"));
                escape = true;
            }
            b'^' => stream.push(Lexeme::new("NEGATE", "^")),
            b'(' => stream.push(Lexeme::new("LPAREN", "(")),
            b')' => stream.push(Lexeme::new("RPAREN", ")")),
            b'[' => stream.push(Lexeme::new("LBRACKET", "[")),
            b']' => stream.push(Lexeme::new("RBRACKET", "]")),
            b'*' => stream.push(Lexeme::new("STAR", "*")),
            b'+' => stream.push(Lexeme::new("PLUS", "+")),
            b'?' => stream.push(Lexeme::new("OPT", "?")),
            b'|' => stream.push(Lexeme::new("ALT", "|")),
            b'.' => stream.push(Lexeme::new("DOT", ".")),
            b'-' => stream.push(Lexeme::new("TO", "-")),
            _ => stream.push(Lexeme::new("CHAR", &text)),
        }
    }
    stream
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pattern: &str) -> Vec<String> {
        lex(pattern)
            .iter()
            .map(|lexeme| lexeme.tag().to_string())
            .collect()
    }

    #[test]
    fn punctuation_gets_its_own_tags() {
        assert_eq!(
            tags("a(b|c)*d"),
            vec!["CHAR", "LPAREN", "CHAR", "ALT", "CHAR", "RPAREN", "STAR", "CHAR"]
        );
        assert_eq!(
            tags("[a-c]+"),
            vec!["LBRACKET", "CHAR", "TO", "CHAR", "RBRACKET", "PLUS"]
        );
        assert_eq!(tags("[^x]?"), vec!["LBRACKET", "NEGATE", "CHAR", "RBRACKET", "OPT"]);
    }

    #[test]
    fn escape_demotes_the_next_byte() {
        let stream = lex("\\(\\n");
        assert_eq!(stream.len(), 4);
        assert_eq!(stream[0].tag(), "SLASH");
        assert_eq!(stream[1].tag(), "CHAR");
        assert_eq!(stream[1].text(), "(");
        assert_eq!(stream[2].tag(), "SLASH");
        assert_eq!(stream[3].tag(), "CHAR");
        assert_eq!(stream[3].text(), "n");
    }

    #[test]
    fn brackets_are_told_apart_by_tag() {
        let stream = lex("[]()");
        let tags: Vec<&str> = stream.iter().map(|lexeme| lexeme.tag()).collect();
        assert_eq!(tags, vec!["LBRACKET", "RBRACKET", "LPAREN", "RPAREN"]);
        assert_eq!(stream[0].text(), "[");
        assert_eq!(stream[2].text(), "(");
    }
}
