/// Style tag a tokenizer attaches to a run of characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Type,
    String,
    Number,
    Comment,
    Operator,
    Preprocessor,
    Other(u16),
}

/// Receives tokenizer output for one line at a time.
pub trait TokenSink {
    fn add_token(&mut self, line: usize, col_start: usize, text: &str, kind: TokenKind);

    /// Plain (unstyled) text; only meaningful to sinks that rebuild the line.
    fn add_text(&mut self, _line: usize, _col_start: usize, _text: &str) {}
}

/// A pluggable tokenizer. The engine never ships one; hosts provide it.
pub trait SyntaxHighlighter {
    /// Resets any state carried between lines before a full pass.
    fn init(&mut self);

    fn process_line(&mut self, line: usize, text: &str, sink: &mut dyn TokenSink);
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Marks every ASCII digit run as a number and `fn` as a keyword.
    #[derive(Default)]
    pub struct DigitHighlighter {
        pub inits: usize,
    }

    impl SyntaxHighlighter for DigitHighlighter {
        fn init(&mut self) {
            self.inits += 1;
        }

        fn process_line(&mut self, line: usize, text: &str, sink: &mut dyn TokenSink) {
            let chars: Vec<char> = text.chars().collect();
            let mut col = 0;
            while col < chars.len() {
                if chars[col].is_ascii_digit() {
                    let start = col;
                    while col < chars.len() && chars[col].is_ascii_digit() {
                        col += 1;
                    }
                    let run: String = chars[start..col].iter().collect();
                    sink.add_token(line, start, &run, TokenKind::Number);
                } else if chars[col..].starts_with(&['f', 'n']) {
                    sink.add_token(line, col, "fn", TokenKind::Keyword);
                    col += 2;
                } else {
                    sink.add_text(line, col, &chars[col].to_string());
                    col += 1;
                }
            }
        }
    }
}
