/// Check if a character can start an identifier (letter or underscore)
pub(crate) const fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Check if a character can continue an identifier (letter, digit, or underscore)
pub(crate) const fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Check if a string is a well-formed identifier.
pub(crate) fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_identifier_start(c) => chars.all(is_identifier_continue),
        _ => false,
    }
}

/// Horizontal whitespace only; newlines are significant to the tokenizer.
pub(crate) const fn is_whitespace(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// A single source character tagged with the 0-based line it came from.
///
/// The line refers to the current translation unit before any expansion,
/// so diagnostics point at what the user actually wrote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PPToken {
    pub character: char,
    pub line: usize,
}

impl PPToken {
    pub fn new(character: char, line: usize) -> Self {
        PPToken { character, line }
    }
}

pub(crate) fn tokens_to_string(tokens: &[PPToken]) -> String {
    tokens.iter().map(|t| t.character).collect()
}

/// Character cursor over comment-stripped source.
///
/// Besides the usual peek/next helpers it keeps a queue of "generated"
/// newline tokens: whenever a directive consumes source text, the newlines
/// inside it are re-emitted through this queue so the output keeps the
/// original line count.
pub(crate) struct Tokenizer {
    chars: Vec<char>,
    index: usize,
    line: usize,
    generated: Vec<PPToken>,
}

impl Tokenizer {
    pub fn new(code: &str) -> Self {
        Tokenizer {
            chars: code.chars().collect(),
            index: 0,
            line: 0,
            generated: Vec::new(),
        }
    }

    /// Current 0-based line.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Newline tokens produced while consuming directive text since the
    /// last call. The caller appends them to the output verbatim.
    pub fn take_generated(&mut self) -> Vec<PPToken> {
        std::mem::take(&mut self.generated)
    }

    fn next(&mut self) -> Option<char> {
        let c = self.chars.get(self.index).copied();
        if c.is_some() {
            self.index += 1;
        }
        c
    }

    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    /// Move the cursor back until it sits on `what`.
    pub fn backtrack(&mut self, what: char) {
        while self.index > 0 {
            if self.chars.get(self.index) == Some(&what) {
                break;
            }
            self.index -= 1;
        }
    }

    /// Consume characters up to and including `what`, returning everything
    /// consumed. Newlines passed over are queued as generated tokens.
    /// Returns an empty vector when `what` is not found before the end.
    pub fn advance(&mut self, what: char) -> Vec<PPToken> {
        let mut tokens = Vec::new();

        while self.index < self.chars.len() {
            let c = self.chars[self.index];
            self.index += 1;

            tokens.push(PPToken::new(c, self.line));

            if c == '\n' {
                self.generated.push(PPToken::new('\n', self.line));
                self.line += 1;
            }

            if c == what {
                return tokens;
            }
        }
        Vec::new()
    }

    pub fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(is_whitespace) {
            self.next();
        }
    }

    /// Read an identifier, skipping leading horizontal whitespace.
    ///
    /// Stops at whitespace, newline, parentheses and commas. Returns an
    /// empty string when the consumed text is not a valid identifier.
    pub fn get_identifier(&mut self) -> String {
        let mut text = String::new();

        let mut started = false;
        loop {
            let c = match self.peek() {
                None | Some('\n') | Some('(') | Some(')') | Some(',') => break,
                Some(c) => c,
            };

            if is_whitespace(c) && started {
                break;
            }
            if !is_whitespace(c) {
                started = true;
            }

            if let Some(n) = self.next()
                && started
            {
                text.push(n);
            }
        }

        if !is_valid_identifier(&text) {
            return String::new();
        }
        text
    }

    /// Like [`get_identifier`](Self::get_identifier) but without moving
    /// the cursor or the line counter.
    pub fn peek_identifier(&mut self) -> String {
        let original = self.index;
        let id = self.get_identifier();
        self.index = original;
        id
    }

    /// Next significant token. Runs of horizontal whitespace collapse into
    /// a single space token. `None` at end of input.
    pub fn get_token(&mut self) -> Option<PPToken> {
        while self.index < self.chars.len() {
            let c = self.chars[self.index];
            self.index += 1;

            match c {
                ' ' | '\t' => {
                    self.skip_whitespace();
                    return Some(PPToken::new(' ', self.line));
                }
                '\n' => {
                    let t = PPToken::new('\n', self.line);
                    self.line += 1;
                    return Some(t);
                }
                _ => return Some(PPToken::new(c, self.line)),
            }
        }
        None
    }
}
