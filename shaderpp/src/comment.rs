use crate::error::{ErrorKind, PreprocessError};

/// Strips `//` and `/* */` comments from shader source.
///
/// Every newline of the input survives into the output, including the ones
/// inside block comments, so line numbers stay 1:1 with the original text.
/// String literals suppress comment recognition; quotes are tracked with a
/// simple open/close toggle, not full escape awareness.
pub(crate) struct CommentStripper {
    chars: Vec<char>,
    stripped: Vec<char>,
    index: usize,
    line: usize,
    comment_line_open: usize,
    comments_open: i32,
    strings_open: i32,
}

impl CommentStripper {
    pub fn new(code: &str) -> Self {
        CommentStripper {
            chars: code.chars().collect(),
            stripped: Vec::with_capacity(code.len()),
            index: 0,
            line: 0,
            comment_line_open: 0,
            comments_open: 0,
            strings_open: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    /// Skip forward to just past `what`, keeping only the newlines.
    fn advance(&mut self, what: char) -> bool {
        while self.index < self.chars.len() {
            let c = self.chars[self.index];
            self.index += 1;

            if c == '\n' {
                self.line += 1;
                self.stripped.push('\n');
            }

            if c == what {
                return true;
            }
        }
        false
    }

    /// Run the scan. Returns the stripped source, or the error describing
    /// an unterminated (or unmatched) block comment.
    pub fn strip(mut self) -> Result<String, PreprocessError> {
        while self.index < self.chars.len() {
            let c = self.chars[self.index];
            self.index += 1;

            if c == '"' {
                if self.strings_open <= 0 {
                    self.strings_open += 1;
                } else {
                    self.strings_open -= 1;
                }
                self.stripped.push(c);
            } else if c == '/' && self.strings_open == 0 {
                match self.peek() {
                    // Single line comment: drop up to the newline, which
                    // advance() itself preserves.
                    Some('/') => {
                        self.advance('\n');
                    }
                    Some('*') => {
                        self.index += 1;
                        self.comment_line_open = self.line;
                        self.comments_open += 1;
                        while self.advance('*') {
                            if self.peek() == Some('/') {
                                self.comments_open -= 1;
                                self.index += 1;
                                break;
                            }
                        }
                    }
                    _ => self.stripped.push(c),
                }
            } else if c == '*' && self.strings_open == 0 {
                if self.peek() == Some('/') {
                    // Stray end of a block comment.
                    self.comment_line_open = self.line;
                    self.comments_open -= 1;
                } else {
                    self.stripped.push(c);
                }
            } else if c == '\n' {
                self.line += 1;
                self.stripped.push(c);
            } else {
                self.stripped.push(c);
            }
        }

        if self.comments_open != 0 {
            return Err(PreprocessError::at(
                ErrorKind::BlockCommentMismatch,
                self.comment_line_open,
            ));
        }
        Ok(self.stripped.into_iter().collect())
    }
}
