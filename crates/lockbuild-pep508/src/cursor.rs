use std::fmt::{Display, Formatter};
use std::str::Chars;

/// A [`Cursor`] over a string.
#[derive(Debug, Clone)]
pub(crate) struct Cursor<'a> {
    input: &'a str,
    chars: Chars<'a>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Convert from `&str`.
    pub(crate) fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars(),
            pos: 0,
        }
    }

    /// Returns a slice over the input string.
    pub(crate) fn slice(&self, start: usize, len: usize) -> &'a str {
        &self.input[start..start + len]
    }

    /// Peeks the next character and position from the input stream without consuming it.
    pub(crate) fn peek(&self) -> Option<(usize, char)> {
        self.chars.clone().next().map(|char| (self.pos, char))
    }

    /// Peeks the next character from the input stream without consuming it.
    pub(crate) fn peek_char(&self) -> Option<char> {
        self.chars.clone().next()
    }

    /// Eats the next character from the input stream if it matches the given token.
    pub(crate) fn eat_char(&mut self, token: char) -> Option<usize> {
        let (start_pos, peek_char) = self.peek()?;
        if peek_char == token {
            self.next();
            Some(start_pos)
        } else {
            None
        }
    }

    /// Consumes whitespace from the cursor.
    pub(crate) fn eat_whitespace(&mut self) {
        while let Some(char) = self.peek_char() {
            if char.is_whitespace() {
                self.next();
            } else {
                return;
            }
        }
    }

    /// Consumes characters from the cursor while the predicate returns true, returning the start
    /// position and length of the consumed span.
    pub(crate) fn take_while(&mut self, mut predicate: impl FnMut(char) -> bool) -> (usize, usize) {
        let start = self.pos;
        let mut len = 0;
        while let Some(char) = self.peek_char() {
            if !predicate(char) {
                break;
            }
            self.next();
            len += char.len_utf8();
        }
        (start, len)
    }

    /// Returns the remaining, unconsumed input.
    pub(crate) fn remaining(&self) -> &'a str {
        self.chars.as_str()
    }

    /// Returns the current byte position in the input.
    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    /// Moves the cursor to the end of the input.
    pub(crate) fn exhaust(&mut self) {
        self.pos = self.input.len();
        self.chars = self.input[self.input.len()..].chars();
    }
}

impl Iterator for Cursor<'_> {
    type Item = (usize, char);

    fn next(&mut self) -> Option<Self::Item> {
        self.chars.next().map(|char| {
            let pos = self.pos;
            self.pos += char.len_utf8();
            (pos, char)
        })
    }
}

impl Display for Cursor<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.input)
    }
}
