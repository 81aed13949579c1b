//! Single-line text input with a cursor.

use unicode_width::UnicodeWidthStr;

use crate::view::display_text;

/// A text input field. `cursor` counts characters, not bytes.
#[derive(Clone, Debug, Default)]
pub struct InputField {
    pub value: String,
    pub cursor: usize,
}

impl InputField {
    /// Create a new empty input field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an input field with initial text value, cursor at the end.
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.chars().count(),
        }
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Insert a character at the current cursor position.
    pub fn handle_char(&mut self, c: char) {
        let at = self.byte_offset(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Delete the character before the cursor.
    pub fn handle_backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_offset(self.cursor);
            self.value.remove(at);
        }
    }

    /// Delete the character at the cursor position.
    pub fn handle_delete(&mut self) {
        if self.cursor < self.len() {
            let at = self.byte_offset(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor < self.len() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.len();
    }

    /// Terminal columns between the start of the drawn text and the cursor.
    /// The text is drawn through `display_text`, so escaped control
    /// characters and wide glyphs count at their drawn width.
    pub fn cursor_column(&self) -> usize {
        let before: String = self.value.chars().take(self.cursor).collect();
        display_text(&before).width()
    }

    fn len(&self) -> usize {
        self.value.chars().count()
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.value
            .char_indices()
            .nth(chars)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editing_multibyte_text_keeps_char_boundaries() {
        let mut field = InputField::with_value("café");
        assert_eq!(field.cursor, 4);
        field.handle_backspace();
        assert_eq!(field.value, "caf");
        field.handle_char('é');
        field.handle_char('!');
        assert_eq!(field.value, "café!");
        field.move_home();
        field.handle_delete();
        assert_eq!(field.value, "afé!");
    }

    #[test]
    fn cursor_column_counts_drawn_width() {
        let mut field = InputField::with_value("ab日本");
        assert_eq!(field.cursor, 4);
        assert_eq!(field.cursor_column(), 6);
        field.move_cursor_left();
        assert_eq!(field.cursor_column(), 4);

        let escaped = InputField::with_value("a\u{1b}b");
        assert_eq!(escaped.cursor_column(), 8);
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut field = InputField::new();
        field.move_cursor_left();
        field.handle_backspace();
        field.move_cursor_right();
        assert_eq!(field.cursor, 0);
        field.handle_char('a');
        field.move_cursor_right();
        assert_eq!(field.cursor, 1);
        field.clear();
        assert!(field.value.is_empty());
        assert_eq!(field.cursor, 0);
    }
}
