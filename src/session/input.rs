//! Locally echoed stdin text and line extraction.

/// Everything typed into the current run's stdin. Submitted lines stay in the
/// buffer (separated by `\n`) so the echo matches what the user saw; only the
/// text after the last line break is still editable.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InputBuffer {
    text: String,
}

impl InputBuffer {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn push(&mut self, c: char) {
        self.text.push(c);
    }

    pub fn push_str(&mut self, s: &str) {
        self.text.push_str(s);
    }

    /// Delete the last character of the line being typed. Returns false when
    /// that line is empty; submitted lines are never edited.
    pub fn backspace(&mut self) -> bool {
        if self.current_line().is_empty() {
            return false;
        }
        self.text.pop();
        true
    }

    pub fn current_line(&self) -> &str {
        last_line(&self.text)
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Extract the line to forward and record the line break in the buffer.
    pub fn take_line(&mut self) -> String {
        let line = line_to_send(&self.text);
        self.text.push('\n');
        line
    }
}

/// Text after the last line break, or all of `buffer` when there is none.
pub fn last_line(buffer: &str) -> &str {
    match buffer.rfind('\n') {
        Some(pos) => &buffer[pos + 1..],
        None => buffer,
    }
}

/// The latest line of `buffer` with exactly one trailing `\n`.
pub fn line_to_send(buffer: &str) -> String {
    let mut line = last_line(buffer).to_string();
    line.push('\n');
    line
}
