//! Printers: colored status lines and the streaming stdout sink.

use std::io::{self, Write};

use owo_colors::OwoColorize;

use crate::session::OutputSink;

pub struct TextPrinter {
    pub color: Option<&'static str>,
}

impl TextPrinter {
    pub fn format(&self, text: &str) -> String {
        match self.color {
            Some("green") => text.green().to_string(),
            Some("cyan") => text.cyan().to_string(),
            Some("magenta") => text.magenta().to_string(),
            Some("yellow") => text.yellow().to_string(),
            Some("red") => text.red().to_string(),
            _ => text.to_string(),
        }
    }

    pub fn print(&self, text: &str) {
        println!("{}", self.format(text));
    }

    pub fn eprint(&self, text: &str) {
        eprintln!("{}", self.format(text));
    }
}

/// Streams run output to `out`; markers and notices go to `err` so
/// redirected stdout holds only program output.
pub struct StreamSink<O: Write, E: Write> {
    out: O,
    err: E,
    /// Whether the last chunk ended with a newline.
    at_line_start: bool,
    pub chunks: usize,
}

pub type StdoutSink = StreamSink<io::Stdout, io::Stderr>;

impl Default for StdoutSink {
    fn default() -> Self {
        StreamSink::new(io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> StreamSink<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err, at_line_start: true, chunks: 0 }
    }

    fn eprint(&mut self, color: &'static str, text: &str) {
        let _ = writeln!(self.err, "{}", TextPrinter { color: Some(color) }.format(text));
    }
}

impl<O: Write, E: Write> OutputSink for StreamSink<O, E> {
    fn clear(&mut self) {
        self.at_line_start = true;
        self.chunks = 0;
    }

    fn append(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
        self.at_line_start = text.ends_with('\n');
        self.chunks += 1;
    }

    fn completed(&mut self) {
        // Finish the dangling line on the terminal without adding a byte to the output.
        if !self.at_line_start {
            let _ = writeln!(self.err);
            self.at_line_start = true;
        }
        self.eprint("green", "[Program completed]");
    }

    fn notice(&mut self, message: &str) {
        self.eprint("yellow", message);
    }
}
