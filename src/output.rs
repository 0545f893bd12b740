// src/output.rs - Line sinks that receive generated G-code
use std::io::{self, Write};

/// Destination for generated command and comment lines.
pub trait LineSink {
    /// Write one complete line. The sink adds its own terminator.
    fn emit_line(&mut self, line: &str) -> io::Result<()>;
}

impl<S: LineSink + ?Sized> LineSink for &mut S {
    fn emit_line(&mut self, line: &str) -> io::Result<()> {
        (**self).emit_line(line)
    }
}

/// Collects lines in memory.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    lines: Vec<String>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }

    /// Removes and returns everything captured so far.
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Captured lines joined with newlines, each line terminated.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }
}

impl LineSink for BufferSink {
    fn emit_line(&mut self, line: &str) -> io::Result<()> {
        self.lines.push(line.to_string());
        Ok(())
    }
}

/// Writes each line straight through to an `io::Write`, flushing after every line.
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
    lines_written: u64,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, lines_written: 0 }
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> LineSink for WriterSink<W> {
    fn emit_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        self.lines_written += 1;
        Ok(())
    }
}
