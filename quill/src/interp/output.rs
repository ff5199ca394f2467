//! Destination for `print` and `printLine`
//!
//! Scripts normally write to stdout. Tests and embedders capture into a
//! shared buffer instead and read it back after the run.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// Where program output goes
#[derive(Debug, Clone, Default)]
pub enum OutputSink {
    /// Process stdout, flushed after every write
    #[default]
    Stdout,
    /// In-memory capture shared with whoever created the sink
    Buffer(Rc<RefCell<String>>),
}

impl OutputSink {
    /// Fresh capturing sink
    pub fn buffer() -> Self {
        OutputSink::Buffer(Rc::new(RefCell::new(String::new())))
    }

    /// Write without a line terminator
    pub fn write(&self, text: &str) {
        match self {
            OutputSink::Stdout => {
                let mut out = std::io::stdout().lock();
                // stdout going away (closed pipe) is not a script error
                let _ = out.write_all(text.as_bytes()).and_then(|()| out.flush());
            }
            OutputSink::Buffer(buf) => buf.borrow_mut().push_str(text),
        }
    }

    /// Write followed by `\n`
    pub fn write_line(&self, text: &str) {
        match self {
            OutputSink::Stdout => {
                let mut out = std::io::stdout().lock();
                let _ = writeln!(out, "{text}");
            }
            OutputSink::Buffer(buf) => {
                let mut buf = buf.borrow_mut();
                buf.push_str(text);
                buf.push('\n');
            }
        }
    }

    /// Everything captured so far; empty for stdout
    pub fn contents(&self) -> String {
        match self {
            OutputSink::Stdout => String::new(),
            OutputSink::Buffer(buf) => buf.borrow().clone(),
        }
    }

    /// Drain the captured text
    pub fn take(&self) -> String {
        match self {
            OutputSink::Stdout => String::new(),
            OutputSink::Buffer(buf) => std::mem::take(&mut *buf.borrow_mut()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_write_line_appends_newline() {
        let sink = OutputSink::buffer();
        sink.write_line("32");
        assert_eq!(sink.contents(), "32\n");
    }

    #[test]
    fn test_buffer_write_has_no_newline() {
        let sink = OutputSink::buffer();
        sink.write("a");
        sink.write("b");
        assert_eq!(sink.contents(), "ab");
    }

    #[test]
    fn test_clones_share_the_buffer() {
        let sink = OutputSink::buffer();
        let reader = sink.clone();
        sink.write_line("x");
        assert_eq!(reader.take(), "x\n");
        assert_eq!(sink.contents(), "");
    }

    #[test]
    fn test_stdout_captures_nothing() {
        assert_eq!(OutputSink::Stdout.contents(), "");
    }
}
