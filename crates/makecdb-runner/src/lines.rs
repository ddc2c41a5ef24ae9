//! Newline framing for incrementally received process output.

/// Consumed bytes are discarded once this many have accumulated.
const COMPACT_THRESHOLD: usize = 64 * 1024;

/// A growable byte buffer from which complete lines are taken.
///
/// Bytes are appended through [`LineBuffer::buffer_mut`]; a line is only
/// returned once its terminating `\n` has arrived.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
    start: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying buffer, for appending newly read bytes.
    pub fn buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    /// Take the next complete line as text, without its `\n`. Invalid UTF-8
    /// is replaced rather than rejected.
    pub fn next_line(&mut self) -> Option<String> {
        self.next_raw_line()
            .map(|line| String::from_utf8_lossy(&line).into_owned())
    }

    /// Take the next complete line's bytes exactly as received, without its
    /// `\n`.
    pub fn next_raw_line(&mut self) -> Option<Vec<u8>> {
        let rest = &self.buf[self.start..];
        let end = rest.iter().position(|&b| b == b'\n')?;
        let line = rest[..end].to_vec();

        self.start += end + 1;
        if self.start == self.buf.len() {
            self.buf.clear();
            self.start = 0;
        } else if self.start >= COMPACT_THRESHOLD {
            self.buf.drain(..self.start);
            self.start = 0;
        }

        Some(line)
    }

    /// Bytes received after the last complete line.
    pub fn pending(&self) -> &[u8] {
        &self.buf[self.start..]
    }
}
