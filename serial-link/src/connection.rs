//! An open serial connection with line buffering

use std::io::ErrorKind;

use crate::error::{Result, SerialError};
use crate::port::LinePort;

/// Longest line kept in the buffer before it is flushed without a newline
pub const MAX_LINE_LEN: usize = 1024;

const READ_CHUNK: usize = 256;

/// Outcome of a bounded line read
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    /// A complete line, decoded lossily and trimmed
    Line(String),
    /// No complete line arrived within the read timeout
    Timeout,
}

/// An open link to the device
///
/// Bytes are accumulated across reads, so a line split over several
/// timeouts is still delivered whole. The port's own timeout bounds each
/// read.
pub struct Connection {
    port_name: String,
    port: Box<dyn LinePort>,
    buffer: Vec<u8>,
}

impl Connection {
    pub fn new(port_name: impl Into<String>, port: Box<dyn LinePort>) -> Self {
        Self {
            port_name: port_name.into(),
            port,
            buffer: Vec::with_capacity(READ_CHUNK),
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Read the next line, waiting at most one port read timeout
    ///
    /// Issues a single port read per call. Bytes that do not complete a line
    /// stay buffered and the call reports [`ReadOutcome::Timeout`].
    pub fn read_line(&mut self) -> Result<ReadOutcome> {
        if let Some(line) = self.take_line() {
            return Ok(ReadOutcome::Line(line));
        }

        let mut chunk = [0u8; READ_CHUNK];
        match self.port.read(&mut chunk) {
            Ok(0) => return Err(SerialError::Disconnected),
            Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) => {}
            Err(e) => return Err(SerialError::Read(e.to_string())),
        }

        Ok(match self.take_line() {
            Some(line) => ReadOutcome::Line(line),
            None => ReadOutcome::Timeout,
        })
    }

    /// Write `text` followed by a newline and flush it to the device
    pub fn write_line(&mut self, text: &str) -> Result<()> {
        let framed = format!("{}\n", text.trim_end_matches('\n'));
        self.port
            .write_all(framed.as_bytes())
            .and_then(|_| self.port.flush())
            .map_err(|e| SerialError::Write(e.to_string()))
    }

    fn take_line(&mut self) -> Option<String> {
        let end = match self.buffer.iter().position(|b| *b == b'\n') {
            Some(pos) => pos + 1,
            None if self.buffer.len() >= MAX_LINE_LEN => {
                tracing::warn!(
                    "Flushing unterminated line after {} bytes on {}",
                    self.buffer.len(),
                    self.port_name
                );
                self.buffer.len()
            }
            None => return None,
        };

        let raw: Vec<u8> = self.buffer.drain(..end).collect();
        Some(String::from_utf8_lossy(&raw).trim().to_string())
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("port_name", &self.port_name)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::{self, Read, Write};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    /// Replays read chunks; an empty chunk simulates a read timeout.
    struct ChunkPort {
        chunks: VecDeque<Vec<u8>>,
        written: Arc<Mutex<Vec<u8>>>,
    }

    impl ChunkPort {
        fn new(chunks: &[&[u8]]) -> (Self, Arc<Mutex<Vec<u8>>>) {
            let written = Arc::new(Mutex::new(Vec::new()));
            let port = Self {
                chunks: chunks.iter().map(|c| c.to_vec()).collect(),
                written: Arc::clone(&written),
            };
            (port, written)
        }
    }

    impl Read for ChunkPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunks.pop_front() {
                Some(chunk) if chunk.is_empty() => {
                    Err(io::Error::new(ErrorKind::TimedOut, "timed out"))
                }
                Some(mut chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.chunks.push_front(chunk.split_off(n));
                    }
                    Ok(n)
                }
                None => Ok(0),
            }
        }
    }

    impl Write for ChunkPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn connection(chunks: &[&[u8]]) -> (Connection, Arc<Mutex<Vec<u8>>>) {
        let (port, written) = ChunkPort::new(chunks);
        let conn = Connection::new("/dev/test", Box::new(port));
        (conn, written)
    }

    #[test]
    fn test_reads_complete_line() {
        let (mut conn, _) = connection(&[b"COIN:5.00\r\n"]);
        assert_eq!(
            conn.read_line().unwrap(),
            ReadOutcome::Line("COIN:5.00".to_string())
        );
    }

    #[test]
    fn test_partial_line_survives_timeout() {
        let (mut conn, _) = connection(&[b"COI", b"", b"N:1\n"]);
        assert_eq!(conn.read_line().unwrap(), ReadOutcome::Timeout);
        assert_eq!(conn.read_line().unwrap(), ReadOutcome::Timeout);
        assert_eq!(
            conn.read_line().unwrap(),
            ReadOutcome::Line("COIN:1".to_string())
        );
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let (mut conn, _) = connection(&[b"HEARTBEAT\nCOIN:10\n"]);
        assert_eq!(
            conn.read_line().unwrap(),
            ReadOutcome::Line("HEARTBEAT".to_string())
        );
        assert_eq!(
            conn.read_line().unwrap(),
            ReadOutcome::Line("COIN:10".to_string())
        );
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let (mut conn, _) = connection(&[b"\xffHELLO\n"]);
        assert_eq!(
            conn.read_line().unwrap(),
            ReadOutcome::Line("\u{fffd}HELLO".to_string())
        );
    }

    #[test]
    fn test_end_of_stream_is_disconnect() {
        let (mut conn, _) = connection(&[]);
        assert_eq!(conn.read_line(), Err(SerialError::Disconnected));
    }

    #[test]
    fn test_overlong_line_is_flushed() {
        let long = vec![b'x'; MAX_LINE_LEN];
        let (mut conn, _) = connection(&[&long]);
        for _ in 0..(MAX_LINE_LEN / READ_CHUNK - 1) {
            assert_eq!(conn.read_line().unwrap(), ReadOutcome::Timeout);
        }
        match conn.read_line().unwrap() {
            ReadOutcome::Line(line) => assert_eq!(line.len(), MAX_LINE_LEN),
            other => panic!("Expected a flushed line, got {:?}", other),
        }
    }

    /// Hands out a fragment after a delay, then blocks for a full timeout.
    struct SlowPort {
        fragment_sent: bool,
        delay: Duration,
    }

    impl Read for SlowPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            std::thread::sleep(self.delay);
            if self.fragment_sent {
                return Err(io::Error::new(ErrorKind::TimedOut, "timed out"));
            }
            self.fragment_sent = true;
            buf[..3].copy_from_slice(b"COI");
            Ok(3)
        }
    }

    impl Write for SlowPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_partial_read_returns_without_reading_again() {
        let delay = Duration::from_millis(300);
        let port = SlowPort {
            fragment_sent: false,
            delay,
        };
        let mut conn = Connection::new("/dev/test", Box::new(port));

        let started = Instant::now();
        assert_eq!(conn.read_line().unwrap(), ReadOutcome::Timeout);
        let elapsed = started.elapsed();

        assert!(
            elapsed < delay * 2,
            "read_line blocked for {:?}, more than one port read",
            elapsed
        );
        assert_eq!(conn.buffer, b"COI");
    }

    #[test]
    fn test_write_line_appends_newline() {
        let (mut conn, written) = connection(&[]);
        conn.write_line("ACK").unwrap();
        assert_eq!(written.lock().unwrap().as_slice(), b"ACK\n");
    }
}
