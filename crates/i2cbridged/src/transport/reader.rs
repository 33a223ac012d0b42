//! Line framing for the peer connection.

use std::io::{self, Read};

use crate::process::ShutdownFlag;

use super::TransportError;

/// Largest request line accepted, newline included.
pub(crate) const MAX_REQUEST_BYTES: usize = 64 * 1024;

const CHUNK_BYTES: usize = 1024;

/// Outcome of waiting for the next request line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Frame {
    /// One request line without its terminator.
    Line(Vec<u8>),
    /// The peer closed the connection with nothing pending.
    Closed,
    /// A termination signal arrived while waiting.
    ShutdownRequested,
}

/// Splits the byte stream into request lines.
///
/// Bytes following a newline in the same read are kept for the next call,
/// so a peer may pipeline requests.
#[derive(Debug, Default)]
pub(crate) struct RequestReader {
    pending: Vec<u8>,
}

impl RequestReader {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Reads until a full line, EOF, or a raised shutdown flag.
    ///
    /// Reads that time out or would block re-check `shutdown` and resume.
    /// At EOF a trailing unterminated line is still delivered.
    pub(crate) fn next_frame<R: Read>(
        &mut self,
        stream: &mut R,
        shutdown: &ShutdownFlag,
    ) -> Result<Frame, TransportError> {
        let mut chunk = [0_u8; CHUNK_BYTES];
        loop {
            if let Some(line) = self.take_line()? {
                return Ok(Frame::Line(line));
            }
            enforce_request_limit(self.pending.len())?;
            if shutdown.is_requested() {
                return Ok(Frame::ShutdownRequested);
            }
            let Some(bytes_read) = read_chunk(stream, &mut chunk)? else {
                continue;
            };
            if bytes_read == 0 {
                return Ok(self.finish());
            }
            self.pending.extend_from_slice(&chunk[..bytes_read]);
        }
    }

    fn take_line(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let Some(pos) = self.pending.iter().position(|byte| *byte == b'\n') else {
            return Ok(None);
        };
        enforce_request_limit(pos + 1)?;
        let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
        line.pop();
        Ok(Some(line))
    }

    fn finish(&mut self) -> Frame {
        if self.pending.is_empty() {
            Frame::Closed
        } else {
            Frame::Line(std::mem::take(&mut self.pending))
        }
    }
}

/// Reads one chunk, retrying interrupts. `Ok(None)` means the read timed
/// out and the caller should poll again.
fn read_chunk<R: Read>(stream: &mut R, chunk: &mut [u8]) -> io::Result<Option<usize>> {
    loop {
        match stream.read(chunk) {
            Ok(read) => return Ok(Some(read)),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                return Ok(None);
            }
            Err(error) => return Err(error),
        }
    }
}

fn enforce_request_limit(size: usize) -> Result<(), TransportError> {
    if size > MAX_REQUEST_BYTES {
        return Err(TransportError::RequestTooLarge {
            size,
            max_size: MAX_REQUEST_BYTES,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::Cursor;

    use rstest::rstest;

    use super::*;

    /// Replays scripted read results.
    struct ScriptedStream {
        steps: VecDeque<io::Result<Vec<u8>>>,
    }

    impl ScriptedStream {
        fn new(steps: impl IntoIterator<Item = io::Result<Vec<u8>>>) -> Self {
            Self {
                steps: steps.into_iter().collect(),
            }
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.steps.pop_front() {
                None => Ok(0),
                Some(Err(error)) => Err(error),
                Some(Ok(bytes)) => {
                    let len = bytes.len().min(buf.len());
                    buf[..len].copy_from_slice(&bytes[..len]);
                    Ok(len)
                }
            }
        }
    }

    #[rstest]
    fn pipelined_lines_are_split() {
        let mut stream = Cursor::new(b"[\"get_bus\"]\n[\"exit\"]\ntrailing".to_vec());
        let mut reader = RequestReader::new();
        let shutdown = ShutdownFlag::new();

        let frames: Vec<Frame> = (0..4)
            .map(|_| reader.next_frame(&mut stream, &shutdown).expect("frame"))
            .collect();
        assert_eq!(
            frames,
            vec![
                Frame::Line(b"[\"get_bus\"]".to_vec()),
                Frame::Line(b"[\"exit\"]".to_vec()),
                Frame::Line(b"trailing".to_vec()),
                Frame::Closed,
            ]
        );
    }

    #[rstest]
    fn interrupted_and_timed_out_reads_resume() {
        let mut stream = ScriptedStream::new([
            Ok(b"[\"get".to_vec()),
            Err(io::Error::from(io::ErrorKind::Interrupted)),
            Err(io::Error::from(io::ErrorKind::WouldBlock)),
            Ok(b"_bus\"]\n".to_vec()),
        ]);
        let mut reader = RequestReader::new();
        let frame = reader
            .next_frame(&mut stream, &ShutdownFlag::new())
            .expect("frame");
        assert_eq!(frame, Frame::Line(b"[\"get_bus\"]".to_vec()));
    }

    #[rstest]
    fn raised_flag_stops_the_wait() {
        let mut stream = ScriptedStream::new([Err(io::Error::from(io::ErrorKind::TimedOut))]);
        let shutdown = ShutdownFlag::new();
        shutdown.request();
        let frame = RequestReader::new()
            .next_frame(&mut stream, &shutdown)
            .expect("frame");
        assert_eq!(frame, Frame::ShutdownRequested);
    }

    #[rstest]
    fn oversized_lines_are_rejected() {
        let mut stream = Cursor::new(vec![b'x'; MAX_REQUEST_BYTES + 10]);
        let error = RequestReader::new()
            .next_frame(&mut stream, &ShutdownFlag::new())
            .expect_err("too large");
        assert!(matches!(error, TransportError::RequestTooLarge { .. }));
    }

    #[rstest]
    fn hard_read_errors_propagate() {
        let mut stream =
            ScriptedStream::new([Err(io::Error::from(io::ErrorKind::ConnectionReset))]);
        let error = RequestReader::new()
            .next_frame(&mut stream, &ShutdownFlag::new())
            .expect_err("reset");
        assert!(matches!(error, TransportError::Io(_)));
    }
}
