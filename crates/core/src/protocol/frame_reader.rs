use std::io::{self, Read};

use crate::shared::constants::LENGTH_PREFIX_BYTES;

use super::frame::Frame;

/// Largest up-front allocation for a payload; longer payloads grow as bytes
/// actually arrive, so a bogus length on a dying stream costs nothing.
const MAX_PREALLOCATION: usize = 1024 * 1024;

/// Why the reader stopped producing frames.
///
/// None of these is an error: a truncated frame ends the stream exactly
/// like a clean close and is never surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamEnd {
    /// No bytes at all where a length prefix would start.
    Closed,
    /// Input ended inside the 4-byte length prefix.
    TruncatedPrefix { received: usize },
    /// Input ended inside a payload.
    TruncatedPayload { declared: u32, received: usize },
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    Frame(Frame),
    End(StreamEnd),
}

/// Splits a byte stream into frames, one blocking read at a time.
///
/// Holds no data beyond the frame currently being read. I/O errors other
/// than end-of-input are returned as-is.
pub struct FrameReader<R> {
    inner: R,
    frames_read: u64,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            frames_read: 0,
        }
    }

    /// Number of frames fully read so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    pub fn read_frame(&mut self) -> io::Result<ReadOutcome> {
        let mut prefix = [0u8; LENGTH_PREFIX_BYTES];
        let received = self.read_prefix(&mut prefix)?;
        if received == 0 {
            return Ok(ReadOutcome::End(StreamEnd::Closed));
        }
        if received < LENGTH_PREFIX_BYTES {
            return Ok(ReadOutcome::End(StreamEnd::TruncatedPrefix { received }));
        }

        let declared = u32::from_be_bytes(prefix);
        let expected = declared as usize;
        let mut payload = Vec::with_capacity(expected.min(MAX_PREALLOCATION));
        (&mut self.inner)
            .take(declared as u64)
            .read_to_end(&mut payload)?;

        if payload.len() < expected {
            return Ok(ReadOutcome::End(StreamEnd::TruncatedPayload {
                declared,
                received: payload.len(),
            }));
        }

        let frame = Frame::new(self.frames_read, payload);
        self.frames_read += 1;
        Ok(ReadOutcome::Frame(frame))
    }

    fn read_prefix(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}
