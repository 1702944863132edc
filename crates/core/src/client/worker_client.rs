use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};

use thiserror::Error;

use crate::protocol::frame_writer::write_frame;
use crate::protocol::output_record::{HandRecord, OutputRecord};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("failed to start hand worker: {0}")]
    Spawn(#[source] io::Error),
    #[error("failed to send frame to hand worker: {0}")]
    Send(#[source] io::Error),
    #[error("failed to read hand worker response: {0}")]
    Receive(#[source] io::Error),
    #[error("hand worker closed its output")]
    WorkerExited,
    #[error("malformed hand worker response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Consumer side of the frame protocol.
///
/// Sends one encoded image, then blocks for exactly one JSON line, so at
/// most one frame is ever in flight. Dropping a client that spawned its
/// worker closes the worker's input and waits for it to exit; use
/// [`close`](Self::close) to see the exit status.
pub struct HandWorkerClient<W: Write, R> {
    writer: Option<W>,
    reader: R,
    child: Option<Child>,
    line: String,
}

impl HandWorkerClient<ChildStdin, BufReader<ChildStdout>> {
    /// Start `program` with piped stdin/stdout. Its stderr is inherited so
    /// worker logs reach the parent's terminal.
    pub fn spawn<I, S>(program: impl AsRef<OsStr>, args: I) -> Result<Self, ClientError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(ClientError::Spawn)?;

        let missing = || ClientError::Spawn(io::Error::other("child pipe not captured"));
        let stdin = child.stdin.take().ok_or_else(missing)?;
        let stdout = child.stdout.take().ok_or_else(missing)?;

        Ok(Self {
            writer: Some(stdin),
            reader: BufReader::new(stdout),
            child: Some(child),
            line: String::new(),
        })
    }
}

impl<W: Write, R: BufRead> HandWorkerClient<W, R> {
    pub fn new(writer: W, reader: R) -> Self {
        Self {
            writer: Some(writer),
            reader,
            child: None,
            line: String::new(),
        }
    }

    /// Send one encoded image and wait for its hands.
    pub fn detect(&mut self, payload: &[u8]) -> Result<Vec<HandRecord>, ClientError> {
        let writer = self.writer.as_mut().ok_or(ClientError::WorkerExited)?;
        write_frame(writer, payload).map_err(ClientError::Send)?;
        writer.flush().map_err(ClientError::Send)?;

        self.line.clear();
        let n = self
            .reader
            .read_line(&mut self.line)
            .map_err(ClientError::Receive)?;
        if n == 0 {
            return Err(ClientError::WorkerExited);
        }

        let record: OutputRecord = serde_json::from_str(self.line.trim_end())?;
        Ok(record.hands)
    }

    /// Close the worker's input, which ends its loop cleanly, and wait for
    /// the process if this client started it.
    pub fn close(mut self) -> Result<Option<ExitStatus>, ClientError> {
        self.shutdown().map_err(ClientError::Receive)
    }

    fn shutdown(&mut self) -> io::Result<Option<ExitStatus>> {
        // Dropping the writer closes the worker's stdin.
        self.writer = None;
        match self.child.take() {
            Some(mut child) => child.wait().map(Some),
            None => Ok(None),
        }
    }
}

impl<W: Write, R> Drop for HandWorkerClient<W, R> {
    fn drop(&mut self) {
        self.writer = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.wait() {
                log::warn!("Failed to wait for hand worker: {e}");
            }
        }
    }
}
