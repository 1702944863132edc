use std::io::{Read, Write};
use std::time::Instant;

use crate::pipeline::frame_processor::FrameProcessor;
use crate::pipeline::worker_error::WorkerError;
use crate::pipeline::worker_logger::WorkerLogger;
use crate::protocol::frame_reader::{FrameReader, ReadOutcome, StreamEnd};
use crate::protocol::record_writer::RecordWriter;

/// How a completed run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamSummary {
    /// Frames fully read, which always equals records written.
    pub frames: u64,
    pub end: StreamEnd,
}

/// The worker loop. Reads a frame, processes it and emits its record, until
/// the input ends.
///
/// Strictly sequential; frame N+1 is not read before frame N's record has
/// been written and flushed.
pub struct StreamHandsUseCase<R, W> {
    reader: FrameReader<R>,
    processor: FrameProcessor,
    writer: RecordWriter<W>,
    logger: Box<dyn WorkerLogger>,
}

impl<R: Read, W: Write> StreamHandsUseCase<R, W> {
    pub fn new(
        input: R,
        output: W,
        processor: FrameProcessor,
        logger: Box<dyn WorkerLogger>,
    ) -> Self {
        Self {
            reader: FrameReader::new(input),
            processor,
            writer: RecordWriter::new(output),
            logger,
        }
    }

    pub fn execute(&mut self) -> Result<StreamSummary, WorkerError> {
        loop {
            let t0 = Instant::now();
            let outcome = self.reader.read_frame().map_err(WorkerError::Read)?;
            self.logger.timing("read", elapsed_ms(t0));

            let frame = match outcome {
                ReadOutcome::Frame(frame) => frame,
                ReadOutcome::End(end) => {
                    let frames = self.reader.frames_read();
                    debug_assert_eq!(frames, self.writer.records_written());
                    self.logger.info(&describe_end(end, frames));
                    self.logger.summary();
                    return Ok(StreamSummary { frames, end });
                }
            };

            let sequence = frame.sequence();
            let record = self.processor.process(&frame, self.logger.as_mut())?;
            drop(frame);

            let t0 = Instant::now();
            self.writer
                .emit(&record)
                .map_err(|source| WorkerError::Write { sequence, source })?;
            self.logger.timing("emit", elapsed_ms(t0));
            self.logger.frame_done(sequence, record.hands.len());
        }
    }

    /// Give back the output sink, e.g. to inspect what was written.
    pub fn into_output(self) -> W {
        self.writer.into_inner()
    }
}

fn describe_end(end: StreamEnd, frames: u64) -> String {
    match end {
        StreamEnd::Closed => format!("Input closed after {frames} frames"),
        StreamEnd::TruncatedPrefix { received } => format!(
            "Input ended inside a length prefix ({received} of 4 bytes) after {frames} frames"
        ),
        StreamEnd::TruncatedPayload { declared, received } => format!(
            "Input ended inside a payload ({received} of {declared} bytes) after {frames} frames"
        ),
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
