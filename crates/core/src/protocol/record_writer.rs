use std::io::{self, Write};

use serde::Serialize;
use serde_json::ser::Formatter;

use super::output_record::OutputRecord;

/// JSON formatting with `", "` between elements and `": "` after keys, so
/// an empty result reads `{"hands": []}`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

/// Serialize a record as one newline-terminated line.
pub fn to_line(record: &OutputRecord) -> serde_json::Result<Vec<u8>> {
    let mut line = Vec::with_capacity(64);
    let mut serializer = serde_json::Serializer::with_formatter(&mut line, SpacedFormatter);
    record.serialize(&mut serializer)?;
    line.push(b'\n');
    Ok(line)
}

/// Emits one JSON line per record and flushes after every line.
///
/// The line is assembled in memory first so a serialization failure never
/// leaves half a record on the output.
pub struct RecordWriter<W> {
    inner: W,
    records_written: u64,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            records_written: 0,
        }
    }

    pub fn emit(&mut self, record: &OutputRecord) -> io::Result<()> {
        let line = to_line(record)?;
        self.inner.write_all(&line)?;
        self.inner.flush()?;
        self.records_written += 1;
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
