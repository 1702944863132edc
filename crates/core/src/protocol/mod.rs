//! Length-prefixed frame input and JSON-lines output.
//!
//! Input: `u32` big-endian payload length followed by exactly that many
//! bytes of encoded image. Output: one JSON object per frame, newline
//! terminated, flushed as soon as it is written.

pub mod frame;
pub mod frame_reader;
pub mod frame_writer;
pub mod output_record;
pub mod record_writer;
