use std::io::{self, Write};

/// Write one frame: the payload length as a big-endian `u32`, then the
/// payload. Does not flush.
pub fn write_frame<W: Write + ?Sized>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let length = u32::try_from(payload.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("payload of {} bytes exceeds the u32 length prefix", payload.len()),
        )
    })?;
    writer.write_all(&length.to_be_bytes())?;
    writer.write_all(payload)
}
