/// One length-prefixed unit of input: the encoded bytes of a still image.
///
/// `sequence` counts fully read frames from zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    sequence: u64,
    payload: Vec<u8>,
}

impl Frame {
    pub fn new(sequence: u64, payload: Vec<u8>) -> Self {
        Self { sequence, payload }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
