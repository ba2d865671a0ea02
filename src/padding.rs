// Block segmentation and padding for messages of arbitrary length.
//
// A message is followed by a terminator byte and zero-filled up to a whole
// number of payloads. Each payload is one byte narrower than a block and is
// prefixed with a sentinel byte, which keeps the block's integer value below
// the modulus.

use crate::error::{Result, RsaError};

pub const SENTINEL: u8 = 0x7f;
pub const TERMINATOR: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaddingCodec {
    block_width: usize,
}

impl PaddingCodec {
    /// # Panics
    ///
    /// Panics if `block_width` is less than two, as a block would have no
    /// room for payload.
    pub fn new(block_width: usize) -> Self {
        assert!(block_width >= 2, "block width must be at least two bytes");
        Self { block_width }
    }

    pub fn block_width(&self) -> usize {
        self.block_width
    }

    pub fn payload_width(&self) -> usize {
        self.block_width - 1
    }

    /// Split `message` into sentinel-prefixed blocks of `block_width` bytes.
    ///
    /// There is always at least one block, and always a terminator: a
    /// message that already fills its last payload gets a whole extra block
    /// of padding.
    pub fn encode(&self, message: &[u8]) -> Vec<Vec<u8>> {
        let payload_width = self.payload_width();
        let n_blocks = message.len() / payload_width + 1;

        let mut padded = Vec::with_capacity(n_blocks * payload_width);
        padded.extend_from_slice(message);
        padded.push(TERMINATOR);
        padded.resize(n_blocks * payload_width, 0);

        padded
            .chunks(payload_width)
            .map(|payload| {
                let mut block = Vec::with_capacity(self.block_width);
                block.push(SENTINEL);
                block.extend_from_slice(payload);
                block
            })
            .collect()
    }

    /// Strip the sentinel from each block and cut the joined payloads at the
    /// last terminator byte.
    pub fn decode<B: AsRef<[u8]>>(&self, blocks: &[B]) -> Result<Vec<u8>> {
        let mut payload = Vec::with_capacity(blocks.len() * self.payload_width());
        for (i, block) in blocks.iter().enumerate() {
            let block = block.as_ref();
            if block.len() != self.block_width {
                return Err(RsaError::MalformedCiphertext(format!(
                    "block {i} is {} bytes, expected {}",
                    block.len(),
                    self.block_width
                )));
            }
            if block[0] != SENTINEL {
                return Err(RsaError::MalformedCiphertext(format!(
                    "block {i} does not start with the sentinel byte"
                )));
            }
            payload.extend_from_slice(&block[1..]);
        }

        let end = payload
            .iter()
            .rposition(|&b| b == TERMINATOR)
            .ok_or_else(|| {
                RsaError::MalformedCiphertext("no terminator byte found".to_string())
            })?;
        payload.truncate(end);
        Ok(payload)
    }
}
