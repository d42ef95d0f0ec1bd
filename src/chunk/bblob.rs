//! BBlob chunker: a sliding 64-byte window, split when the low 13 bits of
//! the last two bytes of `H(window)` are zero and the current chunk has
//! reached `CHUNK_GOAL`. Grounded on `write_bblob` in
//! `original_source/bblob.c`.

use std::ops::Range;

use crate::hash::HashAlgo;

const WINDOW: usize = 64;
pub const CHUNK_GOAL: usize = 4096;

/// Splits `data` into chunk byte ranges using the BBlob content-defined
/// chunking rule. Empty input yields an empty range list.
pub fn split_bblob(data: &[u8], algo: HashAlgo) -> Vec<Range<usize>> {
    let mut chunks = Vec::new();
    let mut chunk_start = 0usize;
    let mut window = [0u8; WINDOW];

    for i in 0..data.len() {
        window[i % WINDOW] = data[i];

        if i >= WINDOW - 1 && i - chunk_start + 1 >= CHUNK_GOAL {
            let mut ctx = algo.new_context();
            ctx.update(&window);
            let digest = ctx.finalize();
            let raw = digest.as_bytes();
            let bits = u16::from_be_bytes([raw[raw.len() - 2], raw[raw.len() - 1]]);

            if bits & 0x1fff == 0 {
                chunks.push(chunk_start..i + 1);
                chunk_start = i + 1;
            }
        }
    }

    if chunk_start < data.len() {
        chunks.push(chunk_start..data.len());
    }

    chunks
}
