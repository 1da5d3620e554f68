//! Splits a payload into fixed-size fragments.

use bytes::Bytes;

/// Zero-copy iterator over `chunk_size` slices of `data`. The last slice may
/// be shorter; an empty payload yields nothing.
pub fn chunks(data: &Bytes, chunk_size: usize) -> impl Iterator<Item = Bytes> + '_ {
    let chunk_size = chunk_size.max(1);
    (0..data.len())
        .step_by(chunk_size)
        .map(move |start| data.slice(start..(start + chunk_size).min(data.len())))
}

/// Number of fragments [`chunks`] yields for a payload of `len` bytes.
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    len.div_ceil(chunk_size.max(1))
}
