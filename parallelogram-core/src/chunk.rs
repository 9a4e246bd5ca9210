use serde_json::Value;

/// A contiguous, order-preserving slice of the caller's input sequence.
/// Immutable once created; `index` is the sole key used to reassemble
/// results and is the position in the original chunking order, not a
/// network identifier.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: u32,
    pub payload: Vec<Value>,
}

/// Splits `data` into `ceil(|data| / sz)` contiguous chunks of size at most
/// `sz`; the last chunk may be shorter. Ordering is preserved.
///
/// Grounded in `helpers.py::_chunk_list`, minus its dead commented-out
/// attempt at removing consumed elements from `data` in place.
pub fn chunk_data(data: Vec<Value>, sz: usize) -> Vec<Chunk> {
    assert!(sz > 0, "chunk size must be positive");
    let mut chunks = Vec::with_capacity(data.len().div_ceil(sz).max(1));
    let mut index = 0u32;
    let mut iter = data.into_iter().peekable();
    while iter.peek().is_some() {
        let payload: Vec<Value> = iter.by_ref().take(sz).collect();
        chunks.push(Chunk { index, payload });
        index += 1;
    }
    chunks
}
