use serde_json::Value;

use crate::error::{Error, Result};

/// `local_map(fn, chunk) -> chunk'` of the same length; element `i` is
/// `fn(chunk[i], i)`. Grounded in `helpers.py::_single_map`.
pub fn local_map(f: impl Fn(&Value, usize) -> Value, chunk: &[Value]) -> Vec<Value> {
    chunk.iter().enumerate().map(|(i, e)| f(e, i)).collect()
}

/// `local_filter(fn, chunk) -> subsequence` preserving order of elements for
/// which `fn(e, i)` holds; indices are positions within the chunk.
///
/// The original (`helpers.py::_single_filter`) pops while iterating forward
/// in reverse-index order, which happens to work there only because it
/// walks the index list backwards; §9 point 2 flags the forward variant of
/// that pattern as a known off-by-one trap. This builds the subsequence
/// directly instead of mutating in place index-by-index.
pub fn local_filter(f: impl Fn(&Value, usize) -> bool, chunk: &[Value]) -> Vec<Value> {
    chunk
        .iter()
        .enumerate()
        .filter(|(i, e)| f(e, *i))
        .map(|(_, e)| e.clone())
        .collect()
}

/// `local_reduce(fn, chunk) -> value`, a left fold:
/// `fn(...fn(fn(c0, c1), c2)..., cn-1)`. Fails with `EmptyInput` on an empty
/// chunk. Grounded in `helpers.py::_single_reduce`, without its in-place
/// `pop(1)` shuffling.
pub fn local_reduce(f: impl Fn(&Value, &Value) -> Value, chunk: &[Value]) -> Result<Value> {
    let mut iter = chunk.iter();
    let first = iter.next().ok_or(Error::EmptyInput)?;
    Ok(iter.fold(first.clone(), |acc, elt| f(&acc, elt)))
}

/// Flattens per-chunk result sequences into one sequence, preserving the
/// relative order of chunks and of elements within each chunk. Used
/// identically by map, filter, and the recursive reduce's "otherwise
/// flatten to R" step. Grounded in `helpers.py::flatten`.
pub fn flatten(chunks: Vec<Vec<Value>>) -> Vec<Value> {
    chunks.into_iter().flatten().collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn map_applies_element_and_index() {
        let chunk = vec![json!(1), json!(2), json!(3)];
        let out = local_map(
            |e, i| json!(e.as_i64().unwrap() + i as i64),
            &chunk,
        );
        assert_eq!(out, vec![json!(1), json!(3), json!(5)]);
    }

    #[test]
    fn filter_preserves_order() {
        let chunk = vec![json!(1), json!(2), json!(3), json!(4)];
        let out = local_filter(|e, _| e.as_i64().unwrap() % 2 == 0, &chunk);
        assert_eq!(out, vec![json!(2), json!(4)]);
    }

    #[test]
    fn reduce_folds_left_to_right() {
        let chunk = vec![json!(1), json!(2), json!(3), json!(4)];
        let out = local_reduce(
            |a, b| json!(a.as_i64().unwrap() + b.as_i64().unwrap()),
            &chunk,
        )
        .unwrap();
        assert_eq!(out, json!(10));
    }

    #[test]
    fn reduce_on_empty_chunk_fails() {
        let err = local_reduce(|a, _b| a.clone(), &[]).unwrap_err();
        assert!(matches!(err, Error::EmptyInput));
    }

    #[test]
    fn flatten_preserves_chunk_and_element_order() {
        let chunks = vec![vec![json!(1), json!(2)], vec![json!(3)], vec![]];
        assert_eq!(flatten(chunks), vec![json!(1), json!(2), json!(3)]);
    }
}
