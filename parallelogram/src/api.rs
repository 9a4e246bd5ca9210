use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use parallelogram_core::{executors, Error, FnToken, Operation, Result};
use serde_json::Value;

use crate::dispatcher::{DispatchOutcome, Dispatcher};

/// `p_map(fn, data, port, timeout) -> sequence`, `fn(element, index) -> element'`.
///
/// Discovers workers, ships chunks in parallel, and reassembles the result
/// in original order; falls back to local execution with zero reachable
/// workers (§6, §7).
pub async fn p_map(
    dispatcher: &Dispatcher,
    fn_token: FnToken,
    data: Vec<Value>,
    port: u16,
    timeout: Duration,
) -> Result<Vec<Value>> {
    let outcome = dispatcher
        .dispatch(Operation::Map, &fn_token, data, port, timeout)
        .await?;
    Ok(flatten_outcome(outcome))
}

/// `p_filter(fn, data, port, timeout) -> sequence`, `fn(element, index) -> bool`.
pub async fn p_filter(
    dispatcher: &Dispatcher,
    fn_token: FnToken,
    data: Vec<Value>,
    port: u16,
    timeout: Duration,
) -> Result<Vec<Value>> {
    let outcome = dispatcher
        .dispatch(Operation::Filter, &fn_token, data, port, timeout)
        .await?;
    Ok(flatten_outcome(outcome))
}

/// `p_reduce(fn, data, port, timeout) -> value`, `fn(acc, elt) -> acc`.
///
/// Requires `|data| >= 1` (fatal `EmptyInput` otherwise) and that `fn` be
/// associative; left-to-right chunk order is preserved through every round
/// so a merely-associative (non-commutative) `fn` still produces the
/// single left-fold order the sequential reference would (§4.9, §9).
pub async fn p_reduce(
    dispatcher: &Dispatcher,
    fn_token: FnToken,
    data: Vec<Value>,
    port: u16,
    timeout: Duration,
) -> Result<Value> {
    if data.is_empty() {
        return Err(Error::EmptyInput);
    }
    reduce_round(dispatcher, fn_token, data, port, timeout).await
}

fn flatten_outcome(outcome: DispatchOutcome) -> Vec<Value> {
    match outcome {
        DispatchOutcome::Local(v) => v,
        DispatchOutcome::Remote(chunks) => executors::flatten(chunks),
    }
}

/// Recursive reduce (§4.9): the dispatcher returns one single-element
/// sequence per chunk; flatten to `R`, finalize locally once `R` fits a
/// single chunk (or the dispatcher already computed the whole answer via
/// local fallback), otherwise recurse with `R` as the next round's input.
/// `async fn` can't recurse directly, so the recursion is boxed manually
/// rather than pulling in an extra crate just for `#[async_recursion]`.
fn reduce_round<'a>(
    dispatcher: &'a Dispatcher,
    fn_token: FnToken,
    data: Vec<Value>,
    port: u16,
    timeout: Duration,
) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>> {
    Box::pin(async move {
        if data.len() == 1 {
            return Ok(data.into_iter().next().expect("length checked above"));
        }

        let outcome = dispatcher
            .dispatch(Operation::Reduce, &fn_token, data, port, timeout)
            .await?;

        let residual = match outcome {
            // Local fallback already ran the whole fold; §4.9's recursion
            // only applies to the chunked remote path.
            DispatchOutcome::Local(v) => {
                return Ok(v.into_iter().next().expect("local_reduce returns one value"));
            }
            DispatchOutcome::Remote(chunks) => executors::flatten(chunks),
        };

        if residual.len() == 1 {
            return Ok(residual.into_iter().next().expect("length checked above"));
        }

        if residual.len() <= dispatcher.config().chunk_size {
            let finalized = dispatcher
                .registry()
                .apply_local(Operation::Reduce, &fn_token, residual)?;
            return Ok(finalized.into_iter().next().expect("local_reduce returns one value"));
        }

        reduce_round(dispatcher, fn_token, residual, port, timeout).await
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use parallelogram_core::{EngineConfig, HandlerRegistry};
    use serde_json::json;
    use std::sync::Arc;

    fn sum_registry() -> HandlerRegistry {
        let mut r = HandlerRegistry::new();
        r.register_reduce("sum", |_args, a, b| {
            json!(a.as_i64().unwrap() + b.as_i64().unwrap())
        });
        r.register_map("increment", |_args, e, i| json!(e.as_i64().unwrap() + i as i64));
        r.register_filter("is_even", |_args, e, _i| e.as_i64().unwrap() % 2 == 0);
        r
    }

    fn local_dispatcher() -> Dispatcher {
        // No multicast peers will ever answer on this group in a unit test
        // sandbox, so every call below exercises the local-fallback path.
        let config = EngineConfig::new()
            .with_multicast_group([239, 5, 5, 5], 0)
            .with_discovery_window(Duration::from_millis(20));
        Dispatcher::with_config(Arc::new(sum_registry()), config)
    }

    #[tokio::test]
    async fn map_falls_back_to_local_execution_with_no_workers() {
        let dispatcher = local_dispatcher();
        let data = vec![json!(1), json!(2), json!(3)];
        let out = p_map(&dispatcher, FnToken::new("increment"), data, 18000, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(out, vec![json!(1), json!(3), json!(5)]);
    }

    #[tokio::test]
    async fn filter_falls_back_to_local_execution_with_no_workers() {
        let dispatcher = local_dispatcher();
        let data = vec![json!(1), json!(2), json!(3), json!(4)];
        let out = p_filter(&dispatcher, FnToken::new("is_even"), data, 18001, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(out, vec![json!(2), json!(4)]);
    }

    #[tokio::test]
    async fn reduce_falls_back_to_local_execution_with_no_workers() {
        let dispatcher = local_dispatcher();
        let data: Vec<Value> = (1..=6).map(Value::from).collect();
        let out = p_reduce(&dispatcher, FnToken::new("sum"), data, 18002, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(out, json!(21));
    }

    #[tokio::test]
    async fn reduce_rejects_empty_input() {
        let dispatcher = local_dispatcher();
        let err = p_reduce(&dispatcher, FnToken::new("sum"), vec![], 18003, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyInput));
    }
}
