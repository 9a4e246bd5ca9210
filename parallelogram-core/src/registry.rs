use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::envelope::{FnToken, Operation};
use crate::error::{Error, Result};
use crate::executors;

/// `fn(bound_args, element, index) -> element'`, registered under
/// [`HandlerRegistry::register_map`].
pub type MapHandler = dyn Fn(&Value, &Value, usize) -> Value + Send + Sync;
/// `fn(bound_args, element, index) -> bool`, registered under
/// [`HandlerRegistry::register_filter`].
pub type FilterHandler = dyn Fn(&Value, &Value, usize) -> bool + Send + Sync;
/// `fn(bound_args, acc, element) -> acc`, registered under
/// [`HandlerRegistry::register_reduce`].
pub type ReduceHandler = dyn Fn(&Value, &Value, &Value) -> Value + Send + Sync;

/// Maps a handler name to the boxed closure a worker (or the client's own
/// local fallback / recursive-reduce finalization) should execute for it.
///
/// Per SPEC_FULL §10.5, this stands in for shipping arbitrary closures over
/// the wire: the same name must be registered, with a handler of the
/// matching operation kind, on every worker and on the dispatching client
/// before a job naming it is sent. A name registered under the wrong
/// operation kind (or not registered at all) produces `UnknownOp`, the same
/// as a name nobody ever registered.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    map: HashMap<String, Arc<MapHandler>>,
    filter: HashMap<String, Arc<FilterHandler>>,
    reduce: HashMap<String, Arc<ReduceHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_map(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&Value, &Value, usize) -> Value + Send + Sync + 'static,
    ) {
        self.map.insert(name.into(), Arc::new(f));
    }

    pub fn register_filter(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&Value, &Value, usize) -> bool + Send + Sync + 'static,
    ) {
        self.filter.insert(name.into(), Arc::new(f));
    }

    pub fn register_reduce(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&Value, &Value, &Value) -> Value + Send + Sync + 'static,
    ) {
        self.reduce.insert(name.into(), Arc::new(f));
    }

    /// The engine's black-box `apply_local(op, fn, chunk)` contract (§4.2),
    /// resolving `fn_token.name` against the registry for `op`'s kind.
    pub fn apply_local(&self, op: Operation, token: &FnToken, chunk: Vec<Value>) -> Result<Vec<Value>> {
        match op {
            Operation::Map => {
                let handler = self
                    .map
                    .get(&token.name)
                    .ok_or_else(|| Error::UnknownOp(token.name.clone()))?;
                Ok(executors::local_map(
                    |e, i| handler(&token.bound_args, e, i),
                    &chunk,
                ))
            }
            Operation::Filter => {
                let handler = self
                    .filter
                    .get(&token.name)
                    .ok_or_else(|| Error::UnknownOp(token.name.clone()))?;
                Ok(executors::local_filter(
                    |e, i| handler(&token.bound_args, e, i),
                    &chunk,
                ))
            }
            Operation::Reduce => {
                let handler = self
                    .reduce
                    .get(&token.name)
                    .ok_or_else(|| Error::UnknownOp(token.name.clone()))?;
                let result =
                    executors::local_reduce(|a, b| handler(&token.bound_args, a, b), &chunk)?;
                Ok(vec![result])
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn registry() -> HandlerRegistry {
        let mut r = HandlerRegistry::new();
        r.register_map("increment", |_args, e, i| {
            json!(e.as_i64().unwrap() + i as i64)
        });
        r.register_filter("is_even", |_args, e, _i| e.as_i64().unwrap() % 2 == 0);
        r.register_reduce("sum", |_args, a, b| {
            json!(a.as_i64().unwrap() + b.as_i64().unwrap())
        });
        r
    }

    #[test]
    fn applies_registered_map_handler() {
        let r = registry();
        let token = FnToken::new("increment");
        let out = r
            .apply_local(Operation::Map, &token, vec![json!(1), json!(2)])
            .unwrap();
        assert_eq!(out, vec![json!(1), json!(3)]);
    }

    #[test]
    fn applies_registered_reduce_handler_to_single_element_result() {
        let r = registry();
        let token = FnToken::new("sum");
        let out = r
            .apply_local(Operation::Reduce, &token, vec![json!(1), json!(2), json!(3)])
            .unwrap();
        assert_eq!(out, vec![json!(6)]);
    }

    #[test]
    fn unregistered_name_is_unknown_op() {
        let r = registry();
        let token = FnToken::new("does_not_exist");
        let err = r.apply_local(Operation::Map, &token, vec![]).unwrap_err();
        assert!(matches!(err, Error::UnknownOp(name) if name == "does_not_exist"));
    }

    #[test]
    fn name_registered_under_a_different_op_is_unknown_op() {
        let r = registry();
        // "is_even" exists, but only as a filter handler.
        let token = FnToken::new("is_even");
        let err = r.apply_local(Operation::Map, &token, vec![]).unwrap_err();
        assert!(matches!(err, Error::UnknownOp(_)));
    }
}
