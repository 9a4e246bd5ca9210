use std::net::IpAddr;

use parallelogram_core::{Error, Result, WorkerRecord};

/// Assigns `n` chunks, in index order, to the least-loaded worker: for each
/// chunk it picks the candidate with the minimum `projected_load` (ties
/// broken by position in `workers`, i.e. the first minimum) and bumps that
/// candidate's `projected_load` by one before picking the next chunk's
/// worker. Fails with `NoWorkers` if `workers` is empty.
///
/// Grounded in `helpers.py::get_chunk_assignments`, minus its `zip(*...)`
/// unpacking of a list of `(addr, load)` tuples — `WorkerRecord` already
/// carries both fields.
pub fn assign(workers: &mut [WorkerRecord], n: usize) -> Result<Vec<IpAddr>> {
    if workers.is_empty() {
        return Err(Error::NoWorkers);
    }

    let mut assignments = Vec::with_capacity(n);
    for _ in 0..n {
        let (idx, _) = workers
            .iter()
            .enumerate()
            .min_by_key(|(_, w)| w.projected_load)
            .expect("workers is non-empty");
        assignments.push(workers[idx].address);
        workers[idx].projected_load += 1;
    }
    Ok(assignments)
}
