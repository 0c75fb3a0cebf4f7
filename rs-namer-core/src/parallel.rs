use std::sync::mpsc;
use std::thread;

/// Splits `items` into chunks and runs `work` on every chunk in its own
/// scoped thread.
///
/// # Behavior
/// - The number of chunks is `CPU cores * factor` (never more than items).
/// - Each worker sends `(chunk index, result)` over an MPSC channel.
/// - The receiver collects every result and restores chunk order, so the
///   output does not depend on thread scheduling.
///
/// # Notes
/// - Returns an empty vector for an empty input.
/// - Workers borrow `items` and `work`, no cloning of the input is needed.
pub(crate) fn map_chunks<T, R, F>(items: &[T], factor: usize, work: F) -> Vec<R>
where
	T: Sync,
	R: Send,
	F: Fn(&[T]) -> R + Sync,
{
	if items.is_empty() {
		return Vec::new();
	}

	let chunk_size = chunk_size(items.len(), num_cpus::get() * factor.max(1));
	let work = &work;

	let mut results: Vec<(usize, R)> = thread::scope(|scope| {
		let (tx, rx) = mpsc::channel();
		for (index, chunk) in items.chunks(chunk_size).enumerate() {
			let tx = tx.clone();
			scope.spawn(move || {
				// The receiver outlives every worker
				let _ = tx.send((index, work(chunk)));
			});
		}
		drop(tx);
		rx.iter().collect()
	});

	results.sort_by_key(|(index, _)| *index);
	results.into_iter().map(|(_, result)| result).collect()
}

/// Number of items per chunk so that `len` items fill at most `chunks` chunks.
fn chunk_size(len: usize, chunks: usize) -> usize {
	len.div_ceil(chunks.max(1)).max(1)
}
