use crate::errors::PipelineError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;

pub fn normalize_parallelism(value: Option<usize>) -> usize {
    value.unwrap_or(1).max(1)
}

enum WorkerMessage<R> {
    Done { index: usize, value: R },
    Fatal(PipelineError),
}

/// Runs `task` over `items` on at most `parallelism` scoped threads and
/// returns the results in input order.
///
/// After the first failure no new items are handed out; items already running
/// finish and their results are dropped. The first failure received wins.
pub fn run_bounded<T, R, F>(
    items: &[T],
    parallelism: usize,
    task: F,
) -> Result<Vec<R>, PipelineError>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> Result<R, PipelineError> + Sync,
{
    let worker_count = parallelism.max(1).min(items.len());
    if worker_count <= 1 {
        return items
            .iter()
            .enumerate()
            .map(|(index, item)| task(index, item))
            .collect();
    }

    let next_index = AtomicUsize::new(0);
    let cancelled = AtomicBool::new(false);
    let (tx, rx) = mpsc::channel::<WorkerMessage<R>>();

    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            let tx = tx.clone();
            let next_index_ref = &next_index;
            let cancelled_ref = &cancelled;
            let task_ref = &task;
            scope.spawn(move || loop {
                if cancelled_ref.load(Ordering::Relaxed) {
                    break;
                }
                let index = next_index_ref.fetch_add(1, Ordering::Relaxed);
                if index >= items.len() {
                    break;
                }
                match task_ref(index, &items[index]) {
                    Ok(value) => {
                        if tx.send(WorkerMessage::Done { index, value }).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        cancelled_ref.store(true, Ordering::Relaxed);
                        let _ = tx.send(WorkerMessage::Fatal(err));
                        break;
                    }
                }
            });
        }

        drop(tx);

        let mut results: Vec<(usize, R)> = Vec::with_capacity(items.len());
        let mut fatal_error: Option<PipelineError> = None;
        while let Ok(message) = rx.recv() {
            match message {
                WorkerMessage::Done { index, value } => {
                    if fatal_error.is_none() {
                        results.push((index, value));
                    }
                }
                WorkerMessage::Fatal(err) => {
                    if fatal_error.is_none() {
                        fatal_error = Some(err);
                    }
                }
            }
        }

        if let Some(err) = fatal_error {
            return Err(err);
        }
        if results.len() != items.len() {
            return Err(PipelineError::Invariant(format!(
                "worker pool expected {} results, got {}",
                items.len(),
                results.len()
            )));
        }
        results.sort_by_key(|(index, _)| *index);
        Ok(results.into_iter().map(|(_, value)| value).collect())
    })
}
