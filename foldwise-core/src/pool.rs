//! Fixed-size pool of scoped worker threads for independent tasks.

use std::sync::mpsc;

/// Worker count used when none is configured.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Run `work` over every task and return the results in task order.
///
/// Tasks are dealt round-robin into one owned queue per worker, so workers
/// share nothing mutable; each result travels back over a channel tagged with
/// its task index. With one worker (or one task) everything runs inline.
pub(crate) fn run_indexed<T, R, F>(tasks: Vec<T>, workers: usize, work: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let n_tasks = tasks.len();
    let workers = workers.clamp(1, n_tasks.max(1));
    if workers == 1 {
        return tasks.into_iter().map(work).collect();
    }

    let mut queues: Vec<Vec<(usize, T)>> = (0..workers).map(|_| Vec::new()).collect();
    for (index, task) in tasks.into_iter().enumerate() {
        queues[index % workers].push((index, task));
    }

    let (tx, rx) = mpsc::channel();
    let work = &work;
    std::thread::scope(|scope| {
        for queue in queues {
            let tx = tx.clone();
            scope.spawn(move || {
                for (index, task) in queue {
                    if tx.send((index, work(task))).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(tx);

    let mut slots: Vec<Option<R>> = (0..n_tasks).map(|_| None).collect();
    for (index, result) in rx {
        slots[index] = Some(result);
    }
    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_keep_task_order() {
        let tasks: Vec<u64> = (0..50).collect();
        let results = run_indexed(tasks, 4, |t| {
            // uneven work so completion order differs from task order
            std::thread::sleep(std::time::Duration::from_micros((50 - t) * 20));
            t * t
        });
        assert_eq!(results, (0..50u64).map(|t| t * t).collect::<Vec<_>>());
    }

    #[test]
    fn test_inline_and_empty() {
        assert_eq!(run_indexed(vec![1, 2, 3], 1, |t| t + 1), vec![2, 3, 4]);
        assert!(run_indexed(Vec::<u8>::new(), 8, |t| t).is_empty());
        assert_eq!(run_indexed(vec![5], 0, |t| t), vec![5]);
    }

    #[test]
    fn test_default_workers_is_positive() {
        assert!(default_workers() >= 1);
    }
}
