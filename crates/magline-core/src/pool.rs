//! Fixed-size task pool with a join barrier and first-failure cancellation.
//!
//! Tasks are independent; each gets a shared cancel flag that is raised as soon
//! as any task fails. Long-running tasks are expected to poll it and bail out.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Tasks claimed by index through one shared cursor; each is handed out once.
struct TaskQueue<T> {
    tasks: Vec<T>,
    cursor: AtomicUsize,
}

impl<T> TaskQueue<T> {
    fn claim(&self) -> Option<(usize, &T)> {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.tasks.get(idx).map(|task| (idx, task))
    }
}

/// Default worker count: at most two, never more than the machine offers.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(2)
}

/// Run `tasks` on `workers` threads and wait for all of them.
///
/// Results come back in task order. On failure the first error observed wins,
/// the cancel flag is raised for the remaining tasks, and errors reported after
/// it (typically cancellations) are dropped.
pub fn run_tasks<T, R, E, F>(workers: usize, tasks: Vec<T>, run: F) -> Result<Vec<R>, E>
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(&T, &AtomicBool) -> Result<R, E> + Sync,
{
    let total = tasks.len();
    let workers = workers.clamp(1, total.max(1));
    let queue = TaskQueue {
        tasks,
        cursor: AtomicUsize::new(0),
    };
    let cancel = AtomicBool::new(false);
    let results: Mutex<Vec<Option<R>>> = Mutex::new((0..total).map(|_| None).collect());
    let first_error: Mutex<Option<E>> = Mutex::new(None);

    let work = || {
        while let Some((idx, task)) = queue.claim() {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            match run(task, &cancel) {
                Ok(value) => {
                    results.lock().expect("worker thread panicked")[idx] = Some(value);
                }
                Err(e) => {
                    let mut slot = first_error.lock().expect("worker thread panicked");
                    if slot.is_none() {
                        *slot = Some(e);
                    }
                    cancel.store(true, Ordering::Relaxed);
                }
            }
        }
    };

    if workers == 1 {
        work();
    } else {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("magline-worker-{i}"))
            .build()
        {
            Ok(pool) => pool.install(|| {
                rayon::scope(|s| {
                    for _ in 0..workers {
                        s.spawn(|_| work());
                    }
                })
            }),
            Err(e) => {
                log::warn!("Failed to create thread pool ({e}), running tasks sequentially");
                work();
            }
        }
    }

    if let Some(e) = first_error.into_inner().expect("worker thread panicked") {
        return Err(e);
    }
    Ok(results
        .into_inner()
        .expect("worker thread panicked")
        .into_iter()
        .flatten()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn results_in_task_order() {
        let out: Result<Vec<u32>, ()> = run_tasks(2, vec![3u32, 1, 2], |t, _| {
            std::thread::sleep(Duration::from_millis(u64::from(*t) * 5));
            Ok(t * 10)
        });
        assert_eq!(out.unwrap(), vec![30, 10, 20]);
    }

    #[test]
    fn single_worker_matches_parallel() {
        let tasks = vec![5u64, 7, 11, 13];
        let seq: Result<Vec<u64>, ()> = run_tasks(1, tasks.clone(), |t, _| Ok(t * t));
        let par: Result<Vec<u64>, ()> = run_tasks(4, tasks, |t, _| Ok(t * t));
        assert_eq!(seq.unwrap(), par.unwrap());
    }

    #[test]
    fn empty_task_list() {
        let out: Result<Vec<()>, ()> = run_tasks(2, Vec::<u8>::new(), |_, _| Ok(()));
        assert!(out.unwrap().is_empty());
    }

    #[test]
    fn first_failure_cancels_sibling() {
        let start = Instant::now();
        let out: Result<Vec<()>, String> = run_tasks(2, vec!["fail", "slow"], |t, cancel| {
            if *t == "fail" {
                std::thread::sleep(Duration::from_millis(20));
                return Err("boom".to_string());
            }
            // Would run for 10s unless cancelled
            for _ in 0..1000 {
                if cancel.load(Ordering::Relaxed) {
                    return Err("cancelled".to_string());
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            Ok(())
        });
        assert_eq!(out.unwrap_err(), "boom");
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn sequential_failure_skips_remaining() {
        let ran = Mutex::new(Vec::new());
        let out: Result<Vec<()>, &str> = run_tasks(1, vec![1, 2, 3], |t, _| {
            ran.lock().unwrap().push(*t);
            if *t == 1 { Err("first") } else { Ok(()) }
        });
        assert_eq!(out.unwrap_err(), "first");
        assert_eq!(*ran.lock().unwrap(), vec![1]);
    }

    #[test]
    fn queue_hands_out_each_task_once() {
        let queue = TaskQueue {
            tasks: vec!["a", "b"],
            cursor: AtomicUsize::new(0),
        };
        assert_eq!(queue.claim(), Some((0, &"a")));
        assert_eq!(queue.claim(), Some((1, &"b")));
        assert_eq!(queue.claim(), None);
        assert_eq!(queue.claim(), None);
    }

    #[test]
    fn default_workers_bounded() {
        let n = default_workers();
        assert!((1..=2).contains(&n));
    }
}
