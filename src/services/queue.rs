//! Bounded, retrying, rate-limited job queues.
//!
//! A queue is a bounded channel plus a runner that executes jobs through
//! a handler with a concurrency cap, a global jobs-per-second ceiling, a
//! per-attempt timeout, and exponential-backoff retries. A job that
//! exhausts its attempts is dropped with an error log; nothing propagates
//! past the worker boundary. Successful jobs leave no residue.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, error, warn};

use crate::error::{AppError, Result};

use super::rate_limiter::RateLimiter;

#[derive(Debug, Clone, Copy)]
pub struct QueueOptions {
    /// Queue name, used in logs
    pub name: &'static str,
    /// Bounded channel capacity; enqueue blocks when full
    pub capacity: usize,
    /// Jobs running at once
    pub concurrency: usize,
    /// Global throughput ceiling
    pub rate_limit_per_sec: u32,
    /// Attempts before the job is dropped
    pub max_attempts: u32,
    /// First retry delay; doubles per attempt, plus jitter
    pub backoff_base: Duration,
    /// Wall-clock budget per attempt
    pub job_timeout: Duration,
}

/// One unit of work with its correlation id.
#[derive(Debug, Clone)]
pub struct Job<T> {
    pub id: String,
    pub payload: T,
}

/// Producer half of a queue.
#[derive(Debug)]
pub struct JobSender<T> {
    name: &'static str,
    tx: mpsc::Sender<Job<T>>,
}

impl<T> Clone for JobSender<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
        }
    }
}

impl<T> JobSender<T> {
    /// Enqueue a job, waiting for capacity if the queue is full.
    pub async fn enqueue(&self, id: String, payload: T) -> Result<()> {
        debug!(queue = self.name, job = %id, "Job enqueued");
        self.tx
            .send(Job { id, payload })
            .await
            .map_err(|_| AppError::QueueClosed)
    }
}

/// Consumer half of a queue. [`run`](Self::run) drives it to completion;
/// it finishes once every sender is gone and in-flight jobs have drained.
#[derive(Debug)]
pub struct JobQueue<T> {
    opts: QueueOptions,
    rx: mpsc::Receiver<Job<T>>,
}

/// Create a connected sender/queue pair.
pub fn channel<T>(opts: QueueOptions) -> (JobSender<T>, JobQueue<T>) {
    let (tx, rx) = mpsc::channel(opts.capacity);
    (
        JobSender {
            name: opts.name,
            tx,
        },
        JobQueue { opts, rx },
    )
}

impl<T: Clone + Send + 'static> JobQueue<T> {
    /// Next job, awaiting until one arrives or all senders are dropped.
    pub async fn recv(&mut self) -> Option<Job<T>> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<Job<T>> {
        self.rx.try_recv().ok()
    }

    /// Consume the queue, executing every job through `handler`.
    pub async fn run<F, Fut>(mut self, handler: F)
    where
        F: Fn(Job<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let opts = self.opts;
        let handler = Arc::new(handler);
        let limiter = Arc::new(RateLimiter::per_second(opts.rate_limit_per_sec));
        let semaphore = Arc::new(Semaphore::new(opts.concurrency));

        while let Some(job) = self.rx.recv().await {
            limiter.acquire().await;
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .expect("queue semaphore closed");
            let handler = handler.clone();

            tokio::spawn(async move {
                let _permit = permit;
                run_job(job, handler, opts).await;
            });
        }

        // All senders gone; wait for in-flight jobs
        let _ = semaphore.acquire_many(opts.concurrency as u32).await;
        debug!(queue = opts.name, "Queue drained");
    }
}

/// Execute one job through its retry schedule.
async fn run_job<T, F, Fut>(job: Job<T>, handler: Arc<F>, opts: QueueOptions)
where
    T: Clone,
    F: Fn(Job<T>) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    for attempt in 1..=opts.max_attempts {
        match timeout(opts.job_timeout, (*handler)(job.clone())).await {
            Ok(Ok(())) => {
                debug!(queue = opts.name, job = %job.id, attempt = attempt, "Job completed");
                return;
            }
            Ok(Err(e)) => {
                warn!(
                    queue = opts.name,
                    job = %job.id,
                    attempt = attempt,
                    error = %e,
                    "Job failed"
                );
            }
            Err(_) => {
                warn!(
                    queue = opts.name,
                    job = %job.id,
                    attempt = attempt,
                    timeout_secs = opts.job_timeout.as_secs(),
                    "Job timed out"
                );
            }
        }

        if attempt < opts.max_attempts {
            let backoff = opts.backoff_base.as_secs_f64() * 2f64.powi(attempt as i32 - 1)
                + rand::random::<f64>() * 0.1;
            sleep(Duration::from_secs_f64(backoff)).await;
        }
    }

    error!(
        queue = opts.name,
        job = %job.id,
        attempts = opts.max_attempts,
        "Job dropped; retries exhausted"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn test_opts() -> QueueOptions {
        QueueOptions {
            name: "test",
            capacity: 64,
            concurrency: 2,
            rate_limit_per_sec: 1_000,
            max_attempts: 3,
            backoff_base: Duration::from_millis(10),
            job_timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn test_jobs_run_to_completion() {
        let (tx, queue) = channel::<u32>(test_opts());
        let counter = Arc::new(AtomicU32::new(0));

        for i in 0..5 {
            tx.enqueue(format!("job-{}", i), i).await.unwrap();
        }
        drop(tx);

        let seen = counter.clone();
        queue
            .run(move |_job| {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_failing_job_retries_then_drops() {
        let (tx, queue) = channel::<()>(test_opts());
        let attempts = Arc::new(AtomicU32::new(0));

        tx.enqueue("doomed".to_string(), ()).await.unwrap();
        drop(tx);

        let seen = attempts.clone();
        queue
            .run(move |_job| {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Err(AppError::Other("boom".to_string()))
                }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_transient_failure_recovers() {
        let (tx, queue) = channel::<()>(test_opts());
        let attempts = Arc::new(AtomicU32::new(0));

        tx.enqueue("flaky".to_string(), ()).await.unwrap();
        drop(tx);

        let seen = attempts.clone();
        queue
            .run(move |_job| {
                let seen = seen.clone();
                async move {
                    if seen.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(AppError::Other("not yet".to_string()))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_hung_job_times_out_and_retries() {
        let (tx, queue) = channel::<()>(test_opts());
        let attempts = Arc::new(AtomicU32::new(0));

        tx.enqueue("hung".to_string(), ()).await.unwrap();
        drop(tx);

        let seen = attempts.clone();
        queue
            .run(move |_job| {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    sleep(Duration::from_secs(5)).await;
                    Ok(())
                }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let opts = QueueOptions {
            concurrency: 2,
            ..test_opts()
        };
        let (tx, queue) = channel::<()>(opts);
        let running = Arc::new(AtomicU32::new(0));
        let peak = Arc::new(AtomicU32::new(0));

        for i in 0..6 {
            tx.enqueue(format!("job-{}", i), ()).await.unwrap();
        }
        drop(tx);

        let running_in = running.clone();
        let peak_in = peak.clone();
        queue
            .run(move |_job| {
                let running = running_in.clone();
                let peak = peak_in.clone();
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
