//! Bounded speech task pipeline.
//!
//! Producers get at most `enqueue_timeout` of backpressure before a task is
//! dropped; ingestion never waits on rendering. One worker drains the queue
//! in FIFO order and renders strictly sequentially, so two announcements
//! never overlap.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use livecast_core::RenderTask;
use livecast_settings::PipelineSettings;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::renderer::SpeechRenderer;

/// Result of offering a task to the queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The task is queued and will be rendered unless the pipeline stops.
    Accepted,
    /// The queue stayed full for the whole wait, or the pipeline is stopped.
    Dropped,
}

/// Queue entries. `Shutdown` ends the worker loop when dequeued.
#[derive(Debug)]
enum Job {
    Render(RenderTask),
    Shutdown,
}

/// Producer handle. Cheap to clone; every clone feeds the same worker.
#[derive(Clone, Debug)]
pub struct TaskQueue {
    tx: mpsc::Sender<Job>,
    wait: Duration,
    dropped: Arc<AtomicU64>,
}

impl TaskQueue {
    /// Offer `task`, waiting up to the configured bound for space.
    pub async fn enqueue(&self, task: RenderTask) -> EnqueueOutcome {
        match self.tx.send_timeout(Job::Render(task), self.wait).await {
            Ok(()) => EnqueueOutcome::Accepted,
            Err(SendTimeoutError::Timeout(job)) => {
                let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
                if let Job::Render(task) = job {
                    warn!(text = %task.text, "speech queue full, dropping task");
                }
                EnqueueOutcome::Dropped
            }
            Err(SendTimeoutError::Closed(job)) => {
                let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
                if let Job::Render(task) = job {
                    debug!(text = %task.text, "speech pipeline stopped, dropping task");
                }
                EnqueueOutcome::Dropped
            }
        }
    }

    /// Tasks dropped through this queue since it was created.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

fn bounded(capacity: usize, wait: Duration) -> (TaskQueue, mpsc::Receiver<Job>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let queue = TaskQueue {
        tx,
        wait,
        dropped: Arc::new(AtomicU64::new(0)),
    };
    (queue, rx)
}

/// Queue plus its worker task.
pub struct TaskPipeline {
    queue: TaskQueue,
    discard: CancellationToken,
    worker: Option<JoinHandle<()>>,
    shutdown_timeout: Duration,
}

impl TaskPipeline {
    /// Create the queue and spawn its worker.
    pub fn start(renderer: Arc<dyn SpeechRenderer>, settings: &PipelineSettings) -> Self {
        let (queue, rx) = bounded(settings.capacity, settings.enqueue_timeout());
        let discard = CancellationToken::new();
        let worker = tokio::spawn(run_worker(rx, renderer, discard.clone()));
        info!(capacity = settings.capacity, "speech pipeline started");
        Self {
            queue,
            discard,
            worker: Some(worker),
            shutdown_timeout: settings.shutdown_timeout(),
        }
    }

    /// Producer handle for the router.
    pub fn queue(&self) -> TaskQueue {
        self.queue.clone()
    }

    /// Whether `stop` has already run.
    pub fn is_stopped(&self) -> bool {
        self.worker.is_none()
    }

    /// Discard queued tasks, let the current one finish, and join the
    /// worker. Idempotent.
    ///
    /// Bounded by the shutdown timeout: a render still running after that is
    /// aborted, which kills its child processes.
    pub async fn stop(&mut self) {
        let Some(mut worker) = self.worker.take() else {
            return;
        };
        self.discard.cancel();

        let timeout = self.shutdown_timeout;
        let drained = tokio::time::timeout(timeout, async {
            // Space frees up as the worker skips discarded jobs.
            if self.queue.tx.send(Job::Shutdown).await.is_err() {
                debug!("speech worker already gone");
            }
            (&mut worker).await
        })
        .await;

        match drained {
            Ok(Ok(())) => info!("speech pipeline stopped"),
            Ok(Err(e)) => error!(error = %e, "speech worker ended abnormally"),
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "speech worker did not stop in time, aborting");
                worker.abort();
            }
        }
    }
}

impl Drop for TaskPipeline {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.discard.cancel();
            worker.abort();
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<Job>,
    renderer: Arc<dyn SpeechRenderer>,
    discard: CancellationToken,
) {
    while let Some(job) = rx.recv().await {
        match job {
            Job::Shutdown => break,
            Job::Render(task) if discard.is_cancelled() => {
                debug!(text = %task.text, "discarding queued speech task");
            }
            Job::Render(task) => execute(renderer.as_ref(), &task).await,
        }
    }
    debug!("speech worker exited");
}

async fn execute(renderer: &dyn SpeechRenderer, task: &RenderTask) {
    let result = std::panic::AssertUnwindSafe(renderer.render_and_play(task))
        .catch_unwind()
        .await;
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(text = %task.text, error = %e, "speech task failed"),
        Err(panic) => error!(
            text = %task.text,
            panic = %panic_message(panic.as_ref()),
            "speech task panicked"
        ),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
        .to_string()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::sync::Semaphore;
    use tokio::time::Instant;

    use super::*;
    use crate::error::SpeechError;

    /// Records rendered texts. Each render waits for one permit from `gate`
    /// when a gate is set.
    #[derive(Default)]
    struct Recorder {
        played: Mutex<Vec<String>>,
        gate: Option<Arc<Semaphore>>,
    }

    impl Recorder {
        fn gated(gate: Arc<Semaphore>) -> Self {
            Self {
                played: Mutex::new(Vec::new()),
                gate: Some(gate),
            }
        }

        fn played(&self) -> Vec<String> {
            self.played.lock().clone()
        }
    }

    #[async_trait]
    impl SpeechRenderer for Recorder {
        async fn render_and_play(&self, task: &RenderTask) -> Result<(), SpeechError> {
            if let Some(gate) = &self.gate {
                gate.acquire().await.expect("gate closed").forget();
            }
            if task.text == "panic" {
                panic!("renderer exploded");
            }
            self.played.lock().push(task.text.clone());
            if task.text == "fail" {
                return Err(SpeechError::Playback("speaker unplugged".into()));
            }
            Ok(())
        }
    }

    fn settings(capacity: usize) -> PipelineSettings {
        PipelineSettings {
            capacity,
            enqueue_timeout_ms: 1000,
            shutdown_timeout_ms: 5000,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_plus_one_is_dropped_within_wait_bound() {
        let (queue, _rx) = bounded(100, Duration::from_secs(1));
        for i in 0..100 {
            assert_eq!(
                queue.enqueue(RenderTask::new(format!("t{i}"), 0)).await,
                EnqueueOutcome::Accepted
            );
        }

        let start = Instant::now();
        let outcome = queue.enqueue(RenderTask::new("overflow", 0)).await;
        let waited = start.elapsed();

        assert_eq!(outcome, EnqueueOutcome::Dropped);
        assert!(waited >= Duration::from_secs(1));
        assert!(waited < Duration::from_millis(1100));
        assert_eq!(queue.dropped_count(), 1);
    }

    #[tokio::test]
    async fn worker_renders_in_fifo_order() {
        let recorder = Arc::new(Recorder::default());
        let mut pipeline = TaskPipeline::start(recorder.clone(), &settings(10));
        let queue = pipeline.queue();
        for text in ["a", "b", "c"] {
            assert_eq!(queue.enqueue(RenderTask::new(text, 0)).await, EnqueueOutcome::Accepted);
        }

        // Shutdown is queued behind the renders, but stop discards them; so
        // wait for them to be played first.
        for _ in 0..100 {
            if recorder.played().len() == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        pipeline.stop().await;
        assert_eq!(recorder.played(), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn failures_and_panics_do_not_stop_the_worker() {
        let recorder = Arc::new(Recorder::default());
        let mut pipeline = TaskPipeline::start(recorder.clone(), &settings(10));
        let queue = pipeline.queue();
        for text in ["fail", "panic", "after"] {
            let _ = queue.enqueue(RenderTask::new(text, 0)).await;
        }

        for _ in 0..100 {
            if recorder.played().contains(&"after".to_string()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(recorder.played(), ["fail", "after"]);
        pipeline.stop().await;
    }

    #[tokio::test]
    async fn stop_discards_queued_tasks() {
        let gate = Arc::new(Semaphore::new(0));
        let recorder = Arc::new(Recorder::gated(gate.clone()));
        let mut pipeline = TaskPipeline::start(recorder.clone(), &settings(10));
        let queue = pipeline.queue();
        for text in ["current", "stale-1", "stale-2"] {
            let _ = queue.enqueue(RenderTask::new(text, 0)).await;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Release only the render already in progress.
        let stopper = tokio::spawn(async move {
            pipeline.stop().await;
            pipeline
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        gate.add_permits(10);
        let pipeline = stopper.await.unwrap();

        assert!(pipeline.is_stopped());
        assert_eq!(recorder.played(), ["current"]);
        assert_eq!(
            queue.enqueue(RenderTask::new("late", 0)).await,
            EnqueueOutcome::Dropped
        );
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let mut pipeline = TaskPipeline::start(Arc::new(Recorder::default()), &settings(4));
        pipeline.stop().await;
        pipeline.stop().await;
        assert!(pipeline.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_aborts_a_render_that_never_finishes() {
        let gate = Arc::new(Semaphore::new(0));
        let recorder = Arc::new(Recorder::gated(gate));
        let mut pipeline = TaskPipeline::start(recorder.clone(), &PipelineSettings {
            shutdown_timeout_ms: 200,
            ..settings(4)
        });
        let _ = pipeline.queue().enqueue(RenderTask::new("stuck", 0)).await;
        tokio::task::yield_now().await;

        let start = Instant::now();
        pipeline.stop().await;
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(recorder.played().is_empty());
    }
}
