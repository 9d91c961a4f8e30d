use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded, unbounded};
use isoterra_world::{MesherConfig, StreamingConfig};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::job::{JobHandle, JobResult, MeshJob, process_mesh_job};
use crate::scratch_pool::ScratchPool;

#[derive(Debug)]
pub enum RuntimeError {
    PoolBuild(String),
    /// Every worker has exited; no further results will arrive.
    Disconnected,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::PoolBuild(msg) => write!(f, "building mesh worker pool: {}", msg),
            RuntimeError::Disconnected => write!(f, "mesh workers disconnected"),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Fixed worker pool fed by a bounded job queue. Workers never touch
/// scheduler state; results come back over a channel drained once per tick.
pub struct Runtime {
    job_tx: Sender<MeshJob>,
    res_rx: Receiver<JobResult>,
    _pool: Arc<ThreadPool>,
    queued: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    workers: usize,
    queue_capacity: usize,
}

impl Runtime {
    pub fn new(streaming: &StreamingConfig, mesher: &MesherConfig) -> Result<Self, RuntimeError> {
        let hardware: usize = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8);
        let workers = streaming.worker_count(hardware).max(1);
        let queue_capacity = streaming.queue_capacity.unwrap_or(workers * 2).max(1);
        Self::with_workers(workers, queue_capacity, mesher)
    }

    pub fn with_workers(
        workers: usize,
        queue_capacity: usize,
        mesher: &MesherConfig,
    ) -> Result<Self, RuntimeError> {
        let (job_tx, job_rx) = bounded::<MeshJob>(queue_capacity);
        let (res_tx, res_rx) = unbounded::<JobResult>();
        let scratch_pool = Arc::new(ScratchPool::new(workers, mesher.clone()));
        let queued = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));

        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("isoterra-mesh-{i}"))
                .build()
                .map_err(|e| RuntimeError::PoolBuild(e.to_string()))?,
        );
        for _ in 0..workers {
            let rx = job_rx.clone();
            let tx = res_tx.clone();
            let scratch_pool = scratch_pool.clone();
            let queued = queued.clone();
            let in_flight = in_flight.clone();
            pool.spawn(move || {
                while let Ok(job) = rx.recv() {
                    queued.fetch_sub(1, Ordering::Relaxed);
                    in_flight.fetch_add(1, Ordering::Relaxed);
                    process_mesh_job(job, scratch_pool.as_ref(), &tx);
                    in_flight.fetch_sub(1, Ordering::Relaxed);
                }
            });
        }
        log::info!(
            target: "stream",
            "mesh runtime: {} workers, queue capacity {}",
            workers,
            queue_capacity
        );

        Ok(Self {
            job_tx,
            res_rx,
            _pool: pool,
            queued,
            in_flight,
            workers,
            queue_capacity,
        })
    }

    /// Queues `job` without blocking. `Ok(None)` when the queue is full.
    pub fn submit(&self, job: MeshJob) -> Result<Option<JobHandle>, RuntimeError> {
        let handle = job.handle();
        self.queued.fetch_add(1, Ordering::Relaxed);
        match self.job_tx.try_send(job) {
            Ok(()) => Ok(Some(handle)),
            Err(TrySendError::Full(_)) => {
                self.queued.fetch_sub(1, Ordering::Relaxed);
                Ok(None)
            }
            Err(TrySendError::Disconnected(_)) => {
                self.queued.fetch_sub(1, Ordering::Relaxed);
                Err(RuntimeError::Disconnected)
            }
        }
    }

    /// Every result finished since the last call.
    pub fn drain_results(&self) -> Result<Vec<JobResult>, RuntimeError> {
        let mut out = Vec::new();
        loop {
            match self.res_rx.try_recv() {
                Ok(r) => out.push(r),
                Err(TryRecvError::Empty) => return Ok(out),
                Err(TryRecvError::Disconnected) => {
                    if out.is_empty() {
                        return Err(RuntimeError::Disconnected);
                    }
                    return Ok(out);
                }
            }
        }
    }

    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    #[inline]
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    #[inline]
    pub fn is_queue_full(&self) -> bool {
        self.job_tx.is_full()
    }

    /// (queued, running)
    pub fn queue_debug_counts(&self) -> (usize, usize) {
        (
            self.queued.load(Ordering::Relaxed),
            self.in_flight.load(Ordering::Relaxed),
        )
    }
}
