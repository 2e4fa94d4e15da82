use super::*;
use crate::server::{
    jobs::registry::JobRegistry,
    pool::manager::WorkerPool,
    relay::{
        bus::{PatternSubscription, ProgressBus},
        store::MemoryResultStore,
    },
};
use futures::stream::{self, StreamExt};
use guessgen_core::{CandidatePool, JobStatus, MAX_VALUE, MIN_VALUE};
use parking_lot::Mutex;

/// Captures every published event in order.
#[derive(Default)]
struct RecordingBus {
    events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressBus for RecordingBus {
    fn publish(&self, _channel: &str, payload: String) -> usize {
        self.events
            .lock()
            .push(serde_json::from_str(&payload).unwrap());
        1
    }

    fn psubscribe(&self, pattern: &str) -> PatternSubscription {
        PatternSubscription::new(pattern, stream::empty().boxed())
    }
}

struct FailingDispatch;

impl ChunkDispatch for FailingDispatch {
    async fn dispatch(&self, task: ChunkTask) -> Result<Vec<Guess>> {
        Err(Error::ChunkPanicked {
            index: task.index,
            reason: "worker crashed".to_string(),
        })
    }
}

struct Harness<D> {
    bus: Arc<RecordingBus>,
    registry: Arc<JobRegistry>,
    store: Arc<MemoryResultStore>,
    orchestrator: JobOrchestrator<D>,
}

fn settings() -> OrchestratorSettings {
    OrchestratorSettings {
        large_batch_threshold: 1000,
        max_blocks: 10,
        max_chunks: 3,
        result_ttl: Duration::from_secs(3600),
        seed: Some(2024),
    }
}

fn harness<D: ChunkDispatch + 'static>(dispatcher: D, settings: OrchestratorSettings) -> Harness<D> {
    let bus = Arc::new(RecordingBus::default());
    let registry = Arc::new(JobRegistry::new(Duration::from_secs(3600)));
    let store = Arc::new(MemoryResultStore::new());
    let publisher = ProgressPublisher::new(bus.clone(), registry.clone());
    let orchestrator =
        JobOrchestrator::new(Arc::new(dispatcher), publisher, store.clone(), settings);
    Harness {
        bus,
        registry,
        store,
        orchestrator,
    }
}

impl<D: ChunkDispatch + 'static> Harness<D> {
    /// Runs a job the way the executor would and returns its outcome.
    async fn run(&self, pool: CandidatePool, count: i64) -> (JobId, Result<JobResult>) {
        let request = GenerationRequest::new(pool, count, 10_000).unwrap();
        let id = JobId::new();
        self.registry.insert(id, request.requested);

        let requested = request.requested;
        let outcome = self.orchestrator.run(id, request).await;
        match &outcome {
            Ok(result) => self
                .orchestrator
                .on_success(id, requested, result.clone())
                .unwrap(),
            Err(e) => self.orchestrator.on_failure(id, e),
        }
        (id, outcome)
    }

    fn events(&self) -> Vec<ProgressEvent> {
        self.bus.events.lock().clone()
    }
}

fn assert_unique_within(guesses: &[Guess], lo: u8, hi: u8) {
    let unique: HashSet<_> = guesses.iter().collect();
    assert_eq!(unique.len(), guesses.len(), "duplicate guesses");
    for guess in guesses {
        assert!(guess.iter().all(|v| (lo..=hi).contains(&v)), "{guess}");
        assert!(guess.values().windows(2).all(|w| w[0] < w[1]));
    }
}

fn assert_progress_non_decreasing(events: &[ProgressEvent]) {
    assert!(
        events.windows(2).all(|w| w[0].progress <= w[1].progress),
        "progress went backwards: {:?}",
        events.iter().map(|e| e.progress).collect::<Vec<_>>()
    );
}

#[test]
fn block_count_is_at_least_one() {
    assert_eq!(block_count(0, 10), 1);
    assert_eq!(block_count(60, 10), 1);
    assert_eq!(block_count(250, 10), 2);
    assert_eq!(block_count(1050, 10), 10);
    assert_eq!(block_count(10_000, 10), 10);
    assert_eq!(block_count(5000, 3), 3);
    assert_eq!(block_count(5000, 0), 1);
}

#[test]
fn block_progress_spans_ten_to_ninety_five() {
    assert_eq!(block_progress(0, 10), 10);
    assert_eq!(block_progress(1, 10), 18);
    assert_eq!(block_progress(5, 10), 52);
    assert_eq!(block_progress(10, 10), 95);
    assert_eq!(block_progress(1, 1), 95);
    assert!((1..=7).map(|d| block_progress(d, 7)).is_sorted());
}

#[tokio::test]
async fn small_pool_job_completes() {
    let h = harness(WorkerPool::spawn(2, 1), settings());
    let (id, outcome) = h.run(CandidatePool::new(1..=8).unwrap(), 5).await;

    let result = outcome.unwrap();
    assert_eq!(result.total, 5);
    assert_unique_within(&result.guesses, 1, 8);

    let events = h.events();
    let statuses: Vec<_> = events.iter().map(|e| e.status).collect();
    assert_eq!(
        statuses,
        vec![
            JobStatus::Started,
            JobStatus::Processing,
            JobStatus::Processing,
            JobStatus::Completed
        ]
    );
    assert_eq!(events[0].progress, 0);
    assert_eq!(events[0].total, Some(5));
    assert_eq!(events[1].progress, POOL_READY_PROGRESS);
    assert_eq!(
        events[1].message.as_deref(),
        Some("Found 8 unique candidates")
    );
    assert_eq!(events[2].progress, SINGLE_PASS_PROGRESS);
    assert_eq!(events[3].progress, 100);
    assert_eq!(events[3].current, Some(5));
    assert!(events[3].result.is_none());

    assert_eq!(h.store.get(id), Some(result));
    assert_eq!(h.registry.get(id).unwrap().status, JobStatus::Completed);
}

#[tokio::test]
async fn empty_pool_is_padded() {
    let h = harness(WorkerPool::spawn(2, 1), settings());
    let (_, outcome) = h.run(CandidatePool::default(), 3).await;

    let result = outcome.unwrap();
    // Six padded values form exactly one guess.
    assert_eq!(result.total, 1);
    assert_unique_within(&result.guesses, MIN_VALUE, MAX_VALUE);
    assert_eq!(
        h.events()[1].message.as_deref(),
        Some("Found 0 unique candidates")
    );
}

#[tokio::test]
async fn large_job_reports_blocks_and_fills_the_count() {
    let h = harness(WorkerPool::spawn(3, 1), settings());
    let pool = CandidatePool::new(MIN_VALUE..=MAX_VALUE).unwrap();
    let (id, outcome) = h.run(pool, 5000).await;

    let result = outcome.unwrap();
    assert_eq!(result.total, 5000);
    assert_unique_within(&result.guesses, MIN_VALUE, MAX_VALUE);

    let events = h.events();
    assert_progress_non_decreasing(&events);
    assert_eq!(events.first().map(|e| e.progress), Some(0));
    assert_eq!(events.last().map(|e| e.progress), Some(100));

    let blocks: Vec<_> = events
        .iter()
        .filter(|e| e.message.as_deref().is_some_and(|m| m.starts_with("Block")))
        .collect();
    assert_eq!(blocks.len(), 10);
    assert_eq!(blocks[9].progress, BLOCKS_DONE_PROGRESS);
    assert_eq!(blocks[9].current, Some(result.total));
    assert_eq!(blocks[9].total, Some(5000));

    assert_eq!(h.store.get(id), Some(result));
}

#[tokio::test]
async fn last_block_makes_up_duplicates() {
    // C(20, 6) = 38 760, so chunks and blocks collide often.
    for seed in 0..5 {
        let h = harness(
            WorkerPool::spawn(3, 1),
            OrchestratorSettings {
                seed: Some(seed),
                ..settings()
            },
        );
        let (_, outcome) = h.run(CandidatePool::new(1..=20).unwrap(), 5000).await;

        let result = outcome.unwrap();
        assert_eq!(result.total, 5000, "seed {seed}");
        assert_unique_within(&result.guesses, 1, 20);
    }
}

#[tokio::test]
async fn large_job_stops_when_pool_is_exhausted() {
    let h = harness(WorkerPool::spawn(3, 1), settings());
    // C(8, 6) = 28
    let (_, outcome) = h.run(CandidatePool::new(1..=8).unwrap(), 2000).await;

    let result = outcome.unwrap();
    assert_eq!(result.total, 28);
    assert_unique_within(&result.guesses, 1, 8);

    let blocks = h
        .events()
        .iter()
        .filter(|e| e.message.as_deref().is_some_and(|m| m.starts_with("Block")))
        .count();
    assert_eq!(blocks, 10);
}

#[tokio::test]
async fn fixed_seed_is_reproducible() {
    let pool = CandidatePool::new(1..=20).unwrap();

    let a = harness(WorkerPool::spawn(2, 1), settings());
    let b = harness(WorkerPool::spawn(2, 1), settings());
    let (_, ra) = a.run(pool.clone(), 40).await;
    let (_, rb) = b.run(pool, 40).await;

    assert_eq!(ra.unwrap(), rb.unwrap());
}

#[tokio::test]
async fn exhausted_pool_returns_short_result() {
    let h = harness(WorkerPool::spawn(2, 1), settings());
    let (_, outcome) = h.run(CandidatePool::new(1..=7).unwrap(), 50).await;
    assert_eq!(outcome.unwrap().total, 7);
}

#[tokio::test]
async fn chunk_failure_everywhere_fails_the_job() {
    let h = harness(FailingDispatch, settings());
    let pool = CandidatePool::new(MIN_VALUE..=MAX_VALUE).unwrap();
    let (id, outcome) = h.run(pool, 2000).await;

    assert!(matches!(outcome, Err(Error::AllChunksFailed { chunks: 3, .. })));
    assert!(h.store.get(id).is_none());

    let last = h.events().pop().unwrap();
    assert_eq!(last.status, JobStatus::Failed);
    assert!(last.error.unwrap().contains("worker crashed"));
    assert_eq!(h.registry.get(id).unwrap().status, JobStatus::Failed);
}
