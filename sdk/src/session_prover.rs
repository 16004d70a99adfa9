use std::sync::Arc;

use crossbeam_channel::{unbounded, Sender};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, instrument, warn};
use zkcemu::Segment;
use zkc_prover::{estimate_witness_bytes, CancellationToken, ProverError, SegmentProver};
use zkc_recursion::{join_succinct_receipts, lift_segment_receipt, RecursionError, SuccinctReceipt};

use crate::{
    reduction_tree::{NodeKind, ReductionTree},
    MemoryBudget, PipelineError, ProverOpts,
};

enum Job {
    /// Prove and lift one segment
    Prove(Segment),
    Join(SuccinctReceipt, SuccinctReceipt),
}

type Completion = (usize, Result<SuccinctReceipt, PipelineError>);

#[derive(Clone, Copy)]
struct JobLimits {
    segment_memory: Option<u64>,
    join_memory: u64,
}

fn run_job(
    job: Job,
    budget: &Arc<MemoryBudget>,
    cancel: &CancellationToken,
    limits: JobLimits,
) -> Result<SuccinctReceipt, PipelineError> {
    if cancel.is_cancelled() {
        return Err(ProverError::Cancelled.into());
    }
    match job {
        Job::Prove(segment) => {
            let index = segment.index;
            let needed = limits.segment_memory.unwrap_or_else(|| estimate_witness_bytes(&segment));
            let permit = budget.acquire(needed, cancel)?;
            debug!("job: proving segment {} with {} bytes reserved", index, permit.bytes());
            let receipt = SegmentProver::new(budget.total(), cancel.clone()).prove(segment)?;
            drop(permit);
            if cancel.is_cancelled() {
                return Err(ProverError::Cancelled.into());
            }
            Ok(lift_segment_receipt(&receipt)?)
        }
        Job::Join(left, right) => {
            let _permit = budget.acquire(limits.join_memory, cancel)?;
            Ok(join_succinct_receipts(&left, &right)?)
        }
    }
}

/// Proves whole sessions on a bounded worker pool.
///
/// Every segment is proven and lifted as its own job. Joins are scheduled as soon as both of
/// their inputs are available, following the plan of a [`ReductionTree`]. Each job reserves its
/// estimated working memory from a shared [`MemoryBudget`] before it starts. The first failing
/// job cancels everything still outstanding in the session.
pub struct SessionProver {
    opts: ProverOpts,
    pool: ThreadPool,
    budget: Arc<MemoryBudget>,
    cancel: CancellationToken,
}

impl SessionProver {
    pub fn new(opts: ProverOpts) -> Result<Self, PipelineError> {
        opts.validate().map_err(|e| PipelineError::Options(e.to_string()))?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(opts.workers)
            .thread_name(|i| format!("zkc-prover-{i}"))
            .build()
            .map_err(|e| PipelineError::WorkerPool(e.to_string()))?;
        let budget = MemoryBudget::new(opts.memory_budget);
        info!("SessionProver: {}", opts);
        Ok(Self { opts, pool, budget, cancel: CancellationToken::new() })
    }

    /// Replaces the token that cancels every session of this prover
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn budget(&self) -> &Arc<MemoryBudget> {
        &self.budget
    }

    pub fn opts(&self) -> &ProverOpts {
        &self.opts
    }

    fn spawn(&self, node: usize, job: Job, tx: &Sender<Completion>, cancel: &CancellationToken) {
        let tx = tx.clone();
        let cancel = cancel.clone();
        let budget = Arc::clone(&self.budget);
        let limits = JobLimits {
            segment_memory: self.opts.segment_memory,
            join_memory: self.opts.join_memory,
        };
        self.pool.spawn(move || {
            let result = run_job(job, &budget, &cancel, limits);
            if tx.send((node, result)).is_err() {
                debug!("job: node {} finished after its session ended", node);
            }
        });
    }

    /// Proves, lifts and joins the segments of one session into a single receipt
    #[instrument(skip_all, fields(segments = segments.len()))]
    pub fn prove_session(&self, segments: Vec<Segment>) -> Result<SuccinctReceipt, PipelineError> {
        if segments.is_empty() {
            return Err(RecursionError::EmptyInput.into());
        }
        let session_cancel = self.cancel.child();
        let mut tree = ReductionTree::new(segments.len(), self.opts.reduction);
        debug!("prove_session: {} joins planned, strategy {}", tree.joins(), self.opts.reduction);
        let (tx, rx) = unbounded::<Completion>();

        let mut outstanding = 0usize;
        for (node, segment) in tree.leaves().zip(segments) {
            self.spawn(node, Job::Prove(segment), &tx, &session_cancel);
            outstanding += 1;
        }

        let mut first_error: Option<PipelineError> = None;
        while outstanding > 0 {
            let (node, result) = rx.recv().map_err(|e| {
                PipelineError::WorkerPool(format!("completion channel closed: {e}"))
            })?;
            outstanding -= 1;

            let receipt = match result {
                Ok(receipt) => receipt,
                Err(e) => {
                    if first_error.is_none() {
                        warn!("prove_session: node {} failed, cancelling the session: {}", node, e);
                        session_cancel.cancel();
                        first_error = Some(e);
                    }
                    continue;
                }
            };
            if first_error.is_some() {
                continue;
            }
            if let NodeKind::Leaf { segment } = tree.kind(node) {
                debug!("prove_session: segment {} lifted", segment);
            }
            if let Some(parent) = tree.complete(node, receipt) {
                match tree.take_children(parent) {
                    Some((left, right)) => {
                        self.spawn(parent, Job::Join(left, right), &tx, &session_cancel);
                        outstanding += 1;
                    }
                    None => {
                        session_cancel.cancel();
                        first_error = Some(PipelineError::WorkerPool(format!(
                            "join node {parent} scheduled twice"
                        )));
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        let receipt = tree.take_root().ok_or_else(|| {
            PipelineError::WorkerPool("session finished without a root receipt".to_string())
        })?;
        info!(
            "prove_session: {} segments, {} cycles, depth {}, exit {}",
            receipt.span.count,
            receipt.span.cycles,
            receipt.recursion_depth,
            receipt.claim.exit.exit_code
        );
        Ok(receipt)
    }
}

/// Proves a session with default options
pub fn prove_session(segments: Vec<Segment>) -> Result<SuccinctReceipt, PipelineError> {
    SessionProver::new(ProverOpts::default())?.prove_session(segments)
}
