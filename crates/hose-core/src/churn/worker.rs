use super::window::Window;
use crate::{
    cluster::{Cluster, PairClient},
    common::{
        error::Result,
        types::{Connectivity, StepBudget},
    },
    ids::IdStream,
};
use core::{fmt, num::NonZeroUsize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Lifecycle of a [`ChurnWorker`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    /// Cancellation observed or budget reached; the window is being torn
    /// down.
    Draining,
    Done,
}

/// Why a worker stopped taking steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitReason {
    BudgetExhausted,
    Cancelled,
    /// The identifier producer went away.
    StreamClosed,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::BudgetExhausted => write!(f, "step budget exhausted"),
            ExitReason::Cancelled => write!(f, "cancelled"),
            ExitReason::StreamClosed => write!(f, "identifier stream closed"),
        }
    }
}

/// Summary handed back to the coordinator once a worker is done.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    /// Steps that drew an identifier and attempted a create.
    pub steps: u64,
    pub creates_failed: u64,
    /// Failed deletes that were not an ignorable not-found.
    pub deletes_failed: u64,
    /// Pairs that still existed and were deleted during teardown.
    pub cleaned_up: u64,
    pub exit: ExitReason,
}

#[derive(Default)]
struct Tally {
    steps: u64,
    creates_failed: u64,
    deletes_failed: u64,
    cleaned_up: u64,
}

/// Churns Service/Endpoints pairs through a fixed-size rotating [`Window`].
///
/// Every step deletes the pair occupying the current slot, draws a fresh
/// identifier, defensively deletes anything already using that name, creates
/// the new pair and records it in the slot. On exit, whatever is left in the
/// window is deleted exactly once.
///
/// The worker owns its window and client handle outright. The only shared
/// state is the [`IdStream`] and the cancellation token, which is checked
/// once per step before any call is made; calls already in flight always
/// complete.
pub struct ChurnWorker<C> {
    worker_id: usize,
    client: PairClient<C>,
    ids: IdStream,
    shutdown: CancellationToken,
    source: Arc<Connectivity>,
    budget: StepBudget,
    window: Window,
    state: WorkerState,
    exit: Option<ExitReason>,
    tally: Tally,
}

impl<C: Cluster> ChurnWorker<C> {
    pub fn new(
        worker_id: usize,
        cluster: C,
        ids: IdStream,
        shutdown: CancellationToken,
        source: Arc<Connectivity>,
        capacity: NonZeroUsize,
        budget: StepBudget,
    ) -> Self {
        Self {
            worker_id,
            client: PairClient::new(cluster),
            ids,
            shutdown,
            source,
            budget,
            window: Window::new(capacity),
            state: WorkerState::Running,
            exit: None,
            tally: Tally::default(),
        }
    }

    pub const fn state(&self) -> WorkerState {
        self.state
    }

    pub const fn window(&self) -> &Window {
        &self.window
    }

    /// Runs steps until the budget is spent, cancellation is observed or the
    /// identifier stream closes, then tears the window down.
    ///
    /// Leaves the worker in [`WorkerState::Done`] with an empty window. Calling
    /// it again only repeats the report.
    #[tracing::instrument(name = "churn_worker", skip_all, fields(worker_id = self.worker_id))]
    pub async fn run(&mut self) -> WorkerReport {
        if let Some(exit) = self.exit {
            return self.report(exit);
        }

        tracing::debug!(budget = %self.budget, capacity = self.window.capacity(), "Worker started");
        let exit = self.churn().await;
        self.drain(exit).await
    }

    async fn churn(&mut self) -> ExitReason {
        loop {
            if self.budget.is_exhausted(self.tally.steps) {
                return ExitReason::BudgetExhausted;
            }
            if self.shutdown.is_cancelled() {
                return ExitReason::Cancelled;
            }
            if let Err(_e) = self.step().await {
                tracing::error!("Worker {} lost the identifier stream: {_e}", self.worker_id);
                return ExitReason::StreamClosed;
            }
        }
    }

    /// Performs one delete-then-create step.
    ///
    /// # Errors
    ///
    /// Fails only when no identifier can be drawn. Orchestration failures are
    /// logged by the [`PairClient`] and counted, never returned.
    pub(crate) async fn step(&mut self) -> Result<()> {
        // Emptied before the draw so a closed stream leaves nothing stale.
        if let Some(previous) = self.window.take_current() {
            // Its absence means something else removed it; worth a warning.
            if self.client.delete_pair(previous.as_str(), false).await.is_err() {
                self.tally.deletes_failed += 1;
            }
        }

        let id = self.ids.next().await?;
        self.tally.steps += 1;

        // Left over from a previous run or created externally.
        if self
            .client
            .delete_pair(id.as_str(), true)
            .await
            .is_err()
        {
            self.tally.deletes_failed += 1;
        }

        if self
            .client
            .create_pair(id.as_str(), &self.source)
            .await
            .is_err()
        {
            self.tally.creates_failed += 1;
        }

        // Recorded even if the create failed: the pair may still have landed.
        self.window.record(id);
        Ok(())
    }

    async fn drain(&mut self, exit: ExitReason) -> WorkerReport {
        self.state = WorkerState::Draining;
        tracing::debug!(live = self.window.len(), "Worker draining ({exit})");

        for id in self.window.drain() {
            tracing::info!(name = %id, "Cleanup: {:?}", id.as_str());
            match self.client.delete_pair(id.as_str(), true).await {
                Ok(true) => self.tally.cleaned_up += 1,
                Ok(false) => {}
                Err(_) => self.tally.deletes_failed += 1,
            }
        }

        self.state = WorkerState::Done;
        self.exit = Some(exit);
        tracing::debug!(steps = self.tally.steps, "Worker done");
        self.report(exit)
    }

    fn report(&self, exit: ExitReason) -> WorkerReport {
        WorkerReport {
            worker_id: self.worker_id,
            steps: self.tally.steps,
            creates_failed: self.tally.creates_failed,
            deletes_failed: self.tally.deletes_failed,
            cleaned_up: self.tally.cleaned_up,
            exit,
        }
    }
}
