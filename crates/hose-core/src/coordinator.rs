//! Fan-out of churn workers over one identifier stream.
//!
//! The [`Coordinator`] performs the only calls whose failure is fatal:
//! building client handles and fetching the source template. Once workers
//! are running, nothing they encounter is propagated back; the coordinator
//! just waits for each of them to finish its teardown and collects their
//! [`WorkerReport`]s.

use crate::{
    churn::{ChurnWorker, WorkerReport},
    cluster::{Cluster, PairClient},
    common::{
        error::{Error, Result},
        types::StepBudget,
    },
    ids::IdStream,
};
use core::num::NonZeroUsize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Validated churn parameters shared by every worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChurnSettings {
    /// Prefix of every generated name (`"{prefix}-{n}"`).
    pub prefix: String,
    /// Name of the Endpoints object whose subsets are copied.
    pub source: String,
    /// Live pairs kept per worker.
    pub window: NonZeroUsize,
    pub budget: StepBudget,
    /// Number of workers.
    pub parallel: NonZeroUsize,
}

impl ChurnSettings {
    /// Validates raw, signed settings as they arrive from flags.
    ///
    /// `steps <= 0` means unbounded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the source name is empty or if
    /// `window` or `parallel` is not positive.
    pub fn try_new(
        prefix: impl Into<String>,
        source: impl Into<String>,
        window: i64,
        steps: i64,
        parallel: i64,
    ) -> Result<Self> {
        let source = source.into();
        if source.is_empty() {
            return Err(Error::InvalidConfig {
                reason: "a source Endpoints name is required".to_string(),
            });
        }

        let window = positive(window).ok_or_else(|| Error::InvalidConfig {
            reason: format!("window capacity must be greater than 0 (got {window})"),
        })?;
        let parallel = positive(parallel).ok_or_else(|| Error::InvalidConfig {
            reason: format!("worker count must be greater than 0 (got {parallel})"),
        })?;

        Ok(Self {
            prefix: prefix.into(),
            source,
            window,
            budget: StepBudget::from(steps),
            parallel,
        })
    }
}

fn positive(value: i64) -> Option<NonZeroUsize> {
    usize::try_from(value).ok().and_then(NonZeroUsize::new)
}

/// Starts the identifier stream and `parallel` workers and waits for all of
/// them.
///
/// `connect` is called once for the template fetch and once per worker, so
/// every worker gets its own client handle.
pub struct Coordinator<F> {
    settings: ChurnSettings,
    connect: F,
}

impl<C, F> Coordinator<F>
where
    C: Cluster + 'static,
    F: Fn() -> Result<C>,
{
    pub const fn new(settings: ChurnSettings, connect: F) -> Self {
        Self { settings, connect }
    }

    /// Runs the churn to completion.
    ///
    /// Cancelling `shutdown` makes every worker stop at its next step
    /// boundary and tear down its window; this method returns once all of
    /// them are done.
    ///
    /// # Errors
    ///
    /// Returns an error only if a client cannot be built or the template
    /// cannot be fetched. If that happens after some workers have started,
    /// they are cancelled and drained before the error is returned.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<Vec<WorkerReport>> {
        let seed = PairClient::new((self.connect)()?);
        let source = seed.get_source(&self.settings.source).await?;
        tracing::info!(
            source = %self.settings.source,
            subsets = source.len(),
            "Fetched source endpoints"
        );
        let source = Arc::new(source);

        // Cancelled on its own when a worker cannot be set up; follows
        // `shutdown` otherwise.
        let token = shutdown.child_token();
        let (ids, producer) = IdStream::spawn(self.settings.prefix.clone());

        let parallel = self.settings.parallel.get();
        let mut handles: Vec<JoinHandle<WorkerReport>> = Vec::with_capacity(parallel);
        let mut setup_error = None;

        for worker_id in 0..parallel {
            let cluster = match (self.connect)() {
                Ok(cluster) => cluster,
                Err(e) => {
                    tracing::error!("Worker {worker_id} could not get a client: {e}");
                    token.cancel();
                    setup_error = Some(e);
                    break;
                }
            };

            let mut worker = ChurnWorker::new(
                worker_id,
                cluster,
                ids.clone(),
                token.clone(),
                Arc::clone(&source),
                self.settings.window,
                self.settings.budget,
            );
            handles.push(tokio::spawn(async move { worker.run().await }));
        }

        tracing::info!(
            "Started {} workers (window = {}, steps = {})",
            handles.len(),
            self.settings.window,
            self.settings.budget
        );

        let reports = join_workers(handles).await;

        // Last handle gone: the producer's request queue closes.
        drop(ids);
        if let Err(_e) = producer.await {
            tracing::error!("Identifier producer failed: {_e}");
        }

        match setup_error {
            Some(e) => Err(e),
            None => Ok(reports),
        }
    }
}

async fn join_workers(handles: Vec<JoinHandle<WorkerReport>>) -> Vec<WorkerReport> {
    futures::future::join_all(handles)
        .await
        .into_iter()
        .filter_map(|joined| match joined {
            Ok(report) => Some(report),
            Err(_e) => {
                tracing::error!("Worker task failed: {_e}");
                None
            }
        })
        .collect()
}
