//! Shared, lazily produced stream of unique resource names.
//!
//! A single producer task owns the counter. Consumers never touch it: each
//! call to [`IdStream::next`] sends a one-shot reply slot over a request
//! queue and waits for the producer to fill it. The producer only mints an
//! identifier while a request is waiting, so generation is throttled to
//! consumption and nothing is buffered ahead of demand.
//!
//! The request queue is FIFO, which gives every individual consumer
//! increasing sequence numbers. No ordering is promised across consumers.

use crate::common::{
    error::{Error, Result},
    types::Identifier,
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

type Reply = oneshot::Sender<Identifier>;

/// Handle to the identifier producer. Clone it once per consumer.
#[derive(Clone, Debug)]
pub struct IdStream {
    requests: mpsc::Sender<Reply>,
}

impl IdStream {
    /// Spawns the producer task for names of the form `"{prefix}-{n}"`,
    /// starting at `n = 0`.
    ///
    /// The task runs until every [`IdStream`] handle has been dropped.
    pub fn spawn(prefix: impl Into<String>) -> (Self, JoinHandle<()>) {
        // One outstanding request slot. The producer itself holds no values,
        // so this bounds waiting consumers, not generated names.
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(produce(prefix.into(), rx));
        (Self { requests: tx }, handle)
    }

    /// Waits for the next unique identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelError`] if the producer task is no longer
    /// running.
    pub async fn next(&self) -> Result<Identifier> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(tx)
            .await
            .map_err(|_| Error::ChannelError {
                context: "identifier producer stopped".to_string(),
            })?;
        rx.await.map_err(|_| Error::ChannelError {
            context: "identifier producer dropped the request".to_string(),
        })
    }
}

async fn produce(prefix: String, mut requests: mpsc::Receiver<Reply>) {
    let mut next_seq = 0_u64;
    // A minted name whose requester went away before receiving it.
    let mut unclaimed: Option<Identifier> = None;

    while let Some(reply) = requests.recv().await {
        let id = match unclaimed.take() {
            Some(id) => id,
            None => {
                let id = Identifier::new(&prefix, next_seq);
                next_seq += 1;
                tracing::info!(name = %id, "New: {:?}", id.as_str());
                id
            }
        };

        if let Err(id) = reply.send(id) {
            tracing::trace!(name = %id, "Requester gone, holding identifier for the next one");
            unclaimed = Some(id);
        }
    }

    tracing::debug!(generated = next_seq, "Identifier producer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::try_join_all;
    use std::collections::HashSet;

    const NUM_CONSUMERS: usize = 32;
    const IDS_PER_CONSUMER: usize = 512;

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn single_consumer_sees_sequence_from_zero() {
        let (ids, _producer) = IdStream::spawn("hp");
        for expected in 0..4 {
            let id = ids.next().await.unwrap();
            assert_eq!(id.seq(), expected);
            assert_eq!(id.as_str(), format!("hp-{expected}"));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_consumers_never_share_an_identifier() {
        let (ids, _producer) = IdStream::spawn("uniq");

        let tasks: Vec<tokio::task::JoinHandle<Result<Vec<Identifier>>>> = (0..NUM_CONSUMERS)
            .map(|_| {
                let ids = ids.clone();
                tokio::spawn(async move {
                    let mut seen = Vec::with_capacity(IDS_PER_CONSUMER);
                    for _ in 0..IDS_PER_CONSUMER {
                        seen.push(ids.next().await?);
                    }
                    Ok(seen)
                })
            })
            .collect();

        let per_consumer = try_join_all(tasks).await.unwrap();
        let mut all = HashSet::with_capacity(NUM_CONSUMERS * IDS_PER_CONSUMER);
        for seen in per_consumer {
            let seen = seen.unwrap();
            assert!(
                seen.windows(2).all(|w| w[0] < w[1]),
                "a consumer observed a non-increasing sequence"
            );
            for id in seen {
                assert!(all.insert(id), "identifier handed out twice");
            }
        }

        assert_eq!(all.len(), NUM_CONSUMERS * IDS_PER_CONSUMER);
        // Nothing was skipped: the set is exactly 0..N.
        let max = all.iter().map(Identifier::seq).max().unwrap();
        assert_eq!(max as usize, NUM_CONSUMERS * IDS_PER_CONSUMER - 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn abandoned_request_does_not_lose_an_identifier() {
        let (ids, _producer) = IdStream::spawn("hp");
        assert_eq!(ids.next().await.unwrap().seq(), 0);

        // Drop the reply slot before the producer answers.
        let (tx, rx) = oneshot::channel();
        drop(rx);
        ids.requests.send(tx).await.unwrap();

        assert_eq!(ids.next().await.unwrap().seq(), 1);
        assert_eq!(ids.next().await.unwrap().seq(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn producer_stops_when_all_handles_are_dropped() {
        let (ids, producer) = IdStream::spawn("hp");
        let other = ids.clone();
        ids.next().await.unwrap();
        drop(ids);
        drop(other);
        producer.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn next_fails_once_producer_is_gone() {
        let (ids, producer) = IdStream::spawn("hp");
        producer.abort();
        let _ = producer.await;
        let err = ids.next().await.unwrap_err();
        assert!(matches!(err, Error::ChannelError { .. }));
    }
}
