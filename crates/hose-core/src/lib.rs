#![doc = include_str!("../README.md")]

mod common;
pub use common::*;

pub mod churn;
pub mod cluster;
pub mod coordinator;
pub mod ids;

pub use churn::{ChurnWorker, ExitReason, WorkerReport, WorkerState};
pub use cluster::{Cluster, KubeCluster, MemoryCluster, PairClient};
pub use common::error::{Error, Result};
pub use coordinator::{ChurnSettings, Coordinator};
pub use ids::IdStream;
// Public re-exports so downstream crates can build `kube` configs and
// template subsets without pinning their own versions.
pub use k8s_openapi;
pub use kube;
