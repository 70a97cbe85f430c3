//! Orchestration client boundary.
//!
//! [`Cluster`] is the raw, namespace-scoped API surface the churn engine
//! consumes. [`PairClient`] layers the paired Service/Endpoints semantics
//! and the warn-and-continue logging policy on top of any backend.
//!
//! ## Structure
//!
//! - [`kubernetes`] - [`KubeCluster`], backed by a live API server.
//! - [`memory`] - [`MemoryCluster`], an in-process store with the same
//!   semantics, used for dry runs, tests and benchmarks.
//! - [`pair`] - [`PairClient`], the facade used by workers.

pub mod kubernetes;
pub mod memory;
pub mod pair;

pub use kubernetes::KubeCluster;
pub use memory::{MemoryCluster, Op};
pub use pair::PairClient;

use crate::common::{error::Result, types::Connectivity};

/// Namespace-scoped create/get/delete operations on Services and Endpoints.
///
/// A handle is used sequentially by a single worker; each worker obtains its
/// own handle.
#[async_trait::async_trait]
pub trait Cluster: Send + Sync {
    /// Creates a Service with a single TCP/80 port.
    async fn create_service(&self, name: &str) -> Result<()>;

    /// Creates an Endpoints object carrying `subsets` verbatim.
    async fn create_endpoints(&self, name: &str, subsets: &Connectivity) -> Result<()>;

    /// Reads the subsets of an existing Endpoints object.
    async fn get_endpoints(&self, name: &str) -> Result<Connectivity>;

    /// Deletes a Service. The control plane removes its Endpoints.
    async fn delete_service(&self, name: &str) -> Result<()>;
}
