//! In-process [`Cluster`] backend.
//!
//! [`MemoryCluster`] keeps Services and Endpoints in a shared map and mirrors
//! the API server semantics the churn engine relies on: duplicate creates
//! fail with `AlreadyExists`, reads and deletes of missing objects fail with
//! `NotFound`, and deleting a Service removes the Endpoints of the same name.
//!
//! Clones share the same store, so handing one clone to each worker models
//! independent client handles talking to one cluster.

use super::Cluster;
use crate::common::{
    error::{Error, Result},
    types::{Connectivity, ResourceKind},
};
use parking_lot::Mutex;
use std::{
    collections::{BTreeSet, HashMap},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

/// A single call made against a [`MemoryCluster`], successful or not.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    CreateService(String),
    CreateEndpoints(String),
    GetEndpoints(String),
    DeleteService(String),
}

#[derive(Default)]
struct Store {
    services: BTreeSet<String>,
    endpoints: HashMap<String, Connectivity>,
    journal: Option<Vec<Op>>,
}

impl Store {
    fn log(&mut self, op: Op) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(op);
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryCluster {
    store: Arc<Mutex<Store>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Like [`MemoryCluster::new`], but every call is appended to a journal
    /// readable through [`MemoryCluster::journal`].
    pub fn with_journal() -> Self {
        let cluster = Self::default();
        cluster.store.lock().journal = Some(Vec::new());
        cluster
    }

    /// Stores a standalone Endpoints object, e.g. the source template.
    pub fn seed_endpoints(&self, name: &str, subsets: Connectivity) {
        self.store.lock().endpoints.insert(name.to_string(), subsets);
    }

    /// While set, every call fails with [`Error::Api`] and changes nothing.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Release);
    }

    /// Names of all Services currently stored, in sorted order.
    pub fn services(&self) -> Vec<String> {
        self.store.lock().services.iter().cloned().collect()
    }

    pub fn contains_service(&self, name: &str) -> bool {
        self.store.lock().services.contains(name)
    }

    pub fn endpoints(&self, name: &str) -> Option<Connectivity> {
        self.store.lock().endpoints.get(name).cloned()
    }

    /// Every call recorded so far. Empty unless built with
    /// [`MemoryCluster::with_journal`].
    pub fn journal(&self) -> Vec<Op> {
        self.store.lock().journal.clone().unwrap_or_default()
    }

    fn check_available(&self, kind: ResourceKind, name: &str) -> Result<()> {
        if self.unavailable.load(Ordering::Acquire) {
            return Err(Error::Api {
                kind,
                name: name.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Cluster for MemoryCluster {
    async fn create_service(&self, name: &str) -> Result<()> {
        // Give other workers a chance to interleave, as a network call would.
        tokio::task::yield_now().await;
        let mut store = self.store.lock();
        store.log(Op::CreateService(name.to_string()));
        self.check_available(ResourceKind::Service, name)?;

        if !store.services.insert(name.to_string()) {
            return Err(Error::AlreadyExists {
                kind: ResourceKind::Service,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    async fn create_endpoints(&self, name: &str, subsets: &Connectivity) -> Result<()> {
        tokio::task::yield_now().await;
        let mut store = self.store.lock();
        store.log(Op::CreateEndpoints(name.to_string()));
        self.check_available(ResourceKind::Endpoints, name)?;

        if store.endpoints.contains_key(name) {
            return Err(Error::AlreadyExists {
                kind: ResourceKind::Endpoints,
                name: name.to_string(),
            });
        }
        store.endpoints.insert(name.to_string(), subsets.clone());
        Ok(())
    }

    async fn get_endpoints(&self, name: &str) -> Result<Connectivity> {
        tokio::task::yield_now().await;
        let mut store = self.store.lock();
        store.log(Op::GetEndpoints(name.to_string()));
        self.check_available(ResourceKind::Endpoints, name)?;

        store
            .endpoints
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                kind: ResourceKind::Endpoints,
                name: name.to_string(),
            })
    }

    async fn delete_service(&self, name: &str) -> Result<()> {
        tokio::task::yield_now().await;
        let mut store = self.store.lock();
        store.log(Op::DeleteService(name.to_string()));
        self.check_available(ResourceKind::Service, name)?;

        if !store.services.remove(name) {
            return Err(Error::NotFound {
                kind: ResourceKind::Service,
                name: name.to_string(),
            });
        }
        store.endpoints.remove(name);
        Ok(())
    }
}
