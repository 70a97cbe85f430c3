use super::Cluster;
use crate::common::{error::Result, types::Connectivity};

/// Paired Service/Endpoints operations over a [`Cluster`] backend.
///
/// Operational failures are logged here as warnings and handed back to the
/// caller for bookkeeping only. Nothing in this type retries.
pub struct PairClient<C> {
    cluster: C,
}

impl<C: Cluster> PairClient<C> {
    pub const fn new(cluster: C) -> Self {
        Self { cluster }
    }

    /// Creates the Service and then, only if it landed, the Endpoints with
    /// `subsets` copied verbatim.
    ///
    /// # Errors
    ///
    /// Returns the first failure after logging it as a warning. A failed
    /// Service create skips the Endpoints create.
    pub async fn create_pair(&self, name: &str, subsets: &Connectivity) -> Result<()> {
        if let Err(e) = self.cluster.create_service(name).await {
            tracing::warn!(name, "Creating service: {e}");
            return Err(e);
        }

        if let Err(e) = self.cluster.create_endpoints(name, subsets).await {
            tracing::warn!(name, "Creating endpoints: {e}");
            return Err(e);
        }

        Ok(())
    }

    /// Deletes the Service named `name`. Its Endpoints go with it.
    ///
    /// Returns `true` if a Service was removed. With `ignore_not_found`, a
    /// missing Service is expected and yields `Ok(false)` without any log
    /// output.
    ///
    /// # Errors
    ///
    /// Returns any other failure after logging it as a warning.
    pub async fn delete_pair(&self, name: &str, ignore_not_found: bool) -> Result<bool> {
        match self.cluster.delete_service(name).await {
            Ok(()) => Ok(true),
            Err(e) if ignore_not_found && e.is_not_found() => Ok(false),
            Err(e) => {
                tracing::warn!(name, "Deleting service {name:?}: {e}");
                Err(e)
            }
        }
    }

    /// Fetches the connectivity of the template Endpoints `name`.
    ///
    /// # Errors
    ///
    /// Returns the backend error unchanged; the caller decides that it is
    /// fatal.
    pub async fn get_source(&self, name: &str) -> Result<Connectivity> {
        self.cluster.get_endpoints(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cluster::{MemoryCluster, Op},
        common::{error::Error, types::ResourceKind},
    };
    use k8s_openapi::api::core::v1::{EndpointAddress, EndpointPort, EndpointSubset};

    fn template() -> Connectivity {
        vec![EndpointSubset {
            addresses: Some(vec![EndpointAddress {
                ip: "192.168.0.10".to_string(),
                ..Default::default()
            }]),
            ports: Some(vec![EndpointPort {
                port: 9376,
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }]
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn create_pair_copies_template() {
        let cluster = MemoryCluster::new();
        let client = PairClient::new(cluster.clone());

        client.create_pair("hp-0", &template()).await.unwrap();

        assert!(cluster.contains_service("hp-0"));
        assert_eq!(cluster.endpoints("hp-0"), Some(template()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn failed_service_create_skips_endpoints() {
        let cluster = MemoryCluster::with_journal();
        let client = PairClient::new(cluster.clone());
        client.create_pair("hp-0", &template()).await.unwrap();
        // Drop the endpoints out from under the service, then retry.
        cluster.delete_service("hp-0").await.unwrap();
        cluster.create_service("hp-0").await.unwrap();

        let err = client.create_pair("hp-0", &template()).await.unwrap_err();

        assert!(matches!(err, Error::AlreadyExists { kind: ResourceKind::Service, .. }));
        let journal = cluster.journal();
        assert_eq!(journal.last(), Some(&Op::CreateService("hp-0".to_string())));
        assert!(cluster.endpoints("hp-0").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn ignored_not_found_delete_is_silent_success() {
        let cluster = MemoryCluster::new();
        let client = PairClient::new(cluster.clone());

        assert!(!client.delete_pair("never-created", true).await.unwrap());
        assert!(!client.delete_pair("never-created", true).await.unwrap());

        client.create_pair("hp-0", &template()).await.unwrap();
        assert!(client.delete_pair("hp-0", true).await.unwrap());

        assert!(cluster.services().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn strict_delete_reports_not_found() {
        let client = PairClient::new(MemoryCluster::new());
        let err = client.delete_pair("never-created", false).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn ignore_not_found_still_reports_api_failures() {
        let cluster = MemoryCluster::new();
        cluster.set_unavailable(true);
        let client = PairClient::new(cluster);
        let err = client.delete_pair("hp-0", true).await.unwrap_err();
        assert!(matches!(err, Error::Api { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn get_source_reads_template() {
        let cluster = MemoryCluster::new();
        cluster.seed_endpoints("src", template());
        let client = PairClient::new(cluster);

        assert_eq!(client.get_source("src").await.unwrap(), template());
        assert!(client.get_source("missing").await.unwrap_err().is_not_found());
    }
}
