use super::Cluster;
use crate::common::{
    error::{Error, Result},
    types::{Connectivity, ResourceKind, SERVICE_PORT, SERVICE_PROTOCOL},
};
use k8s_openapi::api::core::v1::{Endpoints, Service, ServicePort, ServiceSpec};
use kube::{
    Api, Client,
    api::{DeleteParams, ObjectMeta, PostParams},
};

/// [`Cluster`] backed by a Kubernetes API server.
#[derive(Clone)]
pub struct KubeCluster {
    services: Api<Service>,
    endpoints: Api<Endpoints>,
}

impl KubeCluster {
    /// Scopes a client to `namespace`.
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            services: Api::namespaced(client.clone(), namespace),
            endpoints: Api::namespaced(client, namespace),
        }
    }

    /// Builds a fresh client from `config` and scopes it to `namespace`.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClientSetup`] if the client cannot be constructed.
    pub fn connect(config: kube::Config, namespace: &str) -> Result<Self> {
        let client = Client::try_from(config).map_err(|e| Error::ClientSetup {
            context: e.to_string(),
        })?;
        Ok(Self::new(client, namespace))
    }
}

fn map_err(kind: ResourceKind, name: &str, err: kube::Error) -> Error {
    match err {
        kube::Error::Api(ae) if ae.code == 404 => Error::NotFound {
            kind,
            name: name.to_string(),
        },
        kube::Error::Api(ae) if ae.code == 409 => Error::AlreadyExists {
            kind,
            name: name.to_string(),
        },
        other => Error::Api {
            kind,
            name: name.to_string(),
            message: other.to_string(),
        },
    }
}

fn service_body(name: &str) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                protocol: Some(SERVICE_PROTOCOL.to_string()),
                port: SERVICE_PORT,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn endpoints_body(name: &str, subsets: &Connectivity) -> Endpoints {
    Endpoints {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        subsets: Some(subsets.clone()),
    }
}

#[async_trait::async_trait]
impl Cluster for KubeCluster {
    async fn create_service(&self, name: &str) -> Result<()> {
        self.services
            .create(&PostParams::default(), &service_body(name))
            .await
            .map(|_| ())
            .map_err(|e| map_err(ResourceKind::Service, name, e))
    }

    async fn create_endpoints(&self, name: &str, subsets: &Connectivity) -> Result<()> {
        self.endpoints
            .create(&PostParams::default(), &endpoints_body(name, subsets))
            .await
            .map(|_| ())
            .map_err(|e| map_err(ResourceKind::Endpoints, name, e))
    }

    async fn get_endpoints(&self, name: &str) -> Result<Connectivity> {
        self.endpoints
            .get(name)
            .await
            .map(|ep| ep.subsets.unwrap_or_default())
            .map_err(|e| map_err(ResourceKind::Endpoints, name, e))
    }

    async fn delete_service(&self, name: &str) -> Result<()> {
        // Either variant (deleted now / deletion started) is success.
        self.services
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| map_err(ResourceKind::Service, name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{EndpointAddress, EndpointPort, EndpointSubset};

    #[test]
    fn service_body_has_single_tcp_80_port() {
        let svc = service_body("hp-0");
        assert_eq!(svc.metadata.name.as_deref(), Some("hp-0"));
        let ports = svc.spec.unwrap().ports.unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].port, 80);
        assert_eq!(ports[0].protocol.as_deref(), Some("TCP"));
    }

    #[test]
    fn endpoints_body_copies_subsets_verbatim() {
        let subsets = vec![EndpointSubset {
            addresses: Some(vec![EndpointAddress {
                ip: "10.0.0.7".to_string(),
                ..Default::default()
            }]),
            ports: Some(vec![EndpointPort {
                port: 8080,
                ..Default::default()
            }]),
            ..Default::default()
        }];
        let ep = endpoints_body("hp-1", &subsets);
        assert_eq!(ep.metadata.name.as_deref(), Some("hp-1"));
        assert_eq!(ep.subsets, Some(subsets));
    }

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: format!("services \"hp-0\" {reason}"),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn status_codes_map_to_error_variants() {
        let not_found = map_err(ResourceKind::Service, "hp-0", api_error(404, "NotFound"));
        assert_eq!(
            not_found,
            Error::NotFound {
                kind: ResourceKind::Service,
                name: "hp-0".to_string(),
            }
        );
        assert!(not_found.is_not_found());

        let conflict = map_err(ResourceKind::Endpoints, "hp-0", api_error(409, "AlreadyExists"));
        assert_eq!(
            conflict,
            Error::AlreadyExists {
                kind: ResourceKind::Endpoints,
                name: "hp-0".to_string(),
            }
        );

        let internal = map_err(ResourceKind::Service, "hp-0", api_error(500, "InternalError"));
        assert!(matches!(
            internal,
            Error::Api { kind: ResourceKind::Service, ref name, .. } if name == "hp-0"
        ));
        assert!(!internal.is_not_found());
    }
}
