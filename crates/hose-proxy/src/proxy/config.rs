use anyhow::{Context, bail};
use clap::Parser;
use hose_core::{
    ChurnSettings,
    kube::{
        self,
        config::{KubeConfigOptions, Kubeconfig},
    },
};
use std::path::PathBuf;

/// Runtime configuration for the `hose-proxy` binary.
///
/// Every value is parsed from CLI arguments or environment variables (a
/// `.env` file is loaded first). The churn parameters are validated before
/// any connection to the API server is attempted.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "hose-proxy",
    version,
    about = "Churns Service/Endpoints pairs through a Kubernetes control plane"
)]
pub struct CliArgs {
    /// API server URL.
    ///
    /// Overrides the cluster URL of `--kubeconfig` when both are given. When
    /// neither is given, the configuration is inferred (in-cluster service
    /// account or the default kubeconfig).
    ///
    /// Environment variable: `MASTER`
    #[arg(long, env = "MASTER")]
    pub master: Option<String>,

    /// Path to a kubeconfig file.
    ///
    /// Environment variable: `KUBECONFIG_PATH`
    #[arg(long, env = "KUBECONFIG_PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// Namespace in which pairs are created and the source is read.
    ///
    /// Environment variable: `NAMESPACE`
    #[arg(long, env = "NAMESPACE", default_value_t = String::from("default"))]
    pub namespace: String,

    /// Prefix of every generated Service/Endpoints name.
    ///
    /// Environment variable: `PREFIX`
    #[arg(long, env = "PREFIX", default_value_t = String::from("hose-proxy"))]
    pub prefix: String,

    /// Name of the Endpoints object whose subsets are copied into every
    /// generated pair. Required.
    ///
    /// Environment variable: `SRC`
    #[arg(long, env = "SRC")]
    pub src: Option<String>,

    /// Maximum number of live pairs kept by each worker.
    ///
    /// Environment variable: `NSERVICES`
    #[arg(long, env = "NSERVICES", default_value_t = 10, allow_negative_numbers = true)]
    pub nservices: i64,

    /// Maximum number of steps taken by each worker. Zero or less runs until
    /// interrupted.
    ///
    /// Environment variable: `NSTEPS`
    #[arg(long, env = "NSTEPS", default_value_t = 20, allow_negative_numbers = true)]
    pub nsteps: i64,

    /// Number of workers to launch.
    ///
    /// Environment variable: `NPARALLEL`
    #[arg(long, env = "NPARALLEL", default_value_t = 1, allow_negative_numbers = true)]
    pub nparallel: i64,

    /// Churn against an in-process store instead of an API server.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub master: Option<String>,
    pub kubeconfig: Option<PathBuf>,
    pub namespace: String,
    pub churn: ChurnSettings,
    pub dry_run: bool,
}

impl TryFrom<CliArgs> for ProxyConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let Some(src) = args.src.filter(|src| !src.is_empty()) else {
            bail!("specify the source endpoints via --src (or SRC)");
        };

        if args.namespace.is_empty() {
            bail!("NAMESPACE must not be empty");
        }

        let churn = ChurnSettings::try_new(
            args.prefix,
            src,
            args.nservices,
            args.nsteps,
            args.nparallel,
        )?;

        Ok(Self {
            master: args.master,
            kubeconfig: args.kubeconfig,
            namespace: args.namespace,
            churn,
            dry_run: args.dry_run,
        })
    }
}

impl ProxyConfig {
    /// Builds the client configuration shared by every worker's client.
    ///
    /// # Errors
    ///
    /// Fails if the kubeconfig cannot be read, the master URL is invalid, or
    /// no configuration can be inferred.
    pub async fn kube_config(&self) -> anyhow::Result<kube::Config> {
        let master = self
            .master
            .as_deref()
            .map(|url| {
                url.parse::<http::Uri>()
                    .with_context(|| format!("invalid master URL {url:?}"))
            })
            .transpose()?;

        match (&self.kubeconfig, master) {
            (Some(path), master) => {
                let kubeconfig = Kubeconfig::read_from(path)
                    .with_context(|| format!("reading kubeconfig {}", path.display()))?;
                let mut config =
                    kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                        .await
                        .context("building client config from kubeconfig")?;
                if let Some(url) = master {
                    config.cluster_url = url;
                }
                Ok(config)
            }
            (None, Some(url)) => Ok(kube::Config::new(url)),
            (None, None) => kube::Config::infer()
                .await
                .context("inferring client config"),
        }
    }
}
