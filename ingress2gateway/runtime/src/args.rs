use crate::{
    convert::{self, parse_class_mapping, GatewayClassMap, Provider},
    k8s::{Ingress, ResourceExt},
    read_ingresses, render, OutputFormat,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::{
    fs::File,
    io::{self, Write},
    path::PathBuf,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Parser)]
#[clap(
    name = "ingress2gateway",
    about = "Converts Ingress resources to Gateway API resources"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "ingress2gateway=info,warn",
        env = "INGRESS2GATEWAY_LOG"
    )]
    log_level: String,

    #[clap(long, default_value = "plain")]
    log_format: LogFormat,

    /// Manifests to read Ingresses from. `-` reads standard input, as does
    /// omitting the flag.
    #[clap(long = "input-file", short = 'f')]
    input_files: Vec<PathBuf>,

    /// Only converts Ingresses in this namespace. Ingresses without a
    /// namespace are placed in it.
    #[clap(long, short = 'n')]
    namespace: Option<String>,

    /// Only converts Ingresses of these classes.
    #[clap(long = "ingress-class")]
    ingress_classes: Vec<String>,

    /// The annotation dialect to read: `ingress-nginx` or `kubernetes`.
    #[clap(long, default_value = "ingress-nginx")]
    provider: Provider,

    /// Maps an ingress class to a GatewayClass, as `<ingress-class>=<gateway-class>`.
    #[clap(long = "gateway-class", value_parser = parse_class_mapping)]
    gateway_classes: Vec<(String, String)>,

    /// `yaml` or `json`.
    #[clap(long, short = 'o', default_value = "yaml")]
    output: OutputFormat,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
enum LogFormat {
    #[default]
    Plain,
    Json,
}

impl Args {
    #[inline]
    pub fn parse_and_run() -> Result<()> {
        Self::parse().run()
    }

    pub fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            input_files,
            namespace,
            ingress_classes,
            provider,
            gateway_classes,
            output,
        } = self;

        log_format.try_init(&log_level)?;

        let mut ingresses = vec![];
        if input_files.is_empty() {
            ingresses.extend(read_ingresses(io::stdin().lock())?);
        }
        for path in &input_files {
            if path.as_os_str() == "-" {
                ingresses.extend(read_ingresses(io::stdin().lock())?);
                continue;
            }
            let file =
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            let read = read_ingresses(file)
                .with_context(|| format!("failed to read {}", path.display()))?;
            ingresses.extend(read);
        }

        let ingresses = select(ingresses, namespace.as_deref(), &ingress_classes);
        let classes = gateway_classes.into_iter().collect::<GatewayClassMap>();
        let converted = crate::convert_ingresses(&ingresses, provider, &classes);

        for error in &converted.errors {
            warn!(ingress = error.object.as_deref(), %error, "Failed to convert field");
        }
        info!(
            ingresses = ingresses.len(),
            http_routes = converted.http_routes.len(),
            gateways = converted.gateways.len(),
            errors = converted.errors.len(),
            "Converted Ingresses"
        );

        let rendered = render(&converted, output)?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(rendered.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

/// Keeps the Ingresses in `namespace` whose class is one of `classes`.
///
/// Ingresses without a namespace are placed in `namespace`, or in `default`.
/// An empty `classes` keeps every class.
fn select(ingresses: Vec<Ingress>, namespace: Option<&str>, classes: &[String]) -> Vec<Ingress> {
    ingresses
        .into_iter()
        .map(|mut ingress| {
            if ingress.namespace().is_none() {
                ingress.metadata.namespace =
                    Some(namespace.unwrap_or(DEFAULT_NAMESPACE).to_string());
            }
            ingress
        })
        .filter(|ingress| namespace.map_or(true, |ns| ingress.namespace().as_deref() == Some(ns)))
        .filter(|ingress| {
            classes.is_empty() || classes.contains(&convert::ingress_class(ingress))
        })
        .collect()
}

// === impl LogFormat ===

impl LogFormat {
    fn try_init(self, filter: &str) -> Result<()> {
        let filter = EnvFilter::try_new(filter).context("invalid log level")?;
        let builder = fmt().with_env_filter(filter).with_writer(io::stderr);
        match self {
            Self::Plain => builder.try_init(),
            Self::Json => builder.json().try_init(),
        }
        .map_err(anyhow::Error::msg)
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plain" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            s => anyhow::bail!("invalid log format: {s:?}"),
        }
    }
}
