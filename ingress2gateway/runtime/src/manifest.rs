use crate::k8s::Ingress;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_yaml::Value;
use std::io::Read;
use tracing::{debug, warn};

const INGRESS_API_VERSION: &str = "networking.k8s.io/v1";

/// Reads every `networking.k8s.io/v1` Ingress from a stream of YAML or JSON
/// manifests.
pub fn read_ingresses(mut reader: impl Read) -> Result<Vec<Ingress>> {
    let mut manifest = String::new();
    reader
        .read_to_string(&mut manifest)
        .context("failed to read manifests")?;
    parse_ingresses(&manifest)
}

/// Parses every `networking.k8s.io/v1` Ingress from YAML or JSON manifests.
///
/// Documents may be separated by `---` and may be `List` kinds whose items are
/// read in turn. Other resource kinds are skipped.
pub fn parse_ingresses(manifest: &str) -> Result<Vec<Ingress>> {
    let mut ingresses = vec![];
    for (idx, document) in serde_yaml::Deserializer::from_str(manifest).enumerate() {
        let value = Value::deserialize(document)
            .with_context(|| format!("failed to parse manifest document {idx}"))?;
        collect(value, &mut ingresses)?;
    }
    Ok(ingresses)
}

fn collect(value: Value, ingresses: &mut Vec<Ingress>) -> Result<()> {
    if value.is_null() {
        return Ok(());
    }

    let kind = value.get("kind").and_then(Value::as_str).unwrap_or_default();
    let api_version = value
        .get("apiVersion")
        .and_then(Value::as_str)
        .unwrap_or_default();

    match kind {
        "Ingress" if api_version == INGRESS_API_VERSION => {
            let ingress = serde_yaml::from_value::<Ingress>(value)
                .context("failed to parse Ingress")?;
            ingresses.push(ingress);
        }
        "Ingress" => {
            warn!(%api_version, "Skipping Ingress with unsupported API version");
        }
        kind if kind.ends_with("List") => {
            let items = value
                .get("items")
                .and_then(Value::as_sequence)
                .cloned()
                .unwrap_or_default();
            for item in items {
                collect(item, ingresses)?;
            }
        }
        kind => debug!(%kind, %api_version, "Skipping resource"),
    }
    Ok(())
}
