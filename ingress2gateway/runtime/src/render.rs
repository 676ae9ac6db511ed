use crate::convert::Output;
use anyhow::{bail, Error, Result};
use serde::Serialize;

/// How converted resources are written.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// `---`-separated YAML documents.
    #[default]
    Yaml,

    /// A single `v1` `List`.
    Json,
}

// === impl OutputFormat ===

impl std::str::FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "yaml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            s => bail!("invalid output format: {s:?}"),
        }
    }
}

/// Renders Gateways followed by HTTPRoutes.
pub fn render(output: &Output, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => {
            let mut out = String::new();
            for gateway in &output.gateways {
                push_yaml(&mut out, gateway)?;
            }
            for route in &output.http_routes {
                push_yaml(&mut out, route)?;
            }
            Ok(out)
        }
        OutputFormat::Json => {
            let gateways = output.gateways.iter().map(serde_json::to_value);
            let routes = output.http_routes.iter().map(serde_json::to_value);
            let items = gateways.chain(routes).collect::<Result<Vec<_>, _>>()?;
            let list = serde_json::json!({
                "apiVersion": "v1",
                "kind": "List",
                "items": items,
            });
            let mut out = serde_json::to_string_pretty(&list)?;
            out.push('\n');
            Ok(out)
        }
    }
}

fn push_yaml(out: &mut String, resource: &impl Serialize) -> Result<()> {
    out.push_str("---\n");
    out.push_str(&serde_yaml::to_string(resource)?);
    Ok(())
}
