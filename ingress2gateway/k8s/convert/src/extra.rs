use anyhow::{bail, Error, Result};
use ingress2gateway_core::{Canary, Extra, FieldError, FieldErrors, FieldPath};
use std::collections::BTreeMap;

/// The ingress-nginx canary annotations.
pub mod nginx {
    pub const CANARY: &str = "nginx.ingress.kubernetes.io/canary";
    pub const CANARY_BY_HEADER: &str = "nginx.ingress.kubernetes.io/canary-by-header";
    pub const CANARY_BY_HEADER_VALUE: &str = "nginx.ingress.kubernetes.io/canary-by-header-value";
    pub const CANARY_BY_HEADER_PATTERN: &str =
        "nginx.ingress.kubernetes.io/canary-by-header-pattern";
    pub const CANARY_WEIGHT: &str = "nginx.ingress.kubernetes.io/canary-weight";
    pub const CANARY_WEIGHT_TOTAL: &str = "nginx.ingress.kubernetes.io/canary-weight-total";

    /// The header value matched when only `canary-by-header` is set.
    pub const CANARY_HEADER_ALWAYS: &str = "always";
}

/// Selects the annotation dialect used to derive an Ingress's [`Extra`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Provider {
    /// Honors the ingress-nginx `canary-*` annotations.
    #[default]
    IngressNginx,

    /// Plain `networking.k8s.io` semantics; vendor annotations are ignored.
    Kubernetes,
}

// === impl Provider ===

impl Provider {
    pub fn extract(&self, annotations: Option<&BTreeMap<String, String>>) -> (Extra, FieldErrors) {
        match (self, annotations) {
            (Self::IngressNginx, Some(annotations)) => nginx_extra(annotations),
            _ => (Extra::default(), FieldErrors::new()),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ingress-nginx" => Ok(Self::IngressNginx),
            "kubernetes" => Ok(Self::Kubernetes),
            s => bail!("invalid provider: {s:?}"),
        }
    }
}

/// Reads the ingress-nginx canary annotations.
///
/// Parse failures are reported as field errors but do not stop the remaining
/// annotations from being read.
pub fn nginx_extra(annotations: &BTreeMap<String, String>) -> (Extra, FieldErrors) {
    let mut errors = FieldErrors::new();

    if annotations.get(nginx::CANARY).map(String::as_str) != Some("true") {
        return (Extra::default(), errors);
    }

    let mut canary = Canary {
        enable: true,
        ..Canary::default()
    };

    if let Some(key) = non_empty(annotations, nginx::CANARY_BY_HEADER) {
        canary.header_key = key.to_string();
        canary.header_value = nginx::CANARY_HEADER_ALWAYS.to_string();
    }

    if let Some(value) = non_empty(annotations, nginx::CANARY_BY_HEADER_VALUE) {
        canary.header_value = value.to_string();
    }

    if let Some(pattern) = non_empty(annotations, nginx::CANARY_BY_HEADER_PATTERN) {
        canary.header_value = pattern.to_string();
        canary.header_regex_match = true;
    }

    if let Some(weight) = non_empty(annotations, nginx::CANARY_WEIGHT) {
        match weight.parse::<i32>() {
            Ok(weight) => {
                canary.weight = weight;
                canary.weight_total = ingress2gateway_core::DEFAULT_WEIGHT_TOTAL;
            }
            Err(error) => errors.push(FieldError::type_invalid(
                annotation_path(nginx::CANARY_WEIGHT),
                weight,
                format!("canary weight must be an integer: {error}"),
            )),
        }
    }

    if let Some(total) = non_empty(annotations, nginx::CANARY_WEIGHT_TOTAL) {
        match total.parse::<i32>() {
            Ok(t) if t > 0 => canary.weight_total = t,
            Ok(_) => errors.push(FieldError::invalid(
                annotation_path(nginx::CANARY_WEIGHT_TOTAL),
                total,
                "canary weight total must be a positive integer",
            )),
            Err(error) => errors.push(FieldError::type_invalid(
                annotation_path(nginx::CANARY_WEIGHT_TOTAL),
                total,
                format!("canary weight total must be an integer: {error}"),
            )),
        }
    }

    let extra = Extra {
        canary: Some(canary),
    };
    (extra, errors)
}

fn non_empty<'a>(annotations: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    annotations
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

fn annotation_path(key: &str) -> FieldPath {
    FieldPath::new("metadata").child("annotations").key(key)
}
