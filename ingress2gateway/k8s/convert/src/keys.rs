//! Grouping keys.
//!
//! Keys are `/`-joined strings. A `/` cannot appear in a valid namespace,
//! ingress class, host, or path type, so fields never collide across the
//! delimiter.

use ingress2gateway_core::Extra;

/// Identifies the rule group (and so the HTTPRoute) an Ingress rule belongs to.
pub fn rule_group_key(namespace: &str, ingress_class: &str, host: &str) -> String {
    format!("{namespace}/{ingress_class}/{host}")
}

/// Identifies the Gateway a rule group's listener belongs to.
pub fn gateway_key(namespace: &str, ingress_class: &str) -> String {
    format!("{namespace}/{ingress_class}")
}

/// Identifies the HTTPRoute rule an Ingress path belongs to. Paths sharing a
/// key are merged into a single rule with one backend per path.
pub fn path_match_key(path_type: &str, path: &str, extra: Option<&Extra>) -> String {
    let header_key = extra.map(Extra::canary_header_key).unwrap_or_default();
    format!("{path_type}/{path}/{header_key}")
}
