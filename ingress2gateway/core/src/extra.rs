/// Provider-specific metadata extracted from an Ingress and attached to every
/// rule and path that Ingress contributes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Extra {
    pub canary: Option<Canary>,
}

/// Canary routing parameters, modeled after the ingress-nginx `canary-*`
/// annotations.
///
/// Unset numeric fields are zero: a zero `weight` means the backend carries no
/// explicit weight and a zero `weight_total` means no override was given.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Canary {
    pub enable: bool,
    pub header_key: String,
    pub header_value: String,
    pub header_regex_match: bool,
    pub weight: i32,
    pub weight_total: i32,
}

// === impl Extra ===

impl Extra {
    pub fn canary(&self) -> Option<&Canary> {
        self.canary.as_ref()
    }

    /// The canary header key, or the empty string when no header match applies.
    pub fn canary_header_key(&self) -> &str {
        self.canary
            .as_ref()
            .map(|c| c.header_key.as_str())
            .unwrap_or_default()
    }
}
