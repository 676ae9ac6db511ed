use ahash::AHashSet;
use once_cell::sync::Lazy;
use regex::Regex;

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new("[^a-zA-Z0-9]+").expect("regex must compile"));

/// Derives an object name from a hostname.
///
/// Every run of non-alphanumeric characters becomes a single `-` and a leading
/// `-` is dropped. The empty host is named `all-hosts`.
pub fn name_from_host(host: &str) -> String {
    if host.is_empty() {
        return "all-hosts".to_string();
    }
    let name = NON_ALPHANUMERIC.replace_all(host, "-");
    name.strip_prefix('-').unwrap_or(&*name).to_string()
}

/// Names claimed within one scope, such as a namespace or a Gateway.
#[derive(Debug, Default)]
pub(crate) struct UniqueNames(AHashSet<String>);

// === impl UniqueNames ===

impl UniqueNames {
    /// Claims `name`, or `name-<n>` with the lowest free `n` from 2 if `name`
    /// is already taken.
    pub(crate) fn claim(&mut self, name: String) -> String {
        if !self.0.contains(&name) {
            self.0.insert(name.clone());
            return name;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{name}-{n}");
            if self.0.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
