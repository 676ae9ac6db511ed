use crate::{
    aggregator::IngressRuleGroup,
    name::{name_from_host, UniqueNames},
};
use ahash::AHashMap as HashMap;
use anyhow::{bail, Error, Result};
use ingress2gateway_core::{FieldError, FieldErrors, FieldPath};
use ingress2gateway_k8s_api::{
    gateway::{
        protocol, secret_ref, Gateway, GatewayListeners, GatewayListenersTls,
        GatewayListenersTlsCertificateRefs, GatewaySpec, HTTPS_PORT, HTTP_PORT,
    },
    ObjectMeta,
};
use std::collections::BTreeMap;
use tracing::warn;

/// Maps ingress classes to the GatewayClass their Gateway is created with.
///
/// An ingress class without an entry maps to a GatewayClass of the same name.
#[derive(Clone, Debug, Default)]
pub struct GatewayClassMap(HashMap<String, String>);

/// The hostname and TLS settings a rule group contributes to its Gateway.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct HostListener {
    pub hostname: Option<String>,

    /// Set when the rule group has any TLS block, even if none of them name a
    /// secret.
    pub certificate_refs: Option<Vec<GatewayListenersTlsCertificateRefs>>,
}

// === impl GatewayClassMap ===

impl GatewayClassMap {
    pub fn gateway_class_name<'a>(&'a self, ingress_class: &'a str) -> &'a str {
        self.0
            .get(ingress_class)
            .map(String::as_str)
            .unwrap_or(ingress_class)
    }
}

impl FromIterator<(String, String)> for GatewayClassMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Parses a single `<ingress-class>=<gateway-class>` mapping.
pub fn parse_class_mapping(s: &str) -> Result<(String, String), Error> {
    match s.split_once('=') {
        Some((ingress, gateway)) if !ingress.is_empty() && !gateway.is_empty() => {
            Ok((ingress.to_string(), gateway.to_string()))
        }
        _ => bail!("invalid gateway class mapping {s:?}: expected <ingress-class>=<gateway-class>"),
    }
}

// === impl HostListener ===

impl HostListener {
    pub(crate) fn from_rule_group(group: &IngressRuleGroup) -> Self {
        let hostname = if !group.host.is_empty() {
            Some(group.host.clone())
        } else {
            // Without a rule host, a lone TLS block naming a lone host is
            // unambiguous.
            match group.tls.as_slice() {
                [tls] => match tls.hosts.as_deref() {
                    Some([host]) => Some(host.clone()),
                    _ => None,
                },
                _ => None,
            }
        };

        let certificate_refs = if group.tls.is_empty() {
            None
        } else {
            let mut refs = vec![];
            for name in group.tls.iter().filter_map(|tls| tls.secret_name.as_deref()) {
                push_unique(&mut refs, secret_ref(name));
            }
            Some(refs)
        };

        Self {
            hostname,
            certificate_refs,
        }
    }

    fn merge(&mut self, other: HostListener) {
        if let Some(refs) = other.certificate_refs {
            let merged = self.certificate_refs.get_or_insert_with(Vec::new);
            for r in refs {
                push_unique(merged, r);
            }
        }
    }

    /// Listener names are `<prefix>http` and `<prefix>https`.
    fn into_listeners(self, prefix: &str) -> impl Iterator<Item = GatewayListeners> {
        let http = GatewayListeners {
            name: format!("{prefix}http"),
            hostname: self.hostname.clone(),
            port: HTTP_PORT,
            protocol: protocol::HTTP.to_string(),
            ..Default::default()
        };
        let https = self.certificate_refs.map(|refs| GatewayListeners {
            name: format!("{prefix}https"),
            hostname: self.hostname,
            port: HTTPS_PORT,
            protocol: protocol::HTTPS.to_string(),
            tls: Some(GatewayListenersTls {
                certificate_refs: Some(refs),
                ..Default::default()
            }),
            ..Default::default()
        });
        std::iter::once(http).chain(https)
    }
}

fn push_unique(
    refs: &mut Vec<GatewayListenersTlsCertificateRefs>,
    r: GatewayListenersTlsCertificateRefs,
) {
    if !refs.iter().any(|existing| existing.name == r.name) {
        refs.push(r);
    }
}

/// Builds one Gateway per `namespace/ingress-class` key from the listeners its
/// rule groups contributed.
///
/// Listeners for the same hostname are merged. Distinct hostnames that
/// sanitize to the same name, such as `a.com` and `*.a.com`, keep separate
/// listeners; all but the first are named with a numeric suffix.
pub(crate) fn consolidate(
    listeners_by_gateway: BTreeMap<String, Vec<HostListener>>,
    classes: &GatewayClassMap,
) -> (Vec<Gateway>, FieldErrors) {
    let mut gateways = vec![];
    let mut errors = FieldErrors::new();

    for (key, listeners) in listeners_by_gateway {
        let (namespace, ingress_class) = match key.split('/').collect::<Vec<_>>()[..] {
            [_, ""] => {
                errors.push(FieldError::invalid(
                    FieldPath::default(),
                    &key,
                    "empty ingress class",
                ));
                continue;
            }
            [namespace, ingress_class] => (namespace, ingress_class),
            _ => {
                errors.push(FieldError::invalid(
                    FieldPath::default(),
                    &key,
                    "gateway key must be of the form <namespace>/<ingress-class>",
                ));
                continue;
            }
        };

        let mut merged: Vec<HostListener> = vec![];
        for listener in listeners {
            match merged.iter_mut().find(|l| l.hostname == listener.hostname) {
                Some(existing) => existing.merge(listener),
                None => merged.push(listener),
            }
        }

        let mut names = UniqueNames::default();
        let mut gateway_listeners = vec![];
        for listener in merged {
            let prefix = match listener.hostname.as_deref() {
                Some(host) if !host.is_empty() => {
                    let name = name_from_host(host);
                    let unique = names.claim(name.clone());
                    if unique != name {
                        warn!(
                            gateway = %key,
                            hostname = %host,
                            listener = %unique,
                            "Listener name is taken by another hostname"
                        );
                    }
                    format!("{unique}-")
                }
                _ => String::new(),
            };
            gateway_listeners.extend(listener.into_listeners(&prefix));
        }

        let mut gateway = Gateway::new(
            ingress_class,
            GatewaySpec {
                gateway_class_name: classes.gateway_class_name(ingress_class).to_string(),
                listeners: gateway_listeners,
                ..Default::default()
            },
        );
        gateway.metadata = ObjectMeta {
            name: Some(ingress_class.to_string()),
            namespace: Some(namespace.to_string()),
            ..ObjectMeta::default()
        };
        gateways.push(gateway);
    }

    (gateways, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingress2gateway_k8s_api::IngressTLS;
    use pretty_assertions::assert_eq;

    fn group(host: &str, tls: Vec<IngressTLS>) -> IngressRuleGroup {
        IngressRuleGroup {
            namespace: "ns".to_string(),
            ingress_class: "nginx".to_string(),
            host: host.to_string(),
            tls,
            rules: vec![],
        }
    }

    fn tls(secret: &str, hosts: &[&str]) -> IngressTLS {
        IngressTLS {
            secret_name: Some(secret.to_string()),
            hosts: Some(hosts.iter().map(|h| h.to_string()).collect()),
        }
    }

    #[test]
    fn hostname_falls_back_to_single_tls_host() {
        let listener = HostListener::from_rule_group(&group("", vec![tls("s1", &["a.com"])]));
        assert_eq!(listener.hostname.as_deref(), Some("a.com"));

        let listener =
            HostListener::from_rule_group(&group("", vec![tls("s1", &["a.com", "b.com"])]));
        assert_eq!(listener.hostname, None);

        let listener = HostListener::from_rule_group(&group(
            "",
            vec![tls("s1", &["a.com"]), tls("s2", &["b.com"])],
        ));
        assert_eq!(listener.hostname, None);
        assert_eq!(
            listener.certificate_refs,
            Some(vec![secret_ref("s1"), secret_ref("s2")])
        );
    }

    #[test]
    fn certificate_refs_are_deduplicated() {
        let listener = HostListener::from_rule_group(&group(
            "a.com",
            vec![tls("s1", &["a.com"]), tls("s1", &["a.com"]), tls("s2", &[])],
        ));
        assert_eq!(
            listener.certificate_refs,
            Some(vec![secret_ref("s1"), secret_ref("s2")])
        );
    }

    #[test]
    fn https_listener_requires_tls() {
        let listeners = btreemap(
            "ns/nginx",
            vec![
                HostListener {
                    hostname: Some("a.com".to_string()),
                    certificate_refs: None,
                },
                HostListener {
                    hostname: None,
                    certificate_refs: None,
                },
            ],
        );
        let (gateways, errors) = consolidate(listeners, &GatewayClassMap::default());
        assert!(errors.is_empty());
        let names = gateways[0]
            .spec
            .listeners
            .iter()
            .map(|l| l.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a-com-http", "http"]);
    }

    #[test]
    fn listeners_for_same_hostname_are_merged() {
        let listeners = btreemap(
            "ns/nginx",
            vec![
                HostListener {
                    hostname: Some("a.com".to_string()),
                    certificate_refs: None,
                },
                HostListener {
                    hostname: Some("a.com".to_string()),
                    certificate_refs: Some(vec![secret_ref("s1")]),
                },
            ],
        );
        let (gateways, _) = consolidate(listeners, &GatewayClassMap::default());
        let listeners = &gateways[0].spec.listeners;
        assert_eq!(listeners.len(), 2);
        assert_eq!(listeners[0].name, "a-com-http");
        assert_eq!(listeners[1].name, "a-com-https");
        assert_eq!(listeners[1].port, 443);
        assert_eq!(listeners[1].protocol, "HTTPS");
    }

    #[test]
    fn hostnames_sharing_a_sanitized_name_get_unique_listener_names() {
        let listeners = btreemap(
            "ns/nginx",
            vec![
                HostListener {
                    hostname: Some("*.example.com".to_string()),
                    certificate_refs: Some(vec![secret_ref("wildcard")]),
                },
                HostListener {
                    hostname: Some("example.com".to_string()),
                    certificate_refs: None,
                },
                HostListener {
                    hostname: Some("example-com".to_string()),
                    certificate_refs: None,
                },
            ],
        );
        let (gateways, errors) = consolidate(listeners, &GatewayClassMap::default());
        assert!(errors.is_empty());
        let listeners = gateways[0]
            .spec
            .listeners
            .iter()
            .map(|l| (l.name.as_str(), l.hostname.as_deref().unwrap()))
            .collect::<Vec<_>>();
        assert_eq!(
            listeners,
            vec![
                ("example-com-http", "*.example.com"),
                ("example-com-https", "*.example.com"),
                ("example-com-2-http", "example.com"),
                ("example-com-3-http", "example-com"),
            ]
        );
    }

    #[test]
    fn malformed_gateway_keys_are_reported() {
        let mut listeners = btreemap("ns/a/b", vec![HostListener::default()]);
        listeners.insert("ns/".to_string(), vec![HostListener::default()]);
        listeners.insert("ns/nginx".to_string(), vec![HostListener::default()]);

        let (gateways, errors) = consolidate(listeners, &GatewayClassMap::default());
        assert_eq!(gateways.len(), 1);
        assert_eq!(gateways[0].metadata.name.as_deref(), Some("nginx"));
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].value, "ns/");
        assert_eq!(errors[0].detail, "empty ingress class");
        assert_eq!(errors[1].value, "ns/a/b");
        assert_eq!(
            errors[1].detail,
            "gateway key must be of the form <namespace>/<ingress-class>"
        );
    }

    #[test]
    fn gateway_class_is_mapped() {
        let classes = [("nginx".to_string(), "envoy".to_string())]
            .into_iter()
            .collect::<GatewayClassMap>();
        let (gateways, _) = consolidate(
            btreemap("ns/nginx", vec![HostListener::default()]),
            &classes,
        );
        assert_eq!(gateways[0].spec.gateway_class_name, "envoy");
        assert_eq!(classes.gateway_class_name("other"), "other");
    }

    #[test]
    fn parses_class_mappings() {
        assert_eq!(
            parse_class_mapping("nginx=envoy").unwrap(),
            ("nginx".to_string(), "envoy".to_string())
        );
        assert!(parse_class_mapping("nginx").is_err());
        assert!(parse_class_mapping("=envoy").is_err());
    }

    fn btreemap(key: &str, listeners: Vec<HostListener>) -> BTreeMap<String, Vec<HostListener>> {
        let mut map = BTreeMap::new();
        map.insert(key.to_string(), listeners);
        map
    }
}
