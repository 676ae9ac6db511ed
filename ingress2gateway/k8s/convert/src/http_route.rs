use crate::{
    aggregator::{DefaultBackend, IngressRef, IngressRuleGroup},
    keys::path_match_key,
    name::name_from_host,
    weight::calculate_backend_ref_weight,
};
use ahash::AHashMap as HashMap;
use ingress2gateway_core::{Extra, FieldError, FieldErrors, FieldPath};
use ingress2gateway_k8s_api::{
    gateway::{
        HTTPRoute, HTTPRouteParentRefs, HTTPRouteRules, HTTPRouteRulesBackendRefs,
        HTTPRouteRulesMatches, HTTPRouteRulesMatchesHeaders, HTTPRouteRulesMatchesHeadersType,
        HTTPRouteRulesMatchesPath, HTTPRouteRulesMatchesPathType, HTTPRouteSpec,
    },
    path_type, HTTPIngressPath, IngressBackend, ObjectMeta,
};

/// A single Ingress path, located within the Ingress it was read from.
#[derive(Clone, Debug)]
pub(crate) struct IngressPath<'a> {
    pub ingress: &'a IngressRef,
    pub rule_idx: usize,
    pub path_idx: usize,
    pub rule_type: &'static str,
    pub path: &'a HTTPIngressPath,
    pub extra: &'a Extra,
}

// === impl IngressPath ===

impl IngressPath<'_> {
    /// The path's location in its Ingress, e.g. `spec.rules[0].http.paths[1]`.
    pub(crate) fn field_path(&self) -> FieldPath {
        FieldPath::new("spec")
            .child("rules")
            .index(self.rule_idx)
            .child(self.rule_type)
            .child("paths")
            .index(self.path_idx)
    }

    /// Attributes an error to the path's Ingress.
    pub(crate) fn locate(&self, error: FieldError) -> FieldError {
        error.in_object(self.ingress)
    }

    fn match_key(&self) -> String {
        path_match_key(
            &self.path.path_type,
            self.path.path.as_deref().unwrap_or_default(),
            Some(self.extra),
        )
    }
}

// === impl IngressRuleGroup ===

impl IngressRuleGroup {
    /// Converts the rule group into a single HTTPRoute with one rule per
    /// distinct path match.
    ///
    /// A path match that cannot be converted is reported and omitted; the
    /// remaining rules are still produced.
    pub fn to_http_route(&self) -> (HTTPRoute, FieldErrors) {
        let mut errors = FieldErrors::new();
        let mut rules = vec![];

        for paths in self.paths_by_match_key() {
            // Every path in the group shares the fields the match is built
            // from, so the first one stands in for all of them.
            let path = &paths[0];
            let r#match = match to_http_route_match(path.path, path.extra, path.field_path()) {
                Ok(m) => m,
                Err(error) => {
                    errors.push(path.locate(error));
                    continue;
                }
            };

            let (backend_refs, errs) = calculate_backend_ref_weight(&paths);
            errors.extend(errs);

            rules.push(HTTPRouteRules {
                matches: Some(vec![r#match]),
                backend_refs: (!backend_refs.is_empty()).then_some(backend_refs),
                ..Default::default()
            });
        }

        let spec = HTTPRouteSpec {
            parent_refs: parent_refs(&self.ingress_class),
            hostnames: (!self.host.is_empty()).then(|| vec![self.host.clone()]),
            rules: (!rules.is_empty()).then_some(rules),
        };
        let route = http_route(name_from_host(&self.host), &self.namespace, spec);

        (route, errors)
    }

    /// Groups the paths of every rule by their path match key, keeping the
    /// order in which each key was first seen.
    pub(crate) fn paths_by_match_key(&self) -> Vec<Vec<IngressPath<'_>>> {
        let mut groups: Vec<Vec<IngressPath<'_>>> = vec![];
        let mut by_key = HashMap::<String, usize>::new();

        for rule in &self.rules {
            let Some(http) = rule.rule.http.as_ref() else {
                continue;
            };
            for (path_idx, path) in http.paths.iter().enumerate() {
                let path = IngressPath {
                    ingress: &rule.ingress,
                    rule_idx: rule.rule_idx,
                    path_idx,
                    rule_type: "http",
                    path,
                    extra: &rule.extra,
                };
                let idx = *by_key.entry(path.match_key()).or_insert_with(|| {
                    groups.push(vec![]);
                    groups.len() - 1
                });
                groups[idx].push(path);
            }
        }

        groups
    }
}

// === impl DefaultBackend ===

impl DefaultBackend {
    /// Converts the default backend into an HTTPRoute named
    /// `<ingress>-default-backend` with a single catch-all rule.
    pub fn to_http_route(&self) -> (HTTPRoute, FieldErrors) {
        let mut errors = FieldErrors::new();
        let field = FieldPath::new("spec").child("defaultBackend");

        let rules = match to_backend_ref(&self.backend, field) {
            Ok(backend_ref) => Some(vec![HTTPRouteRules {
                backend_refs: Some(vec![backend_ref]),
                ..Default::default()
            }]),
            Err(error) => {
                errors.push(error.in_object(&self.ingress));
                None
            }
        };

        let spec = HTTPRouteSpec {
            parent_refs: parent_refs(&self.ingress_class),
            hostnames: None,
            rules,
        };
        let route = http_route(
            format!("{}-default-backend", self.ingress.name),
            &self.ingress.namespace,
            spec,
        );

        (route, errors)
    }
}

fn http_route(name: String, namespace: &str, spec: HTTPRouteSpec) -> HTTPRoute {
    let mut route = HTTPRoute::new(&name, spec);
    route.metadata = ObjectMeta {
        name: Some(name),
        namespace: Some(namespace.to_string()),
        ..ObjectMeta::default()
    };
    route
}

fn parent_refs(ingress_class: &str) -> Option<Vec<HTTPRouteParentRefs>> {
    if ingress_class.is_empty() {
        return None;
    }
    Some(vec![HTTPRouteParentRefs {
        name: ingress_class.to_string(),
        ..Default::default()
    }])
}

/// Converts an Ingress path into an HTTPRoute match.
///
/// Only the `Prefix` and `Exact` path types can be expressed; any other type,
/// including `ImplementationSpecific`, is rejected. A canary header in `extra`
/// becomes a header match.
pub fn to_http_route_match(
    path: &HTTPIngressPath,
    extra: &Extra,
    field: FieldPath,
) -> Result<HTTPRouteRulesMatches, FieldError> {
    let r#type = match path.path_type.as_str() {
        path_type::PREFIX => HTTPRouteRulesMatchesPathType::PathPrefix,
        path_type::EXACT => HTTPRouteRulesMatchesPathType::Exact,
        unsupported => {
            return Err(FieldError::invalid(
                field.child("pathType"),
                unsupported,
                format!("unsupported path match type: {unsupported}"),
            ))
        }
    };

    let headers = extra
        .canary()
        .filter(|canary| !canary.header_key.is_empty())
        .map(|canary| {
            vec![HTTPRouteRulesMatchesHeaders {
                r#type: Some(if canary.header_regex_match {
                    HTTPRouteRulesMatchesHeadersType::RegularExpression
                } else {
                    HTTPRouteRulesMatchesHeadersType::Exact
                }),
                name: canary.header_key.clone(),
                value: canary.header_value.clone(),
            }]
        });

    Ok(HTTPRouteRulesMatches {
        path: Some(HTTPRouteRulesMatchesPath {
            r#type: Some(r#type),
            value: Some(path.path.clone().unwrap_or_default()),
        }),
        headers,
        ..Default::default()
    })
}

/// Converts an Ingress backend into an unweighted backend reference.
///
/// Service backends must use a numeric port. Resource backends are referenced
/// by group, kind, and name as given.
pub fn to_backend_ref(
    backend: &IngressBackend,
    field: FieldPath,
) -> Result<HTTPRouteRulesBackendRefs, FieldError> {
    if let Some(service) = backend.service.as_ref() {
        let port = service.port.as_ref();
        if let Some(name) = port
            .and_then(|port| port.name.as_deref())
            .filter(|name| !name.is_empty())
        {
            return Err(FieldError::invalid(
                field.child("service").child("port"),
                name,
                "named ports not supported",
            ));
        }
        return Ok(HTTPRouteRulesBackendRefs {
            name: service.name.clone(),
            port: port.and_then(|port| port.number),
            ..Default::default()
        });
    }

    match backend.resource.as_ref() {
        Some(resource) => Ok(HTTPRouteRulesBackendRefs {
            group: resource.api_group.clone(),
            kind: Some(resource.kind.clone()),
            name: resource.name.clone(),
            ..Default::default()
        }),
        None => Err(FieldError::required(
            field,
            "backend must reference a service or a resource",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::IngressRule;
    use ingress2gateway_core::{Canary, ErrorType};
    use ingress2gateway_k8s_api::{
        self as k8s, HTTPIngressRuleValue, IngressServiceBackend, ServiceBackendPort,
        TypedLocalObjectReference,
    };
    use pretty_assertions::assert_eq;

    fn service(name: &str, port: i32) -> IngressBackend {
        IngressBackend {
            service: Some(IngressServiceBackend {
                name: name.to_string(),
                port: Some(ServiceBackendPort {
                    number: Some(port),
                    name: None,
                }),
            }),
            resource: None,
        }
    }

    fn path(path_type: &str, path: &str, backend: IngressBackend) -> HTTPIngressPath {
        HTTPIngressPath {
            path: Some(path.to_string()),
            path_type: path_type.to_string(),
            backend,
        }
    }

    fn header_extra(key: &str, value: &str, regex: bool) -> Extra {
        Extra {
            canary: Some(Canary {
                enable: true,
                header_key: key.to_string(),
                header_value: value.to_string(),
                header_regex_match: regex,
                ..Canary::default()
            }),
        }
    }

    fn ingress(name: &str) -> IngressRef {
        IngressRef {
            namespace: "ns".to_string(),
            name: name.to_string(),
        }
    }

    fn rule(
        name: &str,
        rule_idx: usize,
        host: Option<&str>,
        paths: Vec<HTTPIngressPath>,
        extra: Extra,
    ) -> IngressRule {
        IngressRule {
            ingress: ingress(name),
            rule_idx,
            rule: k8s::IngressRule {
                host: host.map(str::to_string),
                http: Some(HTTPIngressRuleValue { paths }),
            },
            extra,
        }
    }

    #[test]
    fn prefix_and_exact_paths_match() {
        let m = to_http_route_match(
            &path("Prefix", "/api", service("svc", 80)),
            &Extra::default(),
            FieldPath::new("spec"),
        )
        .unwrap();
        assert_eq!(
            m,
            HTTPRouteRulesMatches {
                path: Some(HTTPRouteRulesMatchesPath {
                    r#type: Some(HTTPRouteRulesMatchesPathType::PathPrefix),
                    value: Some("/api".to_string()),
                }),
                ..Default::default()
            }
        );

        let m = to_http_route_match(
            &path("Exact", "/login", service("svc", 80)),
            &Extra::default(),
            FieldPath::new("spec"),
        )
        .unwrap();
        assert_eq!(
            m.path.unwrap().r#type,
            Some(HTTPRouteRulesMatchesPathType::Exact)
        );
    }

    #[test]
    fn implementation_specific_paths_are_rejected() {
        let error = to_http_route_match(
            &path("ImplementationSpecific", "/", service("svc", 80)),
            &Extra::default(),
            FieldPath::new("spec").child("rules").index(0),
        )
        .unwrap_err();
        assert_eq!(error.kind, ErrorType::Invalid);
        assert_eq!(error.field.to_string(), "spec.rules[0].pathType");
        assert_eq!(error.value, "ImplementationSpecific");
    }

    #[test]
    fn canary_headers_match() {
        let m = to_http_route_match(
            &path("Prefix", "/", service("svc", 80)),
            &header_extra("x-canary", "always", false),
            FieldPath::new("spec"),
        )
        .unwrap();
        assert_eq!(
            m.headers,
            Some(vec![HTTPRouteRulesMatchesHeaders {
                r#type: Some(HTTPRouteRulesMatchesHeadersType::Exact),
                name: "x-canary".to_string(),
                value: "always".to_string(),
            }])
        );

        let m = to_http_route_match(
            &path("Prefix", "/", service("svc", 80)),
            &header_extra("x-canary", "^v[0-9]$", true),
            FieldPath::new("spec"),
        )
        .unwrap();
        assert_eq!(
            m.headers.unwrap()[0].r#type,
            Some(HTTPRouteRulesMatchesHeadersType::RegularExpression)
        );
    }

    #[test]
    fn named_service_ports_are_rejected() {
        let backend = IngressBackend {
            service: Some(IngressServiceBackend {
                name: "svc".to_string(),
                port: Some(ServiceBackendPort {
                    name: Some("http".to_string()),
                    number: None,
                }),
            }),
            resource: None,
        };
        let error = to_backend_ref(&backend, FieldPath::new("backend")).unwrap_err();
        assert_eq!(error.field.to_string(), "backend.service.port");
        assert_eq!(error.value, "http");
    }

    #[test]
    fn resource_backends_are_referenced() {
        let backend = IngressBackend {
            service: None,
            resource: Some(TypedLocalObjectReference {
                api_group: Some("k8s.example.com".to_string()),
                kind: "StorageBucket".to_string(),
                name: "static-assets".to_string(),
            }),
        };
        assert_eq!(
            to_backend_ref(&backend, FieldPath::new("backend")).unwrap(),
            HTTPRouteRulesBackendRefs {
                group: Some("k8s.example.com".to_string()),
                kind: Some("StorageBucket".to_string()),
                name: "static-assets".to_string(),
                ..Default::default()
            }
        );

        let empty = IngressBackend::default();
        let error = to_backend_ref(&empty, FieldPath::new("backend")).unwrap_err();
        assert_eq!(error.kind, ErrorType::Required);
    }

    #[test]
    fn paths_group_by_type_value_and_header() {
        let group = IngressRuleGroup {
            namespace: "ns".to_string(),
            ingress_class: "nginx".to_string(),
            host: "a.com".to_string(),
            tls: vec![],
            rules: vec![
                rule(
                    "one",
                    0,
                    Some("a.com"),
                    vec![
                        path("Prefix", "/", service("a", 80)),
                        path("Exact", "/", service("b", 80)),
                    ],
                    Extra::default(),
                ),
                rule(
                    "two",
                    0,
                    Some("a.com"),
                    vec![path("Prefix", "/", service("c", 80))],
                    header_extra("x-canary", "always", false),
                ),
                rule(
                    "three",
                    4,
                    Some("a.com"),
                    vec![path("Prefix", "/", service("d", 80))],
                    Extra::default(),
                ),
            ],
        };

        let groups = group.paths_by_match_key();
        let backends = groups
            .iter()
            .map(|paths| {
                paths
                    .iter()
                    .map(|p| p.path.backend.service.as_ref().unwrap().name.as_str())
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        assert_eq!(backends, vec![vec!["a", "d"], vec!["b"], vec!["c"]]);

        // Paths are located within their own Ingress, not the rule group.
        assert_eq!(groups[0][1].ingress.to_string(), "ns/three");
        assert_eq!(
            groups[0][1].field_path().to_string(),
            "spec.rules[4].http.paths[0]"
        );
    }

    #[test]
    fn unsupported_paths_do_not_block_other_rules() {
        let group = IngressRuleGroup {
            namespace: "ns".to_string(),
            ingress_class: "".to_string(),
            host: "".to_string(),
            tls: vec![],
            rules: vec![rule(
                "app",
                2,
                None,
                vec![
                    path("ImplementationSpecific", "/x", service("a", 80)),
                    path("Prefix", "/y", service("b", 80)),
                ],
                Extra::default(),
            )],
        };

        let (route, errors) = group.to_http_route();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].object.as_deref(), Some("ns/app"));
        assert_eq!(
            errors[0].field.to_string(),
            "spec.rules[2].http.paths[0].pathType"
        );
        assert_eq!(route.metadata.name.as_deref(), Some("all-hosts"));
        assert_eq!(route.spec.parent_refs, None);
        assert_eq!(route.spec.hostnames, None);
        assert_eq!(route.spec.rules.unwrap().len(), 1);
    }

    #[test]
    fn default_backend_route_with_named_port_has_no_rules() {
        let db = DefaultBackend {
            ingress: ingress("app"),
            ingress_class: "nginx".to_string(),
            backend: IngressBackend {
                service: Some(IngressServiceBackend {
                    name: "svc".to_string(),
                    port: Some(ServiceBackendPort {
                        name: Some("http".to_string()),
                        number: None,
                    }),
                }),
                resource: None,
            },
        };
        let (route, errors) = db.to_http_route();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].object.as_deref(), Some("ns/app"));
        assert_eq!(
            errors[0].field.to_string(),
            "spec.defaultBackend.service.port"
        );
        assert_eq!(route.metadata.name.as_deref(), Some("app-default-backend"));
        assert_eq!(route.spec.rules, None);
    }
}
