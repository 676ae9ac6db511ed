use crate::{
    aggregator::Aggregator,
    gateway::{consolidate, GatewayClassMap, HostListener},
    keys::gateway_key,
    name::UniqueNames,
};
use ahash::AHashMap as HashMap;
use ingress2gateway_core::FieldErrors;
use ingress2gateway_k8s_api::{
    gateway::{Gateway, HTTPRoute},
    ResourceExt,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// The resources built from all aggregated Ingresses, sorted by namespace and
/// name, along with every field error encountered while building them.
#[derive(Clone, Debug, Default)]
pub struct Output {
    pub http_routes: Vec<HTTPRoute>,
    pub gateways: Vec<Gateway>,
    pub errors: FieldErrors,
}

// === impl Aggregator ===

impl Aggregator {
    /// Builds HTTPRoutes and Gateways from the aggregated rule groups and
    /// default backends.
    ///
    /// HTTPRoute names are unique within a namespace: when two routes would
    /// share a name, as `a.com` and `*.a.com` do, the later one in rule group
    /// order is given a numeric suffix.
    pub fn build(&self, classes: &GatewayClassMap) -> Output {
        let mut http_routes = vec![];
        let mut errors = FieldErrors::new();
        let mut listeners_by_gateway = BTreeMap::<String, Vec<HostListener>>::new();
        let mut route_names = HashMap::<String, UniqueNames>::new();

        for group in self.rule_groups() {
            listeners_by_gateway
                .entry(gateway_key(&group.namespace, &group.ingress_class))
                .or_default()
                .push(HostListener::from_rule_group(group));

            let (mut route, errs) = group.to_http_route();
            claim_name(&mut route, &mut route_names);
            debug!(
                namespace = %group.namespace,
                host = %group.host,
                route = %route.name_any(),
                errors = errs.len(),
                "Built HTTPRoute"
            );
            http_routes.push(route);
            errors.extend(errs);
        }

        for backend in self.default_backends() {
            let (mut route, errs) = backend.to_http_route();
            claim_name(&mut route, &mut route_names);
            http_routes.push(route);
            errors.extend(errs);
        }

        let (mut gateways, errs) = consolidate(listeners_by_gateway, classes);
        errors.extend(errs);

        http_routes.sort_by(|a, b| object_key(a).cmp(&object_key(b)));
        gateways.sort_by(|a, b| object_key(a).cmp(&object_key(b)));

        Output {
            http_routes,
            gateways,
            errors,
        }
    }
}

fn claim_name(route: &mut HTTPRoute, names: &mut HashMap<String, UniqueNames>) {
    let namespace = route.namespace().unwrap_or_default();
    let name = route.name_any();
    let unique = names.entry(namespace.clone()).or_default().claim(name.clone());
    if unique != name {
        warn!(%namespace, %name, route = %unique, "HTTPRoute name is taken; renamed");
        route.metadata.name = Some(unique);
    }
}

fn object_key<K: ResourceExt>(obj: &K) -> (String, String) {
    (obj.namespace().unwrap_or_default(), obj.name_any())
}
