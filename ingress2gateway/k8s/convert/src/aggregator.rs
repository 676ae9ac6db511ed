use crate::{keys::rule_group_key, Provider};
use ingress2gateway_core::{Extra, FieldErrors};
use ingress2gateway_k8s_api::{
    self as k8s, Ingress, IngressBackend, IngressSpec, IngressTLS, ResourceExt,
    INGRESS_CLASS_ANNOTATION,
};
use std::{collections::BTreeMap, fmt};
use tracing::debug;

/// Accumulates Ingress rules into rule groups keyed by namespace, ingress
/// class, and host.
///
/// Ingresses are added one at a time with [`Aggregator::add_ingress`]; once all
/// Ingresses have been added, [`Aggregator::build`] produces the HTTPRoutes and
/// Gateways.
#[derive(Debug, Default)]
pub struct Aggregator {
    provider: Provider,
    rule_groups: BTreeMap<String, IngressRuleGroup>,
    default_backends: Vec<DefaultBackend>,
}

/// All rules sharing a `(namespace, ingress class, host)`. Each rule group
/// becomes one HTTPRoute.
#[derive(Clone, Debug, PartialEq)]
pub struct IngressRuleGroup {
    pub namespace: String,
    pub ingress_class: String,
    pub host: String,

    /// TLS blocks of every Ingress contributing a rule, in the order added.
    /// Repeats are kept here.
    pub tls: Vec<IngressTLS>,

    pub rules: Vec<IngressRule>,
}

/// Names the Ingress a rule or default backend was read from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct IngressRef {
    pub namespace: String,
    pub name: String,
}

/// An Ingress rule paired with the metadata extracted from its Ingress.
#[derive(Clone, Debug, PartialEq)]
pub struct IngressRule {
    pub ingress: IngressRef,

    /// The rule's index in its Ingress's `spec.rules`.
    pub rule_idx: usize,

    pub rule: k8s::IngressRule,
    pub extra: Extra,
}

/// An Ingress's `spec.defaultBackend`. Each one becomes a dedicated HTTPRoute.
#[derive(Clone, Debug, PartialEq)]
pub struct DefaultBackend {
    pub ingress: IngressRef,
    pub ingress_class: String,
    pub backend: IngressBackend,
}

/// Resolves an Ingress's class: `spec.ingressClassName` when set, otherwise
/// the legacy `kubernetes.io/ingress.class` annotation when present,
/// otherwise the Ingress's own name.
pub fn ingress_class(ingress: &Ingress) -> String {
    if let Some(name) = ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.ingress_class_name.as_deref())
        .filter(|name| !name.is_empty())
    {
        return name.to_string();
    }

    if let Some(class) = ingress.annotations().get(INGRESS_CLASS_ANNOTATION) {
        return class.clone();
    }

    ingress.name_any()
}

// === impl IngressRef ===

impl fmt::Display for IngressRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

// === impl Aggregator ===

impl Aggregator {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            ..Self::default()
        }
    }

    /// Adds all rules and the default backend of an Ingress.
    ///
    /// If the Ingress's annotations cannot be read, none of its rules are
    /// added and the errors are returned. Its default backend is recorded
    /// either way.
    pub fn add_ingress(&mut self, ingress: &Ingress) -> FieldErrors {
        let source = IngressRef {
            namespace: ingress.namespace().unwrap_or_default(),
            name: ingress.name_any(),
        };
        let ingress_class = ingress_class(ingress);
        let spec = ingress.spec.clone().unwrap_or_default();

        let (extra, errors) = self.provider.extract(ingress.metadata.annotations.as_ref());
        let errors = errors
            .into_iter()
            .map(|error| error.in_object(&source))
            .collect::<FieldErrors>();

        if let Some(backend) = spec.default_backend.clone() {
            self.default_backends.push(DefaultBackend {
                ingress: source.clone(),
                ingress_class: ingress_class.clone(),
                backend,
            });
        }

        if !errors.is_empty() {
            debug!(ingress = %source, errors = errors.len(), "Skipping rules of Ingress");
            return errors;
        }

        let rules = spec.rules.as_deref().unwrap_or_default();
        for (rule_idx, rule) in rules.iter().enumerate() {
            self.add_ingress_rule(&source, &ingress_class, rule_idx, rule, &spec, &extra);
        }
        debug!(ingress = %source, %ingress_class, rules = rules.len(), "Added Ingress");

        errors
    }

    /// Appends a rule to its rule group, creating the group if needed.
    ///
    /// Every TLS block of the Ingress is appended to the group as well, even
    /// when another rule of the same Ingress already contributed it.
    pub fn add_ingress_rule(
        &mut self,
        ingress: &IngressRef,
        ingress_class: &str,
        rule_idx: usize,
        rule: &k8s::IngressRule,
        spec: &IngressSpec,
        extra: &Extra,
    ) {
        let namespace = ingress.namespace.as_str();
        let host = rule.host.as_deref().unwrap_or_default();
        let group = self
            .rule_groups
            .entry(rule_group_key(namespace, ingress_class, host))
            .or_insert_with(|| IngressRuleGroup {
                namespace: namespace.to_string(),
                ingress_class: ingress_class.to_string(),
                host: host.to_string(),
                tls: vec![],
                rules: vec![],
            });

        group.tls.extend(spec.tls.iter().flatten().cloned());
        group.rules.push(IngressRule {
            ingress: ingress.clone(),
            rule_idx,
            rule: rule.clone(),
            extra: extra.clone(),
        });
    }

    /// Rule groups, ordered by their grouping key.
    pub fn rule_groups(&self) -> impl Iterator<Item = &IngressRuleGroup> {
        self.rule_groups.values()
    }

    pub fn default_backends(&self) -> &[DefaultBackend] {
        &self.default_backends
    }
}
