#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod gateway;

pub use k8s_openapi::api::{
    self,
    core::v1::TypedLocalObjectReference,
    networking::v1::{
        HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
        IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
    },
};
pub use kube::{core::ObjectMeta, Resource, ResourceExt};

/// The legacy annotation naming an Ingress's class, superseded by
/// `spec.ingressClassName`.
pub const INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";

/// The `pathType` values defined by `networking.k8s.io/v1`.
pub mod path_type {
    pub const EXACT: &str = "Exact";
    pub const PREFIX: &str = "Prefix";
    pub const IMPLEMENTATION_SPECIFIC: &str = "ImplementationSpecific";
}
