//! Ingress to Gateway API conversion.
//!
//! Ingresses are folded into an [`Aggregator`] one at a time. Rules are grouped
//! by namespace, ingress class, and host:
//!
//! - Each rule group becomes one `HTTPRoute`. Within a group, paths sharing a
//!   path type, path value, and canary header become one route rule whose
//!   backends are weighted from the ingress-nginx canary annotations.
//! - Each namespace and ingress class pair becomes one `Gateway`, with an HTTP
//!   listener per hostname and an HTTPS listener for hostnames served with TLS.
//! - Each `spec.defaultBackend` becomes its own `HTTPRoute`.
//!
//! ```text
//! [ Ingress ] -> [ IngressRuleGroup ] -> [ HTTPRoute ]
//!                        \-------------> [ Gateway ]
//! ```
//!
//! Problems with individual fields are collected as [`FieldError`]s and
//! returned alongside everything that could still be converted.
//!
//! [`FieldError`]: ingress2gateway_core::FieldError

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod aggregator;
mod extra;
mod gateway;
mod http_route;
pub mod keys;
mod name;
mod output;
mod weight;


pub use self::{
    aggregator::{
        ingress_class, Aggregator, DefaultBackend, IngressRef, IngressRule, IngressRuleGroup,
    },
    extra::{nginx, nginx_extra, Provider},
    gateway::{parse_class_mapping, GatewayClassMap},
    http_route::{to_backend_ref, to_http_route_match},
    name::name_from_host,
    output::Output,
};
