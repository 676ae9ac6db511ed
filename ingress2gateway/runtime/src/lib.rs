#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use ingress2gateway_core as core;
pub use ingress2gateway_k8s_api as k8s;
pub use ingress2gateway_k8s_convert as convert;

mod args;
mod manifest;
mod render;

pub use self::{
    args::Args,
    manifest::{parse_ingresses, read_ingresses},
    render::{render, OutputFormat},
};

use self::{
    convert::{Aggregator, GatewayClassMap, Output, Provider},
    k8s::Ingress,
};
use tracing::debug;

/// Converts a batch of Ingresses into Gateway API resources.
///
/// Errors raised while reading an Ingress's annotations are reported ahead of
/// those raised while building routes and gateways.
pub fn convert_ingresses(
    ingresses: &[Ingress],
    provider: Provider,
    classes: &GatewayClassMap,
) -> Output {
    let mut aggregator = Aggregator::new(provider);
    let mut errors = vec![];
    for ingress in ingresses {
        errors.extend(aggregator.add_ingress(ingress));
    }

    let mut output = aggregator.build(classes);
    debug!(
        ingresses = ingresses.len(),
        routes = output.http_routes.len(),
        gateways = output.gateways.len(),
        "Converted"
    );
    errors.append(&mut output.errors);
    output.errors = errors;
    output
}
