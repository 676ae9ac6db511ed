//! `gateway.networking.k8s.io/v1` resources, from the standard channel.

pub use gateway_api::apis::standard::{
    gateways::{
        Gateway, GatewayListeners, GatewayListenersTls, GatewayListenersTlsCertificateRefs,
        GatewaySpec,
    },
    httproutes::{
        HTTPRoute, HTTPRouteParentRefs, HTTPRouteRules, HTTPRouteRulesBackendRefs,
        HTTPRouteRulesMatches, HTTPRouteRulesMatchesHeaders, HTTPRouteRulesMatchesHeadersType,
        HTTPRouteRulesMatchesPath, HTTPRouteRulesMatchesPathType, HTTPRouteSpec,
    },
};

pub const GROUP: &str = "gateway.networking.k8s.io";

/// Listener protocols.
pub mod protocol {
    pub const HTTP: &str = "HTTP";
    pub const HTTPS: &str = "HTTPS";
}

pub const HTTP_PORT: i32 = 80;
pub const HTTPS_PORT: i32 = 443;

/// References a `Secret` holding a TLS certificate.
pub fn secret_ref(name: impl Into<String>) -> GatewayListenersTlsCertificateRefs {
    GatewayListenersTlsCertificateRefs {
        name: name.into(),
        ..Default::default()
    }
}
