use crate::http_route::{to_backend_ref, IngressPath};
use ingress2gateway_core::{FieldErrors, DEFAULT_WEIGHT_TOTAL};
use ingress2gateway_k8s_api::gateway::HTTPRouteRulesBackendRefs;
use tracing::warn;

/// Builds the backend references for all paths sharing a path match key.
///
/// Backends of canary paths take their canary weight. When some but not all
/// backends are weighted, the remainder of the weight total is split evenly
/// (rounding down) across the unweighted backends, and no backend ends up
/// above the total. When no backend is weighted, none is given a weight.
///
/// The weight total is 100 unless a weighted canary path overrides it; the
/// last override wins.
pub(crate) fn calculate_backend_ref_weight(
    paths: &[IngressPath<'_>],
) -> (Vec<HTTPRouteRulesBackendRefs>, FieldErrors) {
    let mut errors = FieldErrors::new();
    let mut backend_refs = Vec::with_capacity(paths.len());

    let mut weight_total = DEFAULT_WEIGHT_TOTAL;
    let mut weight_total_override = None;
    let mut total_weight_set = 0i32;
    let mut num_weighted = 0usize;

    for path in paths {
        let mut backend_ref =
            match to_backend_ref(&path.path.backend, path.field_path().child("backend")) {
                Ok(backend_ref) => backend_ref,
                Err(error) => {
                    errors.push(path.locate(error));
                    continue;
                }
            };

        if let Some(canary) = path.extra.canary().filter(|c| c.weight != 0) {
            backend_ref.weight = Some(canary.weight);
            total_weight_set = total_weight_set.saturating_add(canary.weight);
            num_weighted += 1;

            if canary.weight_total > 0 {
                if let Some(previous) = weight_total_override.filter(|t| *t != canary.weight_total)
                {
                    warn!(
                        ingress = %path.ingress,
                        previous,
                        weight_total = canary.weight_total,
                        backend = %backend_ref.name,
                        "Conflicting canary weight totals; using the last one"
                    );
                }
                weight_total_override = Some(canary.weight_total);
                weight_total = canary.weight_total;
            }
        }

        backend_refs.push(backend_ref);
    }

    let num_unweighted = backend_refs.len() - num_weighted;
    if num_weighted > 0 && num_unweighted > 0 {
        let remaining = weight_total.saturating_sub(total_weight_set);
        let weight_to_set = (remaining / num_unweighted as i32).max(0);
        for backend_ref in backend_refs.iter_mut().filter(|b| b.weight.is_none()) {
            backend_ref.weight = Some(weight_to_set);
        }
    }

    for weight in backend_refs.iter_mut().filter_map(|b| b.weight.as_mut()) {
        if *weight > weight_total {
            *weight = weight_total;
        }
    }

    (backend_refs, errors)
}
