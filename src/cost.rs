// The BPR (Bureau of Public Roads) congestion function and the aggregate costs built on it.

pub const DEFAULT_ALPHA: f64 = 0.15;
pub const DEFAULT_POWER: f64 = 4.0;


/// Travel time on a link carrying `flow`.  Infinite when the capacity is exactly zero.
pub fn bpr_travel_time(free_flow_time: f64, flow: f64, capacity: f64, alpha: f64, power: f64)
                       -> f64 {
    if capacity == 0. {
        return f64::INFINITY;
    }
    free_flow_time * (1. + alpha * (flow / capacity).powf(power))
}

/// Integral of the BPR function from 0 to `flow`; the per-link term of the Beckmann objective.
/// Zero-capacity links contribute nothing.
pub fn bpr_integral(free_flow_time: f64, flow: f64, capacity: f64, alpha: f64, power: f64)
                    -> f64 {
    if capacity == 0. {
        return 0.;
    }
    let exponent = power + 1.;
    free_flow_time * (flow + alpha * flow.powf(exponent) / (exponent * capacity.powf(power)))
}

/// Sum of the given per-link times over the links of a path.
pub fn path_cost(link_ids: &[usize], link_times: &[f64]) -> f64 {
    link_ids.iter().map(|&link_id| link_times[link_id]).sum()
}

/// `flow * cost`, except that zero flow on an infinite cost counts as zero rather than NaN.
pub fn flow_times_cost(flow: f64, cost: f64) -> f64 {
    if flow == 0. {
        0.
    } else {
        flow * cost
    }
}
