/// Multinomial-logit choice probabilities for a set of alternative path costs:
/// `P(i) = exp(-theta * c_i) / sum_j exp(-theta * c_j)`.
///
/// Costs are shifted by their minimum before exponentiating, which leaves the probabilities
/// unchanged but keeps long paths from underflowing to zero.  Returns `None` when no path
/// has a finite cost (every alternative is impassable); an empty input yields an empty vector.
pub fn logit_probabilities(costs: &[f64], theta: f64) -> Option<Vec<f64>> {
    if costs.is_empty() {
        return Some(vec![]);
    }
    let min_cost = costs.iter().cloned().fold(f64::INFINITY, f64::min);
    if ! min_cost.is_finite() {
        return None;
    }

    let weights: Vec<f64> = costs.iter().map(|cc| (-theta * (cc - min_cost)).exp()).collect();
    // the cheapest path contributes exp(0) = 1, so the sum is at least 1
    let total: f64 = weights.iter().sum();
    Some(weights.iter().map(|ww| ww / total).collect())
}
