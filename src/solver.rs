// Logit-based stochastic user equilibrium, solved by a self-adaptive averaging scheme over the
// link flow vector.
use std::fs::File;
use std::time::{Duration, Instant};

use ndarray::prelude::*;

use super::cost;
use super::error::Result;
use super::network::RoadNetwork;
use super::route_choice::logit_probabilities;
use super::shortest_path::floyd_warshall;


#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolveOutcome {
    /// The direction norm reached the tolerance.
    Converged { iterations: usize, norm: f64 },
    /// The direction norm stopped changing (or became non-finite) above the tolerance.
    Stalled { iteration: usize, norm: f64 },
    /// The caller's iteration guard was hit first.
    IterationLimit { iterations: usize, norm: f64 },
}

impl SolveOutcome {
    pub fn is_converged(&self) -> bool {
        match self {
            SolveOutcome::Converged{..} => true,
            _ => false,
        }
    }

    pub fn norm(&self) -> f64 {
        match self {
            SolveOutcome::Converged{norm, ..} => *norm,
            SolveOutcome::Stalled{norm, ..} => *norm,
            SolveOutcome::IterationLimit{norm, ..} => *norm,
        }
    }

    pub fn iterations(&self) -> usize {
        match self {
            SolveOutcome::Converged{iterations, ..} => *iterations,
            SolveOutcome::Stalled{iteration, ..} => *iteration,
            SolveOutcome::IterationLimit{iterations, ..} => *iterations,
        }
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct SolveStats {
    pub outcome: SolveOutcome,
    // 1 - (sum of demand * shortest OD cost) / (sum of link flow * link travel time).  Shortest
    // costs come from the distance matrix, which keeps the lowest link times seen since it was
    // last reset.
    pub ue_gap: f64,
    pub avg_flow: f64,
    // mean over links of free-flow time / travel time
    pub avg_speed_ratio: f64,
    // sum over paths of flow * cost
    pub total_cost: f64,
    // sum over links of the integral of the BPR function up to the link's flow
    pub objective: f64,
    // OD pairs with positive demand that no usable path carries
    pub unsatisfied_od_pairs: Vec<usize>,
    pub cpu_time: Duration,
}


/// Writes `iteration,directionNorm,elapsedSeconds` rows, if a log path was configured.
struct ConvergenceLog {
    writer: Option<csv::Writer<File>>,
}

impl ConvergenceLog {
    fn open(network: &RoadNetwork) -> Result<ConvergenceLog> {
        let writer = match &network.convergence_log {
            Some(path) => Some(csv::WriterBuilder::new().has_headers(false).from_path(path)?),
            None => None,
        };
        Ok(ConvergenceLog{writer})
    }

    fn record(&mut self, iteration: usize, norm: f64, elapsed: Duration) -> Result<()> {
        if let Some(writer) = &mut self.writer {
            writer.write_record(&[iteration.to_string(), norm.to_string(),
                                  elapsed.as_secs_f64().to_string()])?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(writer) = &mut self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}


impl RoadNetwork {
    /// Runs the assignment on the current paths until the link flow update vanishes or stalls.
    ///
    /// Each iteration re-times every link from the current flows, re-costs the paths, splits
    /// each OD pair's demand over its paths by logit choice, and moves the link flows a step
    /// of `1 / beta` towards the resulting flows.  `beta` grows by `ita` when the update norm
    /// fails to shrink and by `gama` when it shrinks.  The loop ends when the norm is at or
    /// below the tolerance, when it repeats exactly (a stall), or at the optional iteration
    /// guard.  The UE gap is computed every iteration but only reported.
    ///
    /// Only fails if the convergence log cannot be written.
    pub fn solve(&mut self) -> Result<SolveOutcome> {
        let started = Instant::now();
        let params = self.params.clone();
        self.ensure_distance_matrix();
        let num_nodes = self.nodes.len();
        for link in self.links.iter_mut() {
            link.od_demand_satisfied = vec![[0, 0]; num_nodes];
        }

        // initial costs come from free-flow times alone
        let free_flow_times: Vec<f64> = self.links.iter().map(|ll| ll.free_flow_time).collect();
        self.update_path_costs(&free_flow_times);
        let mut unsatisfied = self.update_path_flows();
        let mut link_flow = self.aggregate_link_flows();
        let mut norm = link_flow.dot(&link_flow).sqrt();

        let mut conv_log = ConvergenceLog::open(self)?;
        let mut beta = 1.0;
        let mut iteration = 0;
        let mut ue_gap = 0.;
        log::info!("solving: {} links, {} paths, initial norm {}", self.links.len(),
                   self.paths.len(), norm);

        let outcome = loop {
            if ! (norm > params.tolerance) {
                if norm.is_finite() {
                    break SolveOutcome::Converged{iterations: iteration, norm};
                }
                log::warn!("direction norm became {} at iteration {}", norm, iteration);
                break SolveOutcome::Stalled{iteration, norm};
            }
            if let Some(max_iterations) = params.max_iterations {
                if iteration >= max_iterations {
                    log::warn!("stopping after {} iterations with norm {}", iteration, norm);
                    break SolveOutcome::IterationLimit{iterations: iteration, norm};
                }
            }
            iteration += 1;

            // re-time the links, tightening the recorded direct distances as we go
            for (link, flow) in self.links.iter_mut().zip(link_flow.iter()) {
                link.travel_time = link.congested_time(*flow);
                let direct = &mut self.distance_matrix[[link.from_node, link.to_node]];
                if link.travel_time < *direct {
                    *direct = link.travel_time;
                }
            }
            let travel_times = self.link_travel_times();
            self.update_path_costs(&travel_times);
            unsatisfied = self.update_path_flows();

            let direction = &link_flow - &self.aggregate_link_flows();
            let new_norm = direction.dot(&direction).sqrt();
            if new_norm >= norm {
                beta += params.ita;
            } else {
                beta += params.gama;
            }
            let last_norm = norm;
            norm = new_norm;
            let step = 1. / beta;
            link_flow.scaled_add(-step, &direction);

            ue_gap = self.ue_gap(&link_flow);
            log::debug!("iteration {}: norm {}, step {}, gap {}", iteration, norm, step, ue_gap);
            conv_log.record(iteration, norm, started.elapsed())?;

            // the first comparison is against the initial flow norm, not an update norm
            if iteration > 1 && norm == last_norm && norm > params.tolerance {
                log::warn!("direction norm stalled at {} after {} iterations; not converged",
                           norm, iteration);
                break SolveOutcome::Stalled{iteration, norm};
            }
        };
        conv_log.finish()?;

        self.finalize(&link_flow, outcome, ue_gap, unsatisfied, started);
        Ok(outcome)
    }

    fn update_path_costs(&mut self, link_times: &[f64]) {
        for path in self.paths.iter_mut() {
            path.cost = cost::path_cost(&path.links, link_times);
        }
    }

    /// Recomputes each OD pair's choice probabilities and path flows from the path costs.
    /// Returns the OD pairs with positive demand left without a usable path.
    fn update_path_flows(&mut self) -> Vec<usize> {
        let theta = self.params.theta;
        let mut unsatisfied = vec![];
        let paths = &mut self.paths;
        for od_pair in self.od_pairs.iter_mut() {
            if od_pair.path_ids.is_empty() {
                if od_pair.demand > 0. {
                    unsatisfied.push(od_pair.id);
                }
                continue;
            }
            let costs: Vec<f64> = od_pair.path_ids.iter()
                .map(|&path_id| paths[path_id].cost).collect();
            od_pair.choice_probs = match logit_probabilities(&costs, theta) {
                Some(probs) => probs,
                None => {
                    // every path is impassable
                    if od_pair.demand > 0. {
                        unsatisfied.push(od_pair.id);
                    }
                    vec![0.; costs.len()]
                }
            };
            for (&path_id, prob) in od_pair.path_ids.iter().zip(&od_pair.choice_probs) {
                paths[path_id].flow = od_pair.demand * prob;
            }
        }
        unsatisfied
    }

    fn aggregate_link_flows(&self) -> Array<f64, Ix1> {
        let mut flows = Array::zeros(self.links.len());
        for path in &self.paths {
            for &link_id in &path.links {
                flows[link_id] += path.flow;
            }
        }
        flows
    }

    /// Re-times the links from `link_flow`, brings the distance matrix up to date, and returns
    /// the relative gap between the system travel time and the all-shortest-paths cost.
    /// Impassable links and unreachable OD pairs are left out of the sums.
    fn ue_gap(&mut self, link_flow: &Array<f64, Ix1>) -> f64 {
        let mut system_time = 0.;
        for (link, flow) in self.links.iter_mut().zip(link_flow.iter()) {
            link.travel_time = link.congested_time(*flow);
            let term = cost::flow_times_cost(*flow, link.travel_time);
            if term.is_finite() {
                system_time += term;
            }
        }

        floyd_warshall(&mut self.distance_matrix);
        let mut shortest_time = 0.;
        for od_pair in &self.od_pairs {
            let od_cost = self.distance_matrix[[od_pair.origin, od_pair.destination]];
            let term = cost::flow_times_cost(od_pair.demand, od_cost);
            if term.is_finite() {
                shortest_time += term;
            }
        }

        if system_time > 0. {
            1. - shortest_time / system_time
        } else {
            0.
        }
    }

    fn finalize(&mut self, link_flow: &Array<f64, Ix1>, outcome: SolveOutcome, ue_gap: f64,
                unsatisfied: Vec<usize>, started: Instant) {
        for (link, flow) in self.links.iter_mut().zip(link_flow.iter()) {
            link.flow = *flow;
            link.travel_time = link.congested_time(*flow);
        }

        // record how much of each origin's and destination's demand each link carries
        for path in &self.paths {
            let od_pair = &self.od_pairs[path.od_pair_id];
            let satisfied = path.flow.floor() as u64;
            for &link_id in &path.links {
                let acc = &mut self.links[link_id].od_demand_satisfied;
                acc[od_pair.origin][0] += satisfied;
                acc[od_pair.destination][1] += satisfied;
            }
        }

        let mut objective = 0.;
        let mut flow_sum = 0.;
        let mut speed_ratio_sum = 0.;
        for link in &self.links {
            objective += cost::bpr_integral(link.free_flow_time, link.flow, link.capacity,
                                            link.alpha, link.power);
            flow_sum += link.flow;
            speed_ratio_sum += if link.travel_time > 0. {
                link.free_flow_time / link.travel_time
            } else {
                1.
            };
        }
        let total_cost: f64 = self.paths.iter()
            .map(|path| cost::flow_times_cost(path.flow, path.cost)).sum();
        let num_links = self.links.len().max(1) as f64;

        for &od_id in &unsatisfied {
            let od_pair = &self.od_pairs[od_id];
            log::warn!("demand {} from node {} to node {} is not satisfied", od_pair.demand,
                       od_pair.origin, od_pair.destination);
        }

        let stats = SolveStats {
            outcome,
            ue_gap,
            avg_flow: flow_sum / num_links,
            avg_speed_ratio: speed_ratio_sum / num_links,
            total_cost,
            objective,
            unsatisfied_od_pairs: unsatisfied,
            cpu_time: started.elapsed(),
        };
        log::info!("Objective Function: {}", stats.objective);
        log::info!("Total Impedance: {}", stats.total_cost);
        log::info!("LogitSUE end ({:?}), CPU time: {:?}", stats.outcome, stats.cpu_time);
        self.stats = Some(stats);
    }
}
