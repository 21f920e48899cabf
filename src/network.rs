// This file defines the road network that the assignment runs on: an arena of nodes and links
// addressed by contiguous integer ids, the OD pairs with their demands, and the paths serving
// them.
use std::collections::HashSet;
use std::path::PathBuf;

use ndarray::prelude::*;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::DiGraph;

use super::cost;
use super::error::{NetworkError, Result};
use super::geometry::{mean_geo_coord, GeoCoord, Point2d};
use super::shortest_path;
use super::solver::SolveStats;


/// Free-flow times must be finite and non-negative.
pub(crate) fn check_free_flow_time(free_flow_time: f64) -> Result<()> {
    if free_flow_time.is_finite() && free_flow_time >= 0. {
        Ok(())
    } else {
        Err(NetworkError::InvalidValue{name: "free-flow time", value: free_flow_time})
    }
}

/// Capacities must be non-negative.  An infinite capacity never congests.
pub(crate) fn check_capacity(capacity: f64) -> Result<()> {
    if capacity >= 0. {
        Ok(())
    } else {
        Err(NetworkError::InvalidValue{name: "capacity", value: capacity})
    }
}

pub(crate) fn check_demand(demand: f64) -> Result<()> {
    if demand.is_finite() && demand >= 0. {
        Ok(())
    } else {
        Err(NetworkError::InvalidValue{name: "demand", value: demand})
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct Node {
    pub id: usize,
    pub position: Point2d,
    pub geo: GeoCoord,
    // whether this node is the origin of some OD pair
    pub is_origin: bool,
    // whether this node is the origin or destination of some OD pair
    pub is_od: bool,
    // whether the node has at most two distinct neighbours
    pub binary_ways: bool,
    pub incoming_links: Vec<usize>,
    pub outgoing_links: Vec<usize>,
}

impl Node {
    pub fn new(id: usize, position: Point2d, geo: GeoCoord) -> Node {
        Node {
            id,
            position,
            geo,
            is_origin: false,
            is_od: false,
            binary_ways: true,
            incoming_links: vec![],
            outgoing_links: vec![],
        }
    }
}


#[derive(PartialEq, Debug, Clone)]
pub struct Link {
    pub id: usize,
    pub from_node: usize,
    pub to_node: usize,
    pub free_flow_time: f64,
    pub travel_time: f64,
    pub capacity: f64,
    pub alpha: f64,
    pub power: f64,
    pub flow: f64,
    /// Indexed by node id: [demand satisfied with that node as origin, ... as destination].
    pub od_demand_satisfied: Vec<[u64; 2]>,
}

impl Link {
    pub fn new(id: usize, from_node: usize, to_node: usize, free_flow_time: f64, capacity: f64)
               -> Link {
        Link {
            id,
            from_node,
            to_node,
            free_flow_time,
            travel_time: free_flow_time,
            capacity,
            alpha: cost::DEFAULT_ALPHA,
            power: cost::DEFAULT_POWER,
            flow: 0.,
            od_demand_satisfied: vec![],
        }
    }

    /// BPR travel time of this link if it carried `flow`.
    pub fn congested_time(&self, flow: f64) -> f64 {
        cost::bpr_travel_time(self.free_flow_time, flow, self.capacity, self.alpha, self.power)
    }
}


#[derive(PartialEq, Debug, Clone)]
pub struct OdPair {
    pub id: usize,
    pub origin: usize,
    pub destination: usize,
    pub demand: f64,
    pub path_ids: Vec<usize>,
    pub choice_probs: Vec<f64>,
}


#[derive(PartialEq, Debug, Clone)]
pub struct Path {
    pub id: usize,
    pub od_pair_id: usize,
    /// Link ids from the OD pair's origin to its destination.
    pub links: Vec<usize>,
    pub flow: f64,
    pub cost: f64,
}


/// Parameters of the stochastic assignment.
#[derive(PartialEq, Debug, Clone)]
pub struct SueParams {
    // logit dispersion
    pub theta: f64,
    // step-control increment applied when the direction norm fails to decrease
    pub ita: f64,
    // step-control increment applied when the direction norm decreases
    pub gama: f64,
    // the solver stops once the direction norm is at or below this
    pub tolerance: f64,
    // optional guard on the number of iterations; the solver is otherwise unbounded
    pub max_iterations: Option<usize>,
}

impl Default for SueParams {
    fn default() -> SueParams {
        SueParams {
            theta: 0.3,
            ita: 1.5,
            gama: 0.01,
            tolerance: 1.0e-10,
            max_iterations: None,
        }
    }
}


pub struct RoadNetwork {
    pub(crate) nodes: Vec<Node>,
    pub(crate) links: Vec<Link>,
    pub(crate) od_pairs: Vec<OdPair>,
    pub(crate) paths: Vec<Path>,
    // best known travel time between each pair of nodes
    pub(crate) distance_matrix: Array<f64, Ix2>,
    pub(crate) params: SueParams,
    pub(crate) convergence_log: Option<PathBuf>,
    pub(crate) stats: Option<SolveStats>,
}

impl Default for RoadNetwork {
    fn default() -> RoadNetwork {
        RoadNetwork::new()
    }
}

impl RoadNetwork {
    pub fn new() -> RoadNetwork {
        RoadNetwork {
            nodes: vec![],
            links: vec![],
            od_pairs: vec![],
            paths: vec![],
            distance_matrix: Array::zeros((0, 0)),
            params: SueParams::default(),
            convergence_log: None,
            stats: None,
        }
    }

    // Construction.  These append without any merging; see the mutator for editing.

    pub fn insert_node(&mut self, position: Point2d, geo: GeoCoord) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::new(id, position, geo));
        id
    }

    pub fn insert_link(&mut self, from_node: usize, to_node: usize, free_flow_time: f64,
                       capacity: f64) -> Result<usize> {
        self.check_node(from_node)?;
        self.check_node(to_node)?;
        check_free_flow_time(free_flow_time)?;
        check_capacity(capacity)?;
        let id = self.links.len();
        self.links.push(Link::new(id, from_node, to_node, free_flow_time, capacity));
        self.nodes[from_node].outgoing_links.push(id);
        self.nodes[to_node].incoming_links.push(id);
        Ok(id)
    }

    pub fn insert_od_pair(&mut self, origin: usize, destination: usize, demand: f64)
                          -> Result<usize> {
        self.check_node(origin)?;
        self.check_node(destination)?;
        check_demand(demand)?;
        let id = self.od_pairs.len();
        self.od_pairs.push(OdPair {
            id,
            origin,
            destination,
            demand,
            path_ids: vec![],
            choice_probs: vec![],
        });
        self.nodes[origin].is_origin = true;
        self.nodes[origin].is_od = true;
        self.nodes[destination].is_od = true;
        Ok(id)
    }

    /// Replaces every path in the network.  `paths_by_od[ii]` holds the link sequences of the
    /// paths serving OD pair `ii`.  Path ids are assigned in OD order.
    pub(crate) fn replace_paths(&mut self, paths_by_od: Vec<Vec<Vec<usize>>>) {
        self.paths.clear();
        for od_pair in self.od_pairs.iter_mut() {
            od_pair.path_ids.clear();
            od_pair.choice_probs.clear();
        }
        for (od_id, od_paths) in paths_by_od.into_iter().enumerate() {
            for links in od_paths {
                let id = self.paths.len();
                self.paths.push(Path{id, od_pair_id: od_id, links, flow: 0., cost: 0.});
                self.od_pairs[od_id].path_ids.push(id);
            }
        }
    }

    /// Drops every path for which `keep` is false, compacting path ids.
    pub(crate) fn retain_paths<FF>(&mut self, mut keep: FF) -> usize
        where FF: FnMut(&Path) -> bool
    {
        let before = self.paths.len();
        let old_paths = std::mem::take(&mut self.paths);
        let mut paths_by_od = vec![vec![]; self.od_pairs.len()];
        for path in old_paths {
            if keep(&path) {
                paths_by_od[path.od_pair_id].push(path.links);
            }
        }
        self.replace_paths(paths_by_od);
        before - self.paths.len()
    }

    pub fn refresh_od_flags(&mut self) {
        for node in self.nodes.iter_mut() {
            node.is_origin = false;
            node.is_od = false;
        }
        for od_pair in &self.od_pairs {
            self.nodes[od_pair.origin].is_origin = true;
            self.nodes[od_pair.origin].is_od = true;
            self.nodes[od_pair.destination].is_od = true;
        }
    }

    /// Resets the node distance matrix to "unknown" (infinite off the diagonal).
    pub fn reset_distance_matrix(&mut self) {
        let size = self.nodes.len();
        let mut matrix = Array::from_elem((size, size), f64::INFINITY);
        matrix.diag_mut().fill(0.);
        self.distance_matrix = matrix;
    }

    /// Rebuilds the distance matrix only if the number of nodes has changed since it was built.
    pub(crate) fn ensure_distance_matrix(&mut self) {
        let size = self.nodes.len();
        if self.distance_matrix.dim() != (size, size) {
            self.reset_distance_matrix();
        }
    }

    // Accessors

    pub fn nodes(&self) -> &Vec<Node> {
        &self.nodes
    }

    pub fn links(&self) -> &Vec<Link> {
        &self.links
    }

    pub fn od_pairs(&self) -> &Vec<OdPair> {
        &self.od_pairs
    }

    pub fn paths(&self) -> &Vec<Path> {
        &self.paths
    }

    pub fn node(&self, id: usize) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn link(&self, id: usize) -> Option<&Link> {
        self.links.get(id)
    }

    pub fn od_pair(&self, id: usize) -> Option<&OdPair> {
        self.od_pairs.get(id)
    }

    pub fn path(&self, id: usize) -> Option<&Path> {
        self.paths.get(id)
    }

    pub fn get_num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn get_num_links(&self) -> usize {
        self.links.len()
    }

    pub fn get_num_od_pairs(&self) -> usize {
        self.od_pairs.len()
    }

    pub fn get_num_paths(&self) -> usize {
        self.paths.len()
    }

    pub fn paths_of(&self, od_id: usize) -> impl Iterator<Item = &Path> {
        let path_ids: &[usize] = match self.od_pairs.get(od_id) {
            Some(od_pair) => &od_pair.path_ids,
            None => &[],
        };
        path_ids.iter().map(move |&path_id| &self.paths[path_id])
    }

    pub fn distance_matrix(&self) -> &Array<f64, Ix2> {
        &self.distance_matrix
    }

    pub fn link_flows(&self) -> Array<f64, Ix1> {
        self.links.iter().map(|link| link.flow).collect()
    }

    pub fn link_travel_times(&self) -> Vec<f64> {
        self.links.iter().map(|link| link.travel_time).collect()
    }

    pub fn stats(&self) -> Option<&SolveStats> {
        self.stats.as_ref()
    }

    /// Returns the ids of the OD pairs that start at `node_id`, and of those that end there.
    pub fn od_pairs_touching(&self, node_id: usize) -> (Vec<usize>, Vec<usize>) {
        let starting = self.od_pairs.iter().filter(|od| od.origin == node_id)
            .map(|od| od.id).collect();
        let ending = self.od_pairs.iter().filter(|od| od.destination == node_id)
            .map(|od| od.id).collect();
        (starting, ending)
    }

    /// Finds a link running from `from_node` to `to_node`, if one exists.
    pub fn find_link(&self, from_node: usize, to_node: usize) -> Option<usize> {
        let node = self.nodes.get(from_node)?;
        node.outgoing_links.iter().cloned()
            .find(|&link_id| self.links[link_id].to_node == to_node)
    }

    pub fn network_center(&self) -> GeoCoord {
        mean_geo_coord(self.nodes.iter().map(|node| &node.geo))
    }

    /// Shortest travel time between two nodes under the current link travel times.
    pub fn shortest_cost(&self, from_node: usize, to_node: usize) -> f64 {
        let (costs, _) = shortest_path::label_correcting(self, from_node);
        costs.get(to_node).cloned().unwrap_or(f64::INFINITY)
    }

    // Parameters

    pub fn params(&self) -> &SueParams {
        &self.params
    }

    pub fn set_parameters(&mut self, params: SueParams) {
        self.params = params;
    }

    pub fn set_theta(&mut self, theta: f64) {
        self.params.theta = theta;
    }

    pub fn set_ita(&mut self, ita: f64) {
        self.params.ita = ita;
    }

    pub fn set_gama(&mut self, gama: f64) {
        self.params.gama = gama;
    }

    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.params.tolerance = tolerance;
    }

    pub fn set_max_iterations(&mut self, max_iterations: Option<usize>) {
        self.params.max_iterations = max_iterations;
    }

    /// Where the solver writes its per-iteration convergence trace.  `None` disables it.
    pub fn set_convergence_log(&mut self, path: Option<PathBuf>) {
        self.convergence_log = path;
    }

    // Structural checks and diagnostics

    pub(crate) fn check_node(&self, node_id: usize) -> Result<()> {
        if node_id < self.nodes.len() {
            Ok(())
        } else {
            Err(NetworkError::NodeOutOfRange(node_id))
        }
    }

    pub(crate) fn check_link(&self, link_id: usize) -> Result<()> {
        if link_id < self.links.len() {
            Ok(())
        } else {
            Err(NetworkError::LinkOutOfRange(link_id))
        }
    }

    /// Marks each node that connects to at most two distinct neighbouring nodes.
    pub fn classify_binary_ways(&mut self) {
        for node_id in 0..self.nodes.len() {
            let node = &self.nodes[node_id];
            let mut neighbours = HashSet::new();
            for link_id in &node.incoming_links {
                neighbours.insert(self.links[*link_id].from_node);
            }
            for link_id in &node.outgoing_links {
                neighbours.insert(self.links[*link_id].to_node);
            }
            self.nodes[node_id].binary_ways = neighbours.len() <= 2;
        }
    }

    /// A petgraph view of the network.  Node weights are node ids, edge weights link ids.
    pub fn to_digraph(&self) -> DiGraph<usize, usize> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.links.len());
        let idxs: Vec<_> = self.nodes.iter().map(|node| graph.add_node(node.id)).collect();
        for link in &self.links {
            graph.add_edge(idxs[link.from_node], idxs[link.to_node], link.id);
        }
        graph
    }

    /// Logs the strongly connected components of the network, returning how many there are.
    pub fn log_components(&self) -> usize {
        let comps = kosaraju_scc(&self.to_digraph());
        if comps.len() > 1 {
            log::warn!("there are {} strongly connected components", comps.len());
            for comp in comps.iter().filter(|comp| comp.len() < 10) {
                let ids: Vec<usize> = comp.iter().map(|ni| ni.index()).collect();
                log::debug!("small component: {:?}", ids);
            }
        }
        comps.len()
    }

    /// Checks the structural invariants: contiguous ids, node/link adjacency agreeing in both
    /// directions, OD endpoints in range, and every path a connected route between its OD
    /// pair's endpoints.  Returns a description of each violation found.
    pub fn consistency_errors(&self) -> Vec<String> {
        let mut errors = vec![];
        for (ii, node) in self.nodes.iter().enumerate() {
            if node.id != ii {
                errors.push(format!("node at {} has id {}", ii, node.id));
            }
        }

        // rebuild the adjacency lists from the links and compare
        let mut incoming = vec![vec![]; self.nodes.len()];
        let mut outgoing = vec![vec![]; self.nodes.len()];
        for (ii, link) in self.links.iter().enumerate() {
            if link.id != ii {
                errors.push(format!("link at {} has id {}", ii, link.id));
            }
            if link.from_node >= self.nodes.len() || link.to_node >= self.nodes.len() {
                errors.push(format!("link {} has an endpoint out of range", ii));
                continue;
            }
            outgoing[link.from_node].push(ii);
            incoming[link.to_node].push(ii);
        }
        for (node, (mut true_in, mut true_out)) in self.nodes.iter()
            .zip(incoming.into_iter().zip(outgoing)) {
            let mut node_in = node.incoming_links.clone();
            let mut node_out = node.outgoing_links.clone();
            node_in.sort_unstable();
            node_out.sort_unstable();
            true_in.sort_unstable();
            true_out.sort_unstable();
            if node_in != true_in || node_out != true_out {
                errors.push(format!("node {} adjacency {:?}/{:?} should be {:?}/{:?}", node.id,
                                    node_in, node_out, true_in, true_out));
            }
        }

        for (ii, od_pair) in self.od_pairs.iter().enumerate() {
            if od_pair.id != ii {
                errors.push(format!("od pair at {} has id {}", ii, od_pair.id));
            }
            if od_pair.origin >= self.nodes.len() || od_pair.destination >= self.nodes.len() {
                errors.push(format!("od pair {} has an endpoint out of range", ii));
            }
            for path_id in &od_pair.path_ids {
                match self.paths.get(*path_id) {
                    Some(path) if path.od_pair_id == ii => (),
                    _ => errors.push(format!("od pair {} lists bad path {}", ii, path_id)),
                }
            }
        }

        for (ii, path) in self.paths.iter().enumerate() {
            if path.id != ii {
                errors.push(format!("path at {} has id {}", ii, path.id));
            }
            let od_pair = match self.od_pairs.get(path.od_pair_id) {
                Some(od_pair) => od_pair,
                None => {
                    errors.push(format!("path {} has bad od pair {}", ii, path.od_pair_id));
                    continue;
                }
            };
            if ! self.is_route(&path.links, od_pair.origin, od_pair.destination) {
                errors.push(format!("path {} ({:?}) is not a route from {} to {}", ii, path.links,
                                    od_pair.origin, od_pair.destination));
            }
        }
        errors
    }

    /// Whether `link_ids` form a connected, node-acyclic route from `origin` to `destination`.
    pub fn is_route(&self, link_ids: &[usize], origin: usize, destination: usize) -> bool {
        if link_ids.iter().any(|&link_id| link_id >= self.links.len()) {
            return false;
        }
        let mut at = origin;
        let mut seen = HashSet::new();
        seen.insert(origin);
        for &link_id in link_ids {
            let link = &self.links[link_id];
            if link.from_node != at || ! seen.insert(link.to_node) {
                return false;
            }
            at = link.to_node;
        }
        ! link_ids.is_empty() && at == destination
    }
}
