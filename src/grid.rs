use itertools::iproduct;
use rand::Rng;
use rand::seq::SliceRandom;

use super::geometry::{GeoCoord, Point2d};
use super::network::RoadNetwork;

// used to give grid nodes plausible geographic coordinates
static METRES_PER_DEGREE: f64 = 111_320.;


/// Builds a rectangular street grid with a link in each direction between neighbouring
/// intersections, and random OD demand between distinct nodes.
///
/// num_x_nodes, num_y_nodes: the number of intersections in each direction
/// spacing: the distance between neighbouring intersections
/// free_flow_speed: distance per unit time, so each link's free-flow time is spacing / speed
/// num_od_pairs: how many distinct (origin, destination) pairs get demand; capped at the number
///     of ordered node pairs
/// total_demand: the demands of all OD pairs sum to this
pub fn generate_grid_network<RR>(num_x_nodes: usize, num_y_nodes: usize, spacing: f64,
                                 free_flow_speed: f64, capacity: f64, num_od_pairs: usize,
                                 total_demand: f64, rng: &mut RR) -> RoadNetwork
    where RR: Rng
{
    let mut network = RoadNetwork::new();
    let node_id = |x_idx: usize, y_idx: usize| y_idx * num_x_nodes + x_idx;

    for (y_idx, x_idx) in iproduct!(0..num_y_nodes, 0..num_x_nodes) {
        let pos = Point2d::new(spacing * x_idx as f64, spacing * y_idx as f64);
        let geo = GeoCoord::new(pos.y_coord / METRES_PER_DEGREE, pos.x_coord / METRES_PER_DEGREE);
        network.insert_node(pos, geo);
    }

    // now that all nodes are added, iterate over them again and add links
    let free_flow_time = spacing / free_flow_speed;
    for (y_idx, x_idx) in iproduct!(0..num_y_nodes, 0..num_x_nodes) {
        let this_id = node_id(x_idx, y_idx);
        let mut others = vec![];
        if 0 < x_idx {
            others.push(node_id(x_idx - 1, y_idx));
        }
        if x_idx + 1 < num_x_nodes {
            others.push(node_id(x_idx + 1, y_idx));
        }
        if 0 < y_idx {
            others.push(node_id(x_idx, y_idx - 1));
        }
        if y_idx + 1 < num_y_nodes {
            others.push(node_id(x_idx, y_idx + 1));
        }
        for other_id in others {
            // both endpoints were just inserted, so this cannot fail
            if let Err(err) = network.insert_link(this_id, other_id, free_flow_time, capacity) {
                log::error!("failed to add grid link: {}", err);
            }
        }
    }

    // pick distinct ordered node pairs to carry demand
    let num_nodes = network.get_num_nodes();
    let mut node_pairs: Vec<(usize, usize)> = iproduct!(0..num_nodes, 0..num_nodes)
        .filter(|(oo, dd)| oo != dd).collect();
    node_pairs.shuffle(rng);
    let num_od_pairs = num_od_pairs.min(node_pairs.len());

    // scale randomly generated weights so the demands sum to the total
    let weights: Vec<f64> = (0..num_od_pairs).map(|_| rng.gen::<f64>() + 0.1).collect();
    let weight_sum: f64 = weights.iter().sum();
    for ((origin, destination), weight) in node_pairs.into_iter().zip(weights) {
        let demand = weight * total_demand / weight_sum;
        if let Err(err) = network.insert_od_pair(origin, destination, demand) {
            log::error!("failed to add grid od pair: {}", err);
        }
    }

    log::info!("generated a {}x{} grid with {} links and {} od pairs", num_x_nodes, num_y_nodes,
               network.get_num_links(), network.get_num_od_pairs());
    network
}
