use std::collections::VecDeque;

use ndarray::prelude::*;

use super::network::RoadNetwork;


/// Single-source shortest travel times by FIFO label correcting (a Bellman-Ford style
/// relaxation).  Edge costs are the links' current travel times and must be non-negative;
/// links with an infinite travel time never relax anything.
///
/// Returns the cost to every node (infinite where unreachable) and, for each node, the link
/// by which the shortest path enters it.
pub fn label_correcting(network: &RoadNetwork, source: usize) -> (Vec<f64>, Vec<Option<usize>>) {
    let num_nodes = network.get_num_nodes();
    let mut costs = vec![f64::INFINITY; num_nodes];
    let mut parent_links = vec![None; num_nodes];
    if source >= num_nodes {
        return (costs, parent_links);
    }

    let mut in_queue = vec![false; num_nodes];
    let mut queue = VecDeque::new();
    costs[source] = 0.;
    queue.push_back(source);
    in_queue[source] = true;

    while let Some(node_id) = queue.pop_front() {
        in_queue[node_id] = false;
        let node_cost = costs[node_id];
        for &link_id in &network.nodes()[node_id].outgoing_links {
            let link = &network.links()[link_id];
            let new_cost = node_cost + link.travel_time;
            if new_cost < costs[link.to_node] {
                costs[link.to_node] = new_cost;
                parent_links[link.to_node] = Some(link_id);
                if ! in_queue[link.to_node] {
                    queue.push_back(link.to_node);
                    in_queue[link.to_node] = true;
                }
            }
        }
    }

    (costs, parent_links)
}

/// Walks the parent links back from `target`, returning the links of the shortest path in
/// travel order.  `None` if the target was not reached.
pub fn trace_path(network: &RoadNetwork, parent_links: &[Option<usize>], source: usize,
                  target: usize) -> Option<Vec<usize>> {
    let mut links = vec![];
    let mut at = target;
    while at != source {
        let link_id = parent_links.get(at).cloned().flatten()?;
        links.push(link_id);
        at = network.links()[link_id].from_node;
        if links.len() > parent_links.len() {
            // the parent links contain a cycle
            return None;
        }
    }
    links.reverse();
    Some(links)
}

/// Floyd-Warshall over a dense distance matrix, in place.  Entries are only ever lowered, so
/// any admissible direct distances already recorded are kept.
pub fn floyd_warshall(dist: &mut Array<f64, Ix2>) {
    let size = dist.nrows();
    for kk in 0..size {
        let via_row = dist.row(kk).to_owned();
        for ii in 0..size {
            let d_ik = dist[[ii, kk]];
            if d_ik == f64::INFINITY {
                continue;
            }
            for (jj, d_kj) in via_row.iter().enumerate() {
                let candidate = d_ik + d_kj;
                if candidate < dist[[ii, jj]] {
                    dist[[ii, jj]] = candidate;
                }
            }
        }
    }
}
