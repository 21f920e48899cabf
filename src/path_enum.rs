// Breadth-first enumeration of a compact, length-diverse set of alternative paths per OD pair.
use std::cmp::Ordering;
use std::collections::HashSet;

use itertools::Itertools;

use super::network::RoadNetwork;

// stop searching once more than this many paths have reached the destination
static MAX_HITS: usize = 20;
// stop adding alternatives once more than this many have been kept
static MAX_ALTERNATIVES: usize = 8;
// past this many alternatives, only keep paths within LENGTH_FACTOR of the shortest
static MIN_ALTERNATIVES: usize = 5;
static LENGTH_FACTOR: f64 = 2.0;


struct TreeNode {
    node_id: usize,
    via_link: Option<usize>,
    parent: Option<usize>,
    // sum of free-flow times from the root
    length: f64,
    // graph nodes already on the branch from the root to here
    visited: HashSet<usize>,
}

/// A path that reached the destination during the search.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub links: Vec<usize>,
    pub length: f64,
}

#[derive(Debug, Default)]
pub struct PathReport {
    pub num_paths: usize,
    // total number of destination hits over all searches
    pub num_hits: usize,
    // ids of OD pairs for which no path was found
    pub unreachable: Vec<usize>,
}


/// Searches breadth-first from `origin` for paths to `destination`, never revisiting a node
/// on the same branch.  Once a path has been found, branches more than twice as long as the
/// shortest hit are not expanded, and the search stops once more than `MAX_HITS` paths have
/// been found.  Hits are returned in the order they were found.
pub fn search_paths(network: &RoadNetwork, origin: usize, destination: usize) -> Vec<Hit> {
    if origin >= network.get_num_nodes() || destination >= network.get_num_nodes() {
        return vec![];
    }
    let mut root_visited = HashSet::new();
    root_visited.insert(origin);
    let mut tree = vec![TreeNode {
        node_id: origin,
        via_link: None,
        parent: None,
        length: 0.,
        visited: root_visited,
    }];
    let mut hit_idxs = vec![];
    let mut min_hit_length = f64::INFINITY;

    let mut pos = 0;
    while pos < tree.len() {
        let node_id = tree[pos].node_id;
        let length = tree[pos].length;
        if node_id == destination {
            hit_idxs.push(pos);
            if length < min_hit_length {
                min_hit_length = length;
            }
            if hit_idxs.len() > MAX_HITS {
                break;
            }
        } else if hit_idxs.is_empty() || length <= LENGTH_FACTOR * min_hit_length {
            for &link_id in &network.nodes()[node_id].outgoing_links {
                let link = &network.links()[link_id];
                let neighbour = link.to_node;
                if tree[pos].visited.contains(&neighbour) {
                    continue;
                }
                let mut visited = tree[pos].visited.clone();
                visited.insert(neighbour);
                tree.push(TreeNode {
                    node_id: neighbour,
                    via_link: Some(link_id),
                    parent: Some(pos),
                    length: length + link.free_flow_time,
                    visited,
                });
            }
        }
        pos += 1;
    }

    hit_idxs.iter().map(|&hit_idx| {
        let mut links = vec![];
        let mut at = hit_idx;
        while let (Some(link_id), Some(parent)) = (tree[at].via_link, tree[at].parent) {
            links.push(link_id);
            at = parent;
        }
        links.reverse();
        Hit{links, length: tree[hit_idx].length}
    }).collect()
}

/// Picks the alternatives to keep from a set of hits, shortest first.  Ties with the
/// previously kept length are always kept; otherwise selection stops once more than
/// `MAX_ALTERNATIVES` are kept, or once `MIN_ALTERNATIVES` are kept and the next candidate is
/// more than twice as long as the shortest.
pub fn select_alternatives(hits: Vec<Hit>) -> Vec<Vec<usize>> {
    let sorted: Vec<Hit> = hits.into_iter()
        .sorted_by(|h1, h2| h1.length.partial_cmp(&h2.length).unwrap_or(Ordering::Equal))
        .collect();
    let min_length = match sorted.first() {
        Some(hit) => hit.length,
        None => return vec![],
    };

    let mut kept: Vec<Vec<usize>> = vec![];
    let mut prev_length = min_length;
    for hit in sorted {
        if hit.length > prev_length {
            if kept.len() > MAX_ALTERNATIVES {
                break;
            } else if kept.len() >= MIN_ALTERNATIVES && hit.length > LENGTH_FACTOR * min_length {
                break;
            }
        }
        prev_length = hit.length;
        kept.push(hit.links);
    }
    kept
}

impl RoadNetwork {
    /// Enumerates paths for every OD pair, replacing all existing paths.
    pub fn compute_paths(&mut self) -> PathReport {
        let mut report = PathReport::default();
        let mut paths_by_od = Vec::with_capacity(self.od_pairs.len());
        for od_pair in &self.od_pairs {
            if od_pair.origin == od_pair.destination {
                log::warn!("OD pair {} starts and ends at node {}; it gets no paths", od_pair.id,
                           od_pair.origin);
                report.unreachable.push(od_pair.id);
                paths_by_od.push(vec![]);
                continue;
            }
            let hits = search_paths(self, od_pair.origin, od_pair.destination);
            report.num_hits += hits.len();
            if hits.is_empty() {
                log::error!("No way from node {} to node {}!", od_pair.origin,
                            od_pair.destination);
                report.unreachable.push(od_pair.id);
            }
            let alternatives = select_alternatives(hits);
            report.num_paths += alternatives.len();
            paths_by_od.push(alternatives);
        }
        self.replace_paths(paths_by_od);
        log::info!("path_num: {}, num_hits: {}", report.num_paths, report.num_hits);
        report
    }
}
