// Editing operations on a loaded network.  Each returns the edits it made, for the caller's
// edit log.
use std::collections::HashSet;

use super::error::{NetworkError, Result};
use super::geometry::{GeoCoord, Point2d};
use super::network::{check_capacity, check_free_flow_time, RoadNetwork};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditType {
    CapacityIncreased = 1,
    CapacityDecreased = 2,
    NodeAdded = 3,
    NodeDeleted = 4,
    LinkAdded = 5,
    LinkDeleted = 6,
    FreeFlowTimeDecreased = 7,
    FreeFlowTimeIncreased = 8,
}

impl EditType {
    /// The integer code recorded in edit logs.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddNodeResult {
    pub node_id: usize,
    pub edits: Vec<EditType>,
    // true if existing paths were patched in place instead of being re-enumerated
    pub paths_patched: bool,
}


impl RoadNetwork {
    pub fn change_link_capacity(&mut self, link_id: usize, capacity: f64)
                                -> Result<Vec<EditType>> {
        self.check_link(link_id)?;
        check_capacity(capacity)?;
        let link = &mut self.links[link_id];
        let edit = if capacity > link.capacity {
            EditType::CapacityIncreased
        } else if capacity < link.capacity {
            EditType::CapacityDecreased
        } else {
            return Ok(vec![]);
        };
        link.capacity = capacity;
        link.travel_time = link.congested_time(link.flow);
        if edit == EditType::CapacityDecreased {
            // recorded distances may be shorter than the link now allows
            self.reset_distance_matrix();
        }
        Ok(vec![edit])
    }

    pub fn change_link_free_flow_time(&mut self, link_id: usize, free_flow_time: f64)
                                      -> Result<Vec<EditType>> {
        self.check_link(link_id)?;
        check_free_flow_time(free_flow_time)?;
        let link = &mut self.links[link_id];
        let edit = if free_flow_time > link.free_flow_time {
            EditType::FreeFlowTimeIncreased
        } else if free_flow_time < link.free_flow_time {
            EditType::FreeFlowTimeDecreased
        } else {
            return Ok(vec![]);
        };
        link.free_flow_time = free_flow_time;
        link.travel_time = link.congested_time(link.flow);
        if edit == EditType::FreeFlowTimeIncreased {
            self.reset_distance_matrix();
        }
        Ok(vec![edit])
    }

    /// Adds a link from `from_node` to `to_node`.  If one already exists in that direction, it
    /// is raised to the given capacity and free-flow time where those are higher, and its id is
    /// returned along with whatever was changed.  Otherwise a new link is appended, and paths
    /// are re-enumerated if `recompute_paths` is set.
    pub fn add_link(&mut self, from_node: usize, to_node: usize, capacity: f64,
                    free_flow_time: f64, recompute_paths: bool)
                    -> Result<(usize, Vec<EditType>)> {
        self.check_node(from_node)?;
        self.check_node(to_node)?;
        check_free_flow_time(free_flow_time)?;
        check_capacity(capacity)?;
        if let Some(link_id) = self.find_link(from_node, to_node) {
            let link = &mut self.links[link_id];
            let mut edits = vec![];
            if capacity > link.capacity {
                link.capacity = capacity;
                edits.push(EditType::CapacityIncreased);
            }
            if free_flow_time > link.free_flow_time {
                link.free_flow_time = free_flow_time;
                edits.push(EditType::FreeFlowTimeIncreased);
            }
            link.travel_time = link.congested_time(link.flow);
            if edits.contains(&EditType::FreeFlowTimeIncreased) {
                self.reset_distance_matrix();
            }
            log::debug!("merged new link from {} to {} into link {}", from_node, to_node, link_id);
            return Ok((link_id, edits));
        }

        let link_id = self.insert_link(from_node, to_node, free_flow_time, capacity)?;
        if recompute_paths {
            self.compute_paths();
        }
        Ok((link_id, vec![EditType::LinkAdded]))
    }

    /// Deletes the given links, skipping ids that don't exist, and renumbers the remaining
    /// links to stay contiguous.  With `recompute_paths`, paths are re-enumerated; without it,
    /// paths that used a deleted link are dropped and the rest are renumbered.
    pub fn delete_links(&mut self, link_ids: &[usize], recompute_paths: bool) -> Vec<EditType> {
        let num_links = self.links.len();
        let to_delete: HashSet<usize> = link_ids.iter().cloned()
            .filter(|&link_id| link_id < num_links).collect();
        if to_delete.is_empty() {
            return vec![];
        }

        if ! recompute_paths {
            let dropped = self.retain_paths(|path| {
                ! path.links.iter().any(|link_id| to_delete.contains(link_id))
            });
            if dropped > 0 {
                log::info!("dropped {} paths through deleted links", dropped);
            }
        }

        // old id -> new id
        let mut new_ids = vec![None; num_links];
        let mut next_id = 0;
        for (old_id, new_id) in new_ids.iter_mut().enumerate() {
            if ! to_delete.contains(&old_id) {
                *new_id = Some(next_id);
                next_id += 1;
            }
        }

        let old_links = std::mem::take(&mut self.links);
        self.links = old_links.into_iter()
            .filter(|link| ! to_delete.contains(&link.id))
            .collect();
        for (new_id, link) in self.links.iter_mut().enumerate() {
            link.id = new_id;
        }
        let remap = |ids: &mut Vec<usize>| {
            *ids = ids.iter().filter_map(|&old_id| new_ids[old_id]).collect();
        };
        for node in self.nodes.iter_mut() {
            remap(&mut node.incoming_links);
            remap(&mut node.outgoing_links);
        }

        if recompute_paths {
            self.compute_paths();
        } else {
            for path in self.paths.iter_mut() {
                remap(&mut path.links);
            }
        }
        self.reset_distance_matrix();
        log::info!("deleted {} links, {} remain", to_delete.len(), self.links.len());
        vec![EditType::LinkDeleted]
    }

    /// The position a fraction of the way along a link, for placing a node that splits it.
    pub fn point_along_link(&self, link_id: usize, fraction: f64) -> Result<(Point2d, GeoCoord)> {
        self.check_link(link_id)?;
        let link = &self.links[link_id];
        let from = &self.nodes[link.from_node];
        let to = &self.nodes[link.to_node];
        let position = from.position.lerp(&to.position, fraction);
        let geo = GeoCoord::new(from.geo.lat + (to.geo.lat - from.geo.lat) * fraction,
                                from.geo.lon + (to.geo.lon - from.geo.lon) * fraction);
        Ok((position, geo))
    }

    /// Inserts a node part way along `link_a`, replacing it with two links through the new node
    /// whose free-flow times are `link_a_times`.  If `link_b` names the link running the
    /// opposite way between the same two nodes, it is split the same way with its own times.
    /// The new links keep the capacities of the links they replace.
    ///
    /// When every split link's new times sum exactly to its old free-flow time, paths through
    /// the old links are patched to run through the new ones.  Otherwise paths are
    /// re-enumerated.
    pub fn add_node(&mut self, position: Point2d, geo: GeoCoord, link_a: usize,
                    link_a_times: (f64, f64), link_b: Option<(usize, (f64, f64))>)
                    -> Result<AddNodeResult> {
        self.check_link(link_a)?;
        let mut splits = vec![(link_a, link_a_times)];
        if let Some((link_b, link_b_times)) = link_b {
            self.check_link(link_b)?;
            let aa = &self.links[link_a];
            let bb = &self.links[link_b];
            if link_a == link_b || bb.from_node != aa.to_node || bb.to_node != aa.from_node {
                return Err(NetworkError::NotOppositeLinks(link_a, link_b));
            }
            splits.push((link_b, link_b_times));
        }
        for (_, (first_time, second_time)) in &splits {
            check_free_flow_time(*first_time)?;
            check_free_flow_time(*second_time)?;
        }

        let node_id = self.insert_node(position, geo);
        // (old link, first new link, second new link)
        let mut replacements = vec![];
        let mut times_preserved = true;
        for (old_id, (first_time, second_time)) in splits {
            let old = self.links[old_id].clone();
            let first = self.insert_link(old.from_node, node_id, first_time, old.capacity)?;
            let second = self.insert_link(node_id, old.to_node, second_time, old.capacity)?;
            replacements.push((old_id, first, second));
            times_preserved &= first_time + second_time == old.free_flow_time;
        }

        if times_preserved {
            for path in self.paths.iter_mut() {
                for &(old_id, first, second) in &replacements {
                    if let Some(pos) = path.links.iter().position(|&ll| ll == old_id) {
                        path.links[pos] = second;
                        path.links.insert(pos, first);
                    }
                }
            }
        }
        let old_ids: Vec<usize> = replacements.iter().map(|(old_id, _, _)| *old_id).collect();
        // this also resizes the distance matrix for the new node
        self.delete_links(&old_ids, ! times_preserved);

        log::info!("added node {} on links {:?}; paths {}", node_id, old_ids,
                   if times_preserved {"patched"} else {"re-enumerated"});
        Ok(AddNodeResult {
            node_id,
            edits: vec![EditType::NodeAdded],
            paths_patched: times_preserved,
        })
    }

    /// Deletes a node and every link touching it, then re-enumerates paths.  Higher node ids
    /// shift down by one.  OD pairs that start or end at the node are removed.
    ///
    /// Refuses with `DemandConflict` if the node is both an origin and a destination of
    /// demand, not counting pairs from the node to itself.  Deleting a node that doesn't exist does nothing.
    pub fn delete_node(&mut self, node_id: usize) -> Result<Vec<EditType>> {
        if node_id >= self.nodes.len() {
            return Ok(vec![]);
        }
        let (origin_of, destination_of) = self.od_pairs_touching(node_id);
        // a pair from the node to itself only counts as starting there
        let destination_of: Vec<usize> = destination_of.into_iter()
            .filter(|&od_id| self.od_pairs[od_id].origin != node_id)
            .collect();
        if ! origin_of.is_empty() && ! destination_of.is_empty() {
            log::warn!("node {} has demand in and out; not deleting it", node_id);
            return Err(NetworkError::DemandConflict{node: node_id, origin_of, destination_of});
        }

        let node = &self.nodes[node_id];
        let incident: Vec<usize> = node.outgoing_links.iter()
            .chain(node.incoming_links.iter()).cloned().collect();
        self.delete_links(&incident, false);
        log::info!("deleted {} links with node {}, {} links remain", incident.len(), node_id,
                   self.links.len());

        // OD pairs at the node can no longer be served
        self.paths.clear();
        let old_od_pairs = std::mem::take(&mut self.od_pairs);
        for od_pair in old_od_pairs {
            if od_pair.origin == node_id || od_pair.destination == node_id {
                log::warn!("removing OD pair {} from {} to {} with demand {}", od_pair.id,
                           od_pair.origin, od_pair.destination, od_pair.demand);
                continue;
            }
            self.od_pairs.push(od_pair);
        }

        let shift = |id: &mut usize| {
            if *id > node_id {
                *id -= 1;
            }
        };
        self.nodes.remove(node_id);
        for (new_id, node) in self.nodes.iter_mut().enumerate() {
            node.id = new_id;
        }
        for link in self.links.iter_mut() {
            shift(&mut link.from_node);
            shift(&mut link.to_node);
            if node_id < link.od_demand_satisfied.len() {
                link.od_demand_satisfied.remove(node_id);
            }
        }
        for (new_id, od_pair) in self.od_pairs.iter_mut().enumerate() {
            od_pair.id = new_id;
            shift(&mut od_pair.origin);
            shift(&mut od_pair.destination);
        }

        self.refresh_od_flags();
        self.reset_distance_matrix();
        self.compute_paths();
        Ok(vec![EditType::NodeDeleted])
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_isaac::Isaac64Rng;
    use std::collections::HashMap;

    use super::super::grid::generate_grid_network;
    use super::super::test_utils::{assert_demand_conserved, build_diamond, compare_hashmaps,
                                   links_by_endpoints};

    /// The diamond with a return link D->A and a second OD pair from B to D.
    fn build_busy_diamond() -> RoadNetwork {
        let mut net = build_diamond(100.);
        net.insert_link(3, 0, 10., 100.).unwrap();
        net.insert_od_pair(1, 3, 30.).unwrap();
        net.compute_paths();
        net
    }

    fn assert_contiguous_and_consistent(net: &RoadNetwork) {
        for (ii, node) in net.nodes().iter().enumerate() {
            assert_eq!(node.id, ii);
        }
        for (ii, link) in net.links().iter().enumerate() {
            assert_eq!(link.id, ii);
        }
        for (ii, path) in net.paths().iter().enumerate() {
            assert_eq!(path.id, ii);
        }
        let errors = net.consistency_errors();
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_edit_codes() {
        let edits = [EditType::CapacityIncreased, EditType::CapacityDecreased,
                     EditType::NodeAdded, EditType::NodeDeleted, EditType::LinkAdded,
                     EditType::LinkDeleted, EditType::FreeFlowTimeDecreased,
                     EditType::FreeFlowTimeIncreased];
        let codes: Vec<u8> = edits.iter().map(|ee| ee.code()).collect();
        assert_eq!(codes, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_change_capacity() {
        let mut net = build_diamond(100.);
        assert_eq!(net.change_link_capacity(0, 150.).unwrap(), vec![EditType::CapacityIncreased]);
        assert_eq!(net.change_link_capacity(0, 50.).unwrap(), vec![EditType::CapacityDecreased]);
        assert!(net.change_link_capacity(0, 50.).unwrap().is_empty());
        assert_relative_eq!(net.links()[0].capacity, 50.);
        match net.change_link_capacity(4, 50.) {
            Err(NetworkError::LinkOutOfRange(4)) => (),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_change_free_flow_time() {
        let mut net = build_diamond(100.);
        assert_eq!(net.change_link_free_flow_time(1, 5.).unwrap(),
                   vec![EditType::FreeFlowTimeDecreased]);
        assert_relative_eq!(net.links()[1].travel_time, 5.);
        assert_eq!(net.change_link_free_flow_time(1, 12.).unwrap(),
                   vec![EditType::FreeFlowTimeIncreased]);
        assert!(net.change_link_free_flow_time(1, 12.).unwrap().is_empty());
        assert!(net.change_link_free_flow_time(9, 12.).is_err());
    }

    #[test]
    fn test_edits_reject_bad_values() {
        let mut net = build_diamond(100.);
        for bad in &[-1., f64::NAN] {
            match net.change_link_capacity(0, *bad) {
                Err(NetworkError::InvalidValue{name, ..}) => assert_eq!(name, "capacity"),
                other => panic!("capacity {} gave {:?}", bad, other),
            }
            match net.change_link_free_flow_time(0, *bad) {
                Err(NetworkError::InvalidValue{name, ..}) => assert_eq!(name, "free-flow time"),
                other => panic!("free-flow time {} gave {:?}", bad, other),
            }
            assert!(net.add_link(1, 2, *bad, 5., false).is_err());
            assert!(net.add_link(1, 2, 50., *bad, false).is_err());
        }
        assert!(net.change_link_free_flow_time(0, f64::INFINITY).is_err());
        // a merge with a bad value changes nothing
        assert!(net.add_link(0, 1, 200., -3., false).is_err());
        assert_relative_eq!(net.links()[0].capacity, 100.);
        assert_relative_eq!(net.links()[0].free_flow_time, 10.);
        assert_eq!(net.get_num_links(), 4);

        // a bad split leaves the network as it was
        let (position, geo) = net.point_along_link(0, 0.5).unwrap();
        assert!(net.add_node(position.clone(), geo, 0, (12., -2.), None).is_err());
        let back = net.insert_link(1, 0, 10., 100.).unwrap();
        assert!(net.add_node(position, geo, 0, (5., 5.), Some((back, (5., f64::NAN)))).is_err());
        assert_eq!(net.get_num_nodes(), 4);
        assert_eq!(net.get_num_links(), 5);

        assert_eq!(net.change_link_capacity(0, f64::INFINITY).unwrap(),
                   vec![EditType::CapacityIncreased]);
        assert_relative_eq!(net.links()[0].travel_time, 10.);
    }

    #[test]
    fn test_add_link() {
        let mut net = build_diamond(100.);
        net.compute_paths();
        let (link_id, edits) = net.add_link(1, 2, 80., 3., true).unwrap();
        assert_eq!(link_id, 4);
        assert_eq!(edits, vec![EditType::LinkAdded]);
        assert_eq!(net.nodes()[1].outgoing_links, vec![2, 4]);
        assert_eq!(net.nodes()[2].incoming_links, vec![1, 4]);
        // the new link opens the route A->B->C->D
        assert_eq!(net.get_num_paths(), 3);
        assert_contiguous_and_consistent(&net);
        assert!(net.add_link(1, 7, 80., 3., true).is_err());
    }

    #[test]
    fn test_add_link_merges() {
        let mut net = build_diamond(100.);
        let (link_id, edits) = net.add_link(0, 1, 150., 12., true).unwrap();
        assert_eq!(link_id, 0);
        assert_eq!(edits, vec![EditType::CapacityIncreased, EditType::FreeFlowTimeIncreased]);
        assert_relative_eq!(net.links()[0].capacity, 150.);
        assert_relative_eq!(net.links()[0].free_flow_time, 12.);

        // merging never lowers anything
        let (link_id, edits) = net.add_link(0, 1, 20., 2., true).unwrap();
        assert_eq!(link_id, 0);
        assert!(edits.is_empty());
        assert_relative_eq!(net.links()[0].capacity, 150.);
        assert_eq!(net.get_num_links(), 4);
    }

    #[test]
    fn test_delete_links_renumbers() {
        let mut net = build_busy_diamond();
        let edits = net.delete_links(&[0, 99, 0], true);
        assert_eq!(edits, vec![EditType::LinkDeleted]);
        assert_eq!(net.get_num_links(), 4);
        assert_contiguous_and_consistent(&net);

        let mut expected = HashMap::new();
        expected.insert((0, 2), (10., 100.));
        expected.insert((1, 3), (10., 100.));
        expected.insert((2, 3), (10., 100.));
        expected.insert((3, 0), (10., 100.));
        compare_hashmaps(&links_by_endpoints(&net), &expected);
        assert_eq!(net.nodes()[1].outgoing_links, vec![1]);
        assert_eq!(net.nodes()[3].incoming_links, vec![1, 2]);

        // only A->C->D is left for the first OD pair
        let od_links: Vec<Vec<usize>> = net.paths_of(0).map(|pp| pp.links.clone()).collect();
        assert_eq!(od_links, vec![vec![0, 2]]);
    }

    #[test]
    fn test_delete_links_without_recompute() {
        let mut net = build_busy_diamond();
        assert_eq!(net.get_num_paths(), 3);
        net.delete_links(&[1], false);
        assert_contiguous_and_consistent(&net);
        // A->C->D was dropped and A->B->D renumbered
        assert_eq!(net.get_num_paths(), 2);
        let od_links: Vec<Vec<usize>> = net.paths_of(0).map(|pp| pp.links.clone()).collect();
        assert_eq!(od_links, vec![vec![0, 1]]);
    }

    #[test]
    fn test_delete_nothing() {
        let mut net = build_busy_diamond();
        assert!(net.delete_links(&[5, 17], true).is_empty());
        assert!(net.delete_links(&[], false).is_empty());
        assert_eq!(net.get_num_links(), 5);
        assert_eq!(net.get_num_paths(), 3);
    }

    #[test]
    fn test_delete_sole_path() {
        // A -> B -> C with demand from A to C
        let mut net = RoadNetwork::new();
        for _ in 0..3 {
            net.insert_node(Point2d::default(), GeoCoord::default());
        }
        net.insert_link(0, 1, 5., 10.).unwrap();
        net.insert_link(1, 2, 5., 10.).unwrap();
        net.insert_od_pair(0, 2, 40.).unwrap();
        net.compute_paths();
        assert_eq!(net.get_num_paths(), 1);

        net.delete_links(&[0], true);
        assert!(net.od_pairs()[0].path_ids.is_empty());
        assert_eq!(net.get_num_paths(), 0);
        let outcome = net.solve().unwrap();
        assert!(outcome.is_converged());
        assert_eq!(net.stats().unwrap().unsatisfied_od_pairs, vec![0]);
    }

    #[test]
    fn test_add_node_patches_paths() {
        let mut net = build_busy_diamond();
        let (position, geo) = net.point_along_link(0, 0.4).unwrap();
        assert_relative_eq!(position.x_coord, 40.);
        assert_relative_eq!(position.y_coord, 100.);
        assert_relative_eq!(geo.lon, -72.9996, epsilon=1e-9);
        let result = net.add_node(position, geo, 0, (4., 6.), None).unwrap();
        assert_eq!(result.node_id, 4);
        assert_eq!(result.edits, vec![EditType::NodeAdded]);
        assert!(result.paths_patched);
        assert_eq!(net.get_num_nodes(), 5);
        assert_eq!(net.get_num_links(), 6);
        assert_eq!(net.distance_matrix().dim(), (5, 5));
        assert_contiguous_and_consistent(&net);

        // A->B was replaced by A->new->B; the old link 0 is gone so ids shift down
        assert_eq!(net.find_link(0, 1), None);
        let first = net.find_link(0, 4).unwrap();
        let second = net.find_link(4, 1).unwrap();
        assert_eq!((first, second), (4, 5));
        assert_relative_eq!(net.links()[first].free_flow_time, 4.);
        assert_relative_eq!(net.links()[second].capacity, 100.);
        let b_to_d = net.find_link(1, 3).unwrap();
        let od_links: Vec<Vec<usize>> = net.paths_of(0).map(|pp| pp.links.clone()).collect();
        assert!(od_links.contains(&vec![first, second, b_to_d]));
        assert_eq!(net.get_num_paths(), 3);
        assert_relative_eq!(net.nodes()[4].position.x_coord, 40.);
        assert!(net.point_along_link(17, 0.5).is_err());
    }

    #[test]
    fn test_add_node_recomputes() {
        let mut net = build_busy_diamond();
        let result = net.add_node(Point2d::default(), GeoCoord::default(), 0, (4., 7.), None)
            .unwrap();
        assert!(! result.paths_patched);
        assert_contiguous_and_consistent(&net);
        let od_links: Vec<Vec<usize>> = net.paths_of(0).map(|pp| pp.links.clone()).collect();
        assert_eq!(od_links.len(), 2);
        for links in od_links {
            assert!(net.is_route(&links, 0, 3));
        }
    }

    #[test]
    fn test_add_node_splits_both_directions() {
        let mut net = build_diamond(100.);
        let back = net.insert_link(1, 0, 10., 60.).unwrap();
        net.insert_od_pair(1, 0, 10.).unwrap();
        net.compute_paths();

        match net.add_node(Point2d::default(), GeoCoord::default(), 0, (5., 5.),
                           Some((2, (5., 5.)))) {
            Err(NetworkError::NotOppositeLinks(0, 2)) => (),
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(net.get_num_nodes(), 4);

        let result = net.add_node(Point2d::default(), GeoCoord::default(), 0, (5., 5.),
                                  Some((back, (3., 7.)))).unwrap();
        assert!(result.paths_patched);
        assert_eq!(net.get_num_links(), 7);
        assert_contiguous_and_consistent(&net);
        let new_node = result.node_id;
        let to_a = net.find_link(new_node, 0).unwrap();
        assert_relative_eq!(net.links()[to_a].free_flow_time, 7.);
        assert_relative_eq!(net.links()[to_a].capacity, 60.);
        let od_links: Vec<Vec<usize>> = net.paths_of(1).map(|pp| pp.links.clone()).collect();
        let from_b = net.find_link(1, new_node).unwrap();
        assert_eq!(od_links, vec![vec![from_b, to_a]]);
    }

    #[test]
    fn test_delete_node() {
        let mut net = build_diamond(100.);
        let edits = net.delete_node(1).unwrap();
        assert_eq!(edits, vec![EditType::NodeDeleted]);
        assert_eq!(net.get_num_nodes(), 3);
        assert_eq!(net.get_num_links(), 2);
        assert_contiguous_and_consistent(&net);
        // old C and D are now nodes 1 and 2
        let mut expected = HashMap::new();
        expected.insert((0, 1), (10., 100.));
        expected.insert((1, 2), (10., 100.));
        compare_hashmaps(&links_by_endpoints(&net), &expected);
        assert_eq!((net.od_pairs()[0].origin, net.od_pairs()[0].destination), (0, 2));
        assert_eq!(net.get_num_paths(), 1);
        assert_eq!(net.distance_matrix().dim(), (3, 3));

        assert!(net.delete_node(3).unwrap().is_empty());
    }

    #[test]
    fn test_delete_node_with_demand() {
        let mut net = build_busy_diamond();
        // node 1 is only an origin; its OD pair goes with it
        net.delete_node(1).unwrap();
        assert_eq!(net.get_num_od_pairs(), 1);
        assert!(net.nodes()[2].is_od);
        assert_contiguous_and_consistent(&net);

        // node 0 is an origin; make it a destination too
        net.insert_od_pair(2, 0, 5.).unwrap();
        match net.delete_node(0) {
            Err(NetworkError::DemandConflict{node, origin_of, destination_of}) => {
                assert_eq!(node, 0);
                assert_eq!(origin_of, vec![0]);
                assert_eq!(destination_of, vec![1]);
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(net.get_num_nodes(), 3);
    }

    #[test]
    fn test_delete_node_with_self_pair() {
        let mut net = build_diamond(100.);
        net.insert_od_pair(2, 2, 10.).unwrap();
        net.compute_paths();
        assert_eq!(net.delete_node(2).unwrap(), vec![EditType::NodeDeleted]);
        assert_eq!(net.get_num_nodes(), 3);
        assert_eq!(net.get_num_od_pairs(), 1);
        let od_pair = &net.od_pairs()[0];
        assert_eq!((od_pair.origin, od_pair.destination), (0, 2));
        assert_contiguous_and_consistent(&net);

        // demand arriving from another node still blocks deletion
        net.insert_od_pair(1, 1, 10.).unwrap();
        net.insert_od_pair(0, 1, 10.).unwrap();
        match net.delete_node(1) {
            Err(NetworkError::DemandConflict{origin_of, destination_of, ..}) => {
                assert_eq!(origin_of, vec![1]);
                assert_eq!(destination_of, vec![2]);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_grid_edits_keep_invariants() {
        let mut rng = Isaac64Rng::seed_from_u64(17);
        let mut net = generate_grid_network(4, 4, 200., 10., 800., 8, 2000., &mut rng);
        net.set_tolerance(1e-6);
        net.set_max_iterations(Some(20_000));
        net.compute_paths();
        net.solve().unwrap();

        net.delete_links(&[3, 11, 20], true);
        assert_contiguous_and_consistent(&net);

        // split a link that has an opposite partner
        let link = net.links()[5].clone();
        let back = net.find_link(link.to_node, link.from_node).unwrap();
        let half = link.free_flow_time / 2.;
        let back_half = net.links()[back].free_flow_time / 2.;
        let result = net.add_node(Point2d::default(), GeoCoord::default(), 5, (half, half),
                                  Some((back, (back_half, back_half)))).unwrap();
        assert!(result.paths_patched);
        assert_contiguous_and_consistent(&net);

        // find a node that is not both an origin and a destination
        let deletable = (0..net.get_num_nodes()).find(|&node_id| {
            let (starting, ending) = net.od_pairs_touching(node_id);
            starting.is_empty() || ending.is_empty()
        }).unwrap();
        net.delete_node(deletable).unwrap();
        assert_contiguous_and_consistent(&net);

        net.solve().unwrap();
        assert_demand_conserved(&net);
        for od_pair in net.od_pairs() {
            if ! od_pair.choice_probs.is_empty() {
                let total: f64 = od_pair.choice_probs.iter().sum();
                assert!((total - 1.).abs() < 1e-9);
            }
        }
    }
}
