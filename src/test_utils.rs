use std::collections::HashMap;
use std::fmt::Debug;

use super::geometry::{GeoCoord, Point2d};
use super::network::RoadNetwork;


/// Checks that the contents of two hashmaps are the same.
pub fn compare_hashmaps<KK, VV>(query_map: &HashMap<KK, VV>, true_map: &HashMap<KK, VV>)
    where KK: Debug + Eq + std::hash::Hash,
    VV: Debug + PartialEq,
{
    assert_eq!(query_map.len(), true_map.len());

    for (true_key, true_val) in true_map {
        match query_map.get(true_key) {
            Some(val) => assert_eq!(val, true_val, "Value for key {:?} differs!", true_key),
            None => assert!(false, "Key {:?} missing!", true_key),
        }
    }
}

/// Maps each (from, to) node pair to the free-flow time and capacity of the link joining them.
pub fn links_by_endpoints(network: &RoadNetwork) -> HashMap<(usize, usize), (f64, f64)> {
    network.links().iter()
        .map(|ll| ((ll.from_node, ll.to_node), (ll.free_flow_time, ll.capacity)))
        .collect()
}

/// A ---> B
/// |      |
/// v      v
/// C ---> D
///
/// Links 0: A->B, 1: A->C, 2: B->D, 3: C->D, each with free-flow time 10 and capacity 100.
/// One OD pair from A to D.
pub fn build_diamond(demand: f64) -> RoadNetwork {
    let mut net = RoadNetwork::new();
    let coords = [(0., 1.), (1., 1.), (0., 0.), (1., 0.)];
    for (xx, yy) in coords.iter() {
        net.insert_node(Point2d::new(*xx * 100., *yy * 100.),
                        GeoCoord::new(45. + *yy * 0.001, -73. + *xx * 0.001));
    }
    for (from, to) in &[(0, 1), (0, 2), (1, 3), (2, 3)] {
        net.insert_link(*from, *to, 10., 100.).unwrap();
    }
    net.insert_od_pair(0, 3, demand).unwrap();
    net
}

/// Asserts that each OD pair with a usable path has its demand spread exactly over its paths.
pub fn assert_demand_conserved(network: &RoadNetwork) {
    for od_pair in network.od_pairs() {
        let usable = network.paths_of(od_pair.id).any(|pp| pp.cost.is_finite());
        if ! usable {
            continue;
        }
        let total: f64 = network.paths_of(od_pair.id).map(|pp| pp.flow).sum();
        assert!((total - od_pair.demand).abs() <= 1e-9 * od_pair.demand.max(1.),
                "OD pair {} has demand {} but its paths carry {}", od_pair.id, od_pair.demand,
                total);
    }
}
