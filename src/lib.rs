// imports of other modules from this crate
mod error;
pub use error::{NetworkError, Result};

mod geometry;
pub use geometry::{GeoCoord, Point2d};

mod network;
pub use network::{Link, Node, OdPair, Path, RoadNetwork, SueParams};

mod cost;
pub use cost::{bpr_integral, bpr_travel_time, DEFAULT_ALPHA, DEFAULT_POWER};

mod route_choice;
pub use route_choice::logit_probabilities;

mod shortest_path;
pub use shortest_path::{floyd_warshall, label_correcting, trace_path};

mod path_enum;
pub use path_enum::{search_paths, select_alternatives, Hit, PathReport};

mod solver;
pub use solver::{SolveOutcome, SolveStats};

mod mutator;
pub use mutator::{AddNodeResult, EditType};

mod loaders;

mod grid;
pub use grid::generate_grid_network;

mod config_utils;
pub use config_utils::{AssignmentConfig, DatasetConfig, GridConfig, NetworkSource};

#[cfg(test)]
mod test_utils;
