use std::path::Path;
use std::path::PathBuf;

use rand::SeedableRng;
use rand_isaac::Isaac64Rng;
use yaml_rust::Yaml;
use yaml_rust::YamlLoader;

use super::error::{NetworkError, Result};
use super::grid::generate_grid_network;
use super::network::{RoadNetwork, SueParams};

static DEFAULT_GRID_SEED: u64 = 0;


pub fn str_to_absolute_path(path_str: &str, default_base_dir: &Path) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        return path;
    } else {
        return [default_base_dir, Path::new(&path)].iter().collect();
    }
}

fn config_err(msg: String) -> NetworkError {
    NetworkError::Config(msg)
}

/// Reads an optional number, accepting either an integer or a real.
fn yaml_f64(yaml_cfg: &Yaml, key: &str) -> Result<Option<f64>> {
    let value = &yaml_cfg[key];
    if value.is_badvalue() || value.is_null() {
        return Ok(None);
    }
    match value.as_f64().or_else(|| value.as_i64().map(|vv| vv as f64)) {
        Some(vv) => Ok(Some(vv)),
        None => Err(config_err(format!("{} must be a number", key))),
    }
}

fn required_f64(yaml_cfg: &Yaml, key: &str) -> Result<f64> {
    yaml_f64(yaml_cfg, key)?.ok_or_else(|| config_err(format!("no {}", key)))
}

fn yaml_usize(yaml_cfg: &Yaml, key: &str) -> Result<Option<usize>> {
    let value = &yaml_cfg[key];
    if value.is_badvalue() || value.is_null() {
        return Ok(None);
    }
    match value.as_i64() {
        Some(vv) if vv >= 0 => Ok(Some(vv as usize)),
        _ => Err(config_err(format!("{} must be a non-negative integer", key))),
    }
}

fn required_usize(yaml_cfg: &Yaml, key: &str) -> Result<usize> {
    yaml_usize(yaml_cfg, key)?.ok_or_else(|| config_err(format!("no {}", key)))
}

fn yaml_path(yaml_cfg: &Yaml, key: &str, config_dir: &Path) -> Result<Option<PathBuf>> {
    let value = &yaml_cfg[key];
    if value.is_badvalue() || value.is_null() {
        return Ok(None);
    }
    match value.as_str() {
        Some(path_str) => Ok(Some(str_to_absolute_path(path_str, config_dir))),
        None => Err(config_err(format!("{} must be a path", key))),
    }
}

fn required_path(yaml_cfg: &Yaml, key: &str, config_dir: &Path) -> Result<PathBuf> {
    yaml_path(yaml_cfg, key, config_dir)?.ok_or_else(|| config_err(format!("no {}", key)))
}


#[derive(Debug, Clone, PartialEq)]
pub struct DatasetConfig {
    pub node_path: PathBuf,
    pub link_path: PathBuf,
    pub od_path: PathBuf,
    // if given, paths are read from here instead of being enumerated
    pub path_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    pub num_x_nodes: usize,
    pub num_y_nodes: usize,
    pub spacing: f64,
    pub free_flow_speed: f64,
    pub capacity: f64,
    pub num_od_pairs: usize,
    pub total_demand: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NetworkSource {
    Dataset(DatasetConfig),
    Grid(GridConfig),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentConfig {
    pub source: NetworkSource,
    pub params: SueParams,
    pub convergence_log: Option<PathBuf>,
}

impl AssignmentConfig {
    pub fn from_file(path: &Path) -> Result<AssignmentConfig> {
        let file_contents = std::fs::read_to_string(path)?;
        let yaml_cfgs = YamlLoader::load_from_str(&file_contents)
            .map_err(|err| config_err(format!("{:?} is not valid yaml: {}", path, err)))?;
        let yaml_cfg = yaml_cfgs.get(0)
            .ok_or_else(|| config_err(format!("{:?} is empty", path)))?;
        let config_dir = path.parent().unwrap_or_else(|| Path::new("."));
        AssignmentConfig::from_yaml(yaml_cfg, config_dir)
    }

    /// Relative paths in the config are taken relative to `config_dir`.
    pub fn from_yaml(yaml_cfg: &Yaml, config_dir: &Path) -> Result<AssignmentConfig> {
        let source = if ! yaml_cfg["grid_network"].is_badvalue() {
            let grid_cfg = &yaml_cfg["grid_network"];
            NetworkSource::Grid(GridConfig {
                num_x_nodes: required_usize(grid_cfg, "num_x_nodes")?,
                num_y_nodes: required_usize(grid_cfg, "num_y_nodes")?,
                spacing: required_f64(grid_cfg, "spacing")?,
                free_flow_speed: required_f64(grid_cfg, "free_flow_speed")?,
                capacity: required_f64(grid_cfg, "capacity")?,
                num_od_pairs: required_usize(grid_cfg, "num_od_pairs")?,
                total_demand: required_f64(grid_cfg, "total_demand")?,
                seed: yaml_usize(grid_cfg, "seed")?.map_or(DEFAULT_GRID_SEED, |ss| ss as u64),
            })
        } else if ! yaml_cfg["dataset"].is_badvalue() {
            let dataset_cfg = &yaml_cfg["dataset"];
            NetworkSource::Dataset(DatasetConfig {
                node_path: required_path(dataset_cfg, "node_path", config_dir)?,
                link_path: required_path(dataset_cfg, "link_path", config_dir)?,
                od_path: required_path(dataset_cfg, "od_path", config_dir)?,
                path_file: yaml_path(dataset_cfg, "path_file", config_dir)?,
            })
        } else {
            return Err(config_err(String::from("either dataset or grid_network is required")));
        };

        let defaults = SueParams::default();
        let params = SueParams {
            theta: yaml_f64(yaml_cfg, "theta")?.unwrap_or(defaults.theta),
            ita: yaml_f64(yaml_cfg, "ita")?.unwrap_or(defaults.ita),
            gama: yaml_f64(yaml_cfg, "gama")?.unwrap_or(defaults.gama),
            tolerance: yaml_f64(yaml_cfg, "tolerance")?.unwrap_or(defaults.tolerance),
            max_iterations: yaml_usize(yaml_cfg, "max_iterations")?,
        };

        Ok(AssignmentConfig {
            source,
            params,
            convergence_log: yaml_path(yaml_cfg, "convergence_log", config_dir)?,
        })
    }
}


impl RoadNetwork {
    /// Loads or generates the configured network, applies the solver settings, and reads or
    /// enumerates its paths, leaving it ready to solve.
    pub fn from_config(cfg: &AssignmentConfig) -> Result<RoadNetwork> {
        let mut network = match &cfg.source {
            NetworkSource::Dataset(dataset) => {
                let mut network = RoadNetwork::new();
                network.read_nodes(&dataset.node_path)?;
                network.read_links(&dataset.link_path)?;
                network.read_od_pairs(&dataset.od_path)?;
                network
            }
            NetworkSource::Grid(grid) => {
                let mut rng = Isaac64Rng::seed_from_u64(grid.seed);
                generate_grid_network(grid.num_x_nodes, grid.num_y_nodes, grid.spacing,
                                      grid.free_flow_speed, grid.capacity, grid.num_od_pairs,
                                      grid.total_demand, &mut rng)
            }
        };
        network.set_parameters(cfg.params.clone());
        network.set_convergence_log(cfg.convergence_log.clone());

        let path_file = match &cfg.source {
            NetworkSource::Dataset(dataset) => dataset.path_file.as_ref(),
            NetworkSource::Grid(_) => None,
        };
        match path_file {
            Some(path_file) => {
                network.read_paths(path_file)?;
            }
            None => {
                network.compute_paths();
            }
        }
        Ok(network)
    }
}
