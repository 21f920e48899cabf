// Readers for the tab-delimited network files.  Ids in the files are 1-based.
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use super::error::{NetworkError, Result};
use super::geometry::{GeoCoord, Point2d};
use super::network::{check_capacity, check_demand, check_free_flow_time, RoadNetwork};


fn open_tsv(path: &Path) -> Result<Option<csv::Reader<File>>> {
    if ! path.exists() {
        log::error!("{:?} does not exist!", path);
        return Ok(None);
    }
    let reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    Ok(Some(reader))
}

fn line_of(record: &csv::StringRecord) -> usize {
    record.position().map_or(0, |pos| pos.line() as usize)
}

fn parse_field<TT>(record: &csv::StringRecord, idx: usize, path: &Path) -> Result<TT>
    where TT: FromStr
{
    let parse_err = |msg: String| NetworkError::Parse {
        file: path.to_path_buf(),
        line: line_of(record),
        msg,
    };
    let field = record.get(idx)
        .ok_or_else(|| parse_err(format!("missing column {}", idx + 1)))?;
    field.parse()
        .map_err(|_| parse_err(format!("could not parse \"{}\" in column {}", field, idx + 1)))
}

/// Parses a 1-based id and returns it 0-based.
fn parse_id(record: &csv::StringRecord, idx: usize, path: &Path) -> Result<usize> {
    let id: usize = parse_field(record, idx, path)?;
    if id == 0 {
        return Err(NetworkError::Parse {
            file: path.to_path_buf(),
            line: line_of(record),
            msg: String::from("ids start at 1"),
        });
    }
    Ok(id - 1)
}

/// Reports a rejected value as a parse error on the record's line.
fn check_value(record: &csv::StringRecord, path: &Path, checked: Result<()>) -> Result<()> {
    checked.map_err(|err| NetworkError::Parse {
        file: path.to_path_buf(),
        line: line_of(record),
        msg: err.to_string(),
    })
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(|field| field.is_empty())
}


impl RoadNetwork {
    /// Reads nodes from rows of `id x y lat lon`.  The id column is ignored; nodes are numbered
    /// in file order.  Replaces the whole network, so links, OD pairs, and paths are cleared.
    /// Returns the number of nodes read, or 0 if the file does not exist.
    pub fn read_nodes(&mut self, path: &Path) -> Result<usize> {
        let mut reader = match open_tsv(path)? {
            Some(reader) => reader,
            None => return Ok(0),
        };
        let mut network = RoadNetwork::new();
        for record in reader.records() {
            let record = record?;
            if is_blank(&record) {
                continue;
            }
            let position = Point2d::new(parse_field(&record, 1, path)?,
                                        parse_field(&record, 2, path)?);
            let geo = GeoCoord::new(parse_field(&record, 3, path)?, parse_field(&record, 4, path)?);
            network.insert_node(position, geo);
        }
        self.nodes = network.nodes;
        self.links.clear();
        self.od_pairs.clear();
        self.paths.clear();
        self.stats = None;
        self.reset_distance_matrix();
        log::info!("read {} nodes from {:?}", self.nodes.len(), path);
        Ok(self.nodes.len())
    }

    /// Reads links from rows of `from to free_flow_time capacity`, replacing existing links
    /// and paths.
    pub fn read_links(&mut self, path: &Path) -> Result<usize> {
        let mut reader = match open_tsv(path)? {
            Some(reader) => reader,
            None => return Ok(0),
        };
        let mut rows = vec![];
        for record in reader.records() {
            let record = record?;
            if is_blank(&record) {
                continue;
            }
            let from_node = parse_id(&record, 0, path)?;
            let to_node = parse_id(&record, 1, path)?;
            self.check_row_nodes(&record, &[from_node, to_node], path)?;
            let free_flow_time: f64 = parse_field(&record, 2, path)?;
            let capacity: f64 = parse_field(&record, 3, path)?;
            check_value(&record, path, check_free_flow_time(free_flow_time))?;
            check_value(&record, path, check_capacity(capacity))?;
            rows.push((from_node, to_node, free_flow_time, capacity));
        }

        self.links.clear();
        for node in self.nodes.iter_mut() {
            node.incoming_links.clear();
            node.outgoing_links.clear();
        }
        for (from_node, to_node, free_flow_time, capacity) in rows {
            self.insert_link(from_node, to_node, free_flow_time, capacity)?;
        }
        self.retain_paths(|_| false);
        self.stats = None;
        log::info!("read {} links from {:?}", self.links.len(), path);
        self.log_components();
        Ok(self.links.len())
    }

    /// Reads OD pairs from rows of `origin destination demand`, replacing existing OD pairs
    /// and paths.
    pub fn read_od_pairs(&mut self, path: &Path) -> Result<usize> {
        let mut reader = match open_tsv(path)? {
            Some(reader) => reader,
            None => return Ok(0),
        };
        let mut rows = vec![];
        for record in reader.records() {
            let record = record?;
            if is_blank(&record) {
                continue;
            }
            let origin = parse_id(&record, 0, path)?;
            let destination = parse_id(&record, 1, path)?;
            self.check_row_nodes(&record, &[origin, destination], path)?;
            let demand: f64 = parse_field(&record, 2, path)?;
            check_value(&record, path, check_demand(demand))?;
            rows.push((origin, destination, demand));
        }

        self.od_pairs.clear();
        self.paths.clear();
        for (origin, destination, demand) in rows {
            self.insert_od_pair(origin, destination, demand)?;
        }
        self.refresh_od_flags();
        self.stats = None;
        log::info!("read {} od pairs from {:?}", self.od_pairs.len(), path);
        Ok(self.od_pairs.len())
    }

    /// Reads a path set in place of enumerating one.  The file is a sequence of blocks, each a
    /// header row `od_pair_id origin destination path_count` followed by `path_count` rows of
    /// node ids.  Consecutive nodes must be joined by a link; paths that are not routes for
    /// their OD pair are dropped with a warning.  Replaces all existing paths and returns the
    /// number kept.
    pub fn read_paths(&mut self, path: &Path) -> Result<usize> {
        let mut reader = match open_tsv(path)? {
            Some(reader) => reader,
            None => return Ok(0),
        };
        let mut paths_by_od = vec![vec![]; self.od_pairs.len()];
        // (od pair id, paths still to read in its block)
        let mut block: Option<(usize, usize)> = None;
        for record in reader.records() {
            let record = record?;
            if is_blank(&record) {
                continue;
            }
            match block {
                Some((od_id, remaining)) if remaining > 0 => {
                    block = Some((od_id, remaining - 1));
                    match self.route_from_node_chain(&record, od_id, path)? {
                        Some(links) => paths_by_od[od_id].push(links),
                        None => log::warn!("dropping invalid path for OD pair {} at line {}",
                                           od_id, line_of(&record)),
                    }
                }
                _ => {
                    let od_id = parse_id(&record, 0, path)?;
                    let count: usize = parse_field(&record, 3, path)?;
                    if od_id >= self.od_pairs.len() {
                        return Err(NetworkError::Parse {
                            file: path.to_path_buf(),
                            line: line_of(&record),
                            msg: format!("no OD pair with id {}", od_id + 1),
                        });
                    }
                    let od_pair = &self.od_pairs[od_id];
                    let origin = parse_id(&record, 1, path)?;
                    let destination = parse_id(&record, 2, path)?;
                    if (origin, destination) != (od_pair.origin, od_pair.destination) {
                        log::warn!("path block for OD pair {} names nodes {} and {}",
                                   od_id, origin, destination);
                    }
                    block = Some((od_id, count));
                }
            }
        }
        if let Some((od_id, remaining)) = block {
            if remaining > 0 {
                log::warn!("path file ended {} paths short for OD pair {}", remaining, od_id);
            }
        }

        self.replace_paths(paths_by_od);
        log::info!("read {} paths from {:?}", self.paths.len(), path);
        Ok(self.paths.len())
    }

    fn check_row_nodes(&self, record: &csv::StringRecord, node_ids: &[usize], path: &Path)
                       -> Result<()> {
        match node_ids.iter().find(|&&node_id| node_id >= self.nodes.len()) {
            Some(node_id) => Err(NetworkError::Parse {
                file: path.to_path_buf(),
                line: line_of(record),
                msg: format!("no node with id {}", node_id + 1),
            }),
            None => Ok(()),
        }
    }

    fn route_from_node_chain(&self, record: &csv::StringRecord, od_id: usize, path: &Path)
                             -> Result<Option<Vec<usize>>> {
        let mut node_ids = Vec::with_capacity(record.len());
        for idx in 0..record.len() {
            if record[idx].is_empty() {
                continue;
            }
            node_ids.push(parse_id(record, idx, path)?);
        }
        let mut links = vec![];
        for pair in node_ids.windows(2) {
            match self.find_link(pair[0], pair[1]) {
                Some(link_id) => links.push(link_id),
                None => return Ok(None),
            }
        }
        let od_pair = &self.od_pairs[od_id];
        if self.is_route(&links, od_pair.origin, od_pair.destination) {
            Ok(Some(links))
        } else {
            Ok(None)
        }
    }
}
