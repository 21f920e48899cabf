use std::path::{Path, PathBuf};

use rust_sue_assignment::{AssignmentConfig, RoadNetwork};


fn run(config_path: &Path) -> rust_sue_assignment::Result<()> {
    let cfg = AssignmentConfig::from_file(config_path)?;
    let mut network = RoadNetwork::from_config(&cfg)?;
    let outcome = network.solve()?;
    if let Some(stats) = network.stats() {
        log::info!("outcome: {:?}", outcome);
        log::info!("UE gap: {}, total cost: {}, objective: {}", stats.ue_gap, stats.total_cost,
                   stats.objective);
        log::info!("average flow: {}, average speed ratio: {}", stats.avg_flow,
                   stats.avg_speed_ratio);
    }

    for link in network.links() {
        println!("{}\t{}\t{}", link.id, link.flow, link.travel_time);
    }
    Ok(())
}

fn main () {
    env_logger::init();
    let config_path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("usage: rust_sue_assignment <config.yaml>");
            std::process::exit(2);
        }
    };
    if let Err(err) = run(&config_path) {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
