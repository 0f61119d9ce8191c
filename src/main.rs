use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;

use structopt::StructOpt;

use use_aware_icache_sim::{Config, Report, SimError, Simulator, TextTraceReader};

fn run(config: Config) -> Result<(), SimError> {
    let mut sim = Simulator::new(config.clone())?;

    let file = File::open(&config.trace_path)?;
    let mut source = TextTraceReader::new(BufReader::new(file));
    sim.run(&mut source)?;

    let report = Report::from_simulator(&sim);

    let out_file = File::create(&config.output_path)?;
    report.write_text(out_file)?;
    log::info!("wrote report to {}", config.output_path);

    if let Some(json_path) = &config.json {
        let json_file = File::create(json_path)?;
        report.write_json(json_file)?;
        log::info!("wrote json report to {}", json_path.display());
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let config = Config::from_args();

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
