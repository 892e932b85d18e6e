use line_validator::config::{self, RuntimeConfig};
use line_validator::{DetailedResult, LineValidator, MaskHistory};
use std::env;
use std::error::Error;
use std::path::Path;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config: RuntimeConfig = config::load_config(Path::new(&config_path))?;
    let input = config::load_input(&config.input_path)?;

    let mut history = match &config.output.history {
        Some(path) if path.exists() => config::read_json::<MaskHistory>(path)?,
        _ => MaskHistory::new(),
    };

    let validator = LineValidator::new(config.params.clone());
    let detailed = validator.process_with_diagnostics(&input, &history.previous());
    let changed = history.apply(input.iteration, &detailed.result);

    if config.output.format.includes_text() {
        print_text_summary(&detailed, changed);
    }
    if config.output.format.includes_json() {
        match &config.output.json_out {
            Some(path) => {
                config::write_json_file(path, &detailed)?;
                println!("JSON report written to {}", path.display());
            }
            None => println!("{}", serde_json::to_string_pretty(&detailed)?),
        }
    }
    if let Some(path) = &config.output.history {
        config::write_json_file(path, &history)?;
    }
    Ok(())
}

fn print_text_summary(detailed: &DetailedResult, changed: usize) {
    let res = &detailed.result;
    println!("Validation summary");
    println!("  spw: {}", res.spw.map_or_else(|| "-".to_string(), |s| s.to_string()));
    println!("  spectra: {} (changed: {changed})", res.windows.len());
    println!("  latency_ms: {:.3}", res.latency_ms);

    println!("\nClusters");
    for (i, c) in res.clusters.iter().enumerate() {
        println!(
            "  #{i}: center={:.1} width={:.1} valid={} max_distance={:.3}",
            c.center, c.width, c.valid, c.max_distance
        );
    }

    println!("\n{}", detailed.report.summary());

    println!("\nTimings (ms):");
    for stage in &detailed.report.timings.stages {
        println!("  {}: {:.3}", stage.label, stage.elapsed_ms);
    }

    println!("\nWindows");
    for (id, outcome) in &res.windows {
        let windows: Vec<String> = outcome.windows.iter().map(|w| w.to_string()).collect();
        println!(
            "  {id}: {}{}",
            windows.join(" "),
            if outcome.changed { "  (changed)" } else { "" }
        );
    }
}

fn usage() -> String {
    "Usage: validate_demo <config.json>".to_string()
}
