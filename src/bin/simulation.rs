//! Synthetic fleet generator
//!
//! Writes a JSONL file of plausible harmonized oil samples for demos and
//! load testing: a fleet of trucks and shovels, a handful of components
//! each, wear metals drifting upward over time with occasional
//! contamination spikes.
//!
//! ```bash
//! cargo run --bin simulation -- --client CDA --units 12 --months 18 \
//!     --out data/silver/CDA.jsonl
//! ```

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::io::Write;

use oilsense::types::Sample;

#[derive(Parser, Debug)]
#[command(name = "simulation")]
#[command(about = "Generate synthetic harmonized oil samples")]
struct CliArgs {
    /// Client identifier stamped on every sample
    #[arg(long, default_value = "CDA")]
    client: String,

    /// Number of units in the fleet
    #[arg(long, default_value = "10")]
    units: usize,

    /// Months of monthly sampling history per component
    #[arg(long, default_value = "12")]
    months: usize,

    /// Output path (JSONL)
    #[arg(long, default_value = "data/silver/CDA.jsonl")]
    out: String,

    /// RNG seed, for reproducible datasets
    #[arg(long, default_value = "42")]
    seed: u64,
}

const MACHINES: &[(&str, &str)] = &[
    ("Camión Tolva", "793F"),
    ("Pala Hidráulica", "PC5500"),
    ("Bulldozer", "D11T"),
];

const COMPONENTS: &[&str] = &["Motor Diesel", "Transmisión", "Hidráulico", "Mando Final"];

/// (essay, baseline, spread, spike chance)
const ESSAYS: &[(&str, f64, f64, f64)] = &[
    ("hierro", 18.0, 6.0, 0.06),
    ("cobre", 8.0, 4.0, 0.05),
    ("silicio", 9.0, 3.0, 0.08),
    ("cromo", 1.5, 0.8, 0.03),
    ("viscosidad_100", 14.0, 1.2, 0.02),
    ("contenido_agua", 0.1, 0.05, 0.04),
];

fn main() -> Result<()> {
    let args = CliArgs::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);

    let start = NaiveDate::from_ymd_opt(2023, 1, 15).unwrap_or_default();
    let mut lines = Vec::new();
    let mut sample_counter = 0u32;

    for unit in 0..args.units {
        let (machine, model) = MACHINES[unit % MACHINES.len()];
        let unit_id = format!("{}-{:03}", args.client.to_uppercase(), unit + 1);

        for component in COMPONENTS {
            // Per-component wear slope so some components degrade faster.
            let slope: f64 = rng.gen_range(0.0..0.6);

            for month in 0..args.months {
                sample_counter += 1;
                let date = start + Duration::days((month * 30) as i64);

                let mut essays = HashMap::new();
                for (essay, baseline, spread, spike_chance) in ESSAYS {
                    // Sparse data: labs skip essays now and then.
                    if rng.gen_bool(0.08) {
                        continue;
                    }
                    let drift = slope * month as f64;
                    let noise = rng.gen_range(-spread..*spread);
                    let spike = if rng.gen_bool(*spike_chance) {
                        rng.gen_range(2.0..4.0)
                    } else {
                        1.0
                    };
                    let value = ((baseline + drift + noise) * spike).max(0.0);
                    essays.insert(essay.to_string(), (value * 10.0).round() / 10.0);
                }

                let sample = Sample {
                    sample_number: format!("SIM-{sample_counter:06}"),
                    unit_id: unit_id.clone(),
                    machine_name: machine.to_string(),
                    machine_model: Some(model.to_string()),
                    component_name: component.to_string(),
                    sample_date: date,
                    client: args.client.to_uppercase(),
                    essays,
                };
                lines.push(serde_json::to_string(&sample)?);
            }
        }
    }

    let path = std::path::Path::new(&args.out);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut file = std::io::BufWriter::new(
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?,
    );
    for line in &lines {
        writeln!(file, "{line}")?;
    }
    file.flush()?;

    println!(
        "Wrote {} samples for {} units to {}",
        lines.len(),
        args.units,
        args.out
    );
    Ok(())
}
