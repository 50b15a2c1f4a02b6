//! MP-Twin - Entry point
//!
//! CLI Usage:
//!   cargo run -- --survey survey.csv                 # One random participant
//!   cargo run -- --survey survey.csv --seed 7 -g 12  # Reproducible pick, human guess 12
//!   cargo run -- --survey survey.csv --cohort        # Simulate every participant to CSV

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use mp_twin::{
    config::Parameters,
    export::{export_burden_csv, export_session_json, CohortExporter},
    session::{Pipeline, Session},
    survey::Survey,
    twin::Organ,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

struct CliArgs {
    survey: PathBuf,
    params_dir: Option<PathBuf>,
    seed: Option<u64>,
    organ: Organ,
    guess: u64,
    export: bool,
    cohort: bool,
}

fn print_help() {
    println!("MP-Twin");
    println!();
    println!("Usage: mp-twin --survey FILE [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -s, --survey FILE   Survey CSV (required)");
    println!("  -p, --params DIR    Parameter directory (default: data/parameters)");
    println!("      --seed N        Seed for participant selection");
    println!("  -o, --organ NAME    Organ for histology analysis (default: Liver)");
    println!("  -g, --guess N       Human particle count for the counting challenge (default: 0)");
    println!("      --export        Write burden CSV and session JSON to exports/");
    println!("      --cohort        Simulate every eligible participant into one CSV");
    println!("  -h, --help          Show this help");
}

/// Parse CLI arguments
fn parse_args() -> Result<CliArgs> {
    let args: Vec<String> = std::env::args().collect();
    let mut survey = None;
    let mut params_dir = None;
    let mut seed = None;
    let mut organ = Organ::Liver;
    let mut guess = 0;
    let mut export = false;
    let mut cohort = false;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let mut value = || -> Result<String> {
            i += 1;
            args.get(i)
                .cloned()
                .with_context(|| format!("{} needs a value", flag))
        };
        match flag {
            "-s" | "--survey" => survey = Some(PathBuf::from(value()?)),
            "-p" | "--params" => params_dir = Some(PathBuf::from(value()?)),
            "--seed" => seed = Some(value()?.parse().context("--seed must be an integer")?),
            "-o" | "--organ" => organ = value()?.parse().map_err(anyhow::Error::msg)?,
            "-g" | "--guess" => guess = value()?.parse().context("--guess must be a whole number")?,
            "--export" => export = true,
            "--cohort" => cohort = true,
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => bail!("unknown argument '{}' (try --help)", other),
        }
        i += 1;
    }

    let Some(survey) = survey else {
        print_help();
        bail!("--survey is required");
    };

    Ok(CliArgs {
        survey,
        params_dir,
        seed,
        organ,
        guess,
        export,
        cohort,
    })
}

/// Simulate every eligible participant and write one CSV row each
fn run_cohort(pipeline: &Pipeline, survey: &Survey, params: &Parameters) -> Result<()> {
    let mut exporter = CohortExporter::new()?;
    let mut skipped = 0;

    for participant in survey.eligible(&params.survey.allowed_participant_ids) {
        let mut session = Session::new();
        session.set_participant(participant.clone());

        let outcome = pipeline
            .assess_exposure(&mut session)
            .and_then(|_| pipeline.simulate(&mut session));
        match (outcome, session.burdens.as_ref()) {
            (Ok(()), Some(burdens)) => exporter.record(participant.id(), burdens)?,
            (Err(e), _) => {
                log::warn!("Skipping participant {}: {}", participant.id(), e);
                skipped += 1;
            }
            (Ok(()), None) => skipped += 1,
        }
    }

    let rows = exporter.rows();
    let path = exporter.finish()?;
    println!("Simulated {} participants ({} skipped)", rows, skipped);
    println!("Cohort written to {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let args = parse_args()?;
    log::info!("MP-Twin starting...");

    let params = match &args.params_dir {
        Some(dir) => Parameters::load_from_dir(dir),
        None => Parameters::load_or_default(),
    };
    let pipeline = Pipeline::from_parameters(&params)?;
    let survey = Survey::from_path(&args.survey, &params.survey)?;

    if args.cohort {
        return run_cohort(&pipeline, &survey, &params);
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut session = Session::new();
    pipeline.select_participant(&mut session, &survey, &mut rng)?;
    let participant_id = session
        .participant
        .as_ref()
        .map(|p| p.id().to_string())
        .unwrap_or_default();
    println!("=== MP-Twin ===\n");
    println!("Selected participant: {}", participant_id);

    // Exposure
    pipeline.assess_exposure(&mut session)?;
    if let Some(summary) = session.exposure_summary() {
        println!("\n--- 1. Exposure Assessment ---");
        println!("Ingestion (particles):  {}", summary.ingestion);
        println!("Inhalation (particles): {}", summary.inhalation);
        println!("Dermal (particles):     {}", summary.dermal);
    }

    // Digital twin
    pipeline.simulate(&mut session)?;
    if let Some(burdens) = &session.burdens {
        println!("\n--- 2. Digital Twin Organ Accumulation ---");
        println!("{:<8} {:>20}", "Organ", "Microplastic_Count");
        for row in burdens {
            println!("{:<8} {:>20.2}", row.organ, row.microplastic_count);
        }
    }

    // Histology and counting challenge
    println!("\n--- 3. Histology Analysis ---");
    match pipeline.resolve_histology(&mut session, args.organ) {
        Ok(()) => {
            if let Some(histology) = &session.histology {
                println!("Synthetic {} section: {}", histology.organ, histology.image.display());
                println!("Predicted burden: {:.1} particles/unit", histology.burden);
            }
            match pipeline.count_particles(&mut session, args.guess) {
                Ok(comparison) => {
                    println!("Human estimate: {}", comparison.human);
                    println!("Model count:    {}", comparison.model);
                    println!("Absolute error: {}", comparison.absolute_error);
                    if comparison.matches_model() {
                        println!("✓ As accurate as the model");
                    } else {
                        println!("⚠️  The model detected particles that may be too small to see by eye");
                    }
                }
                Err(e) => println!("⚠️  Particle counting failed: {}", e),
            }
        }
        Err(e) => println!("⚠️  {}", e),
    }

    if args.export {
        if let Some(burdens) = &session.burdens {
            let path = export_burden_csv(burdens, &participant_id)?;
            println!("\nBurden table: {}", path.display());
        }
        let path = export_session_json(&session)?;
        println!("Session snapshot: {}", path.display());
    }

    println!("\nAll burdens come from a deterministic compartmental model for demonstration only.");
    Ok(())
}
