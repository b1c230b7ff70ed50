extern crate uwg;

use anyhow::{bail, Context};
use clap::Parser;
use indexmap::IndexMap;
use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use uwg::input::ingest_for_processing;
use uwg::output::FileOutput;
use uwg::{run_batch, run_project};

#[derive(Parser, Default, Debug)]
#[clap(author, version, about, long_about = None)]
struct UwgArgs {
    #[arg(
        required = true,
        help = "Path to one or more JSON configurations; several are run in parallel"
    )]
    input_files: Vec<PathBuf>,
    #[arg(long, short, help = "Path to the rural weather file in .epw format")]
    epw_file: PathBuf,
    #[arg(
        long,
        short,
        help = "Directory for the urban weather files (defaults to the weather file's directory)"
    )]
    output_dir: Option<PathBuf>,
    #[arg(long, default_value_t = false, help = "Also write hourly canyon results as .csv")]
    hourly_csv: bool,
    #[arg(short, long, action = clap::ArgAction::Count, help = "Log more detail (-v, -vv, -vvv)")]
    verbose: u8,
}

fn file_stem(path: &Path) -> anyhow::Result<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .with_context(|| format!("'{}' has no file name", path.display()))
}

fn main() -> anyhow::Result<()> {
    let args = UwgArgs::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting tracing subscriber failed")?;

    let epw_text = fs::read_to_string(&args.epw_file)
        .with_context(|| format!("Could not read weather file {}", args.epw_file.display()))?;
    let epw_stem = file_stem(&args.epw_file)?;
    let output_dir = match args.output_dir {
        Some(directory) => directory,
        None => args
            .epw_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    fs::create_dir_all(&output_dir)?;

    if let [input_file] = args.input_files.as_slice() {
        let output = FileOutput::new(output_dir.clone(), format!("{epw_stem}_UWG.{{}}"));
        let summary = run_project(
            BufReader::new(File::open(input_file)?),
            &epw_text,
            &output,
            args.hourly_csv,
        )?;
        info!(
            "Wrote {}",
            output.path_for_location_key(uwg::output::EPW_OUTPUT_KEY)?.display()
        );
        println!(
            "Mean canyon {:.2} C, rural {:.2} C, heat island {:.2} K",
            summary.mean_canyon_temp_c,
            summary.mean_rural_temp_c,
            summary.heat_island_intensity()
        );
        return Ok(());
    }

    let mut cases = IndexMap::new();
    for input_file in &args.input_files {
        let name = file_stem(input_file)?;
        let input = ingest_for_processing(BufReader::new(File::open(input_file)?))
            .with_context(|| format!("Could not load {}", input_file.display()))?;
        let output = FileOutput::new(output_dir.clone(), format!("{epw_stem}_{name}_UWG.{{}}"));
        if cases.insert(name.clone(), (input, output)).is_some() {
            bail!("Two configurations are named '{name}'");
        }
    }

    let mut failures = 0;
    for (name, result) in run_batch(cases, &epw_text, args.hourly_csv) {
        match result {
            Ok(summary) => println!(
                "{name}: mean canyon {:.2} C, rural {:.2} C, heat island {:.2} K",
                summary.mean_canyon_temp_c,
                summary.mean_rural_temp_c,
                summary.heat_island_intensity()
            ),
            Err(e) => {
                warn!("{name} failed");
                println!("{name}: failed: {e:#}");
                failures += 1;
            }
        }
    }
    if failures > 0 {
        bail!("{failures} of {} configurations failed", args.input_files.len());
    }
    Ok(())
}
