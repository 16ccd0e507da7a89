//! avida-cpu-run - Run one genome on the virtual CPU until its first divide
//!
//! # Usage
//!
//! ```bash
//! # Heads instruction set, default configuration
//! avida-cpu-run default-heads.org
//!
//! # Custom instruction set and configuration, fixed seed
//! avida-cpu-run --inst-set instset.cfg --config hardware.json --seed 7 default-heads.org
//!
//! # Give up after 5000 ticks, print every fault
//! avida-cpu-run --ticks 5000 -v default-heads.org
//! ```
//!
//! # Exit Codes
//!
//! - 0: The organism divided; the child genome is printed on stdout
//! - 1: No divide before the tick limit, or the organism died
//! - 2: Invalid arguments, unreadable files or a genome the hardware rejects

use anyhow::{Context, Result};
use avida_cpu::loader::{load_config, load_genome, load_inst_set_or_default};
use avida_cpu::{seeded, ExecutionContext, Hardware, HardwareConfig, RecordingOrganism};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

const DEFAULT_TICKS: u64 = 100_000;

struct Options {
    inst_set: Option<PathBuf>,
    config: Option<PathBuf>,
    seed: u64,
    ticks: u64,
    verbose: bool,
    genome: PathBuf,
}

enum RunEnd {
    Divided,
    Died,
    OutOfTicks,
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let options = match parse_args(&args[1..]) {
        Ok(Some(options)) => options,
        Ok(None) => {
            print_help();
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("Error: {}\n", message);
            print_help();
            return ExitCode::from(2);
        }
    };

    match run(&options) {
        Ok(RunEnd::Divided) => ExitCode::SUCCESS,
        Ok(RunEnd::Died) | Ok(RunEnd::OutOfTicks) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// `Ok(None)` when help was requested.
fn parse_args(args: &[String]) -> std::result::Result<Option<Options>, String> {
    let mut inst_set = None;
    let mut config = None;
    let mut seed = 1u64;
    let mut ticks = DEFAULT_TICKS;
    let mut verbose = false;
    let mut genome = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "-v" | "--verbose" => verbose = true,
            "--inst-set" => inst_set = Some(PathBuf::from(value(&mut iter, arg)?)),
            "--config" => config = Some(PathBuf::from(value(&mut iter, arg)?)),
            "--seed" => seed = number(&mut iter, arg)?,
            "--ticks" => ticks = number(&mut iter, arg)?,
            _ if arg.starts_with('-') => return Err(format!("Unknown option: {}", arg)),
            _ if genome.is_some() => return Err(format!("Unexpected argument: {}", arg)),
            _ => genome = Some(PathBuf::from(arg)),
        }
    }

    let genome = genome.ok_or_else(|| "No genome specified".to_string())?;
    Ok(Some(Options {
        inst_set,
        config,
        seed,
        ticks,
        verbose,
        genome,
    }))
}

fn value<'a>(iter: &mut std::slice::Iter<'a, String>, flag: &str) -> std::result::Result<&'a str, String> {
    iter.next()
        .map(String::as_str)
        .ok_or_else(|| format!("{} needs a value", flag))
}

fn number(iter: &mut std::slice::Iter<'_, String>, flag: &str) -> std::result::Result<u64, String> {
    let raw = value(iter, flag)?;
    raw.parse()
        .map_err(|_| format!("{} expects a number, got '{}'", flag, raw))
}

fn run(options: &Options) -> Result<RunEnd> {
    let inst_set = Arc::new(load_inst_set_or_default(options.inst_set.as_deref())?);
    let config = match &options.config {
        Some(path) => load_config(path)?,
        None => HardwareConfig::default(),
    };
    let genome = load_genome(&options.genome, &inst_set)?;
    let mut hardware = Hardware::new(Arc::clone(&inst_set), Arc::new(config), &genome)
        .with_context(|| format!("Genome {} rejected", options.genome.display()))?;

    let mut rng = seeded(options.seed);
    let mut organism = RecordingOrganism::new();
    let mut executed = 0u64;
    let mut end = RunEnd::OutOfTicks;
    let mut ticks = 0u64;

    while ticks < options.ticks {
        ticks += 1;
        let outcome = {
            let mut ctx = ExecutionContext::new(&mut rng, &mut organism);
            hardware.single_process(&mut ctx)
        };
        executed += outcome.executed as u64;
        if outcome.divided {
            end = RunEnd::Divided;
            break;
        }
        if outcome.died {
            end = RunEnd::Died;
            break;
        }
    }

    if options.verbose {
        for fault in &organism.faults {
            eprintln!("  [{:?} {}] {}", fault.location, fault.severity, fault.message);
        }
    }

    eprintln!("Genome:     {} ({} lines)", options.genome.display(), genome.len());
    eprintln!("Ticks:      {}", ticks);
    eprintln!("Executed:   {}", executed);
    eprintln!("Faults:     {}", organism.faults.len());

    match end {
        RunEnd::Divided => {
            let child = organism.children.last().cloned().unwrap_or_default();
            let identical = child == genome;
            eprintln!(
                "Result:     divided, child has {} lines{}",
                child.len(),
                if identical { " (exact copy)" } else { "" }
            );
            print!("{}", inst_set.genome_to_string(&child));
        }
        RunEnd::Died => eprintln!("Result:     died without dividing"),
        RunEnd::OutOfTicks => eprintln!("Result:     no divide within {} ticks", options.ticks),
    }
    Ok(end)
}

fn print_help() {
    eprintln!("avida-cpu-run - Run a genome on the virtual CPU until its first divide");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    avida-cpu-run [OPTIONS] <GENOME>");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    --inst-set <FILE>  Instruction set (default: 26-instruction heads set)");
    eprintln!("    --config <FILE>    Hardware configuration, JSON");
    eprintln!("    --seed <N>         Random seed (default: 1)");
    eprintln!("    --ticks <N>        Tick limit (default: {})", DEFAULT_TICKS);
    eprintln!("    -v, --verbose      Print every fault");
    eprintln!("    -h, --help         Show this help");
    eprintln!();
    eprintln!("EXIT CODES:");
    eprintln!("    0  Divided; child genome printed on stdout");
    eprintln!("    1  No divide (tick limit or death)");
    eprintln!("    2  Invalid arguments or input");
}
