mod logic;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use metagame_core::{FieldMode, MatchupModel, PairingMode, TournamentFormat};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use logic::{
    BatchRunner, BatchSummary, Scenario, parse_cutoffs, resolve_seed_inputs, split_csv,
    summarize_batch,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FieldArg {
    /// Use archetype weights as literal deck counts
    Counts,
    /// Scale shares to --players with largest-remainder rounding
    Exact,
    /// Draw --players decks by share, fresh every trial
    Sampled,
}

impl From<FieldArg> for FieldMode {
    fn from(value: FieldArg) -> Self {
        match value {
            FieldArg::Counts => Self::Counts,
            FieldArg::Exact => Self::Exact,
            FieldArg::Sampled => Self::Sampled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Swiss rounds followed by a top cut
    Swiss,
    /// Single elimination over the whole field
    Knockout,
}

impl From<FormatArg> for TournamentFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Swiss => Self::Swiss,
            FormatArg::Knockout => Self::Knockout,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "metagame-sim", version = "0.1.0")]
#[command(about = "Monte Carlo Swiss tournament simulator for competitive metagames")]
struct Args {
    /// Scenario JSON file; the built-in demo is used when omitted
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// List the scenario's archetypes and exit
    #[arg(long)]
    list_archetypes: bool,

    /// Batch seeds (comma-separated; numbers, 0x hex, or text)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Trials per seed (overrides the scenario)
    #[arg(long)]
    trials: Option<usize>,

    /// Swiss rounds (default: ceil(log2 players))
    #[arg(long)]
    rounds: Option<u32>,

    /// Requested top cut size; 0 disables the cut
    #[arg(long)]
    top_cut: Option<u32>,

    /// Standings cutoffs to track each round (comma-separated)
    #[arg(long)]
    cutoffs: Option<String>,

    /// Pair Swiss rounds with the exact no-rematch search
    #[arg(long)]
    exact: bool,

    /// With --exact, fail a trial instead of falling back to heuristic pairing
    #[arg(long, requires = "exact")]
    no_fallback: bool,

    /// Step budget for each exact pairing search
    #[arg(long, requires = "exact")]
    search_budget: Option<u64>,

    /// How each trial's field is built
    #[arg(long, value_enum)]
    field: Option<FieldArg>,

    /// Field size for exact or sampled fields
    #[arg(long)]
    players: Option<usize>,

    /// Event structure
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Run trials in parallel
    #[arg(long)]
    parallel: bool,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console", "csv"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let scenario = load_scenario(&args)?;
    if maybe_list_archetypes(&args, &scenario)? {
        return Ok(());
    }

    if wants_banner(&args) {
        announce_banner();
    }

    let start_time = Instant::now();
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let model = scenario.build_model()?;
    let summaries = run_batches(&args, &scenario, &model, &seeds)?;

    write_reports(&args, &summaries, start_time)?;

    if summaries.iter().all(|s| s.completed == 0) {
        bail!("every trial failed; see the report for errors");
    }
    Ok(())
}

fn load_scenario(args: &Args) -> Result<Scenario> {
    let mut scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::demo()?,
    };
    apply_overrides(args, &mut scenario)?;
    scenario.validate()?;
    Ok(scenario)
}

fn apply_overrides(args: &Args, scenario: &mut Scenario) -> Result<()> {
    let tournament = &mut scenario.tournament;
    let monte_carlo = &mut scenario.monte_carlo;
    if let Some(trials) = args.trials {
        monte_carlo.trials = trials;
    }
    if let Some(rounds) = args.rounds {
        tournament.swiss_rounds = Some(rounds);
    }
    if let Some(top_cut) = args.top_cut {
        tournament.top_cut = top_cut;
    }
    if let Some(cutoffs) = &args.cutoffs {
        tournament.tracked_cutoffs =
            parse_cutoffs(cutoffs).context("invalid --cutoffs value")?;
    }
    if args.exact {
        tournament.pairing = PairingMode::Exact {
            fallback: !args.no_fallback,
            budget: args.search_budget,
        };
    }
    if let Some(field) = args.field {
        monte_carlo.field = field.into();
    }
    if let Some(players) = args.players {
        monte_carlo.players = Some(players);
    }
    if let Some(format) = args.format {
        tournament.format = format.into();
    }
    if args.parallel {
        monte_carlo.parallel = true;
    }
    Ok(())
}

fn maybe_list_archetypes(args: &Args, scenario: &Scenario) -> Result<bool> {
    if !args.list_archetypes {
        return Ok(false);
    }
    let model = scenario.build_model()?;
    let meta = model.metagame();
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Archetypes in {}:", scenario.name)?;
    for variant in meta.variants() {
        writeln!(
            output_target.writer(),
            "  {:30} - {:.1}% of the field",
            meta.label(variant),
            meta.variant_share(variant) * 100.0
        )?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn wants_banner(args: &Args) -> bool {
    args.output.is_some() || args.report == "console"
}

fn announce_banner() {
    println!("{}", "🃏 Metagame Tournament Simulator".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn run_batches(
    args: &Args,
    scenario: &Scenario,
    model: &MatchupModel,
    seeds: &[u64],
) -> Result<Vec<BatchSummary>> {
    let runner = BatchRunner::new(model, &scenario.tournament, &scenario.monte_carlo)?;
    let mut summaries = Vec::with_capacity(seeds.len());
    for &seed in seeds {
        let batch_start = Instant::now();
        let batch = runner.run(seed, None);
        if args.verbose {
            let status = if batch.failures.is_empty() {
                "✅".to_string()
            } else {
                format!("⚠️  {} failed,", batch.failures.len())
            };
            println!(
                "{status} seed {} - {}/{} trials in {:?}",
                seed.to_string().green(),
                batch.outcomes.len(),
                batch.trials(),
                batch_start.elapsed()
            );
        }
        summaries.push(summarize_batch(
            &scenario.name,
            model,
            &batch,
            scenario.monte_carlo.projector_rounds,
        ));
    }
    Ok(summaries)
}

fn write_reports(args: &Args, summaries: &[BatchSummary], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => logic::reports::generate_json_report(&mut output_target, summaries)?,
        "markdown" => logic::reports::generate_markdown_report(&mut output_target, summaries)?,
        "csv" => logic::reports::generate_csv_report(&mut output_target, summaries)?,
        _ => {
            let duration = start_time.elapsed();
            if summaries.is_empty() {
                writeln!(&mut output_target, "No batches executed.")?;
            } else {
                logic::reports::generate_console_report(&mut output_target, summaries, duration)?;
            }
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
