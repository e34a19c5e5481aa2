use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use curvefx::{Automaton, AutomatonOptions, DEFAULT_MAX_FX_ROWS};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "curvefx", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print channel values over a time range.
    Sample(SampleArgs),
    /// Rewrite older automaton data in the current format.
    Upgrade(UpgradeArgs),
    /// Summarize an automaton file.
    Info(InfoArgs),
}

#[derive(Parser, Debug)]
struct SampleArgs {
    /// Input automaton JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Channel to sample. All channels when omitted.
    #[arg(long)]
    channel: Option<String>,

    /// First sample time in seconds.
    #[arg(long, default_value_t = 0.0)]
    from: f64,

    /// Last sample time in seconds. Defaults to the automaton length.
    #[arg(long)]
    to: Option<f64>,

    /// Time between samples in seconds.
    #[arg(long, default_value_t = 0.1)]
    step: f64,

    /// Fx rows available on each curve.
    #[arg(long, default_value_t = DEFAULT_MAX_FX_ROWS)]
    max_fx_rows: usize,
}

#[derive(Parser, Debug)]
struct UpgradeArgs {
    /// Input automaton JSON, any supported version.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output path for current-version JSON.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Input automaton JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Sample(args) => cmd_sample(args),
        Command::Upgrade(args) => cmd_upgrade(args),
        Command::Info(args) => cmd_info(args),
    }
}

fn cmd_sample(args: SampleArgs) -> anyhow::Result<()> {
    anyhow::ensure!(
        args.step.is_finite() && args.step > 0.0,
        "--step must be > 0"
    );
    let options = AutomatonOptions {
        max_fx_rows: args.max_fx_rows,
        ..AutomatonOptions::default()
    };
    let automaton = Automaton::from_path(&args.in_path, options)
        .with_context(|| format!("load '{}'", args.in_path.display()))?;

    let names: Vec<String> = match &args.channel {
        Some(name) => {
            anyhow::ensure!(
                automaton.channel(name).is_some(),
                "no channel named '{name}'"
            );
            vec![name.clone()]
        }
        None => automaton.channels().map(|(n, _)| n.to_string()).collect(),
    };

    let to = args.to.unwrap_or(automaton.length());
    anyhow::ensure!(to >= args.from, "--to must not be before --from");
    let steps = ((to - args.from) / args.step + 1e-9).floor() as usize;

    if args.channel.is_none() {
        println!("time {}", names.join(" "));
    }
    for i in 0..=steps {
        let time = args.from + i as f64 * args.step;
        let values: Vec<String> = names
            .iter()
            .map(|n| automaton.channel_value(n, time).unwrap_or(0.0).to_string())
            .collect();
        println!("{time} {}", values.join(" "));
    }
    Ok(())
}

fn cmd_upgrade(args: UpgradeArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.in_path)
        .with_context(|| format!("read '{}'", args.in_path.display()))?;
    let data: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("parse '{}'", args.in_path.display()))?;
    let automaton = Automaton::from_value(data, AutomatonOptions::default())?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, automaton.to_json()?)
        .with_context(|| format!("write '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let automaton = Automaton::from_path(&args.in_path, AutomatonOptions::default())
        .with_context(|| format!("load '{}'", args.in_path.display()))?;

    println!("length: {}", automaton.length());
    println!("resolution: {}", automaton.resolution());
    println!("curves: {}", automaton.curves().len());
    for (index, curve) in automaton.curves().iter().enumerate() {
        println!(
            "  #{index}: length {}, {} nodes, {} fx",
            curve.length(),
            curve.nodes().len(),
            curve.fxs().len()
        );
        for fx in curve.fxs() {
            if !automaton.registry().contains(&fx.def) {
                println!("    warning: unknown fx '{}' at {}", fx.def, fx.time);
            }
        }
        for status in curve.statuses().iter() {
            println!("    {:?}: {}", status.level, status.message);
        }
    }

    println!("channels: {}", automaton.channels().count());
    for (name, channel) in automaton.channels() {
        println!(
            "  {name}: {} items, ends at {}",
            channel.items().len(),
            channel.length()
        );
    }
    for (name, time) in automaton.labels() {
        println!("label {name}: {time}");
    }
    Ok(())
}
