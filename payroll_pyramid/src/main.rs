use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use comfy_table::{Cell, Table};
use payroll_pyramid::api::parse_curp_inner;
use payroll_pyramid::ingest::read_records;
use payroll_pyramid::{PyramidBuilder, PyramidResults, PyramidVariant, RowOrder, ScaleConfig};
use std::error::Error;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run_args: RunArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a pyramid and print it to the console or export to JSON/Markdown
    #[clap(name = "run")]
    Run(RunArgs),
    /// Generate a static HTML report of a pyramid
    Report(ReportArgs),
    /// Decode age and gender from one or more national IDs
    Curp(CurpArgs),
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// Path to the payroll data file (.csv, or .json with an array or {"data": [...]})
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Pyramid variant [choices: population, salary_age]
    #[arg(long, env = "PYRAMID_VARIANT", default_value = "population")]
    variant: PyramidVariant,

    /// Youngest age row to render
    #[arg(long, default_value_t = 15)]
    min_age: i32,

    /// Oldest age row to render
    #[arg(long, default_value_t = 80)]
    max_age: i32,

    /// Width (percent) of the largest possible bar
    #[arg(long, default_value_t = 95.0)]
    target_width: f64,

    /// Lower bound for the scale factor
    #[arg(long, default_value_t = 45.0)]
    min_scale: f64,

    /// List the youngest age first instead of the oldest
    #[arg(long)]
    ascending: bool,

    /// Compute ages as of this date (YYYY-MM-DD) instead of today
    #[arg(long)]
    reference_date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Path to export results as JSON
    #[arg(long)]
    output_json: Option<PathBuf>,

    /// Path to export results as Markdown
    #[arg(long)]
    output_markdown: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ReportArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Path to save the output HTML file
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct CurpArgs {
    /// National IDs to decode
    #[arg(required = true)]
    ids: Vec<String>,

    /// Compute ages as of this date (YYYY-MM-DD) instead of today
    #[arg(long)]
    reference_date: Option<NaiveDate>,
}

fn build(args: &PipelineArgs) -> Result<PyramidResults, Box<dyn Error>> {
    let path = args.data.as_ref().ok_or("A data file is required (--data)")?;
    let records = read_records(path)?;
    info!(path = %path.display(), rows = records.len(), "loaded payroll data");

    let mut builder = PyramidBuilder::new(records);
    builder
        .variant(args.variant)
        .age_bounds(args.min_age, args.max_age)
        .scale(ScaleConfig {
            target_max_width: args.target_width,
            min_scale_factor: args.min_scale,
        })
        .order(if args.ascending {
            RowOrder::Ascending
        } else {
            RowOrder::Descending
        });
    if let Some(date) = args.reference_date {
        builder.reference_date(date);
    }
    Ok(builder.run()?)
}

fn run_pyramid(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let results = build(&args.pipeline)?;
    results.summary();
    if let Some(path) = args.output_json {
        let json = results
            .to_json()
            .map_err(|e| format!("Failed to serialize to JSON: {}", e))?;
        std::fs::write(path, json)?;
    }
    if let Some(path) = args.output_markdown {
        std::fs::write(path, results.to_markdown())?;
    }
    Ok(())
}

fn run_report(args: ReportArgs) -> Result<(), Box<dyn Error>> {
    let results = build(&args.pipeline)?;
    std::fs::write(&args.output, results.to_html())?;
    println!("Report successfully generated at: {}", args.output.display());
    Ok(())
}

fn run_curp(args: CurpArgs) -> Result<(), Box<dyn Error>> {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Valid", "Age", "Gender", "Birth date"]);
    for id in &args.ids {
        let parsed = parse_curp_inner(id, args.reference_date);
        table.add_row(vec![
            Cell::new(&parsed.id),
            Cell::new(if parsed.valid { "yes" } else { "no" }),
            Cell::new(parsed.age.map_or_else(|| "-".to_string(), |a| a.to_string())),
            Cell::new(parsed.gender),
            Cell::new(parsed.birth_date.map_or_else(
                || "-".to_string(),
                |d| format!("{:04}-{:02}-{:02}", d.year, d.month, d.day),
            )),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Some(Commands::Run(args)) => run_pyramid(args),
        Some(Commands::Report(args)) => run_report(args),
        Some(Commands::Curp(args)) => run_curp(args),
        None => run_pyramid(cli.run_args),
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let mut cmd = Cli::command();
        let _ = cmd.print_help();
        std::process::exit(1);
    }
}
