// Command-line entry point for retrograph.

use anyhow::bail;
use clap::Parser;
use retrograph::application::{AnalysisConfig, AnalyzeUsecase};
use retrograph::domain::roots::DEFAULT_MARKER_LABEL;
use retrograph::infrastructure::{concurrency, Frontend, ProjectLoader};
use retrograph::ports::{DotExporter, Exporter, JsonExporter, TextExporter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input source file path (can specify multiple)
    #[arg(short, long)]
    input: Vec<String>,

    /// Input source folder(s)
    #[arg(short = 'd', long)]
    folder: Vec<String>,

    /// Workspace Cargo.toml
    #[arg(long)]
    workspace: Option<String>,

    /// Only analyze files whose path contains this substring
    #[arg(short = 'p', long)]
    filter: Option<String>,

    /// Call name that marks a root function
    #[arg(short, long, default_value = DEFAULT_MARKER_LABEL)]
    marker: String,

    /// Output file path (prints the text report to stdout when omitted)
    #[arg(short, long)]
    output: Option<String>,

    /// Output format (text, json, dot)
    #[arg(short = 'f', long, default_value = "text")]
    format: String,
}

fn collect_sources(cli: &Cli) -> anyhow::Result<Vec<(String, String, String)>> {
    let mut sources = Vec::new();

    sources.extend(ProjectLoader::load_files(&cli.input)?);

    for folder in &cli.folder {
        sources.extend(ProjectLoader::load_folder(folder)?);
    }

    if let Some(manifest) = &cli.workspace {
        match ProjectLoader::load_workspace(manifest) {
            Ok(ws) => sources.extend(ws),
            Err(e) => {
                eprintln!(
                    "[retrograph] cargo metadata unavailable ({e:#}); reading manifest directly"
                );
                sources.extend(ProjectLoader::load_workspace_manifest(manifest)?);
            }
        }
    }

    if sources.is_empty() {
        bail!("Provide at least one --input <file>, --folder <dir> or --workspace <Cargo.toml>");
    }
    Ok(sources)
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    if let Err(e) = concurrency::init_thread_pool() {
        eprintln!("[retrograph] thread pool already initialized: {e}");
    }

    let sources = collect_sources(cli)?;
    println!("[retrograph] Collected {} source files", sources.len());

    let program = Frontend::load(sources)?;

    let usecase = AnalyzeUsecase {
        config: AnalysisConfig {
            marker_label: cli.marker.clone(),
            path_filter: cli.filter.clone(),
        },
    };
    let analysis = usecase.run(&program);
    println!(
        "[retrograph] {} declarations, {} root hits, {} callees",
        analysis.declarations.len(),
        analysis.roots.len(),
        analysis.graph.len()
    );

    match &cli.output {
        Some(path) => {
            let exporter: Box<dyn Exporter> = match cli.format.as_str() {
                "text" => Box::new(TextExporter),
                "json" => Box::new(JsonExporter),
                "dot" => Box::new(DotExporter),
                other => bail!("Unknown output format: {}", other),
            };
            exporter.export(&analysis, path)?;
            println!(
                "[retrograph] Report written to {} (format: {})",
                path, cli.format
            );
        }
        None => print!("{}", TextExporter::render(&analysis)),
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
