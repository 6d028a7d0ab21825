mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use persona_digest::config::{pdf_dir_for, CollectionLayout, EngineConfig};
use persona_digest::extract::PdfPageSource;
use persona_digest::knowledge::KnowledgeBase;
use persona_digest::models::InputJson;
use persona_digest::Engine;

use cli::{Cli, Commands, EngineArgs};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Process {
            input,
            output,
            pdf_dir,
            engine,
        } => {
            let source = page_source(&engine);
            let engine = build_engine(&engine)?;
            let pdf_dir = pdf_dir.unwrap_or_else(|| pdf_dir_for(&input));
            process_collection(&engine, &source(pdf_dir.as_path()), &input, &output)
        }
        Commands::Batch {
            collections,
            engine,
        } => {
            let source = page_source(&engine);
            let engine = build_engine(&engine)?;
            let layout = match collections {
                Some(dir) => CollectionLayout::new(dir),
                None => CollectionLayout::from_current_dir()?,
            };
            run_batch(&engine, &layout, source)
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn build_engine(args: &EngineArgs) -> Result<Engine> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load engine config at {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if args.timings {
        config.record_stage_timings = true;
    }

    let knowledge = match &args.knowledge {
        Some(path) => KnowledgeBase::from_json_file(path)
            .with_context(|| format!("Failed to load knowledge tables at {}", path.display()))?,
        None => KnowledgeBase::builtin(),
    };

    Engine::new(knowledge, config).context("Failed to build engine")
}

/// Builds the PDF reader for a collection's PDF directory.
fn page_source(args: &EngineArgs) -> impl Fn(&Path) -> PdfPageSource {
    let use_pdftotext = !args.no_pdftotext;
    move |pdf_dir: &Path| {
        let source = PdfPageSource::new(pdf_dir);
        if use_pdftotext {
            source
        } else {
            source.without_pdftotext()
        }
    }
}

fn process_collection(
    engine: &Engine,
    source: &PdfPageSource,
    input: &Path,
    output: &Path,
) -> Result<()> {
    let request = InputJson::from_json_file(input)
        .with_context(|| format!("Failed to read input JSON at {}", input.display()))?;

    let result = engine
        .process(&request, source)
        .with_context(|| format!("Failed to process {}", input.display()))?;
    result
        .write_to(output)
        .with_context(|| format!("Failed to write output to {}", output.display()))?;

    info!(
        output = %output.display(),
        sections = result.extracted_sections.len(),
        sub_sections = result.subsection_analysis.len(),
        seconds = result.metadata.processing_time_seconds,
        "wrote output"
    );
    Ok(())
}

/// Processes every collection, carrying on past failures and reporting them
/// together at the end.
fn run_batch(
    engine: &Engine,
    layout: &CollectionLayout,
    source: impl Fn(&Path) -> PdfPageSource,
) -> Result<()> {
    let collections = layout.get_collection_paths().with_context(|| {
        format!(
            "Failed to list collections in {}",
            layout.collections_dir.display()
        )
    })?;
    if collections.is_empty() {
        anyhow::bail!(
            "No collections with an input file under {}",
            layout.collections_dir.display()
        );
    }

    let mut failed = Vec::new();
    for collection in &collections {
        info!(collection = %collection.name, "processing collection");
        if let Err(e) = process_collection(
            engine,
            &source(collection.pdf_dir.as_path()),
            &collection.input,
            &collection.output,
        ) {
            error!(collection = %collection.name, error = %format!("{e:#}"), "collection failed");
            failed.push(collection.name.clone());
        }
    }

    info!(
        processed = collections.len() - failed.len(),
        failed = failed.len(),
        "batch complete"
    );
    if failed.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} collection(s) failed: {}", failed.len(), failed.join(", "))
    }
}
