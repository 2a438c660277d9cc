use anyhow::Result;
use clap::{CommandFactory, Parser};
use mubingraph::{normalize, viewer, Config, HashId, Pipeline, SourceSet};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "mubingraph")]
#[command(about = "Render the objects reachable from a HashId in a map unit directory as a DOT graph")]
struct Args {
    /// Map unit directory, or a logical name from the [sources] config table
    source: String,

    /// Seed HashId, decimal (e.g. -1095034736) or hex (e.g. 0xbebaface)
    seed: String,

    /// Rebuild the flat index, subgraph and graph even if cached
    #[arg(short, long)]
    force: bool,

    /// Open the rendered graph in the configured viewer
    #[arg(long)]
    view: bool,

    /// Leave out edges whose target object is not in the subgraph
    #[arg(long)]
    omit_dangling: bool,

    /// Override the cache directory from the config
    #[arg(long)]
    cache_dir: Option<std::path::PathBuf>,
}

fn main() -> Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // usage problems are not failures
            let _ = e.print();
            return Ok(());
        }
    };

    run(args)
}

/// Parse the seed, or print why it was rejected plus usage.
fn parse_seed(raw: &str) -> Option<HashId> {
    match normalize(raw) {
        Ok(seed) => Some(seed),
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", Args::command().render_usage());
            None
        }
    }
}

fn run(args: Args) -> Result<()> {
    // Reject a bad seed before touching any file, config included
    let Some(seed) = parse_seed(&args.seed) else {
        return Ok(());
    };

    let mut config = Config::load()?;

    // Initialize logger; RUST_LOG wins over the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.mubingraph.log_level.as_str())
    ).init();

    if let Some(dir) = args.cache_dir {
        config.mubingraph.cache_dir = dir;
    }
    if args.omit_dangling {
        config.render.omit_dangling = true;
    }

    log::info!("Starting mubingraph v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Seed: {} ({})", seed, seed.to_decimal());
    log::info!("Cache directory: {}", config.cache_dir().display());

    let start = Instant::now();
    let source = SourceSet::open(&args.source, &config)?;
    log::info!("Source: {} ({} documents)", source.root.display(), source.documents.len());

    let pipeline = Pipeline::new(&config).force(args.force);
    let outcome = pipeline.run(&source, seed)?;

    log::info!("=== Done in {:?} ===", start.elapsed());
    if let Some(index) = &outcome.index {
        println!("index:    {}{}", index.path.display(), if index.cached { " (cached)" } else { "" });
    }
    println!(
        "subgraph: {}{}",
        outcome.subgraph.path.display(),
        if outcome.subgraph.cached { " (cached)" } else { "" }
    );
    println!(
        "graph:    {}{}",
        outcome.graph.path.display(),
        if outcome.graph.cached { " (cached)" } else { "" }
    );
    if outcome.is_empty() {
        println!("empty: no object in {} matches seed {}", source.name, outcome.seed);
    } else {
        println!("objects:  {}", outcome.subgraph_records);
    }

    if args.view {
        viewer::open_in_viewer(&config.render.viewer, &outcome.graph.path)?;
    }

    Ok(())
}
