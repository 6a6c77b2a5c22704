use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use qbank_core::config::Config;
use qbank_core::traits::PageSource;
use qbank_core::{Identifier, SavedSelection};
use qbank_engine::{SelectionEngine, Session};
use qbank_source::{get_default_fetcher, InMemorySource};

struct Options {
    positional: Vec<String>,
    pages: u32,
    select: Vec<Identifier>,
}

fn parse_id(raw: &str) -> Identifier {
    raw.parse::<i64>().map_or_else(|_| Identifier::from(raw), Identifier::Int)
}

fn parse_args() -> anyhow::Result<(String, Options)> {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <browse|edit> [args...]", prog);
        eprintln!("  browse <exam> [subject] [topic] [--pages N] [--select id,id]");
        eprintln!("  edit <saved.json> [--pages N]");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    let mut opts = Options { positional: Vec::new(), pages: 1, select: Vec::new() };
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--pages" => {
                let n = it.next().context("--pages needs a value")?;
                opts.pages = n.parse().with_context(|| format!("bad page count '{n}'"))?;
            }
            "--select" => {
                let ids = it.next().context("--select needs a value")?;
                opts.select.extend(ids.split(',').filter(|s| !s.is_empty()).map(parse_id));
            }
            _ => opts.positional.push(arg),
        }
    }
    Ok((cmd, opts))
}

fn print_session(session: &Session<InMemorySource>) -> anyhow::Result<()> {
    let engine = session.engine();
    let pool = engine.pool();
    println!("Filters: {}", engine.chain());
    println!("State: {:?} (page {}/{})", engine.state(), pool.last_page(), pool.total_pages());
    for entry in engine.entries() {
        let mark = if entry.selected { "[x]" } else { "[ ]" };
        let origin = if entry.in_pool { "" } else { "  (saved)" };
        println!("  {} {:>6}  {:<40} {:>4}{}", mark, entry.item.id.to_string(), entry.item.label(), entry.item.weight(), origin);
    }
    let agg = engine.aggregate();
    println!("Selected: {} questions, {} marks", agg.count, agg.total_weight);
    match engine.submission() {
        Ok(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        Err(issues) => {
            for issue in issues {
                println!("⚠️  {}", issue);
            }
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let config = Config::load().map_err(|e| { error!(error = %e, "loading config"); e })?;
    let (cmd, opts) = parse_args()?;
    let engine_settings = config.engine()?;
    let source_settings = config.source()?;
    let base: PathBuf = env::current_dir()?;
    let fetcher = get_default_fetcher(&source_settings, engine_settings.max_page_size, &base)?;
    let mut session = Session::new(SelectionEngine::from_settings(&engine_settings)?, fetcher);
    info!(source = session.fetcher().source().source_id(), page_size = session.engine().page_size(), "session ready");
    let rt = tokio::runtime::Runtime::new()?;

    match cmd.as_str() {
        "browse" => {
            if opts.positional.is_empty() {
                bail!("Usage: qbank-cli browse <exam> [subject] [topic] [--pages N] [--select id,id]");
            }
            rt.block_on(async {
                for (k, raw) in opts.positional.iter().enumerate() {
                    session.set_filter(k, Some(parse_id(raw))).await?;
                }
                session.load_pages(opts.pages).await?;
                anyhow::Ok(())
            })?;
            for id in &opts.select {
                session.engine_mut().toggle_id(id).with_context(|| format!("cannot select {id}"))?;
            }
        }
        "edit" => {
            let path = opts.positional.first().context("Usage: qbank-cli edit <saved.json> [--pages N]")?;
            let saved = load_saved(Path::new(path))?;
            rt.block_on(async {
                session.seed(saved).await?;
                session.load_pages(opts.pages).await?;
                anyhow::Ok(())
            })?;
        }
        _ => { error!(command = %cmd, "unknown command"); std::process::exit(1); }
    }
    print_session(&session)
}

fn load_saved(path: &Path) -> anyhow::Result<SavedSelection> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}
