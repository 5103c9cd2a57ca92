//! tonindex CLI — run the crawler and inspect ledger state.
//!
//! Usage:
//! ```bash
//! # Follow the masterchain from the current head, printing JSON lines
//! tonindex crawl --endpoint https://toncenter.com --db sqlite:tonindex.db
//!
//! # Backfill from a fixed seqno and walk the shard graph too
//! tonindex crawl --start-seqno 38000000 --shards --db postgres://localhost/ton
//!
//! # Inspect or wipe a ledger
//! tonindex status --db sqlite:tonindex.db
//! tonindex reset  --db sqlite:tonindex.db
//! ```

use std::env;
use std::process;
use std::sync::Arc;

use async_trait::async_trait;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tonindex_core::{Block, BlockLedger, CrawlEvent, EventSink, ShardBlockId};
use tonindex_crawler::CrawlerBuilder;
use tonindex_http::{ToncenterClient, ToncenterConfig};
use tonindex_storage::{MemoryLedger, PostgresLedger, SqliteLedger};

const API_KEY_ENV: &str = "TONINDEX_API_KEY";

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "crawl" => cmd_crawl(&args[2..]).await,
        "status" => cmd_status(&args[2..]).await,
        "reset" => cmd_reset(&args[2..]).await,
        "info" => {
            cmd_info();
            Ok(())
        }
        "version" | "--version" | "-V" => {
            println!("tonindex {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("tonindex {}", env!("CARGO_PKG_VERSION"));
    println!("TON masterchain and shard block crawler\n");
    println!("USAGE:");
    println!("    tonindex <COMMAND> [FLAGS]\n");
    println!("COMMANDS:");
    println!("    crawl    Run the crawler, one JSON line per event on stdout");
    println!("    status   Print ledger statistics");
    println!("    reset    Wipe the ledger");
    println!("    info     Show defaults and supported backends");
    println!("    version  Print version");
    println!("    help     Print this help\n");
    println!("FLAGS:");
    println!("    --endpoint <URL>     toncenter base URL  [default: https://toncenter.com]");
    println!("    --api-key <KEY>      toncenter API key   [env: {API_KEY_ENV}]");
    println!("    --db <DB>            memory | sqlite:<path> | postgres://…  [default: memory]");
    println!("    --start-seqno <N>    first masterchain seqno  [default: current head]");
    println!("    --poll-ms <MS>       polling interval  [default: 5000]");
    println!("    --shards             also walk shard blocks");
    println!("    --log-json           JSON logs on stderr");
}

fn cmd_info() {
    let defaults = CrawlerBuilder::new().build_config();
    println!("tonindex v{}", env!("CARGO_PKG_VERSION"));
    println!("  Default endpoint: {}", ToncenterConfig::default().endpoint);
    println!("  Default poll interval: {}ms", defaults.poll_interval_ms);
    println!("  Default start: current masterchain head");
    println!("  Ledger backends: memory, SQLite (sqlite:<path>), Postgres (postgres://…)");
    println!("  Log filter: RUST_LOG (default: info)");
}

async fn cmd_crawl(args: &[String]) -> Result<(), String> {
    init_tracing(has_flag(args, "--log-json"));

    let mut builder = CrawlerBuilder::new().shards(has_flag(args, "--shards"));
    if let Some(raw) = parse_flag(args, "--start-seqno") {
        let seqno = raw
            .parse::<u32>()
            .map_err(|e| format!("invalid --start-seqno {raw:?}: {e}"))?;
        builder = builder.start_seqno(seqno);
    }
    if let Some(raw) = parse_flag(args, "--poll-ms") {
        let ms = raw
            .parse::<u64>()
            .map_err(|e| format!("invalid --poll-ms {raw:?}: {e}"))?;
        builder = builder.poll_interval_ms(ms);
    }

    let source = ToncenterClient::new(ToncenterConfig {
        endpoint: parse_flag(args, "--endpoint")
            .unwrap_or_else(|| ToncenterConfig::default().endpoint),
        api_key: parse_flag(args, "--api-key").or_else(|| env::var(API_KEY_ENV).ok()),
        ..Default::default()
    })
    .map_err(|e| e.to_string())?;
    let ledger = open_ledger(args).await?;

    let handle = Arc::new(builder.build(source, ledger, Arc::new(StdoutSink)))
        .spawn()
        .map_err(|e| e.to_string())?;

    let crawler = handle.crawler().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping");
            crawler.stop();
        }
    });

    handle.join().await.map_err(|e| e.to_string())
}

async fn cmd_status(args: &[String]) -> Result<(), String> {
    let ledger = open_ledger(args).await?;
    let stats = ledger.stats().await.map_err(|e| e.to_string())?;
    println!("{}", serde_json::to_string_pretty(&stats).unwrap_or_default());
    Ok(())
}

async fn cmd_reset(args: &[String]) -> Result<(), String> {
    let ledger = open_ledger(args).await?;
    ledger.clean().await.map_err(|e| e.to_string())?;
    println!("Ledger cleared");
    Ok(())
}

/// Open the ledger named by `--db`.
async fn open_ledger(args: &[String]) -> Result<Arc<dyn BlockLedger>, String> {
    let db = parse_flag(args, "--db").unwrap_or_else(|| "memory".into());
    let ledger: Arc<dyn BlockLedger> = if db == "memory" {
        Arc::new(MemoryLedger::new())
    } else if db == "sqlite::memory:" {
        Arc::new(SqliteLedger::in_memory().await.map_err(|e| e.to_string())?)
    } else if let Some(path) = db.strip_prefix("sqlite:") {
        Arc::new(SqliteLedger::open(path).await.map_err(|e| e.to_string())?)
    } else if db.starts_with("postgres://") || db.starts_with("postgresql://") {
        Arc::new(PostgresLedger::connect(&db).await.map_err(|e| e.to_string())?)
    } else {
        return Err(format!(
            "unsupported --db {db:?} (expected memory, sqlite:<path> or postgres://…)"
        ));
    };
    Ok(ledger)
}

/// Logs go to stderr so stdout stays a clean event stream.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Prints every event as a JSON line.
struct StdoutSink;

impl StdoutSink {
    fn print(&self, event: &CrawlEvent) {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "failed to serialize event"),
        }
    }
}

#[async_trait]
impl EventSink for StdoutSink {
    async fn on_block(&self, block: &Block) {
        self.print(&CrawlEvent::Block {
            block: block.clone(),
        });
    }

    async fn on_shard_block(&self, id: &ShardBlockId) {
        self.print(&CrawlEvent::ShardBlock { id: *id });
    }
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
