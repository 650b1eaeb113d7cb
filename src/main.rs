use clap::{Parser, Subcommand};
use dumparchive::archive::{pack_dump_dir, Archive, PackOptions};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dumparchive", about = "Inspect and build dump archive preludes")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the prelude for a dump directory
    Pack {
        dir: PathBuf,
        /// Output archive, or `-` for stdout
        #[arg(short, long)]
        output: PathBuf,
        /// Collections the data phase will stream in parallel
        #[arg(short = 'j', long, default_value = "1")]
        concurrency: i32,
    },
    /// List the dump tree stored in an archive
    List {
        /// Archive path, or `-` for stdin
        input: PathBuf,
    },
    /// Show archive header fields
    Info {
        input: PathBuf,
    },
    /// Print the metadata of one namespace (`db.collection`, or `oplog`)
    Metadata {
        input: PathBuf,
        namespace: String,
        /// Print the stored text without reformatting
        #[arg(long)]
        raw: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {

        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { dir, output, concurrency } => {
            let opts = PackOptions { concurrent_collections: concurrency };
            let prelude = if output == Path::new("-") {
                let stdout = io::stdout();
                let mut out = BufWriter::new(stdout.lock());
                let p = pack_dump_dir(&dir, &mut out, &opts)?;
                out.flush()?;
                p
            } else {
                let mut out = BufWriter::new(File::create(&output)?);
                let p = pack_dump_dir(&dir, &mut out, &opts)?;
                out.flush()?;
                eprintln!("Created: {}", output.display());
                p
            };
            eprintln!("  {} namespace(s) from {}", prelude.len(), dir.display());
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input } => {
            let ar = open_archive(&input)?;
            println!("{:<48} {:>12}", "Path", "Size");
            for entry in ar.list()? {
                let shown = if entry.is_dir {
                    format!("{}/", entry.path.display())
                } else {
                    entry.path.display().to_string()
                };
                println!("{:<48} {:>12}", shown, entry.size);
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let ar = open_archive(&input)?;
            let header = ar.header();
            let prelude = ar.prelude();
            println!("── Dump archive ─────────────────────────────────────────");
            println!("  Source                 {}", input.display());
            println!("  Format version         {}", header.format_version);
            println!("  Concurrent collections {}", header.concurrent_collections);
            println!("  Namespaces             {}", prelude.len());
            println!("  Databases ({}):", prelude.databases().len());
            for db in prelude.databases() {
                let count = prelude.namespaces_in(db).map_or(0, |it| it.count());
                let label = if db.is_empty() { "(top level)" } else { db.as_str() };
                println!("    {label:<24} {count} namespace(s)");
            }
        }

        // ── Metadata ─────────────────────────────────────────────────────────
        Commands::Metadata { input, namespace, raw } => {
            let ar = open_archive(&input)?;
            let (db, coll) = split_namespace(&namespace);
            let text = ar.metadata(db, coll)?;
            if raw {
                println!("{text}");
            } else {
                match serde_json::from_str::<serde_json::Value>(&text) {
                    Ok(v) => println!("{}", serde_json::to_string_pretty(&v)?),
                    Err(_) => println!("{text}"),
                }
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn open_archive(path: &Path) -> Result<Archive, Box<dyn std::error::Error>> {
    Ok(if path == Path::new("-") {
        Archive::read(BufReader::new(io::stdin().lock()))?
    } else {
        Archive::open(path)?
    })
}

fn split_namespace(ns: &str) -> (&str, &str) {
    ns.split_once('.').unwrap_or(("", ns))
}
