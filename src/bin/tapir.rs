//! `tapir`: a thin CLI demo harness around the library — its own flat-file
//! heap and page store stand in for a host database (spec §6's note that
//! the CLI surface is unspecified).

use clap::{Parser, Subcommand};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tapir_search::{FilePageStore, Index, IndexConfig, Tid, VecHeap, WhitespaceTokenizer};

#[derive(Parser)]
#[command(name = "tapir", about = "Embeddable BM25 search index demo CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Bulk-builds an index from a newline-delimited JSON corpus.
    Index {
        corpus: PathBuf,
        index_dir: PathBuf,
        #[arg(long, default_value_t = 4)]
        workers: usize,
    },
    /// Runs a BM25 query against an existing index.
    Query {
        index_dir: PathBuf,
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Prints a summary of an index's segments and memtable.
    Dump {
        index_dir: PathBuf,
        #[arg(long)]
        full: bool,
    },
    /// Forces a compaction of one level.
    Merge { index_dir: PathBuf, level: u32 },
    /// Runs compaction repeatedly until no level needs it.
    Vacuum { index_dir: PathBuf },
}

/// One line of the corpus file: `{"block": N, "offset": N, "text": "..."}`.
#[derive(serde::Deserialize)]
struct CorpusRow {
    block: u32,
    offset: u16,
    text: String,
}

fn pages_path(index_dir: &Path) -> PathBuf {
    index_dir.join("pages.bin")
}

fn read_corpus(path: &Path) -> std::io::Result<Vec<(Tid, String)>> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let mut docs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row: CorpusRow = serde_json::from_str(&line)
            .unwrap_or_else(|e| panic!("invalid corpus line: {e}"));
        docs.push((Tid::new(row.block, row.offset), row.text));
    }
    Ok(docs)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Index { corpus, index_dir, workers } => {
            std::fs::create_dir_all(&index_dir)?;
            let docs = read_corpus(&corpus)?;
            let store = FilePageStore::open(pages_path(&index_dir))?;
            let mut config = IndexConfig::default();
            config.thresholds.max_parallel_workers = workers;
            let index = Index::create(Box::new(store), Box::new(WhitespaceTokenizer), config)?;
            let stats = index.build(&docs)?;
            println!("indexed {} documents ({} unique)", stats.heap_tuples, stats.index_tuples);
        }
        Command::Query { index_dir, query, limit } => {
            let store = FilePageStore::open(pages_path(&index_dir))?;
            let heap = VecHeap::new();
            let index = Index::open(Box::new(store), Box::new(WhitespaceTokenizer), IndexConfig::default(), &heap)?;
            for (tid, score) in index.scan(&query, limit)? {
                println!("{tid}\t{score:.4}");
            }
        }
        Command::Dump { index_dir, full } => {
            let store = FilePageStore::open(pages_path(&index_dir))?;
            let heap = VecHeap::new();
            let index = Index::open(Box::new(store), Box::new(WhitespaceTokenizer), IndexConfig::default(), &heap)?;
            print!("{}", index.dump(full)?);
        }
        Command::Merge { index_dir, level } => {
            let store = FilePageStore::open(pages_path(&index_dir))?;
            let heap = VecHeap::new();
            let index = Index::open(Box::new(store), Box::new(WhitespaceTokenizer), IndexConfig::default(), &heap)?;
            index.merge(level)?;
            println!("merged level {level}");
        }
        Command::Vacuum { index_dir } => {
            let store = FilePageStore::open(pages_path(&index_dir))?;
            let heap = VecHeap::new();
            let index = Index::open(Box::new(store), Box::new(WhitespaceTokenizer), IndexConfig::default(), &heap)?;
            let stats = index.vacuum_cleanup()?;
            println!("{} merges performed", stats.merges_performed);
        }
    }
    Ok(())
}
