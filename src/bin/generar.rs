//! Generar CLI - Grammar-Driven Random Program Generator
//!
//! Generate candidate programs for stress-testing a JavaScript engine.

use clap::{Parser, Subcommand};
use generar::capabilities::CapabilitySet;
use generar::corpus::DirCorpus;
use generar::grammar::Bindings;
use generar::session::Generator;

/// Generar - Grammar-Driven Random Program Generator
#[derive(Parser)]
#[command(name = "generar")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate candidate programs
    Generate {
        /// Number of programs to generate
        #[arg(short, long, default_value = "10")]
        count: usize,

        /// Depth budget per program
        #[arg(short = 'd', long, default_value = "14")]
        depth: i64,

        /// Random seed for reproducible generation
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Capability profile (none, spidermonkey) or path to a JSON description
        #[arg(long, default_value = "none")]
        capabilities: String,

        /// Directory of regression tests to splice into programs
        #[arg(long)]
        corpus: Option<String>,

        /// Output format (text, json, jsonl)
        #[arg(short, long, default_value = "text")]
        output: String,

        /// Parallel workers, each with an independently derived seed
        #[arg(short, long, default_value = "1")]
        jobs: usize,
    },

    /// Generate fragments for nested-evaluation testing
    EvalExprs {
        /// Number of fragments
        #[arg(short, long, default_value = "10")]
        count: usize,

        /// Depth budget per fragment
        #[arg(short = 'd', long, default_value = "8")]
        depth: i64,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Comma-separated identifier names treated as in scope
        #[arg(long, default_value = "x")]
        bindings: String,
    },

    /// Show generation statistics for a batch
    Stats {
        /// Batch size
        #[arg(short, long, default_value = "1000")]
        count: usize,

        /// Depth budget
        #[arg(short = 'd', long, default_value = "14")]
        depth: i64,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Validate grammar tables and recursive-function templates
    SelfTest,
}

fn load_capabilities(spec: &str) -> CapabilitySet {
    match spec {
        "none" => CapabilitySet::none(),
        "spidermonkey" => CapabilitySet::spidermonkey_shell(),
        path => {
            let contents = std::fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("Error: cannot read capability file '{path}': {e}");
                std::process::exit(1);
            });
            serde_json::from_str(&contents).unwrap_or_else(|e| {
                eprintln!("Error: bad capability description '{path}': {e}");
                std::process::exit(1);
            })
        }
    }
}

fn build_generator(seed: u64, caps: &CapabilitySet, corpus: Option<&str>) -> Generator {
    let mut builder = Generator::builder().seed(seed).capabilities(caps.clone());
    if let Some(dir) = corpus {
        match DirCorpus::open(dir) {
            Ok(c) => builder = builder.corpus(Box::new(c)),
            Err(e) => {
                eprintln!("Warning: corpus '{dir}' unavailable ({e}); using placeholder");
            }
        }
    }
    builder.build().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    })
}

#[allow(clippy::too_many_lines)]
fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            count,
            depth,
            seed,
            capabilities,
            corpus,
            output,
            jobs,
        } => {
            let caps = load_capabilities(&capabilities);

            let programs: Vec<(u64, String)> = if jobs > 1 {
                use indicatif::ParallelProgressIterator;
                use rayon::prelude::*;

                // One generator per worker seed; workers never share a PRNG
                (0..count as u64)
                    .collect::<Vec<_>>()
                    .par_iter()
                    .progress_count(count as u64)
                    .map(|i| {
                        let worker_seed = seed.wrapping_add(*i);
                        let mut g = build_generator(worker_seed, &caps, corpus.as_deref());
                        (worker_seed, g.generate_program(depth))
                    })
                    .collect()
            } else {
                let mut g = build_generator(seed, &caps, corpus.as_deref());
                (0..count).map(|_| (seed, g.generate_program(depth))).collect()
            };

            match output.as_str() {
                "json" => {
                    let items: Vec<_> = programs
                        .iter()
                        .map(|(s, code)| {
                            serde_json::json!({
                                "seed": s,
                                "depth": depth,
                                "code": code,
                            })
                        })
                        .collect();
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&items).unwrap_or_default()
                    );
                }
                "jsonl" => {
                    for (s, code) in &programs {
                        let line = serde_json::json!({
                            "seed": s,
                            "depth": depth,
                            "code": code,
                        });
                        println!("{line}");
                    }
                }
                _ => {
                    for (i, (s, code)) in programs.iter().enumerate() {
                        println!("--- Program {} (seed {s}, depth {depth}) ---", i + 1);
                        println!("{code}");
                    }
                }
            }
        }

        Commands::EvalExprs {
            count,
            depth,
            seed,
            bindings,
        } => {
            let names: Vec<&str> = bindings.split(',').map(str::trim).collect();
            let b = Bindings::from_names(&names);
            let mut g = build_generator(seed, &CapabilitySet::none(), None);
            for i in 0..count {
                println!("--- Fragment {} ---", i + 1);
                println!("{}", g.generate_expression_for_eval(depth, &b));
            }
        }

        Commands::Stats { count, depth, seed } => {
            use indicatif::{ProgressBar, ProgressStyle};

            let mut g = build_generator(seed, &CapabilitySet::none(), None);

            let pb = ProgressBar::new(count as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                    .unwrap()
                    .progress_chars("#>-"),
            );

            let mut total_len = 0usize;
            let mut max_len = 0usize;
            let mut empty = 0usize;
            for _ in 0..count {
                let code = g.generate_program(depth);
                total_len += code.len();
                max_len = max_len.max(code.len());
                if code.is_empty() {
                    empty += 1;
                }
                pb.inc(1);
            }
            pb.finish_and_clear();

            println!("Generation Statistics");
            println!("=====================");
            println!("Programs:     {count}");
            println!("Depth budget: {depth}");
            println!("Seed:         {seed}");
            println!();
            println!("PRNG draws:   {}", g.draws());
            println!("Chaos hits:   {}", g.chaos_hits());
            println!("Mean length:  {}", total_len / count.max(1));
            println!("Max length:   {max_len}");
            println!("Empty:        {empty}");
        }

        Commands::SelfTest => {
            for (name, caps) in [
                ("none", CapabilitySet::none()),
                ("spidermonkey", CapabilitySet::spidermonkey_shell()),
            ] {
                match Generator::builder().capabilities(caps).build() {
                    Ok(g) => {
                        println!(
                            "{name}: ok ({} registered producers)",
                            g.tables().registry().len()
                        );
                    }
                    Err(e) => {
                        eprintln!("{name}: FAILED\n{e}");
                        std::process::exit(1);
                    }
                }
            }
        }
    }
}
