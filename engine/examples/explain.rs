//! Parses a filter, prints it back in canonical form and optionally checks
//! flow records against it.
//!
//! ```text
//! cargo run --example explain -- --ast 'proto tcp and dst port 443'
//! cargo run --example explain -- --flows flows.json 'not status dropped'
//! ```

use anyhow::Context;
use clap::Parser;
use flowfilter::{FilterParser, FlowFilter, FlowRecord, ParserSettings};
use std::{fs, path::PathBuf, process::ExitCode};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Parse a flow filter and explain it")]
struct Args {
    /// Dump the parsed tree as JSON
    #[arg(long)]
    ast: bool,

    /// JSON file holding an array of flow records to check
    #[arg(long)]
    flows: Option<PathBuf>,

    /// Maximum nesting of parentheses and conjunctions
    #[arg(long, default_value_t = ParserSettings::default().max_depth)]
    max_depth: usize,

    /// Filter text; several arguments are joined with spaces
    filter: Vec<String>,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let input = args.filter.join(" ");

    let parser = FilterParser::with_settings(ParserSettings {
        max_depth: args.max_depth,
    });
    let expr = match parser.parse(&input) {
        Ok(expr) => expr,
        Err(err) => {
            eprint!("{err}");
            return Ok(ExitCode::FAILURE);
        }
    };

    println!("{expr}");
    if args.ast {
        println!("{}", serde_json::to_string_pretty(&expr)?);
    }

    if let Some(path) = args.flows {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let flows: Vec<FlowRecord> = serde_json::from_str(&text)
            .with_context(|| format!("decoding flow records from {}", path.display()))?;
        info!(count = flows.len(), path = %path.display(), "loaded flow records");

        let mut filter = FlowFilter::new();
        let mut matched = 0;
        for (index, flow) in flows.iter().enumerate() {
            let verdict = filter.check_flow(&expr, flow)?;
            if verdict {
                matched += 1;
            }
            println!("{index}\t{verdict}");
        }
        info!(matched, total = flows.len(), "checked flow records");
    }

    Ok(ExitCode::SUCCESS)
}
