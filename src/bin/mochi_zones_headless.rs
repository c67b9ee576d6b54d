//! Mochi Zones Headless Runner
//!
//! Feeds input from stdin or a file through one window over an in-memory
//! terminal and prints the result: scrollback text, a JSON snapshot, or the
//! raw terminal stream the window produced.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use mochi_zones::config::{Config, Zone};
use mochi_zones::logging;
use mochi_zones::term::{FixedGeometry, RecordingSink};
use mochi_zones::Window;

#[derive(Parser, Debug)]
#[command(name = "mochi-zones-headless")]
#[command(version)]
#[command(about = "Run output through a zoned window without a terminal", long_about = None)]
struct Args {
    /// Input file (stdin if omitted)
    #[arg(value_name = "INPUT_FILE")]
    input: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Terminal width
    #[arg(long, default_value_t = 80)]
    cols: usize,

    /// Terminal height
    #[arg(long, default_value_t = 24)]
    rows: usize,

    /// Zone as COL,ROW,WIDTH,HEIGHT (whole terminal if omitted)
    #[arg(short, long, value_name = "ZONE", value_parser = parse_zone)]
    zone: Option<Zone>,

    /// Buffer capacity in characters
    #[arg(long)]
    capacity: Option<usize>,

    /// Scrollback retention in characters
    #[arg(long)]
    scrollback: Option<usize>,

    /// Never let the buffer exceed its capacity
    #[arg(long)]
    strict: bool,

    /// Fail instead of flushing when the buffer overflows
    #[arg(long)]
    no_auto_flush: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Scrollback as plain text
    Text,
    /// Window snapshot as JSON
    Json,
    /// Terminal stream exactly as written
    Raw,
}

fn parse_zone(s: &str) -> Result<Zone, String> {
    let parts: Vec<usize> = s
        .split(',')
        .map(|p| p.trim().parse::<usize>().map_err(|e| format!("{}: {}", p, e)))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        [col, row, width, height] => Ok(Zone::new(*col, *row, *width, *height)),
        _ => Err("expected COL,ROW,WIDTH,HEIGHT".to_string()),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            },
        },
        None => Config::load_or_default(),
    };
    logging::init(&config.log_filter);

    if let Some(capacity) = args.capacity {
        config.buffer.capacity = capacity;
    }
    if let Some(chars) = args.scrollback {
        config.scrollback_chars = chars;
    }
    config.buffer.strict_size_control |= args.strict;
    if args.no_auto_flush {
        config.buffer.auto_flush = false;
    }

    let zone = args
        .zone
        .unwrap_or_else(|| Zone::new(0, 0, args.cols, args.rows));
    let geometry = FixedGeometry::new(args.cols, args.rows);
    let mut window = match Window::new(config.window(zone), RecordingSink::new(), geometry) {
        Ok(window) => window,
        Err(e) => {
            eprintln!("Error creating window: {}", e);
            return ExitCode::FAILURE;
        },
    };

    let input = match &args.input {
        Some(path) => match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            },
        },
        None => {
            let mut data = Vec::new();
            if let Err(e) = io::stdin().read_to_end(&mut data) {
                eprintln!("Error reading stdin: {}", e);
                return ExitCode::FAILURE;
            }
            data
        },
    };

    let text = String::from_utf8_lossy(&input);
    if let Err(e) = window.write(&text).and_then(|_| window.flush()) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match args.format {
        OutputFormat::Text => {
            let cursor = window.cursor();
            println!(
                "Zone {}x{} at ({}, {}):",
                zone.width, zone.height, zone.col, zone.row
            );
            println!("Cursor: ({}, {})", cursor.x, cursor.y);
            println!("---");
            println!("{}", window.scrollback().archive_text());
            println!("---");
        },
        OutputFormat::Json => match window.snapshot().to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing snapshot: {}", e);
                return ExitCode::FAILURE;
            },
        },
        OutputFormat::Raw => {
            let mut stdout = io::stdout();
            let output = window.sink().output();
            if let Err(e) = stdout.write_all(output.as_bytes()).and_then(|_| stdout.flush()) {
                eprintln!("Error writing output: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }

    ExitCode::SUCCESS
}
