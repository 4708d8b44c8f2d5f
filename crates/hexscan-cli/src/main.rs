mod commands;
mod target;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hexscan::{DEFAULT_CHUNK_SIZE, RegionFilter, ScanConfig, ScanMode, ValueType};
use tracing_subscriber::EnvFilter;

use commands::hex_utils::parse_hex_address;
use commands::scan::Needle;
use commands::value::{CompareOp, ValueArgs};
use target::Target;

#[derive(Parser)]
#[command(name = "hexscan")]
#[command(about = "Scan and patch the memory of a running Linux process")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    target: Target,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List readable memory regions
    Regions {
        #[arg(short, long, default_value = "any")]
        filter: RegionFilter,

        #[arg(long)]
        json: bool,
    },

    /// Scan memory for an AOB pattern such as "2B D6 ?? 33"
    Scan {
        #[arg(required_unless_present_any = ["i32", "string"])]
        pattern: Option<String>,

        /// Search for a little-endian i32 value instead
        #[arg(long, conflicts_with_all = ["pattern", "string"], allow_negative_numbers = true)]
        i32: Option<i32>,

        /// Search for an encoded string instead
        #[arg(long, conflicts_with = "pattern")]
        string: Option<String>,

        /// Encoding label for --string (utf-8, shift_jis, windows-1252, ...)
        #[arg(long, default_value = "utf-8")]
        encoding: String,

        #[arg(short, long, default_value = "code")]
        filter: RegionFilter,

        /// Stop at the first match
        #[arg(long)]
        first: bool,

        /// Maximum number of matches to collect
        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(long, env = "HEXSCAN_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        #[arg(long)]
        json: bool,
    },

    /// Scan for a typed value, or narrow a saved scan with --next
    ///
    /// COMPARISON is one of equal, bigger, smaller, range, increased,
    /// increased-by, decreased, decreased-by, changed, unchanged, unknown.
    Value {
        comparison: CompareOp,

        /// Operands of the comparison (two for range)
        #[arg(allow_negative_numbers = true)]
        values: Vec<String>,

        /// Value type (i8..i64, u8..u64, f32, f64), i32 unless --next provides one
        #[arg(short = 't', long = "type")]
        value_type: Option<ValueType>,

        /// Step between candidate addresses, defaults to the value size
        #[arg(long)]
        align: Option<usize>,

        #[arg(short, long, default_value = "data")]
        filter: RegionFilter,

        /// Re-read the addresses saved by an earlier scan
        #[arg(long)]
        next: Option<PathBuf>,

        /// Save the hits for a later --next
        #[arg(long)]
        save: Option<PathBuf>,

        /// Maximum number of hits to collect
        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(long, env = "HEXSCAN_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        #[arg(long)]
        json: bool,
    },

    /// Hexdump memory at an address
    Read {
        #[arg(value_parser = parse_hex_address)]
        address: u64,

        #[arg(short, long, default_value = "64")]
        size: usize,

        /// Show ASCII column
        #[arg(short, long)]
        ascii: bool,
    },

    /// Read a little-endian i32
    ReadI32 {
        #[arg(value_parser = parse_hex_address)]
        address: u64,
    },

    /// Write a little-endian i32
    WriteI32 {
        #[arg(value_parser = parse_hex_address)]
        address: u64,

        #[arg(allow_negative_numbers = true)]
        value: i32,
    },

    /// Write hex bytes such as "90 90"
    Write {
        #[arg(value_parser = parse_hex_address)]
        address: u64,

        bytes: String,
    },

    /// Replace instructions with NOPs, at an address or at the first match of a pattern
    Nop {
        #[arg(value_parser = parse_hex_address, required_unless_present = "pattern")]
        address: Option<u64>,

        /// Locate the address by scanning for this pattern
        #[arg(long, conflicts_with = "address")]
        pattern: Option<String>,

        /// Number of bytes to overwrite
        #[arg(short, long)]
        len: usize,

        #[arg(short, long, default_value = "code")]
        filter: RegionFilter,

        #[arg(long, env = "HEXSCAN_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },

    /// Apply a JSON patch script
    Run {
        script: PathBuf,

        /// Wait for Enter, then restore the original bytes
        #[arg(long)]
        hold: bool,

        #[arg(long, env = "HEXSCAN_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("hexscan=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let target = &cli.target;

    match cli.command {
        Command::Regions { filter, json } => commands::regions::run(target, filter, json),
        Command::Scan {
            pattern,
            i32,
            string,
            encoding,
            filter,
            first,
            limit,
            chunk_size,
            json,
        } => {
            let needle = Needle {
                pattern,
                i32_val: i32,
                string,
                encoding,
            };
            let mode = if first { ScanMode::First } else { ScanMode::All };
            let mut config = ScanConfig::builder().chunk_size(chunk_size);
            if let Some(limit) = limit {
                config = config.limit(limit);
            }
            commands::scan::run(target, &needle, filter, mode, config.build(), json)
        }
        Command::Value {
            comparison,
            values,
            value_type,
            align,
            filter,
            next,
            save,
            limit,
            chunk_size,
            json,
        } => {
            let mut config = ScanConfig::builder().chunk_size(chunk_size);
            if let Some(limit) = limit {
                config = config.limit(limit);
            }
            let args = ValueArgs {
                op: comparison,
                operands: values,
                value_type,
                alignment: align,
                filter,
                next,
                save,
                config: config.build(),
                json,
            };
            commands::value::run(target, &args)
        }
        Command::Read {
            address,
            size,
            ascii,
        } => commands::read::run(target, address, size, ascii),
        Command::ReadI32 { address } => commands::read::run_i32(target, address),
        Command::WriteI32 { address, value } => commands::write::run_i32(target, address, value),
        Command::Write { address, bytes } => commands::write::run(target, address, &bytes),
        Command::Nop {
            address,
            pattern,
            len,
            filter,
            chunk_size,
        } => {
            let config = ScanConfig::builder().chunk_size(chunk_size).build();
            commands::nop::run(target, address, pattern.as_deref(), len, filter, config)
        }
        Command::Run {
            script,
            hold,
            chunk_size,
            json,
        } => {
            let config = ScanConfig::builder().chunk_size(chunk_size).build();
            commands::run::run(target, &script, config, hold, json)
        }
    }
}
