//! blockvfs CLI
//!
//! Command-line interface for inspecting and moving virtual files.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};

use blockvfs::engine::ReadStatus;
use blockvfs::network::KvConnection;
use blockvfs::{stream, BlockFile, BlockVfs, Config, ConnectionFactory, MemStore, RedisConnector};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// blockvfs CLI
#[derive(Parser, Debug)]
#[command(name = "blockvfs-cli")]
#[command(about = "CLI for block-addressed virtual files in a key-value store")]
#[command(version)]
struct Args {
    /// Upstream URL (overrides --host/--port/--db)
    #[arg(short, long)]
    url: Option<String>,

    /// Upstream host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Upstream port
    #[arg(short, long, default_value = "6379")]
    port: u16,

    /// Logical database index
    #[arg(long, default_value = "0")]
    db: i64,

    /// Use a throwaway in-process store instead of a server
    ///
    /// The store lives only for this invocation; nothing persists between runs.
    #[arg(long)]
    memory: bool,

    /// File identity (key prefix)
    file: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the tracked file size
    Size,

    /// Print size and whether the first block exists
    Stat,

    /// Dump a byte range to stdout
    Cat {
        #[arg(short, long, default_value = "0")]
        offset: u64,

        /// Bytes to read (defaults to the rest of the file)
        #[arg(short, long)]
        length: Option<usize>,
    },

    /// Import a local file at offset 0
    Put {
        /// Local source path
        path: String,
    },

    /// Export the file to a local path
    Get {
        /// Local destination path
        path: String,
    },

    /// Write text at an offset
    Write {
        #[arg(short, long, default_value = "0")]
        offset: u64,

        /// Text to write
        text: String,
    },

    /// Shrink the tracked size
    Truncate {
        /// New length in bytes
        length: u64,
    },

    /// Reset the tracked size to zero
    Rm,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,blockvfs=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let result = if args.memory {
        run(&args, MemStore::new())
    } else {
        match build_config(&args) {
            Ok(config) => {
                tracing::info!("Upstream: {}:{}", config.host, config.port);
                run(&args, RedisConnector::new(config))
            }
            Err(e) => Err(e),
        }
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn build_config(args: &Args) -> blockvfs::Result<Config> {
    match &args.url {
        Some(url) => Config::from_url(url),
        None => Ok(Config::builder()
            .host(&args.host)
            .port(args.port)
            .database(args.db)
            .build()),
    }
}

fn run<F: ConnectionFactory>(args: &Args, factory: F) -> blockvfs::Result<()> {
    let vfs = BlockVfs::new(factory);
    let mut file = vfs.open(&args.file)?;
    execute(&args.command, &mut file)
}

fn execute<C: KvConnection>(command: &Commands, file: &mut BlockFile<C>) -> blockvfs::Result<()> {
    match command {
        Commands::Size => {
            println!("{}", file.file_size()?);
        }
        Commands::Stat => {
            let size = file.file_size()?;
            let first_block = file.block_exists(0)?;
            println!("identity:    {}", file.identity());
            println!("size:        {}", size);
            println!("first block: {}", if first_block { "present" } else { "absent" });
        }
        Commands::Cat { offset, length } => {
            let length = match length {
                Some(len) => *len,
                None => file.file_size()?.saturating_sub(*offset) as usize,
            };
            let mut buf = vec![0u8; length];
            if let ReadStatus::Short { verified } = file.read(&mut buf, *offset)? {
                tracing::warn!("short read: {} of {} bytes", verified, length);
            }
            let mut stdout = io::stdout().lock();
            stdout.write_all(&buf)?;
            stdout.flush()?;
        }
        Commands::Put { path } => {
            let mut reader = BufReader::new(File::open(path)?);
            let written = stream::copy_in(file, &mut reader, 0)?;
            println!("wrote {} bytes", written);
        }
        Commands::Get { path } => {
            let mut writer = BufWriter::new(File::create(path)?);
            let copied = stream::copy_out(file, &mut writer)?;
            println!("copied {} bytes", copied);
        }
        Commands::Write { offset, text } => {
            file.write(text.as_bytes(), *offset)?;
            println!("wrote {} bytes at {}", text.len(), offset);
        }
        Commands::Truncate { length } => {
            file.truncate(*length)?;
            println!("truncated to {}", length);
        }
        Commands::Rm => {
            file.delete()?;
            println!("deleted {}", file.identity());
        }
    }
    Ok(())
}
