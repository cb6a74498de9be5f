use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// probeweave - inspect and instrument compiled class files offline
#[derive(Debug, Parser)]
#[command(name = "probeweave", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the scope decision and marked methods of class files.
    Inspect {
        /// A class file, or the root of a class directory.
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Instrument every in-scope class of a class directory.
    Rewrite {
        /// Root of the class directory (the classpath entry).
        #[arg(value_name = "DIR")]
        input: PathBuf,

        /// Output directory; unchanged classes are copied as they are.
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Agent-style engine arguments, e.g. "verbose=true,io_tracking=false".
        #[arg(long, value_name = "ARGS")]
        agent_args: Option<String>,

        /// Report what would change without writing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Disassemble the methods of a class file.
    Disasm {
        /// Path to the class file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Only methods with this name.
        #[arg(long, value_name = "NAME")]
        method: Option<String>,

        /// Show raw instruction bytes.
        #[arg(long)]
        bytes: bool,
    },
}
