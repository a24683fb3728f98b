//! PDF Object Walker CLI tool
//!
//! A command-line tool for inspecting the object graph of a PDF file.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

use pdf_objwalk::options::{ErrorPolicy, OpenOptions, TraverseOptions};
use pdf_objwalk::pdf::{open_document, Object, ObjectRef, Repository, Traverser};
use pdf_objwalk::render::{TextReport, TreeBuilder};

/// PDF Object Walker - Resolve references and walk a PDF's object graph
#[derive(Parser)]
#[command(name = "pdf-objwalk")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # List the optional content (layer) configuration
    pdf-objwalk show layers.pdf

    # Walk another catalog entry, two levels deep
    pdf-objwalk show layers.pdf --entry AcroForm --max-depth 2

    # Dump the whole catalog as JSON, reporting broken references inline
    pdf-objwalk root layers.pdf --format json --keep-going

    # Walk from object 12 0 R
    pdf-objwalk object layers.pdf 12")]
struct Cli {
    /// Log more detail to stderr (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk one entry of the document catalog
    Show {
        /// PDF file to inspect
        input: PathBuf,

        /// Catalog entry to walk
        #[arg(long, default_value = "OCProperties")]
        entry: String,

        #[command(flatten)]
        walk: WalkArgs,
    },

    /// Walk the whole document catalog
    Root {
        /// PDF file to inspect
        input: PathBuf,

        #[command(flatten)]
        walk: WalkArgs,
    },

    /// Walk from an indirect object
    Object {
        /// PDF file to inspect
        input: PathBuf,

        /// Object number
        number: u32,

        /// Generation number
        #[arg(short, long, default_value_t = 0)]
        generation: u16,

        #[command(flatten)]
        walk: WalkArgs,
    },

    /// Write the decoded body of a stream object to stdout
    Body {
        /// PDF file to inspect
        input: PathBuf,

        /// Object number of the stream
        number: u32,

        /// Generation number
        #[arg(short, long, default_value_t = 0)]
        generation: u16,
    },
}

#[derive(Args)]
struct WalkArgs {
    /// Stop descending below this depth [default: 256]
    #[arg(long)]
    max_depth: Option<usize>,

    /// Report unresolvable branches inline instead of aborting
    #[arg(long)]
    keep_going: bool,

    /// Also walk the dictionaries of streams
    #[arg(long)]
    expand_streams: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl WalkArgs {
    fn traverse_options(&self) -> TraverseOptions {
        let defaults = TraverseOptions::default();
        TraverseOptions {
            max_depth: self.max_depth.or(defaults.max_depth),
            on_error: if self.keep_going {
                ErrorPolicy::SkipBranch
            } else {
                ErrorPolicy::Abort
            },
            expand_stream_dicts: self.expand_streams,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Show { input, entry, walk } => cmd_show(&input, &entry, &walk),
        Commands::Root { input, walk } => cmd_root(&input, &walk),
        Commands::Object {
            input,
            number,
            generation,
            walk,
        } => cmd_object(&input, ObjectRef::new(number, generation), &walk),
        Commands::Body {
            input,
            number,
            generation,
        } => cmd_body(&input, ObjectRef::new(number, generation)),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// RUST_LOG wins over -v
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open(input: &Path) -> anyhow::Result<Repository> {
    let name = input.file_name().unwrap_or(input.as_os_str());
    eprintln!("Opening {}...", name.to_string_lossy());
    open_document(input, &OpenOptions::default())
        .with_context(|| format!("Failed to open {}", input.display()))
}

/// Walk one catalog entry
fn cmd_show(input: &Path, entry: &str, walk: &WalkArgs) -> anyhow::Result<()> {
    let repository = open(input)?;
    let object = repository.fetch_entry(entry)?;
    report(&repository, entry, &object, walk)
}

/// Walk the catalog itself, starting from the trailer's reference to it
fn cmd_root(input: &Path, walk: &WalkArgs) -> anyhow::Result<()> {
    let repository = open(input)?;
    let root = repository.root_entry()?;
    let label = repository.options().root_key.clone();
    report(&repository, &label, &root, walk)
}

/// Walk from one indirect object
fn cmd_object(input: &Path, reference: ObjectRef, walk: &WalkArgs) -> anyhow::Result<()> {
    let repository = open(input)?;
    let label = reference.to_string();
    report(&repository, &label, &Object::Reference(reference), walk)
}

/// Dump a decoded stream body
fn cmd_body(input: &Path, reference: ObjectRef) -> anyhow::Result<()> {
    let repository = open(input)?;
    let object = repository.resolve(&reference)?;
    let Object::Stream(stream) = object.as_ref() else {
        bail!("Object {} is not a stream (found {})", reference, object.kind());
    };

    let body = repository.read_stream_body(stream)?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&body)?;
    stdout.flush()?;
    Ok(())
}

/// Traverse and print; nothing reaches stdout unless the walk succeeds
fn report(repository: &Repository, label: &str, object: &Object, walk: &WalkArgs) -> anyhow::Result<()> {
    let mut traverser = Traverser::new(repository, walk.traverse_options());

    let output = match walk.format {
        Format::Text => {
            let mut text = TextReport::new(Vec::new());
            traverser.run(label, object, &mut text)?;
            text.into_inner()
        }
        Format::Json => {
            let mut tree = TreeBuilder::new();
            traverser.run(label, object, &mut tree)?;
            let roots = tree.finish();
            let mut json = match roots.as_slice() {
                [root] => serde_json::to_vec_pretty(root)?,
                _ => serde_json::to_vec_pretty(&roots)?,
            };
            json.push(b'\n');
            json
        }
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&output)?;
    stdout.flush()?;
    Ok(())
}
