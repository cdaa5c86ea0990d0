use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "trowel")]
#[command(about = "Query and reconcile excavation records from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the project configuration (JSON)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log debug details
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store documents from a JSON file ("-" reads stdin)
    Put {
        /// Input file with one resource or an array of them
        file: String,
        /// Input holds stored documents (as printed by `get`) to update
        #[arg(long)]
        update: bool,
    },
    /// Query documents through the index
    Find {
        /// Free-text term
        #[arg(short, long, default_value = "")]
        text: String,
        /// Restrict the free-text lookup to one category
        #[arg(short, long)]
        category: Option<String>,
        /// Constraint as NAME=VALUE, e.g. isRecordedIn:contain=t1
        #[arg(long = "constraint", value_name = "NAME=VALUE")]
        constraints: Vec<String>,
        /// Match descendants for this constraint along the hierarchy
        #[arg(long = "recursive", value_name = "NAME")]
        recursive: Vec<String>,
        /// Match the free-text term exactly instead of as a prefix
        #[arg(long)]
        exact: bool,
        /// Number of documents to show
        #[arg(short, long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a document as JSON
    Get {
        /// Document ID
        id: String,
        /// Print this stored revision instead of the current one
        #[arg(long, value_name = "REVISION")]
        revision: Option<String>,
    },
    /// List documents with conflicting revisions
    Conflicts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve every conflicting revision of a document, oldest first
    Resolve {
        /// Document ID
        id: String,
        /// Take this field or relation from the conflicting revisions
        #[arg(long = "right", value_name = "FIELD")]
        right: Vec<String>,
        /// Take every differing value from the conflicting revisions
        #[arg(long)]
        all_right: bool,
    },
    /// Merge partial resources into the documents with the same identifier
    Import {
        /// Input file with one partial resource or an array of them
        file: String,
        /// Replace relations too (isRecordedIn is always kept)
        #[arg(long)]
        overwrite_relations: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
