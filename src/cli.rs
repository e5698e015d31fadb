use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Builds and maintains a client-side full-text search index for a tree of HTML files.
///
/// The index is written as a single `const searchIndex = [...];` script that a static
/// site can load with a `<script>` tag.
#[derive(Parser, Debug)]
#[command(
    name = "search-index",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    /// Log every document and event (same as RUST_LOG=debug).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Root directory of the HTML corpus.
    pub root: PathBuf,

    /// Where to write the index script [default: search_index.js].
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Text encoding of every document in the corpus, e.g. utf-8 [default: windows-1251].
    #[arg(short, long)]
    pub encoding: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the index from scratch, replacing any existing index file.
    Build {
        #[command(flatten)]
        index: IndexArgs,

        /// Print the summary as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },

    /// Build the index, then keep it up to date as documents change until Ctrl-C.
    Watch {
        #[command(flatten)]
        index: IndexArgs,

        /// Print summaries as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },

    /// Re-index a single document in an existing index.
    ///
    /// Applies the same update a watched change would: the document's record is
    /// replaced (or removed, if the file no longer exists).
    Update {
        #[command(flatten)]
        index: IndexArgs,

        /// The changed document, relative to ROOT.
        file: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build_with_options() {
        let cli = Cli::try_parse_from([
            "search-index",
            "build",
            "site",
            "--output",
            "out.js",
            "-e",
            "utf-8",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Build { index, json } => {
                assert_eq!(index.root, PathBuf::from("site"));
                assert_eq!(index.output, Some(PathBuf::from("out.js")));
                assert_eq!(index.encoding.as_deref(), Some("utf-8"));
                assert!(json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_update() {
        let cli = Cli::try_parse_from(["search-index", "-v", "update", "site", "a/b.html"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Update { index, file } => {
                assert_eq!(index.root, PathBuf::from("site"));
                assert_eq!(file, PathBuf::from("a/b.html"));
                assert!(index.output.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
