use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::output::OutputFormat;

/// Mnemon: command-line access to a temporal knowledge graph
#[derive(Parser)]
#[command(
    author,
    version,
    about = "Command-line access to temporal knowledge graph operations",
    long_about = "Mnemon provides direct access to knowledge graph operations.\n\n\
                  Required environment variables:\n\
                  - NEO4J_PASSWORD (required)\n\
                  - ANTHROPIC_API_KEY (required for natural language queries)\n\n\
                  Optional environment variables:\n\
                  - NEO4J_URI (default: http://localhost:7474)\n\
                  - NEO4J_USER (default: neo4j)\n\
                  - MNEMON_SERVICE_URL (default: http://localhost:8000)"
)]
pub struct Cli {
    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search the knowledge graph
    ///
    /// The search mode is selected automatically: date filters switch to
    /// temporal search, reranking options switch to advanced search, and
    /// everything else runs a basic search.
    Search(SearchArgs),

    /// Episode management operations
    Episodes {
        #[command(subcommand)]
        command: EpisodeCommands,
    },

    /// Graph maintenance and bulk operations
    Maintenance {
        #[command(subcommand)]
        command: MaintenanceCommands,
    },

    /// Natural language interface to the knowledge graph
    Query(QueryArgs),
}

#[derive(Args)]
pub struct SearchArgs {
    /// Search query text
    pub query: String,

    /// Filter by group IDs
    #[arg(short = 'g', long, value_name = "ID")]
    pub group_ids: Vec<String>,

    /// Entity types to include
    #[arg(short = 'e', long, value_name = "TYPE")]
    pub entity_types: Vec<String>,

    /// Edge types to filter
    #[arg(short = 't', long, value_name = "TYPE")]
    pub edge_types: Vec<String>,

    /// Maximum results
    #[arg(short = 'n', long, default_value_t = 10)]
    pub max_results: usize,

    /// UUID for centered search
    #[arg(long, value_name = "UUID")]
    pub center_node: Option<String>,

    /// Only return results created after this time (RFC 3339, a date, or
    /// a relative phrase like "24 hours ago")
    #[arg(long, value_name = "WHEN")]
    pub created_after: Option<String>,

    /// Only return results created before this time
    #[arg(long, value_name = "WHEN")]
    pub created_before: Option<String>,

    /// Sort order
    #[arg(long, value_enum, default_value_t = Order::Relevance)]
    pub order: Order,

    /// Search method (advanced)
    #[arg(short = 'm', long, value_enum)]
    pub method: Option<SearchMethod>,

    /// Reranking strategy (advanced)
    #[arg(short = 'r', long, value_enum)]
    pub reranker: Option<Reranker>,

    /// Minimum relevance score between 0.0 and 1.0 (advanced)
    #[arg(long, value_name = "SCORE")]
    pub quality_threshold: Option<f64>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,

    /// Emit full payloads instead of the simplified edge shape
    #[arg(long)]
    pub full: bool,

    /// Only include the listed keys in each result
    #[arg(long, value_name = "KEY", value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Collapse results to a list of UUIDs
    #[arg(long)]
    pub ids_only: bool,
}

#[derive(Subcommand)]
pub enum EpisodeCommands {
    /// Add an episode to the knowledge graph
    Add {
        /// Episode name
        name: String,

        /// Episode content, or a file path when prefixed with '@'
        content: String,

        /// Content source type
        #[arg(short = 's', long, value_enum, default_value_t = SourceKind::Text)]
        source: SourceKind,

        /// Target group ID
        #[arg(short = 'g', long, value_name = "ID")]
        group_id: Option<String>,

        /// Custom entity types as JSON
        #[arg(long, value_name = "JSON")]
        entity_types: Option<String>,

        /// Override the reference timestamp
        #[arg(long, value_name = "WHEN")]
        timestamp: Option<String>,

        /// Read content from file
        #[arg(short = 'f', long)]
        from_file: bool,
    },

    /// Retrieve episodes with filtering
    Get {
        /// Filter by group ID
        #[arg(short = 'g', long, value_name = "ID")]
        group_id: Option<String>,

        /// Number of recent episodes
        #[arg(short = 'n', long, default_value_t = 10)]
        last_n: usize,

        /// Episodes after this time
        #[arg(long, value_name = "WHEN")]
        after: Option<String>,

        /// Episodes before this time
        #[arg(long, value_name = "WHEN")]
        before: Option<String>,

        /// Output format
        #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,
    },

    /// Process multiple episodes from a JSON file
    ProcessBulk {
        /// Path to a JSON array of {name, content, source?, group_id?}
        file: String,

        /// Target group ID for all episodes
        #[arg(short = 'g', long, value_name = "ID")]
        group_id: Option<String>,

        /// Processing batch size
        #[arg(short = 'b', long, default_value_t = 10)]
        batch_size: usize,

        /// Validate without importing
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum MaintenanceCommands {
    /// Analyze graph structure and statistics
    Stats {
        /// Groups to analyze
        #[arg(short = 'g', long, value_name = "ID")]
        group_ids: Vec<String>,

        /// Show detailed statistics
        #[arg(short = 'd', long)]
        detailed: bool,

        /// Output format
        #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,
    },

    /// Export knowledge graph data
    Export {
        /// Groups to export
        #[arg(short = 'g', long, value_name = "ID")]
        group_ids: Vec<String>,

        /// Export format
        #[arg(short = 'f', long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,

        /// Include embedding vectors
        #[arg(long)]
        include_embeddings: bool,

        /// Output file (default: stdout)
        #[arg(short = 'o', long, value_name = "PATH")]
        output_file: Option<String>,
    },

    /// Build communities for knowledge organization
    BuildCommunities {
        /// Groups to process
        #[arg(short = 'g', long, value_name = "ID")]
        group_ids: Vec<String>,

        /// Community detection algorithm
        #[arg(short = 'a', long, value_enum, default_value_t = CommunityAlgorithm::LabelPropagation)]
        algorithm: CommunityAlgorithm,

        /// Output format
        #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,
    },

    /// Clear graph data (WARNING: destructive operation)
    Clear {
        /// Groups to clear; clears the entire graph when omitted
        #[arg(short = 'g', long, value_name = "ID")]
        group_ids: Vec<String>,

        /// Skip confirmation prompt
        #[arg(long)]
        confirm: bool,
    },
}

#[derive(Args)]
pub struct QueryArgs {
    /// Natural language query
    pub query: Option<String>,

    /// Interactive mode
    #[arg(short = 'i', long)]
    pub interactive: bool,

    /// Show the translated command without executing it
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Translator temperature (0.0-1.0)
    #[arg(long, default_value_t = 0.2)]
    pub temperature: f64,

    /// Show query history
    #[arg(long)]
    pub history: bool,

    /// Clear query history
    #[arg(long)]
    pub clear_history: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Order {
    Newest,
    Oldest,
    Relevance,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SearchMethod {
    Bm25,
    Semantic,
    Hybrid,
    Bfs,
}

impl SearchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::Bm25 => "bm25",
            SearchMethod::Semantic => "semantic",
            SearchMethod::Hybrid => "hybrid",
            SearchMethod::Bfs => "bfs",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Reranker {
    None,
    CrossEncoder,
    Mmr,
}

impl Reranker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reranker::None => "none",
            Reranker::CrossEncoder => "cross_encoder",
            Reranker::Mmr => "mmr",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    Text,
    Json,
    Message,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Text => "text",
            SourceKind::Json => "json",
            SourceKind::Message => "message",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Graphml,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CommunityAlgorithm {
    LabelPropagation,
}

impl CommunityAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommunityAlgorithm::LabelPropagation => "label_propagation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn search_flags_parse() {
        let cli = Cli::parse_from([
            "mnemon",
            "search",
            "authentication",
            "-g",
            "project_x",
            "-g",
            "project_y",
            "-e",
            "Component",
            "--created-after",
            "2025-01-01",
            "--order",
            "newest",
            "-o",
            "pretty",
        ]);

        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.query, "authentication");
                assert_eq!(args.group_ids, vec!["project_x", "project_y"]);
                assert_eq!(args.entity_types, vec!["Component"]);
                assert_eq!(args.created_after.as_deref(), Some("2025-01-01"));
                assert_eq!(args.order, Order::Newest);
                assert_eq!(args.output, OutputFormat::Pretty);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn episode_add_accepts_file_flag() {
        let cli = Cli::parse_from([
            "mnemon", "episodes", "add", "Config", "@config.json", "--source", "json", "-f",
        ]);

        match cli.command {
            Commands::Episodes {
                command:
                    EpisodeCommands::Add {
                        name,
                        content,
                        source,
                        from_file,
                        ..
                    },
            } => {
                assert_eq!(name, "Config");
                assert_eq!(content, "@config.json");
                assert_eq!(source, SourceKind::Json);
                assert!(from_file);
            }
            _ => panic!("expected episodes add command"),
        }
    }

    #[test]
    fn fields_option_splits_on_commas() {
        let cli = Cli::parse_from(["mnemon", "search", "x", "--fields", "uuid,score"]);

        match cli.command {
            Commands::Search(args) => assert_eq!(args.fields, vec!["uuid", "score"]),
            _ => panic!("expected search command"),
        }
    }
}
