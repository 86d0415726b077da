//! Thin clients for the two external systems the CLI delegates to: the
//! knowledge graph service (search, episodes, communities) and the graph
//! database's HTTP transaction endpoint (raw maintenance queries).

mod cypher;
mod error;
mod service;
mod types;

pub use cypher::{CypherClient, QueryResult};
pub use error::ClientError;
pub use service::ServiceClient;
pub use types::{
    AddEpisodeRequest, BuildCommunitiesRequest, ComparisonOperator, DateFilter, EpisodeQuery,
    SearchFilters, SearchRequest,
};
