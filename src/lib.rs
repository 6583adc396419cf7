// Library interface for rust_anime_resolver
//
// Resolves watchable content (search results, series metadata, playable
// stream URLs) from unreliable, bot-protected upstream providers. The HTTP
// layer that exposes these operations lives in the host application.

pub mod config;
pub mod error;
pub mod extract;
pub mod helpers;
pub mod http_client;
pub mod mirrors;
pub mod models;
pub mod providers;
pub mod relay;
pub mod resolver;
pub mod stream;
pub mod validate;

pub use config::ResolverConfig;
pub use error::ResolveError;
pub use models::{
    Episode, InfoOutcome, SearchOutcome, SearchResult, SeriesInfo, SourcesOutcome, StreamSource,
};
pub use providers::ProviderRegistry;
pub use resolver::Resolver;
