//! Catalog lookups: turning parsed titles into canonical movie identities.
//!
//! - [`provider`] -- Trait definition and shared data types.
//! - [`tmdb`] -- TMDB v3 implementation.
//! - [`resolver`] -- Candidate selection, year relation and per-run cache.

pub mod provider;
pub mod resolver;
pub mod tmdb;

pub use provider::{MetadataProvider, MovieDetails, SearchResult};
pub use resolver::{
    split_aka, title_similarity, CatalogIdentity, IdentityResolver, MatchPolicy, ResolvedIdentity,
    YearMatch,
};
pub use tmdb::TmdbProvider;
