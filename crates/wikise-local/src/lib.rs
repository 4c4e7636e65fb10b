//! Network implementations of the `wikise-core` traits.

pub use wikise_core::{Error, Result};

pub mod mediawiki;

pub use mediawiki::MediaWikiSource;
