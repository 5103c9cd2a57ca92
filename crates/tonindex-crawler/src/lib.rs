//! tonindex-crawler — masterchain crawl loop and shard-frontier traversal.

pub mod builder;
pub mod crawl_loop;
pub mod fetcher;

pub use builder::CrawlerBuilder;
pub use crawl_loop::{Crawler, CrawlerHandle};
pub use fetcher::ChainFetcher;
