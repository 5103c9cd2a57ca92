//! tonindex-http — toncenter data source for the tonindex crawler.

pub mod client;
mod schema;

pub use client::{ToncenterClient, ToncenterConfig};
