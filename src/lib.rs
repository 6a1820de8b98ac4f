pub mod cache;
pub mod cli;
pub mod config;
pub mod export;
pub mod fetch;
pub mod flock;
pub mod git;
pub mod mirror;
pub mod model;
pub mod store;

mod api;

pub use api::{Treefetch, TreefetchBuilder};
