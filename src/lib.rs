// src/lib.rs — Library root for tweetpurge

pub mod api;
pub mod cli;
pub mod core;
pub mod infra;
pub mod oauth;
pub mod store;
pub mod upstream;
