//! HTTP plumbing for talking to the upstream directory API.

pub mod client;
pub mod pagination;
pub mod retry;
