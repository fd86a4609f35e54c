//! Storefront orchestration services over the remote store API.

pub mod client;
pub mod context;
pub mod domain;

#[cfg(test)]
mod test;
