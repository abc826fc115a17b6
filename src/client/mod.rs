mod builder;
mod callback;
#[allow(clippy::module_inception)]
mod client;
mod emitter;

pub use builder::ClientBuilder;
pub use client::Client;
