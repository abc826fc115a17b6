//! Socketio-lite is a minimal socket.io client written in the Rust
//! Programming Language. It speaks revision 4 of the engine.io protocol over
//! a single websocket and covers the default namespace: registering
//! callbacks for named events, emitting events with JSON arguments,
//! answering heartbeat pings and transparently reconnecting with a fixed
//! delay whenever the connection drops.
//!
//! ## Example usage
//!
//! ``` no_run
//! use socketio_lite::{ClientBuilder, Payload};
//! use serde_json::json;
//!
//! // define a callback which is called when a payload is received
//! // this callback gets the payload as well as an instance of the
//! // client to communicate back through
//! let callback = |payload: Payload, client: &socketio_lite::Client| {
//!     println!("Received: {:#?}", payload);
//!     client.emit("seen", json!(true)).expect("emit failed");
//! };
//!
//! let client = ClientBuilder::new("http://localhost:3000")
//!     .on("chat message", callback)
//!     .on("connect_error", |reason, _| eprintln!("Error: {:#?}", reason))
//!     .connect()
//!     .expect("Connection failed");
//!
//! // emit to the "chat message" event; buffered until the server
//! // acknowledged the connection
//! client.emit("chat message", json!("hello")).expect("emit failed");
//! ```
//!
//! The main entry point for using this crate is the [`ClientBuilder`] which
//! provides a way to configure the client in the needed way. When the
//! `connect` method is called on the builder, it returns a [`Client`] whose
//! connection engine is already running in the background. The engine keeps
//! cycling through connection attempts until [`Client::disconnect`] is
//! called or the server terminates the session with a disconnect packet.
//!
//! ## Current features
//!
//! - connecting to the default namespace of a socket.io server via
//!   websocket.
//! - registering callbacks for the lifecycle events `connect`,
//!   `disconnect` and `connect_error` as well as for custom events like
//!   `"foo"` or `"chat message"`.
//! - sending JSON data to the server (via `serde_json` which provides safe
//!   handling).
//! - buffering of events emitted while the connection is down, flushed in
//!   order once the server acknowledges the connection.
//! - heartbeat handling and automatic reconnection with a fixed delay.
//!
//! Binary payloads, acknowledgements, http long-polling and custom
//! namespaces are not supported.
#![warn(clippy::complexity)]
#![warn(clippy::style)]
#![warn(clippy::perf)]
#![warn(clippy::correctness)]

/// Defines client only structs
pub mod client;
/// Contains the types and the code concerning the `engine.io` protocol.
pub(crate) mod engineio;
/// Defines the events that could be sent or received.
pub mod event;
pub(crate) mod packet;
/// Defines the types of payload that could be sent or received.
pub mod payload;
pub(crate) mod socket;

/// Contains the error type which will be returned with every result in this
/// crate.
pub mod error;

pub const ENGINE_IO_VERSION: i32 = 4;

pub use error::Error;

pub use {event::Event, payload::Payload};

pub use client::{Client, ClientBuilder};
