use super::callback::Callback;
use super::client::Client;
use crate::error::Result;
use crate::event::Event;
use crate::payload::Payload;
use url::Url;

use std::collections::HashMap;
use std::time::Duration;

/// Default request path a socket.io server mounts the protocol on.
const DEFAULT_PATH: &str = "/socket.io/";
/// Default fixed delay in milliseconds between a close and the next
/// connection attempt.
const DEFAULT_RECONNECTION_DELAY: u64 = 2000;

/// A builder class for a `socket.io` client. This handles setting up the
/// endpoint, the callbacks and the reconnection behavior. The `connect`
/// method acts as the `build` method and returns a [`Client`] whose
/// connection engine is already running.
pub struct ClientBuilder {
    address: String,
    path: String,
    reconnection_delay: Duration,
    on: HashMap<Event, Vec<Callback>>,
}

impl ClientBuilder {
    /// Creates a client builder from a URL. URLs must be in the form
    /// `[ws or wss or http or https]://[domain]:[port]` and name the plain
    /// origin; the request path is configured separately via [`Self::path`].
    ///
    /// # Example
    /// ```no_run
    /// use socketio_lite::{ClientBuilder, Payload};
    ///
    /// let client = ClientBuilder::new("http://localhost:3000")
    ///     .on("chat message", |payload: Payload, _| {
    ///         println!("Received: {:#?}", payload);
    ///     })
    ///     .connect()
    ///     .expect("Connection failed");
    /// ```
    pub fn new<T: Into<String>>(address: T) -> Self {
        Self {
            address: address.into(),
            path: DEFAULT_PATH.to_owned(),
            reconnection_delay: Duration::from_millis(DEFAULT_RECONNECTION_DELAY),
            on: HashMap::new(),
        }
    }

    /// Sets the request path prefix the server mounts the protocol on.
    /// Defaults to `/socket.io/`.
    pub fn path<T: Into<String>>(mut self, path: T) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the fixed delay in milliseconds between a close and the next
    /// reconnection attempt. The same delay applies to every attempt, there
    /// is no backoff. Defaults to `2000`.
    pub fn reconnection_delay(mut self, delay: u64) -> Self {
        self.reconnection_delay = Duration::from_millis(delay);
        self
    }

    /// Registers a callback for a certain [`crate::event::Event`]. The event
    /// could either be one of the lifecycle events `connect`, `disconnect`
    /// and `connect_error` or a custom event defined by a string, e.g.
    /// `chat message`. Callbacks for the same event run in registration
    /// order.
    ///
    /// # Example
    /// ```no_run
    /// use socketio_lite::ClientBuilder;
    ///
    /// let client = ClientBuilder::new("http://localhost:3000")
    ///     .on("chat message", |payload, _| println!("{:#?}", payload))
    ///     .on("connect_error", |reason, _| eprintln!("{:#?}", reason))
    ///     .connect();
    /// ```
    pub fn on<T: Into<Event>, F>(mut self, event: T, callback: F) -> Self
    where
        F: for<'a> FnMut(Payload, &'a Client) + 'static + Sync + Send,
    {
        self.on
            .entry(event.into())
            .or_default()
            .push(Callback::new(callback));
        self
    }

    /// Builds the client and spawns its connection engine. This method
    /// returns immediately, before any connection came up; subscribe to the
    /// `connect` event to observe the session being established. Everything
    /// emitted earlier is buffered and flushed then.
    ///
    /// # Example
    /// ```no_run
    /// use socketio_lite::ClientBuilder;
    /// use serde_json::json;
    ///
    /// let client = ClientBuilder::new("http://localhost:3000")
    ///     .connect()
    ///     .expect("Connection failed");
    ///
    /// client.emit("chat message", json!("hello")).expect("emit failed");
    /// ```
    pub fn connect(self) -> Result<Client> {
        let origin = Url::parse(&self.address)?;
        let client = Client::new(origin, &self.path, self.reconnection_delay, self.on)?;
        client.spawn_poll_loop();
        Ok(client)
    }
}
