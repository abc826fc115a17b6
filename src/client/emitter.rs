use crate::client::callback::Callback;
use crate::client::Client;
use crate::error::Result;
use crate::event::Event;
use crate::payload::Payload;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// The local publish/subscribe registry: event names mapped to the ordered
/// list of handlers registered for them. Used for the lifecycle events as
/// well as for every application event forwarded from the server.
///
/// Handlers run synchronously on the emitting thread, in registration order.
/// The registry lock is held for the whole emission: registering from
/// another thread blocks until the emission finished, and registering from
/// inside a handler is not supported. A handler that panics aborts delivery
/// to the handlers registered after it.
#[derive(Clone, Default)]
pub(crate) struct EventEmitter {
    listeners: Arc<Mutex<HashMap<Event, Vec<Callback>>>>,
}

impl EventEmitter {
    /// Appends a handler to the list for `event`. There is no
    /// de-duplication and no removal.
    pub(crate) fn on(&self, event: Event, callback: Callback) -> Result<()> {
        self.listeners.lock()?.entry(event).or_default().push(callback);
        Ok(())
    }

    /// Calls every handler registered for `event` with the payload; a
    /// silent no-op when there is none.
    pub(crate) fn emit(&self, event: &Event, payload: Payload, client: &Client) -> Result<()> {
        let mut listeners = self.listeners.lock()?;
        if let Some(callbacks) = listeners.get_mut(event) {
            for callback in callbacks.iter_mut() {
                callback(payload.clone(), client);
            }
        }
        Ok(())
    }
}
