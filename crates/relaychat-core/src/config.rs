//! Endpoint configuration.
//!
//! The relay URL is supplied by the caller (command line) and may change at
//! runtime. The display name is persisted under its own storage key so it
//! survives restarts; when none is stored a guest name is generated.

use crate::{
    ConfigError, Environment,
    store::{DISPLAY_NAME_KEY, Storage},
};

/// Where to connect and who we are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Relay URL (e.g. `ws://localhost:8080`).
    pub url: String,
    /// Name attached to outbound messages and join notices.
    pub display_name: String,
}

impl EndpointConfig {
    /// Create a config from explicit values.
    ///
    /// # Errors
    ///
    /// - `ConfigError::EmptyUrl` if `url` is blank
    pub fn new(url: impl Into<String>, display_name: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into().trim().to_owned();
        if url.is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        Ok(Self { url, display_name: display_name.into() })
    }

    /// Build a config for `url`, taking the display name from `name` if
    /// given, else from storage, else a freshly generated guest name.
    ///
    /// Explicit and generated names are persisted; storage failures are
    /// logged and ignored.
    ///
    /// # Errors
    ///
    /// - `ConfigError::EmptyUrl` if `url` is blank
    pub fn resolve<E: Environment, S: Storage>(
        url: impl Into<String>,
        name: Option<String>,
        storage: &S,
        env: &E,
    ) -> Result<Self, ConfigError> {
        let explicit = name.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty());

        let display_name = match explicit {
            Some(name) => {
                store_display_name(storage, &name);
                name
            },
            None => match load_display_name(storage) {
                Some(name) => name,
                None => {
                    let name = guest_name(env);
                    store_display_name(storage, &name);
                    name
                },
            },
        };

        Self::new(url, display_name)
    }
}

/// Display name persisted in `storage`. `None` if absent, blank or unreadable.
pub fn load_display_name<S: Storage>(storage: &S) -> Option<String> {
    match storage.get(DISPLAY_NAME_KEY) {
        Ok(name) => name.filter(|n| !n.trim().is_empty()),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read display name");
            None
        },
    }
}

/// Persist `name` as the display name. Failures are logged and ignored.
pub fn store_display_name<S: Storage>(storage: &S, name: &str) {
    if let Err(e) = storage.set(DISPLAY_NAME_KEY, name) {
        tracing::warn!(error = %e, "failed to persist display name");
    }
}

/// Random guest name of the form `guest-1a2b`.
pub fn guest_name<E: Environment>(env: &E) -> String {
    format!("guest-{:04x}", env.random_u16())
}
