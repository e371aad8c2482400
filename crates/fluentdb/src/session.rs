//! Shared connection state.
//!
//! A [`Session`] owns the profile registry, the lazily opened connection
//! handles and the column metadata cache. Builders hold it through an `Arc`,
//! so a builder switched to another profile still shares all three.

use crate::config::ConnectionProfile;
use crate::driver::{Connection, Connector};
use crate::error::{DbError, DbResult};
use crate::schema::MetadataCache;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

type Handle = Arc<Mutex<Box<dyn Connection>>>;

pub struct Session {
    connector: Box<dyn Connector>,
    profiles: RwLock<BTreeMap<String, ConnectionProfile>>,
    handles: Mutex<HashMap<String, Handle>>,
    metadata: MetadataCache,
}

impl Session {
    pub fn new(connector: impl Connector + 'static) -> Self {
        Self {
            connector: Box::new(connector),
            profiles: RwLock::new(BTreeMap::new()),
            handles: Mutex::new(HashMap::new()),
            metadata: MetadataCache::default(),
        }
    }

    /// Register (or replace) a profile. An open handle for the name is dropped.
    pub fn add_profile(&self, name: impl Into<String>, profile: ConnectionProfile) {
        let name = name.into();
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&name);
        self.profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, profile);
    }

    pub fn profile(&self, name: &str) -> Option<ConnectionProfile> {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn has_profile(&self, name: &str) -> bool {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn profile_names(&self) -> Vec<String> {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn metadata(&self) -> &MetadataCache {
        &self.metadata
    }

    /// Whether a live handle exists for `name`.
    pub fn is_connected(&self, name: &str) -> bool {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    fn handle(&self, name: &str) -> DbResult<Handle> {
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = handles.get(name) {
            return Ok(Arc::clone(handle));
        }

        let profile = self
            .profile(name)
            .ok_or_else(|| DbError::config(format!("Connection '{name}' was not added.")))?;
        tracing::debug!(target: "fluentdb.connection", connection = name, profile = %profile, "opening connection");
        let conn = self.connector.connect(&profile).inspect_err(|e| {
            tracing::error!(target: "fluentdb.connection", connection = name, error = %e, "connect failed");
        })?;
        let handle = Arc::new(Mutex::new(conn));
        handles.insert(name.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Run `f` on the named connection, opening it on first use.
    pub fn with_connection<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut dyn Connection) -> DbResult<T>,
    ) -> DbResult<T> {
        let handle = self.handle(name)?;
        let mut conn = handle.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut **conn)
    }

    /// Drop the handle for `name`; the next use reconnects.
    pub fn disconnect(&self, name: &str) -> bool {
        let removed = self
            .handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some();
        if removed {
            tracing::debug!(target: "fluentdb.connection", connection = name, "disconnected");
        }
        removed
    }

    pub fn disconnect_all(&self) {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("profiles", &self.profile_names())
            .field("cached_tables", &self.metadata.len())
            .finish_non_exhaustive()
    }
}
