use crate::config::PipelineConfig;
use crate::state::State;
use crate::translator::TranslatorId;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// What is known about the two ends of a connection.
///
/// Client and server are tracked separately: while a phase bridge emulates
/// the configuration phase the client can be in `Configuration` while the
/// server is already in `Play`.
#[derive(Debug, Clone)]
pub struct ProtocolInfo {
    pub client_protocol: i32,
    pub server_protocol: i32,
    pub server_state: State,
    client_state: Option<State>,
    pub username: Option<String>,
    pub uuid: Option<Uuid>,
}

impl ProtocolInfo {
    pub fn new(client_protocol: i32, server_protocol: i32) -> Self {
        Self {
            client_protocol,
            server_protocol,
            server_state: State::Handshake,
            client_state: None,
            username: None,
            uuid: None,
        }
    }

    /// The client's phase. Follows the server unless overridden.
    pub fn client_state(&self) -> State {
        self.client_state.unwrap_or(self.server_state)
    }

    pub fn set_client_state(&mut self, state: State) {
        self.client_state = Some(state);
    }

    /// Let the client follow the server again.
    pub fn clear_client_state(&mut self) {
        self.client_state = None;
    }

    /// Move both sides to the same phase.
    pub fn set_state(&mut self, state: State) {
        self.server_state = state;
        self.client_state = None;
    }

    /// The phase a packet travelling in `direction` is sent in.
    pub fn sender_state(&self, direction: crate::Direction) -> State {
        match direction {
            crate::Direction::Clientbound => self.server_state,
            crate::Direction::Serverbound => self.client_state(),
        }
    }
}

type StorageKey = (TranslatorId, TypeId);

/// One client connection as seen by the pipeline: identity, per-side
/// protocol state and translator-owned storage.
pub struct UserConnection {
    id: u64,
    config: Arc<PipelineConfig>,
    info: Mutex<ProtocolInfo>,
    storage: Mutex<HashMap<StorageKey, Box<dyn Any + Send>>>,
}

impl UserConnection {
    pub fn new(config: Arc<PipelineConfig>, info: ProtocolInfo) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            config,
            info: Mutex::new(info),
            storage: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn info(&self) -> MutexGuard<'_, ProtocolInfo> {
        self.info.lock().unwrap()
    }

    pub fn username(&self) -> Option<String> {
        self.info().username.clone()
    }

    /// Store a value owned by `owner`, replacing any previous value of the
    /// same type.
    pub fn put<T: Any + Send>(&self, owner: TranslatorId, value: T) {
        self.storage
            .lock()
            .unwrap()
            .insert((owner, TypeId::of::<T>()), Box::new(value));
    }

    pub fn has<T: Any + Send>(&self, owner: TranslatorId) -> bool {
        self.storage
            .lock()
            .unwrap()
            .contains_key(&(owner, TypeId::of::<T>()))
    }

    /// Run `f` against a stored value. The storage lock is held while `f`
    /// runs, so `f` must not touch this connection's storage.
    pub fn with<T: Any + Send, R>(&self, owner: TranslatorId, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut storage = self.storage.lock().unwrap();
        storage
            .get_mut(&(owner, TypeId::of::<T>()))
            .and_then(|value| value.downcast_mut::<T>())
            .map(f)
    }

    pub fn remove<T: Any + Send>(&self, owner: TranslatorId) -> Option<T> {
        let value = self
            .storage
            .lock()
            .unwrap()
            .remove(&(owner, TypeId::of::<T>()))?;
        value.downcast::<T>().ok().map(|boxed| *boxed)
    }

    /// Drop all translator storage, e.g. when the pipeline is reset.
    pub fn clear_storage(&self) {
        self.storage.lock().unwrap().clear();
    }
}

impl std::fmt::Debug for UserConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserConnection")
            .field("id", &self.id)
            .field("info", &*self.info())
            .finish()
    }
}
