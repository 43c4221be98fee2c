//! Persisted session state.
//!
//! The dashboard keeps a handful of string keys (credential, identity,
//! display preferences) in a key–value store. [`KeyValueStore`] is that
//! store; [`SessionStore`] is the typed view the rest of the client uses.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::error::{Error, Result};
use crate::validator;

/// Default session file name within the bankline data directory.
pub const SESSION_FILE: &str = "session.json";

/// Well-known keys of the persisted session state.
pub mod keys {
    /// The bearer credential.
    pub const TOKEN: &str = "token";
    /// Signed-in user's email.
    pub const EMAIL: &str = "email";
    /// Signed-in user's id.
    pub const USER_ID: &str = "userId";
    /// Branch the user belongs to.
    pub const BRANCH_ID: &str = "branchId";
    /// Display theme preference. Survives sign-out.
    pub const THEME: &str = "theme";

    /// Keys removed when the session ends.
    pub const SESSION: [&str; 4] = [TOKEN, EMAIL, USER_ID, BRANCH_ID];
}

// ─────────────────────────────────────────────────────────────────────────────
// KeyValueStore Trait
// ─────────────────────────────────────────────────────────────────────────────

/// String key–value persistence.
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Whether the backing storage can be used at all.
    fn is_available(&self) -> bool;

    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// MemoryStore
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory store for tests and embedding.
#[derive(Debug)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
    available: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Create a store pre-populated with the given entries.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        {
            let mut values = store.values.write();
            for (k, v) in entries {
                values.insert(k.into(), v.into());
            }
        }
        store
    }

    /// Create a store that reports itself as unavailable.
    pub fn unavailable() -> Self {
        let store = Self::new();
        store.available.store(false, Ordering::SeqCst);
        store
    }

    /// Toggle availability.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Unavailable("memory store disabled".to_string()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        self.ensure_available()?;
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.ensure_available()?;
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.ensure_available()?;
        self.values.write().remove(key);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FileStore
// ─────────────────────────────────────────────────────────────────────────────

/// File-backed store: a single JSON object of strings.
///
/// Every mutation rewrites the file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a store using [`SESSION_FILE`] within `data_dir`.
    pub fn new(data_dir: &Path) -> Self {
        Self::with_path(data_dir.join(SESSION_FILE))
    }

    /// Create a store at an explicit file path.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> Error {
        Error::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, json).map_err(|e| self.io_error(e))
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut values = self.read_all()?;
        f(&mut values);
        self.write_all(&values)
    }
}

impl KeyValueStore for FileStore {
    /// Whether the file could be written, judged by its nearest existing
    /// ancestor. Creates nothing.
    fn is_available(&self) -> bool {
        let Some(parent) = self.path.parent() else {
            return false;
        };
        parent
            .ancestors()
            .find(|dir| dir.as_os_str().is_empty() || dir.exists())
            .is_some_and(|dir| {
                dir.as_os_str().is_empty()
                    || std::fs::metadata(dir)
                        .is_ok_and(|m| m.is_dir() && !m.permissions().readonly())
            })
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|values| {
            values.remove(key);
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SessionStore
// ─────────────────────────────────────────────────────────────────────────────

/// Identity written on successful authentication.
#[derive(Debug, Clone, Default)]
pub struct SignIn {
    pub token: String,
    pub email: Option<String>,
    pub user_id: Option<String>,
    pub branch_id: Option<String>,
}

impl SignIn {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_branch_id(mut self, branch_id: impl Into<String>) -> Self {
        self.branch_id = Some(branch_id.into());
        self
    }
}

/// Typed access to the persisted session keys.
#[derive(Debug, Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Session backed by a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// The underlying key–value store.
    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn is_available(&self) -> bool {
        self.store.is_available()
    }

    /// The stored credential. An empty value counts as absent.
    pub fn token(&self) -> Result<Option<String>> {
        Ok(self.store.get(keys::TOKEN)?.filter(|t| !t.is_empty()))
    }

    pub fn set_token(&self, token: &str) -> Result<()> {
        self.store.set(keys::TOKEN, token)
    }

    pub fn remove_token(&self) -> Result<()> {
        self.store.remove(keys::TOKEN)
    }

    pub fn email(&self) -> Result<Option<String>> {
        self.store.get(keys::EMAIL)
    }

    pub fn user_id(&self) -> Result<Option<String>> {
        self.store.get(keys::USER_ID)
    }

    pub fn branch_id(&self) -> Result<Option<String>> {
        self.store.get(keys::BRANCH_ID)
    }

    /// Persist a successful authentication.
    ///
    /// Rejects credentials that fail structural validation so the stored
    /// token is always well-formed.
    pub fn sign_in(&self, sign_in: &SignIn) -> Result<()> {
        if !validator::is_structurally_valid(&sign_in.token) {
            return Err(Error::MalformedCredential(
                "expected three base64url segments".to_string(),
            ));
        }
        self.store.set(keys::TOKEN, &sign_in.token)?;
        let identity = [
            (keys::EMAIL, &sign_in.email),
            (keys::USER_ID, &sign_in.user_id),
            (keys::BRANCH_ID, &sign_in.branch_id),
        ];
        for (key, value) in identity {
            match value {
                Some(v) => self.store.set(key, v)?,
                None => self.store.remove(key)?,
            }
        }
        tracing::info!(email = sign_in.email.as_deref(), "Session stored");
        Ok(())
    }

    /// Remove the credential and identity keys. Preferences are kept.
    pub fn clear_session(&self) -> Result<()> {
        for key in keys::SESSION {
            self.store.remove(key)?;
        }
        tracing::debug!("Session state cleared");
        Ok(())
    }
}
