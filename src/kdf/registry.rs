//! Deduplicated, lazy acquisition of KDF collaborators.
//!
//! Each collaborator gets one `OnceCell` slot. The first `acquire` for a kind
//! runs the loader; concurrent callers await the same initialization and all
//! of them receive the same shared instance. A failed load leaves the slot
//! empty, so a later request retries.
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use super::{Argon2idKdf, BcryptKdf, Kdf, KdfKind, ScryptKdf};
use crate::error::SimError;

pub type LoadFuture = Pin<Box<dyn Future<Output = Result<Arc<dyn Kdf>, SimError>> + Send>>;

/// Produces a ready-to-use collaborator for a KDF kind.
pub trait KdfLoader: Send + Sync {
    fn load(&self, kind: KdfKind) -> LoadFuture;
}

/// The collaborators compiled into this crate.
pub fn builtin(kind: KdfKind) -> Arc<dyn Kdf> {
    match kind {
        KdfKind::Argon2id => Arc::new(Argon2idKdf),
        KdfKind::Bcrypt => Arc::new(BcryptKdf),
        KdfKind::Scrypt => Arc::new(ScryptKdf),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinLoader;

impl KdfLoader for BuiltinLoader {
    fn load(&self, kind: KdfKind) -> LoadFuture {
        Box::pin(async move {
            log::debug!("loading builtin {kind} collaborator");
            Ok(builtin(kind))
        })
    }
}

type Slot = Arc<OnceCell<Arc<dyn Kdf>>>;

pub struct KdfRegistry {
    loader: Arc<dyn KdfLoader>,
    slots: Mutex<HashMap<KdfKind, Slot>>,
}

impl Default for KdfRegistry {
    fn default() -> Self {
        Self::new(Arc::new(BuiltinLoader))
    }
}

impl KdfRegistry {
    pub fn new(loader: Arc<dyn KdfLoader>) -> Self {
        Self {
            loader,
            slots: Mutex::new(HashMap::new()),
        }
    }

    async fn slot(&self, kind: KdfKind) -> Slot {
        let mut slots = self.slots.lock().await;
        Arc::clone(slots.entry(kind).or_default())
    }

    /// Shared instance for `kind`, loading it on first use.
    pub async fn acquire(&self, kind: KdfKind) -> Result<Arc<dyn Kdf>, SimError> {
        let slot = self.slot(kind).await;
        let kdf = slot
            .get_or_try_init(|| {
                log::info!("loading {kind}");
                self.loader.load(kind)
            })
            .await
            .map_err(|e| match e {
                SimError::CollaboratorLoadFailed { .. } => e,
                other => SimError::load_failed(kind, other),
            })?;
        Ok(Arc::clone(kdf))
    }

    pub async fn is_loaded(&self, kind: KdfKind) -> bool {
        self.slot(kind).await.initialized()
    }

    /// Drop every cached collaborator; the next `acquire` reloads.
    pub async fn reset(&self) {
        self.slots.lock().await.clear();
    }
}
