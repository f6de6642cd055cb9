use std::fmt;
use std::sync::{Arc, OnceLock};

use chipdoc_types::Signature;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{CryptoError, CryptoResult};

/// Token the unlock callback must return before any LEVEL2 document opens.
pub const UNLOCK_TOKEN: [u8; 16] = *b"chipdoc:level2:1";

type UnlockFn = dyn Fn() -> [u8; 16] + Send + Sync;

#[derive(Default)]
struct GateState {
    unlock: Option<Arc<UnlockFn>>,
    pinned: Option<Signature>,
}

/// Trust gate for LEVEL2 documents.
///
/// Lifecycle: starts with no pinned signature. The first LEVEL2 document that
/// opens successfully pins its signature; every later LEVEL2 open must carry
/// the same signature. Nothing unpins a gate, so the process-wide instance
/// returned by [`Level2Gate::global`] stays pinned until the process exits.
/// Tests and embedders that need isolation create their own gate with
/// [`Level2Gate::new`].
#[derive(Default)]
pub struct Level2Gate {
    state: Mutex<GateState>,
}

impl Level2Gate {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide gate.
    pub fn global() -> Arc<Level2Gate> {
        static GLOBAL: OnceLock<Arc<Level2Gate>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Level2Gate::new())))
    }

    /// Register the callback that produces the unlock token.
    pub fn register_unlock<F>(&self, unlock: F)
    where
        F: Fn() -> [u8; 16] + Send + Sync + 'static,
    {
        self.state.lock().unlock = Some(Arc::new(unlock));
    }

    pub fn clear_unlock(&self) {
        self.state.lock().unlock = None;
    }

    /// The signature pinned by the first accepted LEVEL2 document, if any.
    pub fn pinned(&self) -> Option<Signature> {
        self.state.lock().pinned
    }

    /// Ask the unlock callback for its token and compare it to [`UNLOCK_TOKEN`].
    pub fn check_unlock(&self) -> CryptoResult<()> {
        let unlock = self.state.lock().unlock.clone();
        let Some(unlock) = unlock else {
            warn!("LEVEL2 document rejected: no unlock callback registered");
            return Err(CryptoError::UnlockMissing);
        };
        if unlock() != UNLOCK_TOKEN {
            warn!("LEVEL2 document rejected: unlock token mismatch");
            return Err(CryptoError::UnlockRejected);
        }
        Ok(())
    }

    /// Fail if a different signature is already pinned.
    pub fn check_signature(&self, signature: Signature) -> CryptoResult<()> {
        match self.state.lock().pinned {
            Some(pinned) if pinned != signature => {
                warn!(%pinned, offered = %signature, "LEVEL2 signature conflict");
                Err(CryptoError::SignatureConflict {
                    pinned,
                    offered: signature,
                })
            }
            _ => Ok(()),
        }
    }

    /// Accept a LEVEL2 document: pin `signature` if nothing is pinned yet,
    /// otherwise require it to match the pinned one.
    pub fn admit(&self, signature: Signature) -> CryptoResult<()> {
        let mut state = self.state.lock();
        match state.pinned {
            None => {
                debug!(%signature, "pinning LEVEL2 signature");
                state.pinned = Some(signature);
                Ok(())
            }
            Some(pinned) if pinned == signature => Ok(()),
            Some(pinned) => Err(CryptoError::SignatureConflict {
                pinned,
                offered: signature,
            }),
        }
    }
}

impl fmt::Debug for Level2Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Level2Gate")
            .field("unlock_registered", &state.unlock.is_some())
            .field("pinned", &state.pinned)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlock_required() {
        let gate = Level2Gate::new();
        assert!(matches!(gate.check_unlock(), Err(CryptoError::UnlockMissing)));
    }

    #[test]
    fn wrong_token_rejected() {
        let gate = Level2Gate::new();
        gate.register_unlock(|| [0u8; 16]);
        let err = gate.check_unlock().unwrap_err();
        assert!(matches!(err, CryptoError::UnlockRejected));
        assert!(err.is_policy());
    }

    #[test]
    fn correct_token_accepted() {
        let gate = Level2Gate::new();
        gate.register_unlock(|| UNLOCK_TOKEN);
        gate.check_unlock().unwrap();
        gate.clear_unlock();
        assert!(gate.check_unlock().is_err());
    }

    #[test]
    fn first_signature_pins() {
        let gate = Level2Gate::new();
        let acme = Signature::derive("acme");
        let globex = Signature::derive("globex");

        assert_eq!(gate.pinned(), None);
        gate.admit(acme).unwrap();
        assert_eq!(gate.pinned(), Some(acme));

        gate.admit(acme).unwrap();
        gate.check_signature(acme).unwrap();

        let err = gate.admit(globex).unwrap_err();
        assert!(matches!(err, CryptoError::SignatureConflict { .. }));
        assert!(gate.check_signature(globex).is_err());
        assert_eq!(gate.pinned(), Some(acme));
    }

    #[test]
    fn global_is_shared() {
        let a = Level2Gate::global();
        let b = Level2Gate::global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
