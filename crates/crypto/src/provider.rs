//! One-time process-wide OpenSSL provider bootstrap.
//!
//! The "legacy" provider supplies algorithms that older PKCS#12 bundles are
//! encrypted with; "default" must then be loaded explicitly because loading
//! any provider disables the implicit fallback. Loaded providers stay loaded
//! for the life of the process.

use std::sync::OnceLock;

use openssl::provider::Provider;
use serde::Serialize;

use ota_trust_core::config::ProviderConfig;

/// Outcome of the bootstrap, one flag per provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    pub legacy_loaded: bool,
    pub default_loaded: bool,
}

static STATUS: OnceLock<ProviderStatus> = OnceLock::new();

fn load(name: &str) -> bool {
    match Provider::try_load(None, name, true) {
        Ok(provider) => {
            // Unloading happens on drop; the provider has to outlive every
            // key and context created after bootstrap.
            std::mem::forget(provider);
            tracing::debug!(provider = name, "loaded OpenSSL provider");
            true
        }
        Err(stack) => {
            tracing::warn!(provider = name, openssl_error_stack = %stack, "failed to load OpenSSL provider");
            false
        }
    }
}

/// Loads the configured providers. Only the first call does any work; later
/// calls return the status recorded by the first one.
pub fn initialize_crypto_provider(config: &ProviderConfig) -> ProviderStatus {
    *STATUS.get_or_init(|| {
        let status = ProviderStatus {
            legacy_loaded: config.load_legacy && load("legacy"),
            default_loaded: config.load_default && load("default"),
        };
        tracing::info!(
            legacy = status.legacy_loaded,
            default = status.default_loaded,
            "crypto provider bootstrap complete"
        );
        status
    })
}

/// Status of a completed bootstrap, `None` before the first call.
pub fn provider_status() -> Option<ProviderStatus> {
    STATUS.get().copied()
}
