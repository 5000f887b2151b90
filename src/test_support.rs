//! Test support utilities shared across unit and integration tests.

use std::collections::BTreeSet;
use std::env;
use std::ffi::OsString;
use std::time::Duration;

use reqwest::Url;
use tokio::sync::{Mutex, MutexGuard};

use crate::client::{ClientError, Credentials, OvhClient};
use crate::waiter::Cadence;

/// Credentials used against mock servers. The consumer key is non-empty so
/// that requests carry signature headers.
#[must_use]
pub fn test_credentials() -> Credentials {
    Credentials {
        application_key: String::from("test-app-key"),
        application_secret: String::from("test-app-secret"),
        consumer_key: String::from("test-consumer-key"),
    }
}

/// Builds a client pointed at a mock server URI with a zero clock delta, so
/// no `/auth/time` call is made.
///
/// # Errors
///
/// Returns [`ClientError::InvalidEndpoint`] when `uri` does not parse.
pub fn client_for(uri: &str) -> Result<OvhClient, ClientError> {
    let base = Url::parse(uri).map_err(|err| ClientError::InvalidEndpoint {
        endpoint: uri.to_owned(),
        message: err.to_string(),
    })?;
    Ok(OvhClient::new(&base, test_credentials(), Duration::from_secs(5))?.with_time_delta(0))
}

/// Polling cadence short enough for tests that talk to a real mock server.
#[must_use]
pub const fn fast_cadence() -> Cadence {
    Cadence {
        delay: Duration::ZERO,
        interval: Duration::from_millis(10),
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }

    /// Removes variables for the lifetime of the guard.
    pub async fn unset_vars(keys: &[&str]) -> Self {
        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(keys.len());
        for key in keys {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::remove_var(key) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
