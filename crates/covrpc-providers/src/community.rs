//! Shared community resources and their throttle notices.
//!
//! Hosted gateways bundle a shared, heavily rate-limited credential so
//! zero-configuration prototyping works out of the box. Providers riding
//! on one advertise it through [`CommunityResourcable`], and their retry
//! hooks surface a one-time notice through [`show_throttle_message`].

use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

/// Capability query for providers backed by a shared credential.
///
/// Callers use it to decide whether to display attribution or suggest a
/// dedicated API token.
pub trait CommunityResourcable {
    /// Returns `true` if this provider rides on a shared credential.
    fn is_community_resource(&self) -> bool {
        false
    }
}

/// Records the notice for `service`; `true` only the first time.
fn first_notice(service: &str) -> bool {
    static SHOWN: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    let mut shown = SHOWN
        .get_or_init(|| Mutex::new(HashSet::new()))
        .lock()
        .unwrap();
    shown.insert(service.to_string())
}

/// Log the shared-credential throttle notice, once per process per
/// service tag.
///
/// Retry hooks call this on every throttled attempt; only the first call
/// for a given service actually logs.
pub fn show_throttle_message(service: &str) {
    if !first_notice(service) {
        return;
    }
    tracing::warn!(
        service,
        "request rate exceeded: the default shared API token is heavily \
         throttled; supply a dedicated token for anything beyond \
         prototyping (this notice is shown once)"
    );
}
