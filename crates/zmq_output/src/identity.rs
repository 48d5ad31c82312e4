//! Routing identity resolution
//!
//! Host name of the machine, or `"unknown"` when the lookup fails.

use std::ffi::OsString;
use std::io;

use contracts::Identity;
use tracing::warn;

/// Identity derived from the local host name
pub fn host_identity() -> Identity {
    identity_from_lookup(hostname::get)
}

/// Identity from an arbitrary host name lookup
///
/// Failed lookups, empty names and non-UTF-8 names all fall back to the
/// sentinel identity.
pub fn identity_from_lookup<F>(lookup: F) -> Identity
where
    F: FnOnce() -> io::Result<OsString>,
{
    match lookup() {
        Ok(name) => match name.into_string() {
            Ok(name) if !name.is_empty() => Identity::new(name),
            Ok(_) => {
                warn!("host name is empty, using fallback identity");
                Identity::unknown()
            }
            Err(raw) => {
                warn!(host = ?raw, "host name is not UTF-8, using fallback identity");
                Identity::unknown()
            }
        },
        Err(e) => {
            warn!(error = %e, "host name lookup failed, using fallback identity");
            Identity::unknown()
        }
    }
}
