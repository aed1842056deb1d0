//! Per-method resolver plugins.

pub mod ethr;
pub mod key;
pub mod web;

pub use ethr::{chain_id_for_network, EthrNetwork, EthrResolver};
pub use key::KeyResolver;
pub use web::WebResolver;

/// Map a reqwest failure to a resolution error; transport problems and
/// timeouts are transient.
///
/// The URL is stripped from the message: RPC endpoints carry the provider
/// credential in their path.
pub(crate) fn http_error(did: &str, err: reqwest::Error) -> crate::IdentityError {
    let transient = err.is_timeout() || err.is_connect() || err.is_request();
    crate::IdentityError::resolution(did, err.without_url().to_string(), transient)
}
