//! Request signing for the OVHcloud application authentication scheme.

use sha1::{Digest, Sha1};

/// Inputs covered by an OVHcloud request signature.
#[derive(Clone, Copy, Debug)]
pub(super) struct SignatureInput<'a> {
    pub(super) application_secret: &'a str,
    pub(super) consumer_key: &'a str,
    pub(super) method: &'a str,
    pub(super) url: &'a str,
    pub(super) body: &'a str,
    pub(super) timestamp: i64,
}

/// Computes the `X-Ovh-Signature` header value.
///
/// The digest covers `AS+CK+METHOD+URL+BODY+TIMESTAMP` joined with `+` and is
/// prefixed with the scheme version `$1$`.
pub(super) fn sign(input: &SignatureInput<'_>) -> String {
    let mut hasher = Sha1::new();
    hasher.update(
        format!(
            "{}+{}+{}+{}+{}+{}",
            input.application_secret,
            input.consumer_key,
            input.method,
            input.url,
            input.body,
            input.timestamp
        )
        .as_bytes(),
    );
    format!("$1${:x}", hasher.finalize())
}
