//! Client implementation of RFC 6143 handshaking and authentication, with
//! support for some non-standard auth types and vendor quirks.
//! <https://datatracker.ietf.org/doc/html/rfc6143>

pub mod client;
pub mod types;
pub mod wire;

pub use client::Client;
pub use types::{ProtoVer, SecurityResult, VncAuth};

use thiserror::Error;

/// Everything that can go wrong between dialing and the security result.
///
/// Transport errors (`Io`, `Proxy`, `ProxyScheme`, `ProxyUdp`, short reads)
/// and protocol errors (banner, security message, status code) both end an
/// attempt; authentication outcomes are not errors and are reported on the
/// session's `SecurityResult` instead.
#[derive(Debug, Error)]
pub enum RfbError {
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("proxy error: {0}")]
    Proxy(#[from] tokio_socks::Error),

    #[error("unsupported proxy scheme \"{0}\" (expected socks4 or socks5)")]
    ProxyScheme(String),

    #[error("proxy url \"{0}\" has no host")]
    ProxyUrl(String),

    #[error("udp connections cannot be made through a socks proxy")]
    ProxyUdp,

    #[error("client has no open connection")]
    NotConnected,

    #[error("InitServerBanner: expected exactly 12 bytes, got ({0})")]
    ShortBanner(usize),

    #[error("InitServerBanner: invalid RFB banner header (\"{0}\")")]
    BadBanner(String),

    #[error("malformed security message: {0}")]
    ShortSecurityMessage(#[from] wire::WireError),

    #[error("SecurityHandshakeOptions: security type is too large (expected <=255, got {0})")]
    SecTooLarge(u32),

    #[error("SecurityHandshakeOptions: no security type returned: {0}")]
    NoSecurityType(String),

    #[error("SecurityHandshakeOptions: no security types returned: {0}")]
    NoSecurityTypes(String),

    #[error("SecurityHandshakeOptions: server reported ({expected}) security types, but packet is shorter than expected")]
    ShortSecurityTypes { expected: u8 },

    #[error("BasicAuthChallenge: packet too small")]
    ShortChallenge,

    #[error("BasicAuthChallenge: server is likely a honeypot, DES challenge is all 0s")]
    LikelyHoneypot,

    #[error("SecurityResult: invalid status code: expected [0, 1], got ({0})")]
    BadSecurityStatus(u32),
}
