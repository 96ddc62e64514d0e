use std::net::SocketAddr;

use des::cipher::{BlockEncrypt, KeyInit};
use des::Des;
#[allow(deprecated)]
use des::cipher::generic_array::GenericArray;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use url::Url;

use super::types::{ProtoVer, SecurityResult, VncAuth};
use super::wire::{ByteOrder, ByteReader, WireError};
use super::RfbError;
use crate::dialer::{self, ConnType, Stream};

/// Security messages during the handshake always fit well inside this.
const SCRATCH_LEN: usize = 512;

const FALLBACK_REASON: &str = "<failed to get error reason from server>";

/// A single-attempt client session. Owns exactly one byte stream, which is
/// closed when the session is killed or dropped; sessions are never reused
/// across attempts.
pub struct Client {
    pub dest_addr: SocketAddr,
    pub conn_type: ConnType,
    /// Parsed from the proxies file, e.g. `socks5://127.0.0.1:1080`. If
    /// `None`, the connection is dialed directly.
    pub proxy: Option<Url>,
    /// Enables 2-way logging of packet hex dumps for debugging.
    pub packet_debug: bool,

    stream: Option<Box<dyn Stream>>,

    /// Protocol version the server initially reports in its banner, not
    /// necessarily the negotiated version.
    pub server_proto_ver: String,
    /// Negotiated protocol version.
    pub proto_ver: ProtoVer,
    pub security_types: Vec<VncAuth>,
    pub security_result: SecurityResult,
}

impl Client {
    pub fn new(dest_addr: SocketAddr, conn_type: ConnType, packet_debug: bool) -> Client {
        Client {
            dest_addr,
            conn_type,
            proxy: None,
            packet_debug,
            stream: None,
            server_proto_ver: String::new(),
            proto_ver: ProtoVer::V3_3,
            security_types: Vec::new(),
            security_result: SecurityResult::default(),
        }
    }

    /// Test sessions drive the protocol over an in-memory stream.
    #[cfg(test)]
    pub(crate) fn with_stream(stream: Box<dyn Stream>, packet_debug: bool) -> Client {
        let mut client = Client::new("127.0.0.1:5900".parse().unwrap(), ConnType::Tcp, packet_debug);
        client.stream = Some(stream);
        client
    }

    /// Dial the destination based on the configured conn type, through the
    /// proxy when one is set.
    pub async fn connect(&mut self) -> Result<(), RfbError> {
        let stream = dialer::connect(self.dest_addr, self.conn_type, self.proxy.as_ref()).await?;
        self.stream = Some(stream);
        Ok(())
    }

    /// Explicitly close the connection from our end.
    pub fn kill(&mut self) {
        self.stream = None;
    }

    async fn read_packet(&mut self, buf: &mut [u8]) -> Result<usize, RfbError> {
        let stream = self.stream.as_mut().ok_or(RfbError::NotConnected)?;
        let n = stream.read(buf).await?;

        if self.packet_debug {
            log::debug!("[RECV] ({} bytes)\n{}", n, hexdump(&buf[..n]));
        }

        Ok(n)
    }

    /// Read a fixed-width field in full. The connection dying mid-field maps
    /// through `on_short` with the number of bytes that did arrive, so each
    /// protocol step can report its own short-read error.
    async fn read_exact_packet(
        &mut self,
        buf: &mut [u8],
        on_short: impl FnOnce(usize) -> RfbError,
    ) -> Result<(), RfbError> {
        let stream = self.stream.as_mut().ok_or(RfbError::NotConnected)?;

        let mut filled = 0;
        while filled < buf.len() {
            let n = stream.read(&mut buf[filled..]).await?;
            if n == 0 {
                return Err(on_short(filled));
            }
            filled += n;
        }

        if self.packet_debug {
            log::debug!("[RECV] ({} bytes)\n{}", buf.len(), hexdump(buf));
        }

        Ok(())
    }

    /// Trailing reason string: a big-endian length-prefixed string parsed
    /// from whatever the server managed to send (servers routinely close
    /// right after, or skip the reason entirely). `None` when not even a
    /// length prefix arrived; a cut payload comes back partial, as received.
    async fn read_reason(&mut self) -> Result<Option<String>, RfbError> {
        let mut scratch = [0u8; SCRATCH_LEN];
        let n = self.read_packet(&mut scratch).await?;
        let mut reader = ByteReader::new(&scratch[..n]);

        match reader.read_u32_string(ByteOrder::Big) {
            Ok(reason) => Ok(Some(reason)),
            Err(e) => {
                let partial = e.partial_string();
                Ok((!partial.is_empty()).then_some(partial))
            }
        }
    }

    async fn write_packet(&mut self, buf: &[u8]) -> Result<(), RfbError> {
        let stream = self.stream.as_mut().ok_or(RfbError::NotConnected)?;
        stream.write_all(buf).await?;
        stream.flush().await?;

        if self.packet_debug {
            log::debug!("[SEND] ({} bytes)\n{}", buf.len(), hexdump(buf));
        }

        Ok(())
    }

    /// Version negotiation and security-type discovery. On success the
    /// offered types are in `security_types`; it is then on the caller to
    /// decide which type to submit.
    pub async fn handshake(&mut self) -> Result<(), RfbError> {
        let mut banner = [0u8; 12];
        let n = self.read_packet(&mut banner).await?;
        if n != 12 {
            return Err(RfbError::ShortBanner(n));
        } else if &banner[0..4] != b"RFB " {
            return Err(RfbError::BadBanner(
                String::from_utf8_lossy(&banner[0..4]).into_owned(),
            ));
        }

        self.server_proto_ver = String::from_utf8_lossy(&banner[4..11]).into_owned();
        self.proto_ver = ProtoVer::from_banner(&self.server_proto_ver);

        // Tell the server which protocol we are going to use (or otherwise
        // treat it as)
        self.write_packet(format!("RFB {}\n", self.proto_ver).as_bytes())
            .await?;

        if self.proto_ver == ProtoVer::V3_3 {
            // For 3.3 the client doesn't get to negotiate anything. The
            // server sends the one security type we must use as a u32 that
            // can only be 0, 1, or 2.
            let mut word = [0u8; 4];
            self.read_exact_packet(&mut word, |available| {
                RfbError::ShortSecurityMessage(WireError::ShortRead {
                    wanted: 4,
                    available,
                })
            })
            .await?;

            let sec_type = u32::from_be_bytes(word);
            if sec_type > 255 {
                return Err(RfbError::SecTooLarge(sec_type));
            }

            if sec_type == 0 {
                let reason = self
                    .read_reason()
                    .await?
                    .unwrap_or_else(|| FALLBACK_REASON.to_string());
                return Err(RfbError::NoSecurityType(reason));
            }

            self.security_types = vec![VncAuth::from_code(sec_type as u8)];
        } else {
            // 3.7 and later: a u8 count followed by that many type codes. A
            // count of zero means the connection failed, followed by a
            // length-prefixed reason string.
            let mut count = [0u8; 1];
            self.read_exact_packet(&mut count, |available| {
                RfbError::ShortSecurityMessage(WireError::ShortRead {
                    wanted: 1,
                    available,
                })
            })
            .await?;

            let num_types = count[0];
            if num_types == 0 {
                let reason = self
                    .read_reason()
                    .await?
                    .unwrap_or_else(|| FALLBACK_REASON.to_string());
                return Err(RfbError::NoSecurityTypes(reason));
            }

            let mut codes = vec![0u8; num_types as usize];
            self.read_exact_packet(&mut codes, |_| RfbError::ShortSecurityTypes {
                expected: num_types,
            })
            .await?;

            self.security_types = codes.iter().map(|&c| VncAuth::from_code(c)).collect();
        }

        Ok(())
    }

    async fn read_security_result(&mut self) -> Result<(), RfbError> {
        let mut scratch = [0u8; SCRATCH_LEN];
        let n = self.read_packet(&mut scratch).await?;
        let mut reader = ByteReader::new(&scratch[..n]);

        // Just based on observation, Apple's VNC server returns the status
        // code in little-endian. The reason-length prefix that may follow is
        // big-endian regardless.
        let order = if self.server_proto_ver == "003.889" {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        };

        match reader.read_u32(order)? {
            0 => {
                self.security_result.success = true;
            }
            1 => {
                // The reason string exists only in 3.8; older servers stop
                // after the status word. Keep whatever made it onto the wire.
                self.security_result.reason = reader
                    .read_u32_string(ByteOrder::Big)
                    .unwrap_or_else(|e| e.partial_string());
            }
            other => return Err(RfbError::BadSecurityStatus(other)),
        }

        Ok(())
    }

    /// Submit auth type 1 (no authentication). The result, when the
    /// protocol version calls for one, lands in `security_result`.
    #[allow(dead_code)]
    pub async fn submit_auth_none(&mut self) -> Result<(), RfbError> {
        if self.proto_ver == ProtoVer::V3_3 {
            // For 3.3 there is no SecurityResult for None auth
            return Ok(());
        }

        self.write_packet(&[VncAuth::None.code()]).await?;

        if self.proto_ver == ProtoVer::V3_7 {
            // 3.7 jumps straight to the init messages without a result.
            // Known interop hazard with non-conforming servers.
            return Ok(());
        }

        self.read_security_result().await
    }

    /// Submit auth type 2 ("VNC Authentication"): the DES challenge dance.
    /// The verdict lands in `security_result`; an `Err` here is a transport
    /// or protocol failure, never a wrong password.
    pub async fn submit_auth_basic(&mut self, password: &str) -> Result<(), RfbError> {
        // 3.3 servers dictate the type; everyone else expects us to pick it
        if self.proto_ver != ProtoVer::V3_3 {
            self.write_packet(&[VncAuth::Basic.code()]).await?;
        }

        let mut challenge = [0u8; 16];
        self.read_exact_packet(&mut challenge, |_| RfbError::ShortChallenge)
            .await?;
        if challenge == [0u8; 16] {
            return Err(RfbError::LikelyHoneypot);
        }

        let response = encrypt_challenge(&challenge, password);
        self.write_packet(&response).await?;

        self.read_security_result().await
    }
}

/// Derive the DES key from a password: first 8 bytes, zero-padded, each
/// byte's bits mirrored (the RFB quirk).
pub(crate) fn des_key_from_password(password: &str) -> [u8; 8] {
    let mut key = [0u8; 8];
    for (i, byte) in password.as_bytes().iter().take(8).enumerate() {
        key[i] = byte.reverse_bits();
    }

    key
}

/// Encrypt a 16-byte challenge as two independent ECB blocks under the
/// password-derived key.
#[allow(deprecated)]
pub(crate) fn encrypt_challenge(challenge: &[u8; 16], password: &str) -> [u8; 16] {
    let key = des_key_from_password(password);
    let cipher = Des::new(GenericArray::from_slice(&key));

    let mut response = [0u8; 16];
    for i in 0..2 {
        let mut block = GenericArray::clone_from_slice(&challenge[i * 8..(i + 1) * 8]);
        cipher.encrypt_block(&mut block);
        response[i * 8..(i + 1) * 8].copy_from_slice(&block);
    }

    response
}

fn hexdump(buf: &[u8]) -> String {
    let mut out = String::new();
    for (i, chunk) in buf.chunks(16).enumerate() {
        let ascii: String = chunk
            .iter()
            .map(|&b| if (0x20..0x7f).contains(&b) { b as char } else { '.' })
            .collect();

        out.push_str(&format!(
            "{:08x}  {:<32}  |{ascii}|\n",
            i * 16,
            hex::encode(chunk)
        ));
    }

    out
}
