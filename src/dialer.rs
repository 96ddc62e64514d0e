//! Stream production for client sessions: direct TCP/UDP, or TCP tunneled
//! through a SOCKS4/SOCKS5 proxy. Everything downstream only ever sees a
//! boxed bidirectional byte stream.

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use clap::ValueEnum;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpStream, UdpSocket};
use tokio_socks::tcp::{Socks4Stream, Socks5Stream};
use url::Url;

use crate::rfb::RfbError;

/// The one capability a client session needs from its transport.
pub trait Stream: AsyncRead + AsyncWrite + Unpin + Send + std::fmt::Debug {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + std::fmt::Debug> Stream for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConnType {
    Tcp,
    Udp,
}

impl std::fmt::Display for ConnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConnType::Tcp => "tcp",
            ConnType::Udp => "udp",
        })
    }
}

/// Produce a byte stream to `dest`, optionally through a SOCKS proxy.
///
/// Proxy URLs look like `socks5://[user:pass@]host[:port]`; the port
/// defaults to 1080. SOCKS tunnels are TCP only.
pub async fn connect(
    dest: SocketAddr,
    conn_type: ConnType,
    proxy: Option<&Url>,
) -> Result<Box<dyn Stream>, RfbError> {
    match proxy {
        Some(proxy) => {
            if conn_type == ConnType::Udp {
                return Err(RfbError::ProxyUdp);
            }

            connect_proxied(dest, proxy).await
        }
        None => match conn_type {
            ConnType::Tcp => Ok(Box::new(TcpStream::connect(dest).await?)),
            ConnType::Udp => Ok(Box::new(UdpStream::connect(dest).await?)),
        },
    }
}

async fn connect_proxied(dest: SocketAddr, proxy: &Url) -> Result<Box<dyn Stream>, RfbError> {
    let host = proxy
        .host_str()
        .ok_or_else(|| RfbError::ProxyUrl(proxy.to_string()))?;
    let proxy_addr = (host, proxy.port().unwrap_or(1080));

    match proxy.scheme() {
        "socks5" => {
            let stream = if proxy.username().is_empty() {
                Socks5Stream::connect(proxy_addr, dest).await?
            } else {
                Socks5Stream::connect_with_password(
                    proxy_addr,
                    dest,
                    proxy.username(),
                    proxy.password().unwrap_or(""),
                )
                .await?
            };

            Ok(Box::new(stream))
        }
        "socks4" => {
            let stream = if proxy.username().is_empty() {
                Socks4Stream::connect(proxy_addr, dest).await?
            } else {
                Socks4Stream::connect_with_userid(proxy_addr, dest, proxy.username()).await?
            };

            Ok(Box::new(stream))
        }
        other => Err(RfbError::ProxyScheme(other.to_string())),
    }
}

/// A connected UDP socket behind the stream interface. Each write is one
/// datagram out, each read one datagram in.
#[derive(Debug)]
struct UdpStream {
    socket: UdpSocket,
}

impl UdpStream {
    async fn connect(dest: SocketAddr) -> io::Result<UdpStream> {
        let bind_addr = if dest.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(dest).await?;

        Ok(UdpStream { socket })
    }
}

impl AsyncRead for UdpStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.socket.poll_recv(cx, buf)
    }
}

impl AsyncWrite for UdpStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.socket.poll_send(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
