use std::{
    io,
    pin::Pin,
    task::{Context as TaskContext, Poll},
};

use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf},
    net::TcpStream,
};
use tokio_rustls::client::TlsStream;

use super::TlsParameters;
use crate::{
    context::Context,
    smtp::error::{self, Error},
};

/// A network stream
#[derive(Debug)]
pub struct NetworkStream {
    inner: InnerNetworkStream,
}

/// Represents the different types of underlying network streams
#[derive(Debug)]
enum InnerNetworkStream {
    /// Plain TCP stream
    Tcp(TcpStream),
    /// Encrypted TCP stream
    Tls(Box<TlsStream<TcpStream>>),
}

impl NetworkStream {
    /// Dials `server` (`host:port`), wrapping the connection in TLS when asked
    ///
    /// The parsed host is used as the TLS server name. Both the TCP connect and
    /// the handshake give up as soon as `ctx` is done.
    pub async fn connect(ctx: &Context, server: &str, tls: bool) -> Result<NetworkStream, Error> {
        let (host, port) = split_host_port(server)?;
        let tls_parameters = if tls {
            Some(TlsParameters::new(host.to_owned())?)
        } else {
            None
        };

        Self::connect_with(ctx, host, port, tls_parameters).await
    }

    /// Dials `host:port` with explicit TLS parameters
    pub async fn connect_with(
        ctx: &Context,
        host: &str,
        port: u16,
        tls_parameters: Option<TlsParameters>,
    ) -> Result<NetworkStream, Error> {
        let tcp_stream = ctx
            .run(TcpStream::connect((host, port)))
            .await
            .map_err(error::connect)?
            .map_err(error::connect)?;
        tracing::debug!("connected to {host}:{port}");

        let mut stream = NetworkStream {
            inner: InnerNetworkStream::Tcp(tcp_stream),
        };
        if let Some(tls_parameters) = tls_parameters {
            stream = stream.upgrade_tls(ctx, &tls_parameters).await?;
            tracing::debug!("connection encrypted for {}", tls_parameters.domain());
        }
        Ok(stream)
    }

    async fn upgrade_tls(
        self,
        ctx: &Context,
        tls_parameters: &TlsParameters,
    ) -> Result<NetworkStream, Error> {
        match self.inner {
            InnerNetworkStream::Tcp(tcp_stream) => {
                let handshake = tls_parameters
                    .connector()
                    .connect(tls_parameters.server_name(), tcp_stream);
                let tls_stream = ctx
                    .run(handshake)
                    .await
                    .map_err(error::connect)?
                    .map_err(error::tls)?;
                Ok(NetworkStream {
                    inner: InnerNetworkStream::Tls(Box::new(tls_stream)),
                })
            }
            InnerNetworkStream::Tls(_) => Ok(self),
        }
    }

    /// Closes the stream, sending a TLS `close_notify` first when encrypted
    pub async fn close(&mut self) -> io::Result<()> {
        self.shutdown().await
    }
}

impl AsyncRead for NetworkStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut().inner {
            InnerNetworkStream::Tcp(ref mut s) => Pin::new(s).poll_read(cx, buf),
            InnerNetworkStream::Tls(ref mut s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for NetworkStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut().inner {
            InnerNetworkStream::Tcp(ref mut s) => Pin::new(s).poll_write(cx, buf),
            InnerNetworkStream::Tls(ref mut s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
        match self.get_mut().inner {
            InnerNetworkStream::Tcp(ref mut s) => Pin::new(s).poll_flush(cx),
            InnerNetworkStream::Tls(ref mut s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
        match self.get_mut().inner {
            InnerNetworkStream::Tcp(ref mut s) => Pin::new(s).poll_shutdown(cx),
            InnerNetworkStream::Tls(ref mut s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Splits `host:port` (or `[ipv6]:port`) into its parts
pub(crate) fn split_host_port(server: &str) -> Result<(&str, u16), Error> {
    let (host, port) = if let Some(rest) = server.strip_prefix('[') {
        let (host, rest) = rest
            .split_once(']')
            .ok_or_else(|| error::address(format!("missing ']' in address {server}")))?;
        let port = rest
            .strip_prefix(':')
            .ok_or_else(|| error::address(format!("missing port in address {server}")))?;
        (host, port)
    } else {
        let (host, port) = server
            .rsplit_once(':')
            .ok_or_else(|| error::address(format!("missing port in address {server}")))?;
        if host.contains(':') {
            return Err(error::address(format!(
                "too many colons in address {server}"
            )));
        }
        (host, port)
    };

    if host.is_empty() {
        return Err(error::address(format!("missing host in address {server}")));
    }
    let port = port
        .parse::<u16>()
        .map_err(|e| error::address(format!("invalid port in address {server}: {e}")))?;

    Ok((host, port))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn splits_host_and_port() {
        assert_eq!(
            split_host_port("smtp.example.org:465").unwrap(),
            ("smtp.example.org", 465)
        );
        assert_eq!(split_host_port("127.0.0.1:25").unwrap(), ("127.0.0.1", 25));
        assert_eq!(split_host_port("[::1]:2525").unwrap(), ("::1", 2525));
    }

    #[test]
    fn rejects_malformed_addresses() {
        for server in [
            "smtp.example.org",
            "smtp.example.org:",
            "smtp.example.org:smtp",
            "smtp.example.org:70000",
            ":25",
            "::1:25",
            "[::1]",
            "[::1:25",
            "",
        ] {
            let err = split_host_port(server).unwrap_err();
            assert!(err.is_address(), "{server}: {err}");
        }
    }

    #[tokio::test]
    async fn cancelled_context_never_dials() {
        let ctx = Context::background();
        ctx.cancel();

        // nothing listens on port 9 here; a real dial would be refused instead
        let err = NetworkStream::connect(&ctx, "127.0.0.1:9", false)
            .await
            .unwrap_err();
        assert!(err.is_connect());
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn tls_is_not_attempted_for_bad_address() {
        let err = NetworkStream::connect(&Context::background(), "no-port", true)
            .await
            .unwrap_err();
        assert!(err.is_address());
    }
}
