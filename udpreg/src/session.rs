//! A single-request, single-reply UDP session with a device

use crate::Error;
use std::{
    net::{
        Ipv4Addr,
        Ipv6Addr,
        SocketAddr,
        UdpSocket,
    },
    time::Duration,
};
use tracing::{
    trace,
    warn,
};

// Big enough for any ethernet payload, so oversized replies come back with their real length
const RECV_BUF_LEN: usize = 1500;

/// An ephemeral UDP endpoint that talks to exactly one remote device.
///
/// The protocol has no transaction identifier, so a session only ever has one request in flight.
/// Methods take `&mut self` to enforce that. The socket is closed when the session is dropped.
#[derive(Debug)]
pub struct Session {
    socket: UdpSocket,
    remote: SocketAddr,
}

impl Session {
    /// Bind an ephemeral local socket for talking with `remote`
    /// # Errors
    /// Returns an error if the local socket can't be bound
    pub fn open(remote: SocketAddr) -> Result<Self, Error> {
        let local: SocketAddr = match remote {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local)?;
        // Set explicit blocking, the timeout is applied per exchange
        socket.set_nonblocking(false)?;
        trace!(local = %socket.local_addr()?, %remote, "Opened session");
        Ok(Self { socket, remote })
    }

    /// The device this session talks to
    #[must_use]
    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    /// The ephemeral address we bound to
    /// # Errors
    /// Returns an error if the OS can't report the socket address
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.socket.local_addr()?)
    }

    /// Send `bytes` to the remote without waiting for anything back
    /// # Errors
    /// Returns an error on socket failures
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.socket.send_to(bytes, self.remote)?;
        trace!(remote = %self.remote, len = bytes.len(), "Sent datagram");
        Ok(())
    }

    /// Send `request` and return the payload of the first datagram that arrives within `timeout`.
    ///
    /// The reply is accepted from any sender. Without a transaction ID there is no way to tell a
    /// late or stray datagram from the real reply, so a reply from somewhere other than the
    /// remote is only logged.
    /// # Errors
    /// - [`Error::InvalidTimeout`] if `timeout` is zero
    /// - [`Error::Timeout`] if nothing arrived in time
    /// - [`Error::Io`] on any other socket failure
    pub fn exchange(&mut self, request: &[u8], timeout: Duration) -> Result<Vec<u8>, Error> {
        // std treats a zero timeout as an error, and "wait forever" is exactly what we can't allow
        if timeout.is_zero() {
            return Err(Error::InvalidTimeout);
        }
        self.socket.set_read_timeout(Some(timeout))?;
        self.send(request)?;
        let mut buf = [0u8; RECV_BUF_LEN];
        let (nbytes, from) = match self.socket.recv_from(&mut buf) {
            Ok(v) => v,
            Err(e) => match e.kind() {
                // Compat for both windows and *nix
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => {
                    trace!(remote = %self.remote, ?timeout, "Timed out waiting for reply");
                    return Err(Error::Timeout(timeout));
                }
                _ => return Err(e.into()),
            },
        };
        if from != self.remote {
            warn!(expected = %self.remote, %from, "Accepting reply from an unexpected sender");
        }
        trace!(%from, len = nbytes, "Received datagram");
        Ok(buf[..nbytes].to_vec())
    }
}
