//! The fpgareg transport implementation for the UDP register protocol
use super::{
    Transport,
    TransportResult,
};
use std::{
    net::SocketAddr,
    time::Duration,
};
use udpreg::Session;

/// How long to wait for each reply unless told otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug)]
/// A UDP register protocol connection (newtype for a [`Session`])
pub struct Udp {
    session: Session,
    timeout: Duration,
}

impl Udp {
    /// Create a UDP transport to the device at `host`
    /// # Errors
    /// Will return an error if the local UDP socket fails to bind
    pub fn connect(host: SocketAddr) -> TransportResult<Self> {
        Ok(Self {
            session: Session::open(host)?,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Replace the per-exchange reply timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The device this transport talks to
    #[must_use]
    pub fn host(&self) -> SocketAddr {
        self.session.remote()
    }

    /// Direct access to the underlying session, e.g. for debug commands
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }
}

impl Transport for Udp {
    fn write_register(&mut self, address: u32, data: u32) -> TransportResult<bool> {
        udpreg::write_register(&mut self.session, address, data, self.timeout)
    }

    fn read_register(&mut self, address: u32) -> TransportResult<Option<u32>> {
        udpreg::read_register(&mut self.session, address, self.timeout)
    }
}
