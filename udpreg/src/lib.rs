//! An implementation of a minimal UDP register access protocol for FPGA devices.
//!
//! Each request is one 8 byte [`frame`] in one datagram, and the device answers with exactly one
//! frame. Writes are acknowledged with `WRITE_ACK`, reads with `READ_ACK` carrying the register
//! contents. There is no retry, no transaction identifier and no more than one request in flight
//! per [`Session`].

pub mod debug;
pub mod frame;
pub mod session;

pub use frame::{
    decode,
    encode,
    Frame,
    Opcode,
};
pub use session::Session;

use std::time::Duration;
use tracing::debug;

/// Errors that can be thrown from register access
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("A frame must be exactly 8 bytes, but we got {0}")]
    MalformedFrame(usize),
    #[error("No reply within {0:?}")]
    Timeout(Duration),
    #[error("The reply timeout must be nonzero")]
    InvalidTimeout,
    #[error("Unknown debug command: {0}")]
    BadCommand(String),
    #[error("Internal system IO error")]
    Io(#[from] std::io::Error),
}

/// Send a single request frame and decode the single reply
fn transact(session: &mut Session, request: Frame, timeout: Duration) -> Result<Frame, Error> {
    let reply = session.exchange(&request.pack(), timeout)?;
    Frame::unpack(&reply)
}

/// Write `data` to the register at `address`.
///
/// Returns `true` if the device acknowledged the write. A reply with any other opcode is a valid
/// (if unhelpful) device response and yields `false`, not an error.
/// # Errors
/// Returns errors on socket failures, timeouts, or malformed replies
pub fn write_register(
    session: &mut Session,
    address: u32,
    data: u32,
    timeout: Duration,
) -> Result<bool, Error> {
    let reply = transact(
        session,
        Frame::new(Opcode::WriteRequest, address, data),
        timeout,
    )?;
    if reply.opcode == Opcode::WriteAck {
        Ok(true)
    } else {
        debug!(address, got = ?reply.opcode, "Write was not acknowledged");
        Ok(false)
    }
}

/// Read the register at `address`.
///
/// Returns `None` if the device answered with anything other than `READ_ACK`, so a failed read
/// can never be mistaken for register contents.
/// # Errors
/// Returns errors on socket failures, timeouts, or malformed replies
pub fn read_register(
    session: &mut Session,
    address: u32,
    timeout: Duration,
) -> Result<Option<u32>, Error> {
    // The device ignores the data field of a read request
    let reply = transact(session, Frame::new(Opcode::ReadRequest, address, 0), timeout)?;
    if reply.opcode == Opcode::ReadAck {
        Ok(Some(reply.data))
    } else {
        debug!(address, got = ?reply.opcode, "Read was not acknowledged");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        net::UdpSocket,
        thread,
        thread::JoinHandle,
    };

    const TIMEOUT: Duration = Duration::from_secs(2);

    /// A device that answers `n` requests using `respond`
    fn device<F>(n: usize, respond: F) -> (std::net::SocketAddr, JoinHandle<Vec<Frame>>)
    where
        F: Fn(Frame) -> Vec<u8> + Send + 'static,
    {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = socket.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let mut seen = vec![];
            let mut buf = [0u8; 64];
            for _ in 0..n {
                let (nbytes, from) = socket.recv_from(&mut buf).unwrap();
                let frame = Frame::unpack(&buf[..nbytes]).unwrap();
                seen.push(frame);
                socket.send_to(&respond(frame), from).unwrap();
            }
            seen
        });
        (addr, handle)
    }

    #[test]
    fn test_write_acked() {
        let (addr, handle) = device(1, |f| encode(Opcode::WriteAck, f.address, f.data).to_vec());
        let mut session = Session::open(addr).unwrap();
        assert!(write_register(&mut session, 8562, 69_696_969, TIMEOUT).unwrap());
        let seen = handle.join().unwrap();
        assert_eq!(seen, vec![Frame::new(Opcode::WriteRequest, 8562, 69_696_969)]);
    }

    #[test]
    fn test_write_wrong_ack() {
        let (addr, handle) = device(1, |f| encode(Opcode::ReadAck, f.address, f.data).to_vec());
        let mut session = Session::open(addr).unwrap();
        assert!(!write_register(&mut session, 1, 2, TIMEOUT).unwrap());
        handle.join().unwrap();
    }

    #[test]
    fn test_read_acked() {
        let (addr, handle) = device(1, |f| encode(Opcode::ReadAck, f.address, 0xCAFE).to_vec());
        let mut session = Session::open(addr).unwrap();
        assert_eq!(read_register(&mut session, 7, TIMEOUT).unwrap(), Some(0xCAFE));
        // The data field of a read request goes out as zero
        assert_eq!(handle.join().unwrap(), vec![Frame::new(Opcode::ReadRequest, 7, 0)]);
    }

    #[test]
    fn test_read_wrong_ack() {
        let (addr, handle) = device(1, |f| encode(Opcode::WriteAck, f.address, 5).to_vec());
        let mut session = Session::open(addr).unwrap();
        assert_eq!(read_register(&mut session, 7, TIMEOUT).unwrap(), None);
        handle.join().unwrap();
    }

    #[test]
    fn test_malformed_reply() {
        let (addr, handle) = device(1, |_| vec![0xC0; 5]);
        let mut session = Session::open(addr).unwrap();
        assert!(matches!(
            read_register(&mut session, 7, TIMEOUT),
            Err(Error::MalformedFrame(5))
        ));
        handle.join().unwrap();
    }

    #[test]
    fn test_silent_device_times_out() {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut session = Session::open(socket.local_addr().unwrap()).unwrap();
        let timeout = Duration::from_millis(50);
        assert!(matches!(
            write_register(&mut session, 1, 1, timeout),
            Err(Error::Timeout(t)) if t == timeout
        ));
    }
}
