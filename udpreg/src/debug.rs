//! The textual ACK/ECHO/EXIT debug commands.
//!
//! These are plain ASCII datagrams used to check that a device's network stack is alive before
//! any register traffic. Every command starts with a 4 byte prefix, optionally followed by a
//! payload. None of this touches binary frames.

use crate::{
    session::Session,
    Error,
};
use std::{
    fmt::Display,
    str::FromStr,
    time::Duration,
};
use tracing::debug;

/// Length of every command prefix
pub const PREFIX_LEN: usize = 4;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Command {
    /// The device answers with the same datagram
    Ack,
    /// The device answers with the same datagram and then echoes until it sees `exit`
    Echo,
    /// The device stops listening, no reply is sent
    Exit,
}

impl Command {
    #[must_use]
    pub fn prefix(self) -> &'static [u8; PREFIX_LEN] {
        match self {
            Command::Ack => b"ACK\0",
            Command::Echo => b"ECHO",
            Command::Exit => b"EXIT",
        }
    }

    /// Whether the device answers this command
    #[must_use]
    pub fn expects_reply(self) -> bool {
        !matches!(self, Command::Exit)
    }

    /// Construct the bytes to send over UDP
    #[must_use]
    pub fn pack(self, payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(PREFIX_LEN + payload.len());
        bytes.extend_from_slice(self.prefix());
        bytes.extend_from_slice(payload);
        bytes
    }

    /// Recognize the command a datagram starts with. A bare `ACK` (without the null) is accepted
    /// too, as devices send both.
    #[must_use]
    pub fn classify(bytes: &[u8]) -> Option<Self> {
        [Command::Ack, Command::Echo, Command::Exit]
            .into_iter()
            .find(|cmd| bytes.starts_with(cmd.prefix()))
            .or_else(|| (bytes == b"ACK").then_some(Command::Ack))
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Command::Ack => "ack",
                Command::Echo => "echo",
                Command::Exit => "exit",
            }
        )
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "ack" => Command::Ack,
            "echo" => Command::Echo,
            "exit" => Command::Exit,
            _ => return Err(Error::BadCommand(s.to_owned())),
        })
    }
}

/// Send a debug command and, if the command has one, wait for the reply
/// # Errors
/// Returns errors on socket failures or if the reply didn't arrive within `timeout`
pub fn send_command(
    session: &mut Session,
    command: Command,
    payload: &[u8],
    timeout: Duration,
) -> Result<Option<Vec<u8>>, Error> {
    let bytes = command.pack(payload);
    if !command.expects_reply() {
        session.send(&bytes)?;
        return Ok(None);
    }
    let reply = session.exchange(&bytes, timeout)?;
    debug!(%command, reply = ?Command::classify(&reply), "Debug command answered");
    Ok(Some(reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        net::UdpSocket,
        thread,
    };

    #[test]
    fn test_pack_ack() {
        assert_eq!(Command::Ack.pack(&[]), vec![b'A', b'C', b'K', 0]);
    }

    #[test]
    fn test_pack_echo_payload() {
        assert_eq!(Command::Echo.pack(b"hi"), b"ECHOhi".to_vec());
    }

    #[test]
    fn test_classify() {
        assert_eq!(Command::classify(b"ACK\0"), Some(Command::Ack));
        assert_eq!(Command::classify(b"ACK"), Some(Command::Ack));
        assert_eq!(Command::classify(b"ECHO hello"), Some(Command::Echo));
        assert_eq!(Command::classify(b"EXIT"), Some(Command::Exit));
        assert_eq!(Command::classify(b"ACKNOWLEDGE"), None);
        assert_eq!(Command::classify(&[0u8; 8]), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("ECHO".parse::<Command>().unwrap(), Command::Echo);
        assert_eq!("ack".parse::<Command>().unwrap(), Command::Ack);
        assert!(matches!(
            "reboot".parse::<Command>(),
            Err(Error::BadCommand(s)) if s == "reboot"
        ));
    }

    #[test]
    fn test_ack_roundtrip() {
        let device = UdpSocket::bind("127.0.0.1:0").unwrap();
        let remote = device.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 64];
            let (n, from) = device.recv_from(&mut buf).unwrap();
            device.send_to(&buf[..n], from).unwrap();
        });
        let mut session = Session::open(remote).unwrap();
        let reply = send_command(&mut session, Command::Ack, &[], Duration::from_secs(2)).unwrap();
        assert_eq!(reply.as_deref(), Some(&b"ACK\0"[..]));
        handle.join().unwrap();
    }

    #[test]
    fn test_exit_does_not_wait() {
        let device = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut session = Session::open(device.local_addr().unwrap()).unwrap();
        let reply = send_command(&mut session, Command::Exit, &[], Duration::from_secs(30)).unwrap();
        assert!(reply.is_none());
        let mut buf = [0u8; 8];
        let (n, _) = device.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"EXIT");
    }
}
