//! Mock transport implementations used in testing the interface

use super::{
    Transport,
    TransportResult,
};
use std::{
    collections::HashMap,
    time::Duration,
};
use udpreg::frame::ADDRESS_MASK;

/// A misbehavior the mock device performs instead of answering one request normally
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Perform the request, but XOR the data of the reply with the given mask
    CorruptData(u32),
    /// Drop the request and answer with the acknowledgement for the other request type
    WrongAck,
    /// Drop the request and never answer
    Timeout,
}

/// A platform that mocks reads and writes, useful for testing
#[derive(Debug, Default)]
pub struct Mock {
    memory: HashMap<u32, u32>,
    // Keyed by the zero-based index of the request they apply to
    faults: HashMap<usize, Fault>,
    requests: usize,
}

impl Mock {
    /// Construct a new mock platform with every register zeroed
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Misbehave on the `request`-th request (counting reads and writes from zero)
    #[must_use]
    pub fn with_fault(mut self, request: usize, fault: Fault) -> Self {
        self.faults.insert(request, fault);
        self
    }

    /// The number of requests this device has seen
    #[must_use]
    pub fn requests(&self) -> usize {
        self.requests
    }

    /// Peek at a register without going through the protocol
    #[must_use]
    pub fn peek(&self, address: u32) -> u32 {
        self.memory
            .get(&(address & ADDRESS_MASK))
            .copied()
            .unwrap_or_default()
    }

    fn next_fault(&mut self) -> Option<Fault> {
        let fault = self.faults.remove(&self.requests);
        self.requests += 1;
        fault
    }
}

impl Transport for Mock {
    fn write_register(&mut self, address: u32, data: u32) -> TransportResult<bool> {
        match self.next_fault() {
            Some(Fault::Timeout) => Err(udpreg::Error::Timeout(Duration::ZERO)),
            Some(Fault::WrongAck) => Ok(false),
            // Write acks carry no data, so there's nothing to corrupt
            Some(Fault::CorruptData(_)) | None => {
                // Addresses are truncated on the wire, so they alias here too
                self.memory.insert(address & ADDRESS_MASK, data);
                Ok(true)
            }
        }
    }

    fn read_register(&mut self, address: u32) -> TransportResult<Option<u32>> {
        match self.next_fault() {
            Some(Fault::Timeout) => Err(udpreg::Error::Timeout(Duration::ZERO)),
            Some(Fault::WrongAck) => Ok(None),
            Some(Fault::CorruptData(mask)) => Ok(Some(self.peek(address) ^ mask)),
            None => Ok(Some(self.peek(address))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixed::types::{
        I16F16,
        U1F31,
    };
    use paste::paste;

    macro_rules! test_rw_num {
        ($name:ident, $num:ty, $v:expr) => {
            paste! {
                #[test]
                #[allow(clippy::float_cmp)]
                fn [<test_rw_ $name>]() {
                    let mut transport = Mock::new();
                    let num: $num = $v;
                    assert!(transport.write(0x40, &num).unwrap());
                    let read_num: $num = transport.read(0x40).unwrap().unwrap();
                    assert_eq!(read_num, num);
                }
            }
        };
    }

    #[test]
    fn test_read_unwritten() {
        let mut transport = Mock::new();
        assert_eq!(transport.read_register(1234).unwrap(), Some(0));
    }

    #[test]
    fn test_write_read() {
        let mut transport = Mock::new();
        assert!(transport.write_register(8562, 69_696_969).unwrap());
        assert_eq!(transport.read_register(8562).unwrap(), Some(69_696_969));
        assert_eq!(transport.requests(), 2);
    }

    #[test]
    fn test_address_aliasing() {
        let mut transport = Mock::new();
        transport.write_register(0xC000_0001, 7).unwrap();
        assert_eq!(transport.read_register(1).unwrap(), Some(7));
    }

    #[test]
    fn test_corrupt_read() {
        let mut transport = Mock::new().with_fault(1, Fault::CorruptData(0x1));
        transport.write_register(4, 0x10).unwrap();
        assert_eq!(transport.read_register(4).unwrap(), Some(0x11));
        // Only the one reply is affected
        assert_eq!(transport.read_register(4).unwrap(), Some(0x10));
    }

    #[test]
    fn test_wrong_ack_drops_write() {
        let mut transport = Mock::new().with_fault(0, Fault::WrongAck);
        assert!(!transport.write_register(4, 0x10).unwrap());
        assert_eq!(transport.peek(4), 0);
    }

    #[test]
    fn test_timeout() {
        let mut transport = Mock::new().with_fault(0, Fault::Timeout);
        assert!(matches!(
            transport.read_register(4),
            Err(udpreg::Error::Timeout(_))
        ));
    }

    test_rw_num!(u32, u32, 0xDEAD_BEEF);
    test_rw_num!(i32, i32, -0x0DEA_DBEE);
    test_rw_num!(f32, f32, 1.618);
    test_rw_num!(i16f16, I16F16, I16F16::from_num(-3.25));
    test_rw_num!(u1f31, U1F31, U1F31::from_num(0.75));
}
