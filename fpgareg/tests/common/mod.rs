//! A loopback UDP device that answers the register protocol from an in-memory register file

use std::{
    collections::HashMap,
    net::{
        SocketAddr,
        UdpSocket,
    },
    sync::{
        atomic::{
            AtomicBool,
            Ordering,
        },
        Arc,
        Mutex,
    },
    thread::{
        self,
        JoinHandle,
    },
    time::Duration,
};
use udpreg::{
    Frame,
    Opcode,
};

/// How the device misbehaves on one particular request
#[derive(Debug, Copy, Clone)]
pub enum Misbehave {
    /// XOR the reply data with a mask
    Corrupt(u32),
    /// Reply with the wrong acknowledgement
    WrongAck,
    /// Don't reply at all
    Silent,
}

pub struct FakeDevice {
    addr: SocketAddr,
    seen: Arc<Mutex<Vec<Frame>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FakeDevice {
    pub fn spawn() -> Self {
        Self::with_faults(HashMap::new())
    }

    /// Misbehave on the given zero-based request indices
    pub fn with_faults(faults: HashMap<usize, Misbehave>) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        // Poll so the thread notices when we're dropped
        socket
            .set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();
        let addr = socket.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(vec![]));
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let seen = Arc::clone(&seen);
            let stop = Arc::clone(&stop);
            thread::spawn(move || serve(&socket, &faults, &seen, &stop))
        };
        Self {
            addr,
            seen,
            stop,
            handle: Some(handle),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Every request frame received so far
    pub fn seen(&self) -> Vec<Frame> {
        self.seen.lock().unwrap().clone()
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
    }
}

fn serve(
    socket: &UdpSocket,
    faults: &HashMap<usize, Misbehave>,
    seen: &Mutex<Vec<Frame>>,
    stop: &AtomicBool,
) {
    let mut memory: HashMap<u32, u32> = HashMap::new();
    let mut buf = [0u8; 64];
    while !stop.load(Ordering::Relaxed) {
        let Ok((n, from)) = socket.recv_from(&mut buf) else {
            continue;
        };
        let Ok(request) = Frame::unpack(&buf[..n]) else {
            continue;
        };
        let index = {
            let mut seen = seen.lock().unwrap();
            seen.push(request);
            seen.len() - 1
        };
        let fault = faults.get(&index).copied();
        let reply = match (request.opcode, fault) {
            (_, Some(Misbehave::Silent)) => continue,
            (Opcode::WriteRequest, Some(Misbehave::WrongAck)) => {
                Frame::new(Opcode::ReadAck, request.address, 0)
            }
            (Opcode::WriteRequest, _) => {
                memory.insert(request.address, request.data);
                Frame::new(Opcode::WriteAck, request.address, request.data)
            }
            (Opcode::ReadRequest, Some(Misbehave::WrongAck)) => {
                Frame::new(Opcode::WriteAck, request.address, 0)
            }
            (Opcode::ReadRequest, fault) => {
                let mut data = memory.get(&request.address).copied().unwrap_or_default();
                if let Some(Misbehave::Corrupt(mask)) = fault {
                    data ^= mask;
                }
                Frame::new(Opcode::ReadAck, request.address, data)
            }
            // Devices never act on acknowledgements
            (Opcode::WriteAck | Opcode::ReadAck, _) => continue,
        };
        socket.send_to(&reply.pack(), from).unwrap();
    }
}
