use std::{
    net::SocketAddr,
    time::Duration,
};

const SCRATCH_ADDR: u32 = 8562;

fn main() -> anyhow::Result<()> {
    // Setup the session
    let host_addr: SocketAddr = "192.168.1.128:1234".parse()?;
    let mut session = udpreg::Session::open(host_addr)?;
    let timeout = Duration::from_secs_f32(0.5);
    // Make sure the network stack is alive first
    let reply = udpreg::debug::send_command(
        &mut session,
        udpreg::debug::Command::Ack,
        &[],
        timeout,
    )?;
    dbg!(reply);
    // Then poke a register
    let acked = udpreg::write_register(&mut session, SCRATCH_ADDR, 69_696_969, timeout)?;
    assert!(acked);
    assert_eq!(
        udpreg::read_register(&mut session, SCRATCH_ADDR, timeout)?,
        Some(69_696_969)
    );
    Ok(())
}
