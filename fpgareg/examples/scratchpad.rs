//! In this example, we will connect to a device over UDP, write and read back a fixed point gain
//! register, and then run a short round-trip verification.

use fixed::types::U16F16;
use fpgareg::prelude::*;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    let mut transport =
        Udp::connect("192.168.1.128:1234".parse()?)?.with_timeout(Duration::from_millis(250));
    let gain = U16F16::from_num(1.25);
    anyhow::ensure!(transport.write(0x100, &gain)?, "gain write was not acknowledged");
    dbg!(transport.read::<U16F16>(0x100)?);
    let config = VerifyConfig {
        iterations: 1000,
        ..VerifyConfig::default()
    };
    let iterations = Verifier::new(config).run(&mut transport).into_result()?;
    println!("{iterations} round trips passed");
    Ok(())
}
