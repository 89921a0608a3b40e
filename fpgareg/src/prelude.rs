//! Prelude (helpful reexports) for this package

pub use crate::{
    transport::{
        mock::{
            Fault,
            Mock,
        },
        udp::{
            self,
            Udp,
        },
        RegisterValue,
        Transport,
        TransportResult,
    },
    verify::{
        Report,
        Verifier,
        VerifyConfig,
    },
};
pub use fixed::prelude::*;
