//! Defines the transport mechanisms that all fpgareg transports must implement

pub mod mock;
pub mod udp;

use fixed::{
    types::extra::LeEqU32,
    FixedI32,
    FixedU32,
};

/// The result of a transport operation. Framing, timeout, and socket failures are errors, an
/// unacknowledged request is not.
pub type TransportResult<T> = Result<T, udpreg::Error>;

/// Types that fit in, and can be recovered from, a single 32-bit register
pub trait RegisterValue: Sized {
    /// The big-endian register contents representing this value
    fn to_chunk(&self) -> [u8; 4];
    /// Reconstruct a value from big-endian register contents
    fn from_chunk(chunk: [u8; 4]) -> Self;
}

macro_rules! reg_num {
    ($num:ty) => {
        impl RegisterValue for $num {
            fn to_chunk(&self) -> [u8; 4] {
                self.to_be_bytes()
            }
            fn from_chunk(chunk: [u8; 4]) -> Self {
                <$num>::from_be_bytes(chunk)
            }
        }
    };
}

// Implement register serdes for all builtin 32-bit numeric types
reg_num!(u32);
reg_num!(i32);
reg_num!(f32);

// And for every 32-bit fixed point type
impl<Frac: LeEqU32> RegisterValue for FixedI32<Frac> {
    fn to_chunk(&self) -> [u8; 4] {
        self.to_be_bytes()
    }
    fn from_chunk(chunk: [u8; 4]) -> Self {
        Self::from_be_bytes(chunk)
    }
}

impl<Frac: LeEqU32> RegisterValue for FixedU32<Frac> {
    fn to_chunk(&self) -> [u8; 4] {
        self.to_be_bytes()
    }
    fn from_chunk(chunk: [u8; 4]) -> Self {
        Self::from_be_bytes(chunk)
    }
}

/// The trait that is implemented for register access transport mechanisms.
/// The methods of this trait *assume* that the device is reachable and only one request is ever
/// in flight per transport.
pub trait Transport {
    /// Write `data` to the register at `address`, returning whether the device acknowledged
    fn write_register(&mut self, address: u32, data: u32) -> TransportResult<bool>;

    /// Read the register at `address`, returning `None` if the device didn't acknowledge
    fn read_register(&mut self, address: u32) -> TransportResult<Option<u32>>;

    /// Generically write a [`RegisterValue`] `T` to the register at `address`.
    /// # Example
    /// ```
    /// # use fpgareg::transport::mock::Mock;
    /// # use fpgareg::transport::Transport;
    /// # let mut transport = Mock::new();
    /// let my_num = 3.14f32;
    /// assert!(transport.write(0x10, &my_num).unwrap());
    /// ```
    fn write<T>(&mut self, address: u32, value: &T) -> TransportResult<bool>
    where
        T: RegisterValue,
    {
        self.write_register(address, u32::from_be_bytes(value.to_chunk()))
    }

    /// Generically read a [`RegisterValue`] `T` from the register at `address`.
    /// # Example
    /// ```
    /// # use fpgareg::transport::mock::Mock;
    /// # use fpgareg::transport::Transport;
    /// # let mut transport = Mock::new();
    /// let my_num: Option<u32> = transport.read(0x10).unwrap();
    /// assert_eq!(my_num, Some(0));
    /// ```
    fn read<T>(&mut self, address: u32) -> TransportResult<Option<T>>
    where
        T: RegisterValue,
    {
        Ok(self
            .read_register(address)?
            .map(|word| T::from_chunk(word.to_be_bytes())))
    }
}
