use std::fmt::{Debug, Display};
use std::io::{self, Read, Write};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use rand::distributions::uniform::SampleUniform;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Numeric values that can live inside a `Vector` or a `Matrix`.
///
/// Implemented for `f32` and `f64`. Besides arithmetic, an element knows how
/// to write itself to and read itself from the little-endian binary format.
pub trait Element:
    'static
    + Copy
    + Debug
    + Display
    + PartialOrd
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + Sum
    + SampleUniform
    + Serialize
    + DeserializeOwned
{
    const ZERO: Self;
    const ONE: Self;
    /// Width of one element in the binary format.
    const BYTES: usize;

    fn from_f64(value: f64) -> Self;
    fn to_f64(self) -> f64;

    fn exp(self) -> Self;
    fn sqrt(self) -> Self;
    fn tanh(self) -> Self;

    fn write_le<W: Write>(self, out: &mut W) -> io::Result<()>;
    fn read_le<R: Read>(input: &mut R) -> io::Result<Self>;
}

macro_rules! impl_element {
    ($t:ty, $bytes:expr) => {
        impl Element for $t {
            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;
            const BYTES: usize = $bytes;

            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $t
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn exp(self) -> Self {
                <$t>::exp(self)
            }

            #[inline]
            fn sqrt(self) -> Self {
                <$t>::sqrt(self)
            }

            #[inline]
            fn tanh(self) -> Self {
                <$t>::tanh(self)
            }

            fn write_le<W: Write>(self, out: &mut W) -> io::Result<()> {
                out.write_all(&self.to_le_bytes())
            }

            fn read_le<R: Read>(input: &mut R) -> io::Result<Self> {
                let mut buf = [0u8; $bytes];
                input.read_exact(&mut buf)?;
                Ok(<$t>::from_le_bytes(buf))
            }
        }
    };
}

impl_element!(f32, 4);
impl_element!(f64, 8);

/// Writes a length/shape header word (always `u64`, little-endian).
pub(crate) fn write_len<W: Write>(out: &mut W, len: usize) -> io::Result<()> {
    out.write_all(&(len as u64).to_le_bytes())
}

/// Reads a length/shape header word written by [`write_len`].
pub(crate) fn read_len<R: Read>(input: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}
