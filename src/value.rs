//! Four-state logic scalar.
//!
//! Equality is the only operation the propagation core needs: it is the
//! sole gate for "did this signal change". The 2-bit encoding exists
//! because packed NBA gates store the value inline in the low bits of a
//! reference-sized word.

use std::str::FromStr;

use crate::error::{KernelError, KernelResult};

/// Mask selecting the two bits a [`Logic`] value occupies when packed.
pub const LOGIC_BITS_MASK: u64 = 0x3;

/// A single 4-state logic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Logic {
    Zero,
    One,
    /// High impedance.
    Z,
    /// Unknown. Every net starts here unless elaboration says otherwise.
    #[default]
    X,
}

impl Logic {
    /// All four values in encoding order.
    pub const ALL: [Logic; 4] = [Logic::Zero, Logic::One, Logic::Z, Logic::X];

    /// Encode into the 2-bit packed form (`0, 1, Z = 2, X = 3`).
    #[inline]
    pub fn to_bits(self) -> u8 {
        match self {
            Logic::Zero => 0,
            Logic::One => 1,
            Logic::Z => 2,
            Logic::X => 3,
        }
    }

    /// Decode the low two bits of `bits`. Higher bits are ignored, so
    /// this is total over `u8`.
    #[inline]
    pub fn from_bits(bits: u8) -> Logic {
        match bits & LOGIC_BITS_MASK as u8 {
            0 => Logic::Zero,
            1 => Logic::One,
            2 => Logic::Z,
            _ => Logic::X,
        }
    }

    /// `true` for `0` and `1`.
    #[inline]
    pub fn is_known(self) -> bool {
        matches!(self, Logic::Zero | Logic::One)
    }

    pub fn to_char(self) -> char {
        match self {
            Logic::Zero => '0',
            Logic::One => '1',
            Logic::Z => 'z',
            Logic::X => 'x',
        }
    }

    pub fn from_char(c: char) -> KernelResult<Logic> {
        match c {
            '0' => Ok(Logic::Zero),
            '1' => Ok(Logic::One),
            'z' | 'Z' => Ok(Logic::Z),
            'x' | 'X' => Ok(Logic::X),
            other => Err(KernelError::InvalidLogicChar(other)),
        }
    }
}

/// The change-detection predicate. Deterministic and side-effect free.
#[inline]
pub fn equal(a: Logic, b: Logic) -> bool {
    a == b
}

impl From<bool> for Logic {
    fn from(b: bool) -> Self {
        if b {
            Logic::One
        } else {
            Logic::Zero
        }
    }
}

impl FromStr for Logic {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Logic::from_char(c),
            (Some(_), Some(extra)) => Err(KernelError::InvalidLogicChar(extra)),
            (None, _) => Err(KernelError::InvalidLogicChar('\0')),
        }
    }
}

impl std::fmt::Display for Logic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_char())
    }
}
