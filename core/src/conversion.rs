//! Number/numeral pairs as shown to the user.

use std::fmt;

use clipwise_types::{RomanError, decode, encode, try_encode};

/// A number together with the numeral it was converted from or to.
///
/// Displays as `"{number} = {numeral}"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomanConversion {
    pub number: u32,
    pub numeral: String,
}

impl RomanConversion {
    /// Encode `number`; fails above 3999.
    pub fn from_number(number: u32) -> Result<Self, RomanError> {
        Ok(Self {
            number,
            numeral: try_encode(number)?,
        })
    }

    /// Decode `input`, ignoring surrounding whitespace.
    ///
    /// Decoding is permissive, so the result may not be canonical; check
    /// [`Self::is_canonical`] before echoing the numeral back as-is.
    pub fn from_numeral(input: &str) -> Result<Self, RomanError> {
        let numeral = input.trim();
        let number = decode(numeral)?;
        Ok(Self {
            number,
            numeral: numeral.to_string(),
        })
    }

    /// Canonical spelling of `number`.
    #[must_use]
    pub fn canonical(&self) -> String {
        encode(self.number)
    }

    #[must_use]
    pub fn is_canonical(&self) -> bool {
        self.canonical() == self.numeral
    }
}

impl fmt::Display for RomanConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.number, self.numeral)
    }
}
