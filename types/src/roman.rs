//! Roman numeral codec.
//!
//! Encoding is greedy and table-driven: the subtractive pairs (`CM`, `CD`, `XC`,
//! `XL`, `IX`, `IV`) are first-class table entries, so walking [`SYMBOL_VALUES`]
//! from largest to smallest always yields the canonical minimal-length form.
//!
//! Decoding is deliberately permissive. It folds letters left to right and only
//! knows one rule: a letter larger than its predecessor turns that predecessor
//! into a subtraction. Malformed numerals such as `IIII`, `VX` or `IIX` are not
//! rejected; they decode to whatever that arithmetic produces. Callers that need
//! to know whether an input was canonical can compare it with
//! `encode(decode(input)?)`.

use thiserror::Error;

/// Largest value with a canonical Roman representation.
///
/// The tables stop at `M`, so anything above this is rendered as a plain run of
/// `M`s, which is not a conventional numeral.
pub const MAX_CANONICAL: u32 = 3999;

/// Encoding table, strictly decreasing by value.
pub const SYMBOL_VALUES: [(u32, &str); 13] = [
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

/// Decoding table for the seven base letters.
pub const LETTER_VALUES: [(char, u32); 7] = [
    ('I', 1),
    ('V', 5),
    ('X', 10),
    ('L', 50),
    ('C', 100),
    ('D', 500),
    ('M', 1000),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RomanError {
    /// Input was empty or whitespace only.
    #[error("roman numeral must not be blank")]
    Blank,
    /// A character that is not one of `IVXLCDM` (case-sensitive).
    #[error("unrecognized roman numeral letter {letter:?} at position {position}")]
    UnknownLetter { letter: char, position: usize },
    #[error("{number} is outside the canonical roman range (0..=3999)")]
    OutOfRange { number: u32 },
    #[error("roman numeral value does not fit in 32 bits")]
    Overflow,
}

/// Value of a single Roman letter, if it is one.
#[must_use]
pub fn letter_value(letter: char) -> Option<u32> {
    LETTER_VALUES
        .iter()
        .find(|(candidate, _)| *candidate == letter)
        .map(|&(_, value)| value)
}

/// Encode `number` as a Roman numeral.
///
/// `0` encodes to the empty string. The output is canonical for `1..=3999`;
/// larger values are emitted as a leading run of `M`s. Use [`try_encode`] when
/// the caller wants that range enforced.
#[must_use]
pub fn encode(mut number: u32) -> String {
    let mut roman = String::new();
    for &(value, symbol) in &SYMBOL_VALUES {
        while number >= value {
            roman.push_str(symbol);
            number -= value;
        }
    }
    roman
}

/// Like [`encode`], but rejects values above [`MAX_CANONICAL`].
pub fn try_encode(number: u32) -> Result<String, RomanError> {
    if number > MAX_CANONICAL {
        return Err(RomanError::OutOfRange { number });
    }
    Ok(encode(number))
}

/// Decode a Roman numeral.
///
/// Fails on blank input and on any character outside `IVXLCDM`. Everything
/// else is accepted without well-formedness checks, see the module docs.
pub fn decode(roman: &str) -> Result<u32, RomanError> {
    if roman.trim().is_empty() {
        return Err(RomanError::Blank);
    }

    // `total - 2 * previous` dips below zero mid-expression for inputs like `IVX`.
    let mut total: i64 = 0;
    let mut previous: i64 = 0;

    for (position, letter) in roman.chars().enumerate() {
        let current = i64::from(
            letter_value(letter).ok_or(RomanError::UnknownLetter { letter, position })?,
        );

        if previous != 0 && current > previous {
            // `previous` was added once already: undo it, then subtract it.
            total = total - 2 * previous + current;
        } else {
            total += current;
        }

        previous = current;
    }

    u32::try_from(total).map_err(|_| RomanError::Overflow)
}
