//! Roman numeral codec tests

use clipwise_types::{MAX_CANONICAL, RomanError, decode, encode, try_encode};

#[test]
fn encode_reference_values() {
    let cases = [
        (0, ""),
        (1, "I"),
        (4, "IV"),
        (9, "IX"),
        (40, "XL"),
        (90, "XC"),
        (444, "CDXLIV"),
        (1994, "MCMXCIV"),
        (3999, "MMMCMXCIX"),
    ];
    for (number, expected) in cases {
        assert_eq!(encode(number), expected, "encode({number})");
    }
}

#[test]
fn decode_reference_values() {
    assert_eq!(decode("MCMXCIV"), Ok(1994));
    assert_eq!(decode("IX"), Ok(9));
    assert_eq!(decode("IV"), Ok(4));
}

#[test]
fn decode_blank_is_invalid_argument() {
    assert_eq!(decode(""), Err(RomanError::Blank));
    assert_eq!(decode("   "), Err(RomanError::Blank));
}

#[test]
fn decode_unknown_letter_is_lookup_failure() {
    assert!(matches!(
        decode("IZ"),
        Err(RomanError::UnknownLetter { letter: 'Z', .. })
    ));
}

#[test]
fn canonical_numerals_survive_decode_then_encode() {
    for numeral in ["MMXXIV", "CDXLIV", "XCIX", "MMMCMXCIX", "DCCCLXXXVIII"] {
        let number = decode(numeral).unwrap();
        assert_eq!(encode(number), numeral);
    }
}

// Documented limitation: the decoder is permissive, so non-canonical input
// does not survive decode then encode.
#[test]
fn non_canonical_numerals_are_normalised_by_round_trip() {
    assert_eq!(encode(decode("IIII").unwrap()), "IV");
    assert_eq!(encode(decode("VIIII").unwrap()), "IX");
    assert_eq!(encode(decode("XXXXX").unwrap()), "L");
}

#[test]
fn every_canonical_value_round_trips() {
    for n in 1..=MAX_CANONICAL {
        let numeral = try_encode(n).unwrap();
        assert_eq!(decode(&numeral), Ok(n));
    }
}

#[test]
fn zero_encodes_to_blank_which_does_not_decode() {
    assert_eq!(decode(&encode(0)), Err(RomanError::Blank));
}

#[test]
fn decode_overflow_is_reported() {
    // 4_294_968 thousands is just past u32::MAX.
    let numeral = "M".repeat(4_294_968);
    assert_eq!(decode(&numeral), Err(RomanError::Overflow));
}
