//! Random digit sequence generation.
//!
//! Pure over the supplied RNG: the same seed always yields the same
//! sequence, which is what the tests rely on.

use rand::Rng;

/// Generate a digit string of exactly `length` characters.
///
/// Each digit is uniform over 0–9. When `first_digit_nonzero` is set,
/// position 0 is drawn from 1–9 instead, so the sequence reads as a
/// natural number without a leading zero.
pub fn generate<R: Rng>(rng: &mut R, length: usize, first_digit_nonzero: bool) -> String {
    let mut seq = String::with_capacity(length);
    for i in 0..length {
        let digit = if i == 0 && first_digit_nonzero {
            rng.gen_range(1..=9u8)
        } else {
            rng.gen_range(0..=9u8)
        };
        seq.push((b'0' + digit) as char);
    }
    seq
}
