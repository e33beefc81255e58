use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Row (low-group) tone frequencies, in keypad order.
pub(crate) const LOW_TONES: [f32; 4] = [697.0, 770.0, 852.0, 941.0];

/// Column (high-group) tone frequencies, in keypad order.
pub(crate) const HIGH_TONES: [f32; 4] = [1209.0, 1336.0, 1477.0, 1633.0];

/// Keypad layout indexed by [row tone][column tone].
pub(crate) const KEYPAD: [[PhoneKey; 4]; 4] = [
    [PhoneKey::One, PhoneKey::Two, PhoneKey::Three, PhoneKey::A],
    [PhoneKey::Four, PhoneKey::Five, PhoneKey::Six, PhoneKey::B],
    [PhoneKey::Seven, PhoneKey::Eight, PhoneKey::Nine, PhoneKey::C],
    [PhoneKey::Star, PhoneKey::Zero, PhoneKey::Hash, PhoneKey::D],
];

/// One of the 16 keys on a telephone keypad.
///
/// Detection results use `Option<PhoneKey>`; `None` means no key sounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PhoneKey {
    Zero,
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Star,
    Hash,
    A,
    B,
    C,
    D,
}

impl PhoneKey {
    /// The character printed on the key.
    pub fn as_char(self) -> char {
        match self {
            PhoneKey::Zero => '0',
            PhoneKey::One => '1',
            PhoneKey::Two => '2',
            PhoneKey::Three => '3',
            PhoneKey::Four => '4',
            PhoneKey::Five => '5',
            PhoneKey::Six => '6',
            PhoneKey::Seven => '7',
            PhoneKey::Eight => '8',
            PhoneKey::Nine => '9',
            PhoneKey::Star => '*',
            PhoneKey::Hash => '#',
            PhoneKey::A => 'A',
            PhoneKey::B => 'B',
            PhoneKey::C => 'C',
            PhoneKey::D => 'D',
        }
    }
}

impl fmt::Display for PhoneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}
