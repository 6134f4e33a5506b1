//! Member and declaration flag strings.
//!
//! Producers attach a compact string of single-character facets to members,
//! parameters and declarations (`"?R"` is an optional readonly property).
//! The string is decoded once into a [`Flags`] set. Characters are additive and
//! order-independent; unknown characters are ignored so that newer producers
//! stay readable.
//!
//! | Facet | Char |
//! |-------|------|
//! | optional | `?` |
//! | rest | `3` |
//! | readonly | `R` |
//! | abstract | `A` |
//! | public / private / protected | `$` / `#` / `@` |
//! | static | `S` |
//! | async | `a` |
//! | exported | `E` |
//! | inferred return type | `i` |
//! | getter / setter | `g` / `s` |
//! | method / property | `M` / `P` |

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Decoded flag string.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    pub struct Flags: u16 {
        const OPTIONAL = 1 << 0;
        const REST = 1 << 1;
        const READONLY = 1 << 2;
        const ABSTRACT = 1 << 3;
        const PUBLIC = 1 << 4;
        const PRIVATE = 1 << 5;
        const PROTECTED = 1 << 6;
        const STATIC = 1 << 7;
        const ASYNC = 1 << 8;
        const EXPORTED = 1 << 9;
        const INFERRED = 1 << 10;
        const GETTER = 1 << 11;
        const SETTER = 1 << 12;
        const METHOD = 1 << 13;
        const PROPERTY = 1 << 14;

        const VISIBILITY = Self::PUBLIC.bits() | Self::PRIVATE.bits() | Self::PROTECTED.bits();
        const ACCESSOR = Self::GETTER.bits() | Self::SETTER.bits();
    }
}

/// Wire characters in canonical rendering order.
const FLAG_CHARS: [(char, Flags); 15] = [
    ('?', Flags::OPTIONAL),
    ('3', Flags::REST),
    ('R', Flags::READONLY),
    ('A', Flags::ABSTRACT),
    ('$', Flags::PUBLIC),
    ('#', Flags::PRIVATE),
    ('@', Flags::PROTECTED),
    ('S', Flags::STATIC),
    ('a', Flags::ASYNC),
    ('E', Flags::EXPORTED),
    ('i', Flags::INFERRED),
    ('g', Flags::GETTER),
    ('s', Flags::SETTER),
    ('M', Flags::METHOD),
    ('P', Flags::PROPERTY),
];

/// Member visibility.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Protected,
}

impl Flags {
    /// Decode a flag string, ignoring characters outside the table.
    pub fn parse(text: &str) -> Self {
        text.chars()
            .filter_map(|c| FLAG_CHARS.iter().find(|(ch, _)| *ch == c))
            .fold(Flags::empty(), |acc, (_, flag)| acc | *flag)
    }

    /// The wire character of a single facet.
    pub fn char_of(flag: Flags) -> Option<char> {
        FLAG_CHARS
            .iter()
            .find(|(_, f)| *f == flag)
            .map(|(c, _)| *c)
    }

    /// Members without an explicit visibility facet are public.
    pub fn visibility(self) -> Visibility {
        if self.contains(Flags::PRIVATE) {
            Visibility::Private
        } else if self.contains(Flags::PROTECTED) {
            Visibility::Protected
        } else {
            Visibility::Public
        }
    }

    pub fn is_optional(self) -> bool {
        self.contains(Flags::OPTIONAL)
    }

    pub fn is_rest(self) -> bool {
        self.contains(Flags::REST)
    }

    pub fn is_static(self) -> bool {
        self.contains(Flags::STATIC)
    }
}

impl From<&str> for Flags {
    fn from(text: &str) -> Self {
        Flags::parse(text)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (c, flag) in FLAG_CHARS {
            if self.contains(flag) {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_order_independent() {
        assert_eq!(Flags::parse("?R"), Flags::parse("R?"));
        assert_eq!(Flags::parse("?R"), Flags::OPTIONAL | Flags::READONLY);
    }

    #[test]
    fn parse_ignores_unknown_characters() {
        assert_eq!(Flags::parse("?xZ~"), Flags::OPTIONAL);
        assert_eq!(Flags::parse("zzz"), Flags::empty());
    }

    #[test]
    fn repeated_characters_are_idempotent() {
        assert_eq!(Flags::parse("???"), Flags::OPTIONAL);
    }

    #[test]
    fn display_uses_canonical_order() {
        let flags = Flags::parse("SR#?");
        assert_eq!(flags.to_string(), "?R#S");
        assert_eq!(Flags::parse(&flags.to_string()), flags);
    }

    #[test]
    fn visibility_defaults_to_public() {
        assert_eq!(Flags::empty().visibility(), Visibility::Public);
        assert_eq!(Flags::parse("#").visibility(), Visibility::Private);
        assert_eq!(Flags::parse("@").visibility(), Visibility::Protected);
        assert_eq!(Flags::parse("$R").visibility(), Visibility::Public);
    }

    #[test]
    fn every_facet_has_a_distinct_character() {
        for (c, flag) in FLAG_CHARS {
            assert_eq!(Flags::char_of(flag), Some(c));
            assert_eq!(Flags::parse(&c.to_string()), flag);
        }
    }

    #[test]
    fn accessor_and_predicates() {
        let getter = Flags::parse("g");
        assert!(getter.intersects(Flags::ACCESSOR));
        assert!(Flags::parse("3").is_rest());
        assert!(Flags::parse("S").is_static());
        assert!(!Flags::parse("S").is_optional());
    }
}
