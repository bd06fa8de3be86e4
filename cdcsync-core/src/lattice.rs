//! Widening order over column types.
//!
//! `can_widen(from, to)` holds when every value of `from` fits in `to`
//! without loss. Comparisons only happen inside one [`TypeFamily`]; the
//! relation is reflexive and transitive but not total, so two types can be
//! mutually incomparable.

use crate::models::ColumnType;

/// Returns true if every value representable by `from` is representable by `to`.
///
/// # Example
/// ```rust
/// use cdcsync_core::lattice::can_widen;
/// use cdcsync_core::models::ColumnType;
///
/// let int = ColumnType::Integer { bits: 32 };
/// let bigint = ColumnType::Integer { bits: 64 };
/// assert!(can_widen(&int, &bigint));
/// assert!(!can_widen(&bigint, &int));
/// ```
pub fn can_widen(from: &ColumnType, to: &ColumnType) -> bool {
    match (from, to) {
        (ColumnType::String { max_length: a }, ColumnType::String { max_length: b })
        | (ColumnType::Binary { max_length: a }, ColumnType::Binary { max_length: b }) => {
            length_fits(*a, *b)
        }
        (ColumnType::Integer { bits: a }, ColumnType::Integer { bits: b })
        | (ColumnType::Float { bits: a }, ColumnType::Float { bits: b }) => b >= a,
        (
            ColumnType::Decimal {
                precision: p1,
                scale: s1,
            },
            ColumnType::Decimal {
                precision: p2,
                scale: s2,
            },
        ) => p2 >= p1 && s2 >= s1,
        _ => from.family() == to.family() && from == to,
    }
}

/// Picks the wider of two types, or `None` when neither widens to the other.
///
/// When both widen to each other (equal types) the first argument is returned.
pub fn wider_of<'a>(a: &'a ColumnType, b: &'a ColumnType) -> Option<&'a ColumnType> {
    if can_widen(b, a) {
        Some(a)
    } else if can_widen(a, b) {
        Some(b)
    } else {
        None
    }
}

// `None` is unbounded.
fn length_fits(from: Option<u32>, to: Option<u32>) -> bool {
    match (from, to) {
        (_, None) => true,
        (None, Some(_)) => false,
        (Some(from), Some(to)) => to >= from,
    }
}
