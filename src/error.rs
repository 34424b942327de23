use std::ops::{Bound, RangeBounds};

use thiserror::Error;

/// Precondition violation reported by the checked (`try_*`) operations.
///
/// The unchecked operations panic with the same message.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TreapError {
    #[error("position {pos} is out of bounds for a sequence of length {len}")]
    OutOfBounds { pos: usize, len: usize },
    #[error("range {start}..{end} is invalid for a sequence of length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, TreapError>;

/// Resolves `range` against a sequence of length `len` into a half-open pair.
pub(crate) fn resolve_range<R: RangeBounds<usize>>(range: R, len: usize) -> Result<(usize, usize)> {
    let start = match range.start_bound() {
        Bound::Included(&s) => s,
        Bound::Excluded(&s) => s.checked_add(1).ok_or(TreapError::InvalidRange {
            start: s,
            end: len,
            len,
        })?,
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&e) => e.checked_add(1).ok_or(TreapError::InvalidRange {
            start,
            end: e,
            len,
        })?,
        Bound::Excluded(&e) => e,
        Bound::Unbounded => len,
    };
    if start > end || end > len {
        return Err(TreapError::InvalidRange { start, end, len });
    }
    Ok((start, end))
}

#[cold]
#[track_caller]
pub(crate) fn fail(err: TreapError) -> ! {
    panic!("{err}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_range_forms() {
        assert_eq!(resolve_range(.., 5), Ok((0, 5)));
        assert_eq!(resolve_range(1..3, 5), Ok((1, 3)));
        assert_eq!(resolve_range(1..=3, 5), Ok((1, 4)));
        assert_eq!(resolve_range(2.., 5), Ok((2, 5)));
        assert_eq!(resolve_range(..=4, 5), Ok((0, 5)));
        assert_eq!(resolve_range(5..5, 5), Ok((5, 5)));
    }

    #[test]
    fn test_resolve_range_rejects() {
        assert_eq!(
            resolve_range(3..2, 5),
            Err(TreapError::InvalidRange { start: 3, end: 2, len: 5 })
        );
        assert_eq!(
            resolve_range(0..6, 5),
            Err(TreapError::InvalidRange { start: 0, end: 6, len: 5 })
        );
        assert!(resolve_range(..=usize::MAX, 5).is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = TreapError::OutOfBounds { pos: 7, len: 3 };
        assert_eq!(
            err.to_string(),
            "position 7 is out of bounds for a sequence of length 3"
        );
        let err = TreapError::InvalidRange { start: 4, end: 1, len: 9 };
        assert_eq!(
            err.to_string(),
            "range 4..1 is invalid for a sequence of length 9"
        );
    }
}
