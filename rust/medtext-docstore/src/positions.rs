use serde::{Deserialize, Serialize};

use medtext_common::{Result, error::Error};

/// Character span `[start, end)` of one token occurrence in the untokenized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionRange {
    pub start: u32,
    pub end: u32,
}

impl PositionRange {
    pub fn new(start: u32, end: u32) -> PositionRange {
        PositionRange { start, end }
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

impl From<std::ops::Range<u32>> for PositionRange {
    fn from(range: std::ops::Range<u32>) -> Self {
        PositionRange::new(range.start, range.end)
    }
}

/// Checks that every range is well formed and that ranges ascend without overlap.
pub fn validate_ranges(ranges: &[PositionRange]) -> Result<()> {
    let mut cursor = 0u32;
    for (i, range) in ranges.iter().enumerate() {
        if range.start > range.end {
            return Err(Error::invalid_arg(
                "positions",
                format!("range {i} starts at {} after its end {}", range.start, range.end),
            ));
        }
        if range.start < cursor {
            return Err(Error::invalid_arg(
                "positions",
                format!("range {i} starts at {} before the previous end {cursor}", range.start),
            ));
        }
        cursor = range.end;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ranges() {
        let ok: Vec<PositionRange> = vec![(0..4).into(), (4..4).into(), (6..11).into()];
        validate_ranges(&ok).unwrap();
        validate_ranges(&[]).unwrap();

        assert!(validate_ranges(&[PositionRange::new(5, 2)]).is_err());
        assert!(validate_ranges(&[(0..5).into(), (3..8).into()]).is_err());
    }

    #[test]
    fn test_len() {
        assert_eq!(PositionRange::new(3, 10).len(), 7);
        assert!(PositionRange::new(3, 3).is_empty());
    }
}
