use crate::core::stream::{Error, Result};
use derive_more::Display;
use log::debug;

const BYTES_PREFIX: &str = "bytes=";
const BYTES_LEN: usize = BYTES_PREFIX.len();

/// The HTTP byte range according to rfc7233, resolved against the length of a resource.
/// Both the start and end positions are inclusive.
#[derive(Debug, Display, Clone, PartialEq)]
#[display("{}-{}", start, end)]
pub struct Range {
    pub start: u64,
    pub end: u64,
}

impl Range {
    /// Parse the given `Range` header value for a resource of the given size.
    /// Only the `bytes` unit is supported, any other unit results in [Error::InvalidRange].
    ///
    /// The end position is capped at the last byte of the resource.
    /// Malformed ranges and ranges which can't be satisfied for the resource size are ignored,
    /// if no satisfiable range remains, [Error::InvalidRange] is returned.
    pub fn parse(value: &str, size: u64) -> Result<Vec<Self>> {
        if !value.starts_with(BYTES_PREFIX) || size == 0 {
            return Err(Error::InvalidRange);
        }

        let ranges: Vec<Self> = value[BYTES_LEN..]
            .split(',')
            .filter_map(|value| match Self::parse_value(value.trim(), size) {
                Ok(range) => range,
                Err(e) => {
                    debug!("Ignoring range \"{}\", {}", value, e);
                    None
                }
            })
            .collect();

        if ranges.is_empty() {
            return Err(Error::InvalidRange);
        }

        Ok(ranges)
    }

    /// Returns the number of bytes within the range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Returns the `Content-Range` header value for a resource of the given size.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }

    fn parse_value(value: &str, size: u64) -> Result<Option<Self>> {
        let (start_value, end_value) = value
            .split_once('-')
            .ok_or_else(|| Error::Parse(format!("missing range separator in \"{}\"", value)))?;
        let last = size - 1;

        let (start, end) = if start_value.is_empty() {
            let suffix = Self::parse_position(end_value)?;
            if suffix > size {
                return Ok(None);
            }
            (size - suffix, last)
        } else {
            let start = Self::parse_position(start_value)?;
            let end = if end_value.is_empty() {
                last
            } else {
                Self::parse_position(end_value)?.min(last)
            };
            (start, end)
        };

        if start > end {
            return Ok(None);
        }

        Ok(Some(Self { start, end }))
    }

    fn parse_position(value: &str) -> Result<u64> {
        value
            .trim()
            .parse::<u64>()
            .map_err(|e| Error::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() {
        let value = "bytes=0-99";

        let ranges = Range::parse(value, 1000).expect("expected a valid range");

        assert_eq!(vec![Range { start: 0, end: 99 }], ranges);
        assert_eq!(100, ranges[0].len());
        assert_eq!("bytes 0-99/1000", ranges[0].content_range(1000));
    }

    #[test]
    fn test_parse_no_end_value() {
        let ranges = Range::parse("bytes=500-", 1000).expect("expected a valid range");

        assert_eq!(vec![Range { start: 500, end: 999 }], ranges);
    }

    #[test]
    fn test_parse_suffix() {
        let ranges = Range::parse("bytes=-200", 1000).expect("expected a valid range");

        assert_eq!(vec![Range { start: 800, end: 999 }], ranges);
    }

    #[test]
    fn test_parse_suffix_larger_than_size() {
        assert_eq!(Err(Error::InvalidRange), Range::parse("bytes=-5000", 1000));

        let ranges = Range::parse("bytes=-5000,10-19", 1000).expect("expected a valid range");
        assert_eq!(vec![Range { start: 10, end: 19 }], ranges);
    }

    #[test]
    fn test_parse_suffix_entire_resource() {
        let ranges = Range::parse("bytes=-1000", 1000).expect("expected a valid range");

        assert_eq!(vec![Range { start: 0, end: 999 }], ranges);
    }

    #[test]
    fn test_parse_end_beyond_size() {
        let ranges = Range::parse("bytes=900-4000", 1000).expect("expected a valid range");

        assert_eq!(vec![Range { start: 900, end: 999 }], ranges);
    }

    #[test]
    fn test_parse_multiple_ranges() {
        let ranges = Range::parse("bytes=0-9, 20-29", 1000).expect("expected a valid range");

        assert_eq!(
            vec![Range { start: 0, end: 9 }, Range { start: 20, end: 29 }],
            ranges
        );
    }

    #[test]
    fn test_parse_invalid_prefix() {
        let result = Range::parse("kb=0-1485", 2000);

        assert_eq!(Err(Error::InvalidRange), result);
    }

    #[test]
    fn test_parse_unsatisfiable() {
        assert_eq!(Err(Error::InvalidRange), Range::parse("bytes=1000-1200", 1000));
        assert_eq!(Err(Error::InvalidRange), Range::parse("bytes=50-10", 1000));
        assert_eq!(Err(Error::InvalidRange), Range::parse("bytes=0-10", 0));
    }

    #[test]
    fn test_parse_invalid_start_value() {
        let result = Range::parse("bytes=lorem-1023", 2048);

        assert_eq!(Err(Error::InvalidRange), result);
    }

    #[test]
    fn test_parse_invalid_end_value() {
        let result = Range::parse("bytes=10-lorem", 2048);

        assert_eq!(Err(Error::InvalidRange), result);
    }

    #[test]
    fn test_parse_missing_separator() {
        let result = Range::parse("bytes=100", 2048);

        assert_eq!(Err(Error::InvalidRange), result);
    }

    #[test]
    fn test_parse_skips_malformed_range() {
        let ranges = Range::parse("bytes=abc-1,0-99", 1000).expect("expected a valid range");

        assert_eq!(vec![Range { start: 0, end: 99 }], ranges);
    }
}
