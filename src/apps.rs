//! The word-count application: tokenize records into `(token, 1)` pairs,
//! sum per key. The sum reducer doubles as the combiner.

use crate::common::{Delimiter, Mapper, Pair, Reducer};
use crate::error::MrError;

pub struct WordCount {
    delimiter: Delimiter,
}

impl WordCount {
    pub fn new(delimiter: Delimiter) -> Self {
        Self { delimiter }
    }
}

impl Mapper for WordCount {
    fn map<'a>(&'a self, record: &'a str) -> Box<dyn Iterator<Item = Pair> + 'a> {
        Box::new(self.delimiter.tokens(record).map(|token| Pair::new(token, 1)))
    }
}

/// Sums a group with checked arithmetic; overflow is an error, never a wrap.
pub struct SumReducer;

impl Reducer for SumReducer {
    fn reduce(&self, key: &str, values: &[u64]) -> Result<u64, MrError> {
        let mut sum: u64 = 0;
        for value in values {
            sum = sum.checked_add(*value).ok_or_else(|| MrError::Overflow {
                key: key.to_string(),
            })?;
        }
        Ok(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_one_pair_per_token() {
        let wc = WordCount::new(Delimiter::Whitespace);
        let pairs: Vec<Pair> = wc.map("the cat sat").collect();
        assert_eq!(
            pairs,
            vec![Pair::new("the", 1), Pair::new("cat", 1), Pair::new("sat", 1)]
        );
    }

    #[test]
    fn empty_record_maps_to_nothing() {
        let wc = WordCount::new(Delimiter::Whitespace);
        assert_eq!(wc.map("").count(), 0);
        assert_eq!(wc.map("   ").count(), 0);
    }

    #[test]
    fn comma_delimiter_maps_tokens() {
        let wc = WordCount::new(Delimiter::Char(','));
        let pairs: Vec<Pair> = wc.map("a,a,b").collect();
        assert_eq!(
            pairs,
            vec![Pair::new("a", 1), Pair::new("a", 1), Pair::new("b", 1)]
        );
    }

    #[test]
    fn sums_a_group() {
        assert_eq!(SumReducer.reduce("k", &[1, 1, 1]).unwrap(), 3);
        assert_eq!(SumReducer.reduce("k", &[]).unwrap(), 0);
    }

    #[test]
    fn overflow_is_an_error_not_a_wrap() {
        let err = SumReducer.reduce("busy", &[u64::MAX, 1]).unwrap_err();
        assert!(matches!(err, MrError::Overflow { ref key } if key == "busy"));
    }
}
