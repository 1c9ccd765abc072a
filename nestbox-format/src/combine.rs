//! Reductions over the per-entry results of one container.

/// Reduces one archive's ordered per-entry results to a single value.
///
/// Entries whose handler produced nothing appear as `None`; entries skipped by
/// the exception policy do not appear at all.
pub trait Combiner<T> {
    fn combine(&self, path: &str, results: Vec<Option<T>>) -> Option<T>;
}

impl<T, F> Combiner<T> for F
where
    F: Fn(&str, Vec<Option<T>>) -> Option<T>,
{
    fn combine(&self, path: &str, results: Vec<Option<T>>) -> Option<T> {
        self(path, results)
    }
}

/// Throws every result away.
///
/// For handlers that only matter for their side effects, such as printing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl<T> Combiner<T> for Discard {
    fn combine(&self, _path: &str, _results: Vec<Option<T>>) -> Option<T> {
        None
    }
}

/// Counts the entries that produced a result.
#[derive(Debug, Clone, Copy, Default)]
pub struct Count;

impl Combiner<u64> for Count {
    fn combine(&self, _path: &str, results: Vec<Option<u64>>) -> Option<u64> {
        Some(results.iter().filter(|r| r.is_some()).count() as u64)
    }
}

/// Adds up the results, so nested containers total their leaves.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sum;

impl Combiner<u64> for Sum {
    fn combine(&self, _path: &str, results: Vec<Option<u64>>) -> Option<u64> {
        Some(results.into_iter().flatten().sum())
    }
}

/// Concatenates list results in entry order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Concat;

impl<U> Combiner<Vec<U>> for Concat {
    fn combine(&self, _path: &str, results: Vec<Option<Vec<U>>>) -> Option<Vec<U>> {
        Some(results.into_iter().flatten().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discard_always_yields_none() {
        assert_eq!(Discard.combine("a.zip", vec![Some(1), None, Some(3)]), None);
        assert_eq!(Combiner::<u8>::combine(&Discard, "a.zip", vec![]), None);
    }

    #[test]
    fn count_skips_absent_results() {
        assert_eq!(Count.combine("a.zip", vec![Some(7), None, Some(9)]), Some(2));
        assert_eq!(Count.combine("a.zip", vec![]), Some(0));
    }

    #[test]
    fn sum_totals_nested_counts() {
        assert_eq!(Sum.combine("a.zip", vec![Some(1), None, Some(4)]), Some(5));
    }

    #[test]
    fn concat_keeps_order() {
        let combined = Concat.combine(
            "a.tar",
            vec![Some(vec!["a"]), None, Some(vec!["b", "c"])],
        );
        assert_eq!(combined, Some(vec!["a", "b", "c"]));
    }

    #[test]
    fn closures_combine() {
        let longest = |_: &str, results: Vec<Option<String>>| results.into_iter().flatten().max_by_key(|s| s.len());
        assert_eq!(
            longest.combine("x", vec![Some("ab".into()), Some("abc".into())]),
            Some("abc".to_string())
        );
    }
}
