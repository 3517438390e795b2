//! Sorted order verification.

/// Checks that the items are in nondecreasing order.
/// Returns the index of the first out-of-order item, or [`None`] if the sequence is sorted.
pub fn find_unsorted<T, E, I>(items: I) -> Result<Option<usize>, E>
where
    T: Ord,
    I: IntoIterator<Item = Result<T, E>>,
{
    let mut prev: Option<T> = None;
    for (idx, item) in items.into_iter().enumerate() {
        let item = item?;
        if let Some(prev) = &prev {
            if *prev > item {
                return Ok(Some(idx));
            }
        }
        prev = Some(item);
    }

    Ok(None)
}

/// Checks that the items are in nondecreasing order.
pub fn check_sorted<T, E, I>(items: I) -> Result<bool, E>
where
    T: Ord,
    I: IntoIterator<Item = Result<T, E>>,
{
    Ok(find_unsorted(items)?.is_none())
}

#[cfg(test)]
mod test {
    use std::io;

    use rstest::*;

    use super::{check_sorted, find_unsorted};

    #[rstest]
    #[case(vec![], None)]
    #[case(vec![1], None)]
    #[case(vec![1, 1, 2, 5], None)]
    #[case(vec![1, 3, 2], Some(2))]
    #[case(vec![2, 1], Some(1))]
    fn test_find_unsorted(#[case] items: Vec<i64>, #[case] expected: Option<usize>) {
        let result = find_unsorted(items.into_iter().map(Ok::<_, io::Error>));
        assert_eq!(result.unwrap(), expected);
    }

    #[test]
    fn test_check_sorted_propagates_error() {
        let items = vec![Ok(1), Err(io::Error::new(io::ErrorKind::Other, "test error"))];
        assert!(check_sorted(items).is_err());
    }
}
