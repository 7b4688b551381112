use std::vec;

use crate::error::KeysetResult;

/// Flattens a sequence of batches into single items, in order.
///
/// A batch is pulled only once the previous one has been handed out
/// completely. Errors from the batch sequence are passed through as they
/// arrive.
pub struct Items<I, T> {
    batches: I,
    current: vec::IntoIter<T>,
}

impl<I, T> Iterator for Items<I, T>
where
    I: Iterator<Item = KeysetResult<Vec<T>>>,
{
    type Item = KeysetResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.current.next() {
                return Some(Ok(item));
            }
            match self.batches.next()? {
                Ok(batch) => self.current = batch.into_iter(),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// Converts a batch sequence into a per-item sequence.
pub fn iterate_query_items<I, T>(batches: I) -> Items<I::IntoIter, T>
where
    I: IntoIterator<Item = KeysetResult<Vec<T>>>,
{
    Items {
        batches: batches.into_iter(),
        current: Vec::new().into_iter(),
    }
}

pub trait BatchesExt<T>: Iterator<Item = KeysetResult<Vec<T>>> + Sized {
    fn items(self) -> Items<Self, T> {
        iterate_query_items(self)
    }
}

impl<I, T> BatchesExt<T> for I where I: Iterator<Item = KeysetResult<Vec<T>>> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KeysetError;

    #[test]
    fn preserves_order_across_batches() {
        let batches: Vec<KeysetResult<Vec<u32>>> = vec![Ok(vec![1, 2]), Ok(vec![]), Ok(vec![3]), Ok(vec![4, 5])];
        let items: Vec<u32> = iterate_query_items(batches).map(Result::unwrap).collect();
        assert_eq!(items, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn pulls_batches_lazily() {
        let mut pulled = 0;
        let source = std::iter::from_fn(|| {
            pulled += 1;
            Some(Ok::<_, KeysetError>(vec![pulled, pulled]))
        });
        let first: Vec<u32> = source.items().take(3).map(Result::unwrap).collect();
        assert_eq!(first, vec![1, 1, 2]);
        assert_eq!(pulled, 2);
    }

    #[test]
    fn passes_errors_through() {
        let batches: Vec<KeysetResult<Vec<u32>>> =
            vec![Ok(vec![1]), Err(KeysetError::QueryMessage("connection lost".into()))];
        let mut items = batches.into_iter().items();
        assert_eq!(items.next().unwrap().unwrap(), 1);
        assert!(matches!(items.next(), Some(Err(KeysetError::QueryMessage(_)))));
        assert!(items.next().is_none());
    }
}
