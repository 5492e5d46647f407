use futures::stream::{self, StreamExt};
use std::future::Future;

/// Runs `f` over `items` with at most `workers` calls in flight.
///
/// Results come back in input order. Every item runs to completion; a
/// failing item does not cancel its siblings.
pub async fn bounded_map<T, R, F, Fut>(items: Vec<T>, workers: usize, f: F) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    if workers <= 1 {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            results.push(f(item).await);
        }
        return results;
    }

    stream::iter(items).map(f).buffered(workers).collect().await
}
