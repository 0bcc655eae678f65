//! Offset/limit iteration over Controller list endpoints.
//!
//! Offsets are 1-based. Pages are requested until one comes back shorter than
//! the limit (or empty).

use controller_client::ApiError;
use std::future::Future;
use tracing::debug;

/// Page size used for every list endpoint
pub const PAGE_LIMIT: u32 = 500;

/// Fetch every item of a list endpoint
///
/// `fetch` receives `(offset, limit)` and returns one page.
pub async fn fetch_all<T, F, Fut>(fetch: F) -> Result<Vec<T>, ApiError>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, ApiError>>,
{
    fetch_all_with_limit(PAGE_LIMIT, fetch).await
}

/// Fetch every item with a custom page size
pub async fn fetch_all_with_limit<T, F, Fut>(limit: u32, mut fetch: F) -> Result<Vec<T>, ApiError>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, ApiError>>,
{
    let limit = limit.max(1);
    let mut offset = 1;
    let mut items = Vec::new();
    loop {
        let page = fetch(offset, limit).await?;
        let received = page.len();
        items.extend(page);
        debug!("Fetched page at offset {} ({} items)", offset, received);
        if received < limit as usize {
            break;
        }
        offset += limit;
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_stops_on_short_page() {
        let data: Vec<u32> = (0..7).collect();
        let calls = Mutex::new(Vec::new());
        let all = fetch_all_with_limit(3, |offset, limit| {
            calls.lock().unwrap().push(offset);
            let start = (offset - 1) as usize;
            let page: Vec<u32> = data.iter().skip(start).take(limit as usize).copied().collect();
            async move { Ok::<_, ApiError>(page) }
        })
        .await
        .unwrap();

        assert_eq!(all, data);
        assert_eq!(*calls.lock().unwrap(), vec![1, 4, 7]);
    }

    #[tokio::test]
    async fn test_exact_multiple_needs_empty_page() {
        let data: Vec<u32> = (0..6).collect();
        let calls = Mutex::new(0);
        let all = fetch_all_with_limit(3, |offset, limit| {
            *calls.lock().unwrap() += 1;
            let page: Vec<u32> = data.iter().skip((offset - 1) as usize).take(limit as usize).copied().collect();
            async move { Ok::<_, ApiError>(page) }
        })
        .await
        .unwrap();

        assert_eq!(all.len(), 6);
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_error_propagates() {
        let result: Result<Vec<u32>, _> =
            fetch_all(|_, _| async { Err(ApiError::Api("GET /x failed: 500 - boom".to_string())) }).await;
        assert!(result.is_err());
    }
}
