use std::sync::Arc;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};

use crate::key::CacheKey;
use crate::store::{QueryResult, QueryStore};

/// Streams the result of the slot picked by `key_of` from the selector value.
///
/// Emits the current result first, then again whenever the store writes the
/// picked slot or the selector value changes. Consecutive equal results are
/// emitted once. The stream ends when the selector's sender is dropped.
pub(crate) fn result_stream<T, F>(
    store: Arc<QueryStore>,
    mut selector: watch::Receiver<T>,
    key_of: F,
) -> BoxStream<'static, QueryResult>
where
    T: Send + Sync + 'static,
    F: Fn(&T) -> Option<CacheKey> + Send + Sync + 'static,
{
    let changes = store.subscribe();
    selector.mark_unchanged();

    let view = View {
        store,
        selector,
        changes,
        key_of,
        started: false,
        last: None,
    };

    stream::unfold(view, |mut view| async move {
        loop {
            if view.started && !view.wait().await {
                return None;
            }
            view.started = true;

            let result = view.read();
            if view.last.as_ref() != Some(&result) {
                view.last = Some(result.clone());
                return Some((result, view));
            }
        }
    })
    .boxed()
}

struct View<T, F> {
    store: Arc<QueryStore>,
    selector: watch::Receiver<T>,
    changes: broadcast::Receiver<CacheKey>,
    key_of: F,
    started: bool,
    last: Option<QueryResult>,
}

impl<T, F> View<T, F>
where
    F: Fn(&T) -> Option<CacheKey>,
{
    fn key(&self) -> Option<CacheKey> {
        (self.key_of)(&self.selector.borrow())
    }

    fn read(&self) -> QueryResult {
        self.key()
            .map_or(QueryResult::UNINITIALIZED, |key| self.store.result_for_key(&key))
    }

    /// Waits until the picked slot may have changed.
    ///
    /// Returns `false` once the selector's sender is gone or the store is
    /// dropped.
    async fn wait(&mut self) -> bool {
        let key = self.key();

        loop {
            tokio::select! {
                changed = self.selector.changed() => return changed.is_ok(),
                notified = self.changes.recv() => match notified {
                    Ok(written) if key.as_ref() == Some(&written) => return true,
                    Ok(_) => {}
                    // Missed notifications; re-read the slot.
                    Err(RecvError::Lagged(_)) => return true,
                    Err(RecvError::Closed) => return false,
                },
            }
        }
    }
}
