//! Cancellation-aware database access.
//!
//! Every query the catalog runs on behalf of a [`Session`](crate::Session) is
//! raced against the session's [`CancellationToken`]. A future or cursor that
//! loses the race is dropped on the spot, which hands its pooled connection
//! back, and the caller sees [`ErrorKind::Cancelled`].

use crate::error::{Error, ErrorKind, Result};
use async_stream::stream;
use exn::ResultExt;
use futures::{Stream, StreamExt};
use futures::stream::BoxStream;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Await a database future unless the token fires first.
///
/// An already-cancelled token never polls the future at all.
pub(crate) async fn guard<T, F>(token: &CancellationToken, future: F) -> Result<T>
where
    F: Future<Output = sqlx::Result<T>>,
{
    if token.is_cancelled() {
        exn::bail!(ErrorKind::Cancelled);
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => exn::bail!(ErrorKind::Cancelled),
        result = future => result.or_raise(|| ErrorKind::Database),
    }
}

/// Turn a `sqlx` row cursor into a lazy stream of models that ends with a
/// single [`ErrorKind::Cancelled`] item once the token fires.
///
/// The cursor is finite and not restartable: re-issue the query to read the
/// rows again.
pub(crate) fn cursor<'a, R, T>(
    token: &'a CancellationToken,
    mut rows: BoxStream<'a, sqlx::Result<R>>,
) -> impl Stream<Item = Result<T>> + 'a
where
    R: Send + 'a,
    T: TryFrom<R, Error = Error> + 'a,
{
    stream! {
        loop {
            if token.is_cancelled() {
                yield Err(Error::new(ErrorKind::Cancelled));
                return;
            }
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                row = rows.next() => Some(row),
            };
            match next {
                None => {
                    yield Err(Error::new(ErrorKind::Cancelled));
                    return;
                },
                Some(None) => return,
                Some(Some(row)) => {
                    let fatal = row.is_err();
                    yield row.or_raise(|| ErrorKind::Database).and_then(T::try_from);
                    if fatal {
                        return;
                    }
                },
            }
        }
    }
}
