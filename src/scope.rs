use std::future::Future;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("screen was left before the request finished")]
pub struct Cancelled;

/// Lifetime of one screen.
///
/// Requests started through [`ScreenScope::run`] resolve to `Err(Cancelled)`
/// once the screen has been left, even when the response itself arrives.
#[derive(Clone, Debug, Default)]
pub struct ScreenScope {
    token: CancellationToken,
}

impl ScreenScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leave(&self) {
        self.token.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub async fn run<F, T>(&self, work: F) -> Result<T, Cancelled>
    where
        F: Future<Output = T>,
    {
        if !self.is_active() {
            return Err(Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Cancelled),
            out = work => {
                if self.is_active() {
                    Ok(out)
                } else {
                    Err(Cancelled)
                }
            }
        }
    }
}
