use tokio::sync::watch;

/// Fires the paired [`AbortToken`]s.
#[derive(Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

/// Cancellation signal for long-running KDF measurements.
#[derive(Debug, Clone)]
pub struct AbortToken {
    rx: watch::Receiver<bool>,
}

pub fn abort_pair() -> (AbortHandle, AbortToken) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx }, AbortToken { rx })
}

impl AbortHandle {
    pub fn abort(&self) {
        // send only fails once every token is gone, and then nobody is listening
        let _ = self.tx.send(true);
    }
}

impl AbortToken {
    /// A token that can never fire.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        AbortToken { rx }
    }

    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the handle fires; pends forever if the handle is dropped
    /// without firing.
    pub async fn aborted(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn fires_after_abort() {
        let (handle, token) = abort_pair();
        assert!(!token.is_aborted());
        let mut waiter = token.clone();
        handle.abort();
        tokio::time::timeout(Duration::from_secs(1), waiter.aborted())
            .await
            .unwrap();
        assert!(token.is_aborted());
    }

    #[tokio::test]
    async fn never_token_does_not_fire() {
        let mut token = AbortToken::never();
        assert!(!token.is_aborted());
        let res = tokio::time::timeout(Duration::from_millis(20), token.aborted()).await;
        assert!(res.is_err());
    }
}
