use crate::types::SearchQuery;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Coalesces raw search input into settled queries. A query is emitted once
/// no new input has arrived for the quiet period, and only when it differs
/// from the last one emitted.
pub struct SearchDebouncer {
    input: mpsc::UnboundedSender<String>,
    handle: JoinHandle<()>,
}

impl SearchDebouncer {
    pub fn spawn(quiet: Duration) -> (Self, mpsc::UnboundedReceiver<SearchQuery>) {
        let (input, raw_rx) = mpsc::unbounded_channel();
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(raw_rx, settled_tx, quiet));
        (Self { input, handle }, settled_rx)
    }

    /// Feed the current contents of the search box.
    pub fn push(&self, raw: impl Into<String>) -> bool {
        self.input.send(raw.into()).is_ok()
    }

    /// Stop accepting input. Pending input is still emitted before the task
    /// exits.
    pub async fn close(self) {
        drop(self.input);
        let _ = self.handle.await;
    }
}

async fn run(
    mut raw_rx: mpsc::UnboundedReceiver<String>,
    settled_tx: mpsc::UnboundedSender<SearchQuery>,
    quiet: Duration,
) {
    let mut last_emitted = SearchQuery::default();

    while let Some(first) = raw_rx.recv().await {
        let mut pending = first;
        let mut closed = false;

        loop {
            tokio::select! {
                next = raw_rx.recv() => match next {
                    Some(raw) => pending = raw,
                    None => {
                        closed = true;
                        break;
                    }
                },
                _ = tokio::time::sleep(quiet) => break,
            }
        }

        let settled = SearchQuery::new(pending);
        if settled != last_emitted {
            debug!("Search settled on {:?}", settled.as_str());
            if settled_tx.send(settled.clone()).is_err() {
                return;
            }
            last_emitted = settled;
        }
        if closed {
            return;
        }
    }
}
