use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::warn;

pub const NOTICE_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub time: String,
    pub level: String,
    pub message: String,
}

/// Last `NOTICE_CAPACITY` user-facing lines, oldest first.
pub struct NoticeLog {
    lines: Mutex<VecDeque<Notice>>,
    capacity: usize,
}

impl Default for NoticeLog {
    fn default() -> Self {
        Self::with_capacity(NOTICE_CAPACITY)
    }
}

impl NoticeLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, notice: Notice) {
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(notice);
    }

    pub fn snapshot(&self) -> Vec<Notice> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).iter().cloned().collect()
    }

    /// Drain the broadcast channel into the log until every sender is gone.
    pub async fn collect(&self, mut rx: broadcast::Receiver<Notice>) {
        loop {
            match rx.recv().await {
                Ok(notice) => self.push(notice),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // not via tracing: would loop back into the channel
                    eprintln!("notice log missed {} messages", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    warn!("notice channel closed");
                    break;
                }
            }
        }
    }
}
