use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// 在独立线程中执行任务，最多等待 `timeout`
///
/// 超时后任务线程不会被终止，会在后台跑完，结果被丢弃。
/// 任务线程 panic 时返回 `RecvTimeoutError::Disconnected`。
pub fn run_with_deadline<T, F>(timeout: Duration, job: F) -> Result<T, RecvTimeoutError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // 接收端可能已因超时而放弃
        let _ = tx.send(job());
    });
    rx.recv_timeout(timeout)
}
