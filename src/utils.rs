/// Shared async helpers
use tokio::sync::watch;

/// Resolves once the flag behind `rx` is set, or when its sender is gone.
pub async fn wait_for_flag(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}
