use std::io;
use std::path::Path;
use std::process::ExitStatus;

use tokio::process::Command;

/// Runs a hook program with the interface name as its only argument and
/// waits for it to finish.
///
/// The caller decides what the status means: a failing up hook is fatal
/// before the loop starts, a failing down hook is only reported.
pub async fn run_hook(path: &Path, iface: &str) -> io::Result<ExitStatus> {
    Command::new(path).arg(iface).status().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_success() {
        let status = run_hook(Path::new("/bin/true"), "tap0").await.unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn reports_failure_status() {
        let status = run_hook(Path::new("/bin/false"), "tap0").await.unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn spawn_failure_is_an_error() {
        let result = run_hook(Path::new("/nonexistent/hook"), "tap0").await;
        assert!(result.is_err());
    }
}
