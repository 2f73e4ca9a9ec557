use std::io;
use std::process::ExitCode;

/// Result type for this crate
pub type Result<T = ()> = std::result::Result<T, Error>;

/// Every way the tunnel can fail fatally, each mapped to the process exit
/// code the operator sees.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to create tap device: {0}")]
    Tap(#[from] tun::Error),

    #[error("unable to run up hook: {0}")]
    UpHookSpawn(#[source] io::Error),

    #[error("up hook exited with {0}")]
    UpHook(std::process::ExitStatus),

    #[error("unable to drop privileges: {0}")]
    PrivDrop(#[from] nix::Error),

    #[error("unable to create socket: {0}")]
    Socket(#[source] io::Error),

    #[error("unable to install signal handlers: {0}")]
    Signals(#[source] io::Error),

    #[error("i/o readiness wait failed: {0}")]
    Wait(#[source] io::Error),

    #[error("tunnel i/o failed: {0}")]
    DataPlane(#[source] io::Error),
}

impl Error {
    /// Process exit code for this failure. Clean shutdown exits 0; these
    /// start at 1.
    pub fn exit_code(&self) -> ExitCode {
        let code: u8 = match self {
            Error::Tap(_) | Error::UpHookSpawn(_) | Error::UpHook(_) | Error::PrivDrop(_) => 1,
            Error::Socket(_) => 2,
            Error::Signals(_) | Error::Wait(_) => 3,
            Error::DataPlane(_) => 4,
        };
        ExitCode::from(code)
    }
}
