use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use framepipe::error::{Error, Result};
use framepipe::hooks::run_hook;
use framepipe::peer::Peer;
use framepipe::privdrop::{self, drop_privileges};
use framepipe::shutdown::Shutdown;
use framepipe::tap::create_tap;
use framepipe::tunnel::{Tunnel, bind_udp};
use framepipe::{MAX_MTU, TUNNEL_PORT};

/// Point-to-point L2 tunnel over UDP.
#[derive(Parser)]
#[command(
    version,
    about,
    after_help = "framepipe has two basic modes: server and client. Both modes work by \
creating a tap device and shuffling Ethernet frames back-and-forth over UDP. \
In server mode (no --remote), no traffic is sent until a datagram from a \
client is received. In client mode, traffic is immediately sent to the \
remote address, and incoming traffic is only accepted from it.\n\n\
If you're tunneling between two hosts with static IPs, you can specify \
--remote on both ends. In all cases, at least one host must specify --remote."
)]
struct Args {
    /// Name of the tap device interface (default: kernel auto-assign)
    #[arg(short, long)]
    iface: Option<String>,

    /// IPv4 address of the remote peer; absence means server mode
    #[arg(short, long)]
    remote: Option<Ipv4Addr>,

    /// Binary to execute once the interface is up, with the interface
    /// name as its only argument
    #[arg(long, value_name = "BINARY")]
    up: Option<PathBuf>,

    /// Binary to execute after the tunnel closes, while the interface
    /// still exists
    #[arg(long, value_name = "BINARY")]
    down: Option<PathBuf>,

    /// uid to drop privileges to
    #[arg(short, long, default_value_t = privdrop::UNPRIVILEGED_UID)]
    uid: u32,

    /// gid to drop privileges to
    #[arg(short, long, default_value_t = privdrop::UNPRIVILEGED_GID)]
    gid: u32,

    /// Tunnel MTU
    #[arg(long, default_value_t = MAX_MTU, value_parser = clap::value_parser!(u16).range(100..=MAX_MTU as i64))]
    mtu: u16,
}

async fn run(args: Args, shutdown: &mut Shutdown) -> Result {
    let (tap, iface) = create_tap(args.iface.as_deref(), args.mtu)?;
    info!("tap device is: {iface}");

    let socket = bind_udp(Ipv4Addr::UNSPECIFIED, TUNNEL_PORT).await?;

    let peer = match args.remote {
        Some(addr) => {
            info!("running in client mode with remote: {addr}");
            Peer::client((addr, TUNNEL_PORT).into())
        }
        None => {
            info!("running in server mode, waiting for first contact");
            Peer::server()
        }
    };

    if let Some(hook) = &args.up {
        let status = run_hook(hook, &iface).await.map_err(Error::UpHookSpawn)?;
        if !status.success() {
            return Err(Error::UpHook(status));
        }
    }

    drop_privileges(args.uid, args.gid)?;

    let result = Tunnel::new(tap, socket, peer, args.mtu).run(shutdown).await;

    // The interface still exists until the process exits, so the down hook
    // runs on fatal exits too. Its status never changes the outcome.
    if let Some(hook) = &args.down {
        match run_hook(hook, &iface).await {
            Ok(status) if status.success() => {}
            Ok(status) => warn!("down hook exited with {status}"),
            Err(err) => warn!("unable to run down hook: {err}"),
        }
    }

    result
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Signals are watched before anything else so one arriving during
    // setup still drives an orderly shutdown.
    let mut shutdown = match Shutdown::new() {
        Ok(shutdown) => shutdown,
        Err(err) => {
            let err = Error::Signals(err);
            error!("{err}");
            return err.exit_code();
        }
    };

    match run(args, &mut shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            err.exit_code()
        }
    }
}
