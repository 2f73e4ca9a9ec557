use tokio::io::unix::AsyncFd;
use tun::{AbstractDevice, Device};

use crate::error::{Error, Result};

/// Headroom left under the tunnel MTU for the UDP/IP encapsulation of each
/// frame on the underlay path.
const MTU_HEADROOM: u16 = 50;

/// Creates the TAP device, configures it, and brings it up.
///
/// The kernel picks the name unless one is requested. The interface MTU is
/// set [`MTU_HEADROOM`] below the tunnel MTU so an encapsulated frame still
/// fits in a single datagram. The returned device is non-blocking and
/// registered with the reactor; the loop only ever does readiness-gated
/// I/O on it.
pub fn create_tap(name: Option<&str>, mtu: u16) -> Result<(AsyncFd<Device>, String)> {
    let mut config = tun::Configuration::default();
    config
        .layer(tun::Layer::L2)
        .mtu(mtu.saturating_sub(MTU_HEADROOM))
        .up();
    if let Some(name) = name {
        config.tun_name(name);
    }

    config.platform_config(|config| {
        // requiring root privilege to acquire complete functions
        config.ensure_root_privileges(true);
    });

    let device = tun::create(&config)?;
    let name = device.tun_name()?;
    device
        .set_nonblock()
        .map_err(|err| Error::Tap(err.into()))?;
    let device = AsyncFd::new(device).map_err(|err| Error::Tap(err.into()))?;

    Ok((device, name))
}
