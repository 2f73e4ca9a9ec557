pub mod error;
pub mod frame;
pub mod hooks;
pub mod peer;
pub mod privdrop;
pub mod shutdown;
pub mod tap;
pub mod tunnel;

pub use error::{Error, Result};
pub use frame::{Frame, FrameQueue};
pub use peer::Peer;
pub use shutdown::Shutdown;
pub use tunnel::Tunnel;

/// Largest frame the tunnel will read, queue, or send in one operation.
pub const MAX_MTU: u16 = 1500;

/// UDP port used on both ends of the tunnel.
pub const TUNNEL_PORT: u16 = 1234;
