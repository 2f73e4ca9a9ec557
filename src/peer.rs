use std::net::SocketAddr;

/// What [`Peer::observe`] decided about a datagram's source address.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The source is the current peer.
    Accepted,
    /// First contact: the sender is now the peer.
    Learned,
    /// A new sender replaced the previous peer; carries the old address.
    Migrated(SocketAddr),
    /// Client mode only: the sender is not the configured peer.
    Rejected,
}

/// The remote end of the tunnel.
///
/// Client mode pins the configured address for the whole run. Server mode
/// starts unknown, learns the first sender, and migrates to any later one.
/// Once an address is known it never becomes unknown again.
#[derive(Debug)]
pub struct Peer {
    addr: Option<SocketAddr>,
    pinned: bool,
}

impl Peer {
    /// Client mode: the peer is fixed up front and outbound sends are
    /// permitted immediately.
    pub fn client(addr: SocketAddr) -> Self {
        Self {
            addr: Some(addr),
            pinned: true,
        }
    }

    /// Server mode: no traffic is sent until a datagram arrives and its
    /// sender becomes the peer.
    pub fn server() -> Self {
        Self {
            addr: None,
            pinned: false,
        }
    }

    pub fn known(&self) -> bool {
        self.addr.is_some()
    }

    pub fn addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    /// Judges a datagram's source and updates the peer address when the
    /// mode allows it.
    pub fn observe(&mut self, src: SocketAddr) -> Verdict {
        match self.addr {
            None => {
                self.addr = Some(src);
                Verdict::Learned
            }
            Some(current) if current == src => Verdict::Accepted,
            Some(_) if self.pinned => Verdict::Rejected,
            Some(current) => {
                self.addr = Some(src);
                Verdict::Migrated(current)
            }
        }
    }
}
