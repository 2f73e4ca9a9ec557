use std::io;
use std::net::Ipv4Addr;
use std::os::fd::AsRawFd;

use tokio::io::unix::{AsyncFd, AsyncFdReadyGuard};
use tokio::net::UdpSocket;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::frame::{FrameQueue, QUEUE_SLOTS};
use crate::peer::{Peer, Verdict};
use crate::shutdown::Shutdown;

/// Frame-at-a-time I/O on the interface descriptor.
///
/// One call moves one whole frame; the TAP driver rejects partial frames,
/// so the loop never splits a frame across calls. The seam also lets tests
/// run the loop over any datagram-style descriptor.
pub trait FrameIo {
    fn recv_frame(&self, buf: &mut [u8]) -> io::Result<usize>;
    fn send_frame(&self, frame: &[u8]) -> io::Result<usize>;
}

impl FrameIo for tun::Device {
    fn recv_frame(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.recv(buf)
    }

    fn send_frame(&self, frame: &[u8]) -> io::Result<usize> {
        self.send(frame)
    }
}

/// Binds the tunnel's UDP socket.
pub async fn bind_udp(addr: Ipv4Addr, port: u16) -> Result<UdpSocket> {
    UdpSocket::bind((addr, port)).await.map_err(Error::Socket)
}

/// The tunnel data plane: the tap-side descriptor, the UDP socket, and one
/// bounded queue per direction.
///
/// Everything here is owned by the single loop task; there is no shared
/// state and no locking. Frames flow tap → `peer_bound` → socket and
/// socket → `tap_bound` → tap, FIFO within each direction, with drop-oldest
/// eviction when a consumer falls behind.
pub struct Tunnel<T: FrameIo + AsRawFd> {
    tap: AsyncFd<T>,
    socket: UdpSocket,
    peer: Peer,
    /// Frames received from the peer, waiting to be written to the tap.
    tap_bound: FrameQueue,
    /// Frames read from the tap, waiting to be sent to the peer.
    peer_bound: FrameQueue,
    mtu: usize,
}

impl<T: FrameIo + AsRawFd> Tunnel<T> {
    pub fn new(tap: AsyncFd<T>, socket: UdpSocket, peer: Peer, mtu: u16) -> Self {
        let mtu = usize::from(mtu);
        Self {
            tap,
            socket,
            peer,
            tap_bound: FrameQueue::new(QUEUE_SLOTS, mtu),
            peer_bound: FrameQueue::new(QUEUE_SLOTS, mtu),
            mtu,
        }
    }

    /// Relays frames until a termination signal arrives or a fatal I/O
    /// error occurs.
    ///
    /// Each pass arms writability only for a descriptor with something
    /// queued (and for the socket, only once the peer is known), then
    /// waits for one event and services it. The shutdown branch outranks
    /// all I/O; frames still queued when it fires are discarded, not
    /// flushed.
    pub async fn run(&mut self, shutdown: &mut Shutdown) -> Result {
        let mut buf = vec![0u8; self.mtu];

        loop {
            let tap_write = !self.tap_bound.is_empty();
            let peer_write = !self.peer_bound.is_empty() && self.peer.known();

            tokio::select! {
                biased;

                sig = shutdown.recv() => {
                    info!("received {sig}, shutting down");
                    return Ok(());
                }

                guard = self.tap.writable(), if tap_write => {
                    write_tap(guard.map_err(Error::Wait)?, &mut self.tap_bound)?;
                }

                ready = self.socket.writable(), if peer_write => {
                    ready.map_err(Error::Wait)?;
                    send_to_peer(&self.socket, &mut self.peer_bound, &self.peer)?;
                }

                guard = self.tap.readable() => {
                    read_tap(guard.map_err(Error::Wait)?, &mut self.peer_bound, &mut buf)?;
                }

                ready = self.socket.readable() => {
                    ready.map_err(Error::Wait)?;
                    recv_from_peer(&self.socket, &mut self.tap_bound, &mut self.peer, &mut buf)?;
                }
            }
        }
    }
}

// The helpers below are free functions over borrowed fields so the loop
// body can hand each one a readiness guard plus the one queue it touches.

/// Writes the oldest tap-bound frame, if the descriptor will take it.
fn write_tap<T: FrameIo + AsRawFd>(
    mut guard: AsyncFdReadyGuard<'_, T>,
    queue: &mut FrameQueue,
) -> Result {
    let Some(frame) = queue.peek_oldest() else {
        return Ok(());
    };
    let len = frame.len();

    match guard.try_io(|fd| fd.get_ref().send_frame(frame.bytes())) {
        Err(_would_block) => {} // stale readiness, retried next pass
        Ok(Ok(n)) => {
            trace!("wrote {n} bytes to tap");
            queue.pop_oldest();
        }
        Ok(Err(err)) if err.kind() == io::ErrorKind::InvalidInput => {
            // The driver refused the frame as malformed. It will never be
            // accepted, so it is dropped rather than retried.
            warn!("tap rejected garbage frame ({len} bytes), dropping it");
            queue.pop_oldest();
        }
        Ok(Err(err)) if err.kind() == io::ErrorKind::Interrupted => {}
        Ok(Err(err)) => return Err(Error::DataPlane(err)),
    }
    Ok(())
}

/// Sends the oldest peer-bound frame to the known peer address.
fn send_to_peer(socket: &UdpSocket, queue: &mut FrameQueue, peer: &Peer) -> Result {
    let Some(addr) = peer.addr() else {
        return Ok(());
    };
    let Some(frame) = queue.peek_oldest() else {
        return Ok(());
    };
    let len = frame.len();

    match socket.try_send_to(frame.bytes(), addr) {
        Ok(n) => {
            if n < len {
                // UDP has no partial-send continuation; the tail is gone
                // either way.
                warn!("short send to {addr}: {n} of {len} bytes");
            } else {
                trace!("sent {n} bytes to {addr}");
            }
            queue.pop_oldest();
        }
        Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
        Err(err) => return Err(Error::DataPlane(err)),
    }
    Ok(())
}

/// Reads one frame from the tap and queues it for the peer.
fn read_tap<T: FrameIo + AsRawFd>(
    mut guard: AsyncFdReadyGuard<'_, T>,
    queue: &mut FrameQueue,
    buf: &mut [u8],
) -> Result {
    match guard.try_io(|fd| fd.get_ref().recv_frame(buf)) {
        Err(_would_block) => {}
        Ok(Ok(0)) => {} // nothing to carry
        Ok(Ok(n)) => {
            trace!("read {n} bytes from tap");
            queue.enqueue(&buf[..n]);
        }
        Ok(Err(err)) if err.kind() == io::ErrorKind::Interrupted => {}
        Ok(Err(err)) => return Err(Error::DataPlane(err)),
    }
    Ok(())
}

/// Receives one datagram, updates the peer, and queues the frame for the
/// tap.
fn recv_from_peer(
    socket: &UdpSocket,
    queue: &mut FrameQueue,
    peer: &mut Peer,
    buf: &mut [u8],
) -> Result {
    match socket.try_recv_from(buf) {
        Ok((n, src)) => {
            match peer.observe(src) {
                Verdict::Accepted => {}
                Verdict::Learned => info!("peer is {src}"),
                Verdict::Migrated(old) => info!("peer moved from {old} to {src}"),
                Verdict::Rejected => {
                    debug!("dropping datagram from {src}: not the configured peer");
                    return Ok(());
                }
            }
            // An empty datagram still learns the peer but carries no frame.
            if n > 0 {
                trace!("received {n} bytes from {src}");
                queue.enqueue(&buf[..n]);
            }
        }
        Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
        Err(err) => return Err(Error::DataPlane(err)),
    }
    Ok(())
}
