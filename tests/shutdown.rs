//! Shutdown liveness, alone in its own test binary: it raises a real
//! SIGTERM, which every loop in the process would observe.

use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixDatagram;
use std::time::Duration;

use nix::sys::signal::{Signal, raise};
use tokio::io::unix::AsyncFd;
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout};

use framepipe::tunnel::FrameIo;
use framepipe::{Peer, Shutdown, Tunnel};

struct FakeTap(UnixDatagram);

impl FrameIo for FakeTap {
    fn recv_frame(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.recv(buf)
    }

    fn send_frame(&self, frame: &[u8]) -> io::Result<usize> {
        self.0.send(frame)
    }
}

impl AsRawFd for FakeTap {
    fn as_raw_fd(&self) -> RawFd {
        self.0.as_raw_fd()
    }
}

#[tokio::test]
async fn sigterm_ends_the_loop_cleanly() {
    let (near, far) = UnixDatagram::pair().unwrap();
    near.set_nonblocking(true).unwrap();
    let tap = AsyncFd::new(FakeTap(near)).unwrap();

    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let remote = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let peer = Peer::client(remote.local_addr().unwrap());

    let mut tunnel = Tunnel::new(tap, socket, peer, 1500);
    let mut shutdown = Shutdown::new().unwrap();
    let handle = tokio::spawn(async move { tunnel.run(&mut shutdown).await });

    // Shut down with traffic in flight, not from a quiet loop.
    far.send(b"in flight at shutdown").unwrap();
    sleep(Duration::from_millis(100)).await;

    raise(Signal::SIGTERM).unwrap();

    let result = timeout(Duration::from_secs(2), handle)
        .await
        .expect("loop should exit promptly after SIGTERM")
        .expect("loop task should not panic");
    assert!(result.is_ok());
}
