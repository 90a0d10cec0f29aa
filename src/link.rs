use anyhow::{Context, Result};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("send to {peer}: {source}")]
    Io {
        peer: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("short send to {peer}: {sent} of {len} bytes")]
    Short {
        peer: SocketAddr,
        sent: usize,
        len: usize,
    },
}

/// Fire-and-forget datagram sink. The only capability the dispatcher needs.
pub trait Transport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
}

/// UDP socket aimed at one fixed peer.
#[derive(Debug)]
pub struct UdpLink {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpLink {
    /// Bind an ephemeral local port. `timeout` bounds every send call.
    pub fn open(peer: SocketAddrV4, timeout: Duration) -> Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).context("bind udp socket")?;
        socket
            .set_write_timeout(Some(timeout))
            .context("set udp write timeout")?;
        Ok(Self {
            socket,
            peer: SocketAddr::V4(peer),
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl Transport for UdpLink {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let sent = self
            .socket
            .send_to(bytes, self.peer)
            .map_err(|source| TransportError::Io {
                peer: self.peer,
                source,
            })?;
        if sent != bytes.len() {
            return Err(TransportError::Short {
                peer: self.peer,
                sent,
                len: bytes.len(),
            });
        }
        Ok(())
    }
}
