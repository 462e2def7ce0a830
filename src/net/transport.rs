//! Socket transports: UDP/TCP/Unix datagram and stream, wired to the
//! framers in [`super::framing`]. Datagram transports deliver one OSC
//! packet per read; stream transports funnel reads through a
//! [`super::framing::FrameDecoder`].

use super::framing::{length_prefix_encode, slip_encode, FrameDecoder, Framing};
use crate::error::Error;
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket, UnixStream};

const FRAMING_ERROR_DISCONNECT_THRESHOLD: u32 = 3;

/// One established connection, datagram or stream.
pub enum Transport {
    Udp(UdpSocket),
    Tcp { stream: TcpStream, decoder: FrameDecoder, framing: Framing },
    Unix { stream: UnixStream, decoder: FrameDecoder, framing: Framing },
}

impl Transport {
    pub async fn connect_tcp(addr: std::net::SocketAddr, framing: Framing) -> Result<Self, Error> {
        let stream = TcpStream::connect(addr).await.map_err(|source| Error::Transport { addr, source })?;
        Ok(Transport::Tcp { stream, decoder: FrameDecoder::new(framing), framing })
    }

    pub async fn connect_unix(path: PathBuf, framing: Framing) -> Result<Self, Error> {
        let stream = UnixStream::connect(&path).await?;
        Ok(Transport::Unix { stream, decoder: FrameDecoder::new(framing), framing })
    }

    pub async fn bind_udp(addr: std::net::SocketAddr) -> Result<Self, Error> {
        let socket = UdpSocket::bind(addr).await.map_err(|source| Error::Transport { addr, source })?;
        Ok(Transport::Udp(socket))
    }

    /// Wraps a stream already accepted by a listener (server-side TCP).
    pub fn from_accepted_tcp(stream: TcpStream, framing: Framing) -> Self {
        Transport::Tcp { stream, decoder: FrameDecoder::new(framing), framing }
    }

    /// Sends one OSC packet, applying stream framing if applicable.
    pub async fn send(&mut self, payload: &[u8]) -> Result<(), Error> {
        match self {
            Transport::Udp(socket) => {
                socket.send(payload).await?;
            }
            Transport::Tcp { stream, framing, .. } => {
                let framed = frame(payload, *framing);
                stream.write_all(&framed).await?;
            }
            Transport::Unix { stream, framing, .. } => {
                let framed = frame(payload, *framing);
                stream.write_all(&framed).await?;
            }
        }
        Ok(())
    }

    /// Reads and returns every complete frame available after one
    /// underlying socket read. A stream transport whose framer hits
    /// [`FRAMING_ERROR_DISCONNECT_THRESHOLD`] consecutive errors signals
    /// disconnection by returning `Err`.
    pub async fn recv(&mut self) -> Result<Vec<Vec<u8>>, Error> {
        match self {
            Transport::Udp(socket) => {
                let mut buf = vec![0u8; 65536];
                let n = socket.recv(&mut buf).await?;
                buf.truncate(n);
                Ok(vec![buf])
            }
            Transport::Tcp { stream, decoder, .. } => read_framed(stream, decoder).await,
            Transport::Unix { stream, decoder, .. } => read_framed(stream, decoder).await,
        }
    }
}

fn frame(payload: &[u8], framing: Framing) -> Vec<u8> {
    match framing {
        Framing::Slip => slip_encode(payload),
        Framing::LengthPrefix => length_prefix_encode(payload),
    }
}

async fn read_framed(stream: &mut (impl AsyncReadExt + Unpin), decoder: &mut FrameDecoder) -> Result<Vec<Vec<u8>>, Error> {
    let mut buf = [0u8; 4096];
    let n = stream.read(&mut buf).await?;
    if n == 0 {
        return Err(Error::framing("stream closed by peer"));
    }
    let result = decoder.feed(&buf[..n]);
    if decoder.consecutive_errors() >= FRAMING_ERROR_DISCONNECT_THRESHOLD {
        return Err(Error::framing("too many consecutive framing errors, disconnecting"));
    }
    result
}
