//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Non-blocking TCP plumbing for the multiplexer.
//!
//! Everything in here is a thin veneer over `std::net` sockets placed in
//! non-blocking mode. `WouldBlock` is a normal empty poll, never an error;
//! hard errors on an established connection surface as
//! [`ReadOutcome::Closed`] so the owning line resets itself.

use std::io::{ErrorKind, Read, Write};
use std::net::{IpAddr, Ipv4Addr, TcpListener, TcpStream};
use tracing::warn;

/// Result of one non-blocking read poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadOutcome {
    /// `count` bytes were received.
    Bytes(usize),
    /// Nothing pending.
    Empty,
    /// The peer closed the connection or the socket failed.
    Closed,
}

/// Listening socket in non-blocking mode.
#[derive(Debug)]
pub(crate) struct MasterSocket {
    listener: TcpListener,
}

impl MasterSocket {
    /// Binds the listener. Port 0 requests an ephemeral port; the bound
    /// port is returned either way.
    pub(crate) fn open(port: u16) -> std::io::Result<(Self, u16)> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))?;
        listener.set_nonblocking(true)?;
        let bound = listener.local_addr()?.port();
        Ok((Self { listener }, bound))
    }

    /// Polls for one pending connection.
    pub(crate) fn accept(&self) -> Option<(LineSocket, Ipv4Addr)> {
        match self.listener.accept() {
            Ok((stream, peer)) => match LineSocket::new(stream) {
                Ok(socket) => {
                    let addr = match peer.ip() {
                        IpAddr::V4(v4) => v4,
                        IpAddr::V6(_) => Ipv4Addr::UNSPECIFIED,
                    };
                    Some((socket, addr))
                }
                Err(err) => {
                    warn!("could not configure accepted socket: {err}");
                    None
                }
            },
            Err(err) if err.kind() == ErrorKind::WouldBlock => None,
            Err(err) => {
                warn!("accept failed: {err}");
                None
            }
        }
    }
}

/// Established per-line connection in non-blocking mode.
#[derive(Debug)]
pub(crate) struct LineSocket {
    stream: TcpStream,
}

impl LineSocket {
    fn new(stream: TcpStream) -> std::io::Result<Self> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }

    /// Non-blocking read into `buf`.
    pub(crate) fn read(&mut self, buf: &mut [u8]) -> ReadOutcome {
        if buf.is_empty() {
            return ReadOutcome::Empty;
        }
        match self.stream.read(buf) {
            Ok(0) => ReadOutcome::Closed,
            Ok(count) => ReadOutcome::Bytes(count),
            Err(err) if err.kind() == ErrorKind::WouldBlock => ReadOutcome::Empty,
            Err(err) if err.kind() == ErrorKind::Interrupted => ReadOutcome::Empty,
            Err(_) => ReadOutcome::Closed,
        }
    }

    /// Non-blocking write. Returns the number of bytes accepted by the
    /// kernel, zero when the socket cannot take data right now. Hard write
    /// errors also report zero; the matching read poll notices the dead
    /// connection and resets the line.
    pub(crate) fn write(&mut self, buf: &[u8]) -> usize {
        match self.stream.write(buf) {
            Ok(count) => count,
            Err(err) if err.kind() == ErrorKind::Interrupted => 0,
            Err(err) if err.kind() == ErrorKind::WouldBlock => 0,
            Err(_) => 0,
        }
    }

    /// Best-effort burst write for connection preambles, where the socket
    /// send buffer is known to be empty. Whatever the kernel refuses is
    /// dropped.
    pub(crate) fn write_all_now(&mut self, mut buf: &[u8]) {
        while !buf.is_empty() {
            let sent = self.write(buf);
            if sent == 0 {
                warn!("dropped {} preamble bytes on congested socket", buf.len());
                break;
            }
            buf = &buf[sent..];
        }
    }
}
