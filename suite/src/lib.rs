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

//! Shared harness for the end-to-end multiplexer scenarios.
//!
//! The multiplexer is polled, so every wire interaction in a test is a
//! little duet: the client side blocks briefly while the server side is
//! polled in between. These helpers keep the individual scenarios free of
//! deadline boilerplate.

use std::io::{ErrorKind, Read};
use std::net::TcpStream;
use std::time::{Duration, Instant};
use telemux_mux::{LineInput, Multiplexer};

/// Per-step deadline for polled waits.
pub const DEADLINE: Duration = Duration::from_secs(2);

/// Installs a per-process trace subscriber writing to the test harness,
/// so `RUST_LOG`-less scenario runs still surface wire traces on failure.
pub fn init_tracing() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Connects a client to the multiplexer's port and polls the multiplexer
/// until it assigns the connection a line. Returns the client socket and
/// the line index.
pub fn connect_client(mux: &mut Multiplexer) -> (TcpStream, usize) {
    let port = mux.port().expect("listener not open");
    let client = TcpStream::connect(("127.0.0.1", port)).expect("client connect");
    client
        .set_read_timeout(Some(Duration::from_millis(20)))
        .expect("set_read_timeout");
    let line = wait_for(
        || mux.poll_conn(),
        "multiplexer never accepted the connection",
    );
    (client, line)
}

/// Polls `step` until it yields a value or the deadline passes.
pub fn wait_for<T>(mut step: impl FnMut() -> Option<T>, what: &str) -> T {
    let deadline = Instant::now() + DEADLINE;
    loop {
        if let Some(value) = step() {
            return value;
        }
        assert!(Instant::now() < deadline, "{what}");
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Reads exactly `count` bytes from the client while keeping the
/// multiplexer's transmit side serviced.
pub fn read_exact_polled(client: &mut TcpStream, count: usize, mux: &mut Multiplexer) -> Vec<u8> {
    let mut out = vec![0u8; count];
    let mut filled = 0;
    let deadline = Instant::now() + DEADLINE;
    while filled < count {
        mux.poll_tx();
        match client.read(&mut out[filled..]) {
            Ok(0) => panic!("peer closed after {filled} of {count} bytes"),
            Ok(read) => filled += read,
            Err(err) if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut => {
            }
            Err(err) => panic!("client read failed: {err}"),
        }
        assert!(Instant::now() < deadline, "read of {count} bytes timed out");
    }
    out
}

/// Reads until the client sees end-of-stream, servicing the multiplexer.
pub fn read_to_close(client: &mut TcpStream, mux: &mut Multiplexer) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 256];
    let deadline = Instant::now() + DEADLINE;
    loop {
        mux.poll_tx();
        match client.read(&mut buf) {
            Ok(0) => return out,
            Ok(read) => out.extend_from_slice(&buf[..read]),
            Err(err) if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut => {
            }
            Err(_) => return out,
        }
        assert!(Instant::now() < deadline, "peer never closed");
    }
}

/// Consumes the option prelude and the connection banner so a scenario
/// starts from a clean wire.
pub fn drain_preamble(client: &mut TcpStream, mux: &mut Multiplexer) {
    let prelude = read_exact_polled(client, 15, mux);
    assert_eq!(prelude[0], 0xFF, "prelude must lead with IAC");
    let mut tail = Vec::new();
    let deadline = Instant::now() + DEADLINE;
    while !tail.ends_with(b"\r\n\n") {
        let mut byte = [0u8; 1];
        mux.poll_tx();
        match client.read(&mut byte) {
            Ok(0) => panic!("peer closed during banner"),
            Ok(_) => tail.push(byte[0]),
            Err(err) if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut => {
            }
            Err(err) => panic!("client read failed: {err}"),
        }
        assert!(Instant::now() < deadline, "banner never completed");
    }
}

/// Collects `count` filtered input values from a line, polling receive in
/// between.
pub fn collect_input(mux: &mut Multiplexer, line: usize, count: usize) -> Vec<LineInput> {
    let mut out = Vec::with_capacity(count);
    let deadline = Instant::now() + DEADLINE;
    while out.len() < count {
        mux.poll_rx();
        while let Some(input) = mux.get_char(line) {
            out.push(input);
        }
        assert!(Instant::now() < deadline, "input never arrived");
        std::thread::sleep(Duration::from_millis(1));
    }
    out
}
