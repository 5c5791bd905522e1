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

//! End-to-end scenarios for a Telnet-served operator console

use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};
use telemux_codec::consts;
use telemux_console::{Console, ConsoleConfig, ConsoleGate, KeyInput, ScriptedConsole};

fn telnet_console() -> (Console, TcpStream) {
    telemux_suite::init_tracing();
    let console = Console::new(
        Box::new(ScriptedConsole::new()),
        ConsoleConfig::new().with_simulator_name("TEST"),
    );
    let port = console.listen(0).expect("listen");
    let client = TcpStream::connect(("127.0.0.1", port)).expect("connect");
    client
        .set_read_timeout(Some(Duration::from_millis(20)))
        .unwrap();
    // Adoption happens in the execution preflight.
    std::thread::sleep(Duration::from_millis(20));
    assert!(matches!(
        console.check_console(5),
        Ok(ConsoleGate::Ready)
    ));
    (console, client)
}

fn drain_preamble(client: &mut TcpStream, console: &Console) {
    let mut seen = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(2);
    while !seen.ends_with(b"\r\n\n") || seen.len() < 18 {
        console.poll_tx();
        let mut byte = [0u8; 1];
        match client.read(&mut byte) {
            Ok(0) => panic!("peer closed during preamble"),
            Ok(_) => seen.push(byte[0]),
            Err(err) if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut => {
            }
            Err(err) => panic!("read failed: {err}"),
        }
        assert!(Instant::now() < deadline, "preamble never completed");
    }
}

fn poll_key_until(console: &Console, what: &str) -> KeyInput {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let key = console.poll_kbd();
        if key != KeyInput::None {
            return key;
        }
        assert!(Instant::now() < deadline, "{what}");
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn remote_interrupt_char_stops_the_simulator() {
    let (console, mut client) = telnet_console();
    drain_preamble(&mut client, &console);
    client.write_all(&[0o005]).unwrap();
    assert_eq!(
        poll_key_until(&console, "interrupt never arrived"),
        KeyInput::Stop
    );
}

#[test]
fn remote_break_sequence_raises_break() {
    let (console, mut client) = telnet_console();
    drain_preamble(&mut client, &console);
    client.write_all(&[consts::IAC, consts::BRK]).unwrap();
    assert_eq!(
        poll_key_until(&console, "break never arrived"),
        KeyInput::Break
    );
}

#[test]
fn remote_typing_reaches_the_simulator() {
    let (console, mut client) = telnet_console();
    drain_preamble(&mut client, &console);
    client.write_all(b"c").unwrap();
    assert_eq!(
        poll_key_until(&console, "keystroke never arrived"),
        KeyInput::Char(b'c')
    );
    // Echo path back to the client.
    console.put_char(b'c');
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut byte = [0u8; 1];
    loop {
        console.poll_tx();
        match client.read(&mut byte) {
            Ok(1) => break,
            Ok(_) => panic!("peer closed"),
            Err(err) if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut => {
            }
            Err(err) => panic!("read failed: {err}"),
        }
        assert!(Instant::now() < deadline, "echo never arrived");
    }
    assert_eq!(byte[0], b'c');
}
