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

//! Integration tests for the console adapter

use std::io::{ErrorKind, Read};
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use telemux_console::{
    Console, ConsoleConfig, ConsoleError, ConsoleGate, KeyInput, ScriptedConsole, SendOutcome,
};

fn console_with_script(script: &[u8]) -> Console {
    let mut local = ScriptedConsole::new();
    local.type_bytes(script);
    Console::new(
        Box::new(local),
        ConsoleConfig::new().with_simulator_name("TEST"),
    )
}

fn read_some(client: &mut TcpStream, want: usize, console: &Console) -> Vec<u8> {
    let mut out = vec![0u8; want];
    let mut filled = 0;
    let deadline = Instant::now() + Duration::from_secs(2);
    while filled < want {
        console.poll_tx();
        match client.read(&mut out[filled..]) {
            Ok(0) => panic!("peer closed early"),
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut => {
            }
            Err(err) => panic!("read failed: {err}"),
        }
        assert!(Instant::now() < deadline, "read timed out");
    }
    out
}

#[test]
fn local_console_round_trip() {
    let console = console_with_script(b"hi");
    assert_eq!(console.poll_kbd(), KeyInput::Char(b'h'));
    assert_eq!(console.poll_kbd(), KeyInput::Char(b'i'));
    assert_eq!(console.poll_kbd(), KeyInput::None);
    assert_eq!(console.put_char(b'X'), SendOutcome::Sent);
}

#[test]
fn keymap_classifies_local_input() {
    let console = console_with_script(&[0o005, 0o002, 0x08, b'a']);
    console.configure(|config| config.set_break_char(0o002));
    console.configure(|config| config.set_delete_char(0x08)).unwrap();
    assert_eq!(console.poll_kbd(), KeyInput::Stop);
    assert_eq!(console.poll_kbd(), KeyInput::Break);
    assert_eq!(console.poll_kbd(), KeyInput::Char(0x7F), "delete normalises to DEL");
    assert_eq!(console.poll_kbd(), KeyInput::Char(b'a'));
}

#[test]
fn unbuffered_telnet_console_without_client_is_lost() {
    let console = console_with_script(b"");
    console.listen(0).unwrap();
    assert_eq!(console.poll_kbd(), KeyInput::Lost);
    assert_eq!(console.put_char(b'x'), SendOutcome::Lost);
}

#[test]
fn buffered_console_retains_and_replays() {
    let console = console_with_script(b"");
    console.set_telnet("BUFFERED=64").unwrap();
    let port = console.listen(0).unwrap();

    // The simulator keeps running and writing with nobody connected.
    for &byte in b"abcdef" {
        assert_eq!(console.put_char(byte), SendOutcome::Sent);
    }

    let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    client
        .set_read_timeout(Some(Duration::from_millis(50)))
        .unwrap();

    // The next keyboard poll adopts the pending client.
    let deadline = Instant::now() + Duration::from_secs(2);
    while !console.client_connected() {
        let _ = console.poll_kbd();
        assert!(Instant::now() < deadline, "adoption timed out");
        std::thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(console.put_char(b'!'), SendOutcome::Sent);

    // Option prelude first.
    let prelude = read_some(&mut client, 15, &console);
    assert_eq!(prelude[0], 0xFF);
    // Banner next, then the retained output and the fresh byte.
    let mut seen = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(2);
    while !seen.ends_with(b"abcdef!") {
        console.poll_tx();
        let mut buf = [0u8; 64];
        match client.read(&mut buf) {
            Ok(0) => panic!("peer closed early"),
            Ok(n) => seen.extend_from_slice(&buf[..n]),
            Err(err) if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut => {
            }
            Err(err) => panic!("read failed: {err}"),
        }
        assert!(Instant::now() < deadline, "replay timed out");
    }
    let text = String::from_utf8_lossy(&seen);
    assert!(
        text.contains("Connected to the TEST simulator"),
        "banner missing from {text:?}"
    );
}

#[test]
fn check_console_is_immediate_without_telnet() {
    let console = console_with_script(b"");
    assert!(matches!(console.check_console(0), Ok(ConsoleGate::Ready)));
}

#[test]
fn check_console_times_out_with_no_budget() {
    let console = console_with_script(b"");
    console.listen(0).unwrap();
    assert!(matches!(console.check_console(0), Err(ConsoleError::Timeout)));
}

#[test]
fn check_console_adopts_waiting_client() {
    let console = console_with_script(b"");
    let port = console.listen(0).unwrap();
    let _client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    // Give the kernel a moment to queue the connection.
    std::thread::sleep(Duration::from_millis(20));
    assert!(matches!(console.check_console(5), Ok(ConsoleGate::Ready)));
}

#[test]
fn check_console_honours_stop_flag() {
    let flag = Arc::new(AtomicBool::new(true));
    let console = Console::new(
        Box::new(ScriptedConsole::new()),
        ConsoleConfig::new()
            .with_simulator_name("TEST")
            .with_stop_flag(flag.clone()),
    );
    console.listen(0).unwrap();
    let started = Instant::now();
    assert!(matches!(console.check_console(30), Ok(ConsoleGate::Stopped)));
    assert!(started.elapsed() < Duration::from_secs(5), "stop was not prompt");
    flag.store(false, Ordering::Relaxed);
}

#[test]
fn check_console_local_interrupt_cancels_wait() {
    let console = console_with_script(&[0o005]);
    console.listen(0).unwrap();
    assert!(matches!(console.check_console(30), Ok(ConsoleGate::Stopped)));
}

#[test]
fn buffered_console_proceeds_without_client() {
    let console = console_with_script(b"");
    console.set_telnet("BUFFERED").unwrap();
    console.listen(0).unwrap();
    assert!(matches!(console.check_console(0), Ok(ConsoleGate::Ready)));
    // Buffered and disconnected: polls stay quiet rather than reporting loss.
    assert_eq!(console.poll_kbd(), KeyInput::None);
}

#[test]
fn simulator_log_captures_console_output() {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("telemux-console-log-{}.txt", std::process::id()));
    let path_str = path.to_str().unwrap().to_string();
    let _ = std::fs::remove_file(&path);

    let console = console_with_script(b"");
    console.set_log(&path_str).unwrap();
    console.put_char(b'A');
    console.put_str("BC");
    console.set_nolog();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("Logging to file"));
    assert!(contents.contains("ABC"));
    assert!(contents.trim_end().ends_with("Log file closed"));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn debug_sink_can_share_the_log() {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("telemux-console-debug-{}.txt", std::process::id()));
    let path_str = path.to_str().unwrap().to_string();
    let _ = std::fs::remove_file(&path);

    let console = console_with_script(b"");
    console.set_log(&path_str).unwrap();
    console.set_debug("LOG").unwrap();
    assert_eq!(console.debug_name().unwrap(), path_str);
    console.set_nodebug();
    console.set_nolog();
    let _ = std::fs::remove_file(&path);
}

#[test]
fn status_reports() {
    let console = console_with_script(b"");
    assert_eq!(console.status_report(), "Connected to console window\n");
    assert_eq!(console.buffer_report(), "Unbuffered\n");
    assert_eq!(console.telnet_log_report(), "No Logging\n");
    let port = console.listen(0).unwrap();
    assert!(console.status_report().contains(&format!("Listening on port {port}")));
    console.set_telnet("BUFFERED=4096").unwrap();
    assert_eq!(console.buffer_report(), "Buffer Size = 4096\n");
    console.set_notelnet();
    assert_eq!(console.status_report(), "Connected to console window\n");
}
