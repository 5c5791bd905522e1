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

//! The operator console adapter.

use crate::config::ConsoleConfig;
use crate::local::LocalConsole;
use crate::result::{ConsoleError, ConsoleResult};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use telemux_mux::{LogHandle, Multiplexer, MuxConfig, SendOutcome};
use tracing::info;

/// Result of one console keyboard poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Nothing pending.
    None,
    /// A data character.
    Char(u8),
    /// A BREAK condition, from the break keymap character or a Telnet
    /// BREAK.
    Break,
    /// The interrupt character: the caller should stop the simulator.
    Stop,
    /// The console Telnet client is gone and output is not buffered.
    Lost,
}

/// Outcome of waiting for an initial console connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleGate {
    /// Execution may proceed.
    Ready,
    /// The operator interrupted the wait.
    Stopped,
}

struct ConsoleInner {
    local: Box<dyn LocalConsole>,
    mux: Multiplexer,
    config: ConsoleConfig,
    log: Option<LogHandle>,
    debug: Option<LogHandle>,
}

/// The simulator's operator console.
///
/// Binds the console either to the controlling terminal (through the
/// [`LocalConsole`] capability) or, once a Telnet listener is opened, to
/// line 0 of an internal single-line multiplexer. With buffered mode
/// enabled the simulator keeps running while no client is connected;
/// output accumulates for replay and a reconnect picks up mid-stream.
///
/// All operations lock a single internal mutex, so the console may be
/// shared between the command interpreter and the simulated CPU's service
/// thread.
pub struct Console {
    inner: Mutex<ConsoleInner>,
}

impl Console {
    /// Creates a console bound to the given local terminal.
    pub fn new(local: Box<dyn LocalConsole>, config: ConsoleConfig) -> Self {
        let mux = Multiplexer::new(
            MuxConfig::new(1).with_simulator_name(config.simulator_name().to_string()),
        );
        Self {
            inner: Mutex::new(ConsoleInner {
                local,
                mux,
                config,
                log: None,
                debug: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConsoleInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== Configuration =====

    /// Runs a closure against the console settings, for keymap and mode
    /// changes from the command interpreter.
    pub fn configure<R>(&self, apply: impl FnOnce(&mut ConsoleConfig) -> R) -> R {
        apply(&mut self.lock().config)
    }

    /// Copy of the current settings.
    pub fn config(&self) -> ConsoleConfig {
        self.lock().config.clone()
    }

    // ===== Telnet listener control =====

    /// Applies a comma-separated console Telnet specification: a port
    /// number opens the listener (closing any previous one first), and the
    /// keyword forms `BUFFERED[=<size>]`, `UNBUFFERED`/`NOBUFFERED`,
    /// `LOG=<path>` and `NOLOG` adjust it.
    pub fn set_telnet(&self, spec: &str) -> ConsoleResult<()> {
        let mut inner = self.lock();
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(ConsoleError::Mux(telemux_mux::MuxError::MissingArgument));
        }
        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if part.as_bytes()[0].is_ascii_digit() && inner.mux.is_listening() {
                inner.mux.close_master();
            }
            inner.mux.open_master(part)?;
        }
        Ok(())
    }

    /// Closes the console Telnet listener. A console that never opened one
    /// is left alone.
    pub fn set_notelnet(&self) {
        let mut inner = self.lock();
        if inner.mux.is_listening() {
            inner.mux.close_master();
        }
    }

    /// True while the console Telnet listener is open.
    pub fn telnet_active(&self) -> bool {
        self.lock().mux.is_listening()
    }

    /// Bound console Telnet port.
    pub fn telnet_port(&self) -> Option<u16> {
        self.lock().mux.port()
    }

    /// True while a Telnet client is attached to the console line.
    pub fn client_connected(&self) -> bool {
        self.lock().mux.line(0).is_connected()
    }

    /// Opens the listener on an explicit port, port 0 meaning ephemeral.
    pub fn listen(&self, port: u16) -> ConsoleResult<u16> {
        Ok(self.lock().mux.listen(port)?)
    }

    // ===== Simulator log and debug sinks =====

    /// Opens the simulator log. Announces the transition on the console
    /// and in the new log.
    pub fn set_log(&self, path: &str) -> ConsoleResult<()> {
        let mut inner = self.lock();
        inner.close_log();
        let handle = LogHandle::resolve(path, None, inner.debug.as_ref())?;
        let text = format!("Logging to file \"{}\"", handle.name());
        inner.log = Some(handle);
        inner.sync_sinks();
        inner.announce(&text);
        Ok(())
    }

    /// Closes the simulator log, announcing first so the closing message
    /// lands in the log.
    pub fn set_nolog(&self) {
        let mut inner = self.lock();
        if inner.log.is_some() {
            inner.announce("Log file closed");
            inner.close_log();
            inner.sync_sinks();
        }
    }

    /// Name of the simulator log.
    pub fn log_name(&self) -> Option<String> {
        self.lock().log.as_ref().map(|log| log.name().to_string())
    }

    /// Opens the debug output sink. `LOG` shares the simulator log.
    pub fn set_debug(&self, path: &str) -> ConsoleResult<()> {
        let mut inner = self.lock();
        let handle = LogHandle::resolve(path, inner.log.as_ref(), None)?;
        let text = format!("Debug output to \"{}\"", handle.name());
        inner.debug = Some(handle);
        inner.sync_sinks();
        inner.announce(&text);
        Ok(())
    }

    /// Closes the debug output sink.
    pub fn set_nodebug(&self) {
        let mut inner = self.lock();
        if inner.debug.take().is_some() {
            inner.sync_sinks();
            inner.announce("Debug output disabled");
        }
    }

    /// Name of the debug output sink.
    pub fn debug_name(&self) -> Option<String> {
        self.lock().debug.as_ref().map(|debug| debug.name().to_string())
    }

    // ===== Data path =====

    /// Polls the console keyboard.
    ///
    /// With no Telnet listener this reads the local terminal. With one
    /// open, local keystrokes are discarded except for the interrupt
    /// character, and input comes from the Telnet client; a disconnected
    /// unbuffered console reports [`KeyInput::Lost`], while a buffered one
    /// quietly waits for a reconnect.
    pub fn poll_kbd(&self) -> KeyInput {
        let mut inner = self.lock();
        let inner = &mut *inner;
        if let Some(byte) = inner.local.poll_key() {
            let key = inner.map_key(byte);
            if key == KeyInput::Stop || !inner.mux.is_listening() {
                return key;
            }
        }
        if !inner.mux.is_listening() {
            return KeyInput::None;
        }
        if !inner.mux.line(0).is_connected() {
            if inner.mux.buffered_size().is_none() {
                return KeyInput::Lost;
            }
            if inner.accept_console_client().is_none() {
                return KeyInput::None;
            }
        }
        inner.mux.poll_rx();
        match inner.mux.get_char(0) {
            Some(input) if input.is_break => KeyInput::Break,
            Some(input) => inner.map_key(input.byte),
            None => KeyInput::None,
        }
    }

    /// Writes one character to the console.
    ///
    /// The character is duplicated into the simulator log unless the
    /// console line carries its own transcript log. A buffered console
    /// with no client quietly retains the output; an unbuffered one
    /// reports [`SendOutcome::Lost`].
    pub fn put_char(&self, byte: u8) -> SendOutcome {
        let mut inner = self.lock();
        inner.put_char_common(byte, false)
    }

    /// As [`put_char`](Console::put_char), but honours the transmit gate:
    /// when the line has paused its producer this returns
    /// [`SendOutcome::Stall`] without queueing.
    ///
    /// The gate only reopens when a transmit poll drains the ring, and
    /// this method never transmits before the gate check, so a stalled
    /// producer must keep calling [`poll_tx`](Console::poll_tx) (directly
    /// or through this method's own trailing poll) between retries.
    pub fn put_char_stalling(&self, byte: u8) -> SendOutcome {
        let mut inner = self.lock();
        inner.put_char_common(byte, true)
    }

    /// Writes a string to the console.
    pub fn put_str(&self, text: &str) {
        let mut inner = self.lock();
        for &byte in text.as_bytes() {
            inner.put_char_common(byte, false);
        }
    }

    /// One transmit poll on the console line.
    pub fn poll_tx(&self) {
        self.lock().mux.poll_tx();
    }

    /// Preflight before simulator execution.
    ///
    /// Immediate when no Telnet listener is open, when a client is
    /// already connected, or when the console is buffered (announcing
    /// `Running with Buffered Console` if the client is gone). Otherwise
    /// polls for a connection once a second up to `seconds`, printing a
    /// waiting notice every ten seconds. The local interrupt character or
    /// the simulator's stop flag cancels the wait.
    pub fn check_console(&self, seconds: u32) -> ConsoleResult<ConsoleGate> {
        let mut inner = self.lock();
        let inner = &mut *inner;
        if !inner.mux.is_listening() {
            return Ok(ConsoleGate::Ready);
        }
        let buffered = inner.mux.buffered_size().is_some();
        if inner.mux.line(0).is_connected() || buffered {
            inner.mux.poll_rx();
            if inner.mux.line(0).is_connected() {
                return Ok(ConsoleGate::Ready);
            }
            if buffered {
                inner.announce("Running with Buffered Console");
                return Ok(ConsoleGate::Ready);
            }
        }
        for elapsed in 0..seconds {
            if inner.accept_console_client().is_some() {
                if elapsed > 0 {
                    inner.announce("Running");
                }
                return Ok(ConsoleGate::Ready);
            }
            if let Some(byte) = inner.local.poll_key() {
                if byte == inner.config.interrupt_char() {
                    return Ok(ConsoleGate::Stopped);
                }
            }
            if inner.config.stop_requested() {
                return Ok(ConsoleGate::Stopped);
            }
            if elapsed % 10 == 0 {
                inner.announce("Waiting for console Telnet connection");
            }
            std::thread::sleep(Duration::from_secs(1));
        }
        Err(ConsoleError::Timeout)
    }

    // ===== Reports =====

    /// Console status for the operator: local window or Telnet listener,
    /// connection state and line statistics.
    pub fn status_report(&self) -> String {
        let inner = self.lock();
        let Some(port) = inner.mux.port() else {
            return "Connected to console window\n".to_string();
        };
        let line = inner.mux.line(0);
        let mut out = if line.is_connected() {
            format!(
                "Listening on port {port}, connected to client\n{}\n",
                line.status()
            )
        } else {
            format!("Listening on port {port}\n")
        };
        out.push_str(&line.stats().to_string());
        out
    }

    /// Buffering status for the operator.
    pub fn buffer_report(&self) -> String {
        match self.lock().mux.buffered_size() {
            Some(size) => format!("Buffer Size = {size}\n"),
            None => "Unbuffered\n".to_string(),
        }
    }

    /// Console transcript log status for the operator.
    pub fn telnet_log_report(&self) -> String {
        let inner = self.lock();
        match inner.mux.line(0).log_name() {
            Some(name) => format!("Log File being written to {name}\n"),
            None => "No Logging\n".to_string(),
        }
    }
}

impl ConsoleInner {
    fn map_key(&self, byte: u8) -> KeyInput {
        if byte == self.config.interrupt_char() {
            KeyInput::Stop
        } else if self.config.break_char() != 0 && byte == self.config.break_char() {
            KeyInput::Break
        } else if byte == self.config.delete_char() {
            KeyInput::Char(0x7F)
        } else {
            KeyInput::Char(byte)
        }
    }

    /// Accepts a pending console client, enabling its receive side.
    fn accept_console_client(&mut self) -> Option<usize> {
        let line = self.mux.poll_conn()?;
        self.mux.line_mut(line).set_rx_enabled(true);
        info!("console client connected");
        Some(line)
    }

    fn put_char_common(&mut self, byte: u8, honour_gate: bool) -> SendOutcome {
        if !self.mux.is_listening() {
            if let Some(log) = &self.log {
                log.write_byte(byte);
            }
            return match self.local.write_char(byte) {
                Ok(()) => SendOutcome::Sent,
                Err(_) => SendOutcome::Lost,
            };
        }
        if let Some(log) = &self.log {
            if self.mux.line(0).log_name().is_none() {
                log.write_byte(byte);
            }
        }
        if !self.mux.line(0).is_connected() {
            if self.mux.buffered_size().is_none() {
                return SendOutcome::Lost;
            }
            self.accept_console_client();
        }
        let outcome = if honour_gate && !self.mux.line(0).tx_enabled() {
            SendOutcome::Stall
        } else {
            self.mux.put_char(0, byte)
        };
        self.mux.poll_tx();
        outcome
    }

    /// Mirrors the console's log and debug sinks into the multiplexer for
    /// announcements and `LOG`/`DEBUG` transcript aliases.
    fn sync_sinks(&mut self) {
        self.mux
            .set_log_sinks(self.log.clone(), self.debug.clone());
    }

    fn close_log(&mut self) {
        if let Some(log) = self.log.take() {
            log.flush();
        }
    }

    fn announce(&mut self, text: &str) {
        print!("{text}\r\n");
        let _ = std::io::Write::flush(&mut std::io::stdout());
        if let Some(log) = &self.log {
            log.write_str(text);
            log.write_str("\n");
            log.flush();
        }
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Console")
            .field("telnet", &inner.mux.is_listening())
            .field("connected", &inner.mux.line(0).is_connected())
            .field("log", &inner.log.as_ref().map(LogHandle::name))
            .finish()
    }
}
