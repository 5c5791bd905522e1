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

//! The multiplexer: one listening socket feeding N virtual lines.

use crate::line::{LineInput, SendOutcome, TelnetLine};
use crate::logfile::LogHandle;
use crate::result::{MuxError, MuxResult};
use crate::socket::MasterSocket;
use telemux_codec::consts;
use tracing::{debug, info};

/// Default transmit retention when buffered mode is enabled without an
/// explicit size.
const DEFAULT_BUFFERED_SIZE: usize = 32768;
/// Largest accepted buffered retention.
const MAX_BUFFERED_SIZE: usize = 1_048_576;

/// Construction parameters for a [`Multiplexer`].
#[derive(Debug, Clone)]
pub struct MuxConfig {
    lines: usize,
    simulator_name: String,
    device_name: Option<String>,
    vax_prelude: bool,
    connect_order: bool,
}

impl MuxConfig {
    /// Starts a configuration for a multiplexer with `lines` virtual lines.
    /// At least one line is always allocated.
    pub fn new(lines: usize) -> Self {
        Self {
            lines: lines.max(1),
            simulator_name: "SIM".to_string(),
            device_name: None,
            vax_prelude: false,
            connect_order: false,
        }
    }

    /// Simulator name used in connection banners.
    pub fn with_simulator_name(mut self, name: impl Into<String>) -> Self {
        self.simulator_name = name.into();
        self
    }

    /// Device name used in connection banners and trace output.
    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    /// Selects the VAX-family option prelude instead of the default one.
    pub fn with_vax_prelude(mut self, vax: bool) -> Self {
        self.vax_prelude = vax;
        self
    }

    /// Enables the line connection order feature.
    pub fn with_connect_order(mut self, supported: bool) -> Self {
        self.connect_order = supported;
        self
    }
}

/// Telnet terminal multiplexer.
///
/// Owns the line array and the listening socket. The hosting simulator
/// drives it from its service loop:
///
/// - [`poll_conn`](Multiplexer::poll_conn) accepts at most one pending
///   client and assigns it a free line;
/// - [`poll_rx`](Multiplexer::poll_rx) moves socket input into the line
///   rings, filtered;
/// - [`poll_tx`](Multiplexer::poll_tx) drains the line rings to the
///   sockets.
///
/// Between polls the simulator's device models exchange bytes with
/// individual lines via [`get_char`](Multiplexer::get_char) and
/// [`put_char`](Multiplexer::put_char).
pub struct Multiplexer {
    lines: Vec<TelnetLine>,
    master: Option<MasterSocket>,
    port: u16,
    buffered_size: usize,
    order: Option<Vec<i32>>,
    log_template: Option<String>,
    shared_log: Option<LogHandle>,
    shared_debug: Option<LogHandle>,
    simulator_name: String,
    device_name: Option<String>,
    prelude: &'static [u8],
}

impl Multiplexer {
    /// Builds an idle multiplexer: all lines disconnected, no listener.
    pub fn new(config: MuxConfig) -> Self {
        let lines = (0..config.lines)
            .map(|index| {
                let tag = match &config.device_name {
                    Some(device) => format!("{device} line {index}"),
                    None => format!("line {index}"),
                };
                TelnetLine::new(tag)
            })
            .collect();
        Self {
            lines,
            master: None,
            port: 0,
            buffered_size: 0,
            order: config.connect_order.then(|| vec![-1; config.lines]),
            log_template: None,
            shared_log: None,
            shared_debug: None,
            simulator_name: config.simulator_name,
            device_name: config.device_name,
            prelude: if config.vax_prelude {
                consts::OPTION_PRELUDE_VAX
            } else {
                consts::OPTION_PRELUDE
            },
        }
    }

    // ===== Accessors =====

    /// Number of virtual lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Shared view of one line.
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of range.
    pub fn line(&self, index: usize) -> &TelnetLine {
        &self.lines[index]
    }

    /// Exclusive view of one line.
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of range.
    pub fn line_mut(&mut self, index: usize) -> &mut TelnetLine {
        &mut self.lines[index]
    }

    /// Iterates over all lines.
    pub fn lines(&self) -> impl Iterator<Item = &TelnetLine> {
        self.lines.iter()
    }

    /// True while the listening socket is open.
    pub fn is_listening(&self) -> bool {
        self.master.is_some()
    }

    /// Bound listener port.
    pub fn port(&self) -> Option<u16> {
        self.master.as_ref().map(|_| self.port)
    }

    /// Buffered retention size, when buffered mode is enabled.
    pub fn buffered_size(&self) -> Option<usize> {
        (self.buffered_size > 0).then_some(self.buffered_size)
    }

    /// Transcript log template, when per-line logging is enabled.
    pub fn log_template(&self) -> Option<&str> {
        self.log_template.as_deref()
    }

    /// Supplies the simulator-wide log and debug sinks. Announcements are
    /// duplicated into the log sink, and per-line transcript logs may name
    /// `LOG` or `DEBUG` to share these sinks.
    pub fn set_log_sinks(&mut self, log: Option<LogHandle>, debug: Option<LogHandle>) {
        self.shared_log = log;
        self.shared_debug = debug;
    }

    // ===== Polled service =====

    /// Accepts at most one pending connection and assigns it a line.
    ///
    /// The chosen line receives the option prelude and the connection
    /// banner. With all lines busy the client is told so and dropped.
    /// Returns the activated line index.
    pub fn poll_conn(&mut self) -> Option<usize> {
        let master = self.master.as_ref()?;
        let (socket, peer) = master.accept()?;
        let Some(index) = self.pick_line() else {
            let mut socket = socket;
            socket.write_all_now(b"All connections busy\r\n");
            debug!(peer = %peer, "rejected connection, all lines busy");
            return None;
        };
        let banner = self.connection_banner(index);
        let buffered = self.buffered_size > 0;
        let prelude = self.prelude;
        let line = &mut self.lines[index];
        line.attach(socket, peer);
        line.send_preamble(prelude);
        if !buffered {
            line.clear_counters();
        }
        let routed = line.splice_banner(&banner);
        line.flush_tx();
        line.adjust_tx_count(-(routed as i64));
        info!(line = index, peer = %peer, "connection established");
        Some(index)
    }

    /// Polls every connected, receive-enabled line for socket input.
    /// Closed sockets reset their lines.
    pub fn poll_rx(&mut self) {
        for line in &mut self.lines {
            line.service_rx();
        }
    }

    /// Drains queued output on every connected line. Lines whose ring
    /// empties get their transmit gate re-enabled.
    pub fn poll_tx(&mut self) {
        for line in &mut self.lines {
            if line.is_connected() && line.flush_tx() == 0 {
                line.set_tx_enabled(true);
            }
        }
    }

    /// Takes the next filtered input byte from a line.
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of range.
    pub fn get_char(&mut self, index: usize) -> Option<LineInput> {
        self.lines[index].get_char()
    }

    /// Queues one output byte on a line.
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of range.
    pub fn put_char(&mut self, index: usize, byte: u8) -> SendOutcome {
        self.lines[index].put_char(byte)
    }

    // ===== Listener control =====

    /// Opens the listening socket. Port 0 requests an ephemeral port. Every
    /// line is returned to its fresh-listener state, buffered retention
    /// included. Returns the bound port.
    pub fn listen(&mut self, port: u16) -> MuxResult<u16> {
        let (master, bound) = MasterSocket::open(port)
            .map_err(|err| MuxError::OpenFailed(format!("port {port}: {err}")))?;
        self.master = Some(master);
        self.port = bound;
        for line in &mut self.lines {
            line.reset_for_listener();
        }
        self.announce(&format!("Listening on port {bound}"));
        info!(port = bound, "listener open");
        Ok(bound)
    }

    /// Applies one attachment specifier.
    ///
    /// A decimal port number `1..=65535` opens the listener. The keyword
    /// forms mutate state without touching the listening socket:
    ///
    /// - `LOG=<template>` opens a transcript log per line, named
    ///   `<template>_<index>` on a multi-line multiplexer;
    /// - `NOLOG` closes the transcript logs;
    /// - `BUFFERED[=<size>]` enables buffered retention (default 32768,
    ///   range 1..=1048576);
    /// - `NOBUFFERED` / `UNBUFFERED` disables it.
    pub fn open_master(&mut self, spec: &str) -> MuxResult<()> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(MuxError::MissingArgument);
        }
        if spec.as_bytes()[0].is_ascii_digit() {
            let port: u32 = spec
                .parse()
                .map_err(|_| MuxError::BadArgument(spec.to_string()))?;
            if !(1..=65535).contains(&port) {
                return Err(MuxError::BadArgument(spec.to_string()));
            }
            self.listen(port as u16)?;
            return Ok(());
        }
        let (keyword, value) = match spec.split_once('=') {
            Some((keyword, value)) => (keyword.trim().to_ascii_uppercase(), Some(value.trim())),
            None => (spec.to_ascii_uppercase(), None),
        };
        match keyword.as_str() {
            "LOG" => {
                let Some(template) = value.filter(|value| !value.is_empty()) else {
                    return Err(MuxError::MissingArgument);
                };
                self.set_log_template(template)
            }
            "NOLOG" => {
                if value.is_some() {
                    return Err(MuxError::ExtraArguments);
                }
                self.log_template = None;
                for line in &mut self.lines {
                    line.clear_log();
                }
                Ok(())
            }
            "BUFFERED" => {
                let size = match value.filter(|value| !value.is_empty()) {
                    None => DEFAULT_BUFFERED_SIZE,
                    Some(value) => {
                        let parsed: usize = value
                            .parse()
                            .map_err(|_| MuxError::BadArgument(value.to_string()))?;
                        if !(1..=MAX_BUFFERED_SIZE).contains(&parsed) {
                            return Err(MuxError::BadArgument(value.to_string()));
                        }
                        parsed
                    }
                };
                self.buffered_size = size;
                for line in &mut self.lines {
                    line.configure_buffered(size);
                }
                Ok(())
            }
            "NOBUFFERED" | "UNBUFFERED" => {
                if self.buffered_size > 0 {
                    self.buffered_size = 0;
                    for line in &mut self.lines {
                        line.configure_unbuffered();
                    }
                }
                Ok(())
            }
            other => Err(MuxError::NoSuchParameter(other.to_string())),
        }
    }

    fn set_log_template(&mut self, template: &str) -> MuxResult<()> {
        let count = self.lines.len();
        let shared_log = self.shared_log.clone();
        let shared_debug = self.shared_debug.clone();
        for (index, line) in self.lines.iter_mut().enumerate() {
            line.clear_log();
            let name = if count > 1 {
                format!("{template}_{index}")
            } else {
                template.to_string()
            };
            let handle = LogHandle::resolve(&name, shared_log.as_ref(), shared_debug.as_ref())?;
            line.set_log(handle);
        }
        self.log_template = Some(template.to_string());
        Ok(())
    }

    /// Opens the listener per `spec` and returns the attachment description
    /// recorded against the hosting unit, such as
    /// `"2323, buffered=32768, log=console.log"`.
    pub fn attach(&mut self, spec: &str) -> MuxResult<String> {
        self.open_master(spec)?;
        let mut description = self.port.to_string();
        if self.buffered_size > 0 {
            description.push_str(&format!(", buffered={}", self.buffered_size));
        }
        if let Some(template) = &self.log_template {
            description.push_str(&format!(", log={template}"));
        }
        Ok(description)
    }

    /// Bids every connected client farewell, resets all lines and closes
    /// the listening socket. The line array stays intact.
    pub fn close_master(&mut self) {
        let farewell = format!(
            "\r\nDisconnected from the {} simulator\r\n\n",
            self.simulator_name
        );
        for line in &mut self.lines {
            if line.is_connected() {
                line.send_message(&farewell);
                line.reset();
            }
        }
        self.master = None;
        self.port = 0;
        info!("listener closed");
    }

    /// Detaches from the hosting unit; same as
    /// [`close_master`](Multiplexer::close_master).
    pub fn detach(&mut self) {
        self.close_master();
    }

    /// Sends the farewell to one line and resets it.
    pub fn disconnect_line(&mut self, index: usize) -> MuxResult<()> {
        let line = self
            .lines
            .get_mut(index)
            .ok_or(MuxError::LineOutOfRange(index))?;
        line.disconnect();
        Ok(())
    }

    // ===== Connection order =====

    /// Sets the line connection order from a semicolon-separated list of
    /// line numbers and ranges, such as `1;5;2-4;7`. The keyword `ALL` or a
    /// range covering every line selects plain sequential order. Lines not
    /// named are appended in ascending order. On error the previous order
    /// is untouched.
    pub fn set_connect_order(&mut self, spec: &str) -> MuxResult<()> {
        if self.order.is_none() {
            return Err(MuxError::OrderNotSupported);
        }
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(MuxError::MissingArgument);
        }
        let count = self.lines.len();
        let max = count - 1;
        let mut list: Vec<i32> = Vec::with_capacity(count);
        let mut seen = vec![false; count];
        let mut sequential = false;
        for token in spec.split(';') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let (low, high) = if token.eq_ignore_ascii_case("ALL") {
                (0usize, max)
            } else if let Some((low, high)) = token.split_once('-') {
                (
                    low.trim()
                        .parse()
                        .map_err(|_| MuxError::BadArgument(token.to_string()))?,
                    high.trim()
                        .parse()
                        .map_err(|_| MuxError::BadArgument(token.to_string()))?,
                )
            } else {
                let single: usize = token
                    .parse()
                    .map_err(|_| MuxError::BadArgument(token.to_string()))?;
                (single, single)
            };
            if low > high || high > max {
                return Err(MuxError::LineOutOfRange(low.max(high)));
            }
            if low == 0 && high == max {
                sequential = true;
                break;
            }
            for index in low..=high {
                if !seen[index] {
                    seen[index] = true;
                    list.push(index as i32);
                }
            }
        }
        let order = self.order.as_mut().ok_or(MuxError::OrderNotSupported)?;
        if sequential {
            *order = vec![-1; count];
        } else {
            for index in 0..count {
                if !seen[index] {
                    list.push(index as i32);
                }
            }
            *order = list;
        }
        Ok(())
    }

    /// Renders the connection order as a range-compressed list, such as
    /// `Order=1;5;2-4;7;0;6` or `Order=0-7` for sequential order.
    pub fn connect_order_description(&self) -> MuxResult<String> {
        let order = self.order.as_ref().ok_or(MuxError::OrderNotSupported)?;
        let count = self.lines.len();
        if order.first().copied().unwrap_or(-1) < 0 {
            return Ok(format!("Order=0-{}", count - 1));
        }
        let mut out = String::from("Order=");
        let mut first = true;
        let mut low = order[0];
        let mut last = order[0];
        for position in 1..=count {
            let next = if position < count { order[position] } else { -1 };
            if next != last + 1 {
                if first {
                    first = false;
                } else {
                    out.push(';');
                }
                if low == last {
                    out.push_str(&last.to_string());
                } else {
                    out.push_str(&format!("{low}-{last}"));
                }
                low = next;
            }
            last = next;
        }
        Ok(out)
    }

    // ===== Reports =====

    /// One-line connection count summary.
    pub fn summary(&self) -> String {
        let connected = self.lines.iter().filter(|line| line.is_connected()).count();
        if connected == 1 {
            "1 connection".to_string()
        } else {
            format!("{connected} connections")
        }
    }

    /// Per-line connection report: statuses, or traffic statistics when
    /// `show_stats` is set.
    pub fn connection_report(&self, show_stats: bool) -> String {
        let mut out = String::new();
        let mut any = false;
        for (index, line) in self.lines.iter().enumerate() {
            if line.is_connected() {
                any = true;
                if show_stats {
                    out.push_str(&format!("line {index}:\n{}", line.stats()));
                } else {
                    out.push_str(&format!("line {index}: {}\n", line.status()));
                }
            }
        }
        if !any {
            out.push_str(if self.lines.len() == 1 {
                "disconnected\n"
            } else {
                "all disconnected\n"
            });
        }
        out
    }

    // ===== Internals =====

    fn pick_line(&self) -> Option<usize> {
        let count = self.lines.len();
        match &self.order {
            Some(order) if order.first().copied().unwrap_or(-1) >= 0 => {
                let mut tried = vec![false; count];
                for &entry in order {
                    if let Some(index) = usize::try_from(entry).ok().filter(|&i| i < count) {
                        tried[index] = true;
                        if !self.lines[index].is_connected() {
                            return Some(index);
                        }
                    }
                }
                (0..count).find(|&index| !tried[index] && !self.lines[index].is_connected())
            }
            _ => (0..count).find(|&index| !self.lines[index].is_connected()),
        }
    }

    fn connection_banner(&self, index: usize) -> String {
        let mut banner = format!("\n\r\nConnected to the {} simulator ", self.simulator_name);
        if let Some(device) = &self.device_name {
            banner.push_str(device);
            banner.push_str(" device");
            if self.lines.len() > 1 {
                banner.push_str(&format!(", line {index}"));
            }
        }
        banner.push_str("\r\n\n");
        banner
    }

    fn announce(&self, text: &str) {
        println!("{text}");
        let _ = std::io::Write::flush(&mut std::io::stdout());
        if let Some(log) = &self.shared_log {
            log.write_str(text);
            log.write_str("\n");
            log.flush();
        }
    }
}

impl std::fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multiplexer")
            .field("lines", &self.lines.len())
            .field("listening", &self.is_listening())
            .field("port", &self.port)
            .field("buffered_size", &self.buffered_size)
            .finish()
    }
}
