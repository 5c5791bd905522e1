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

//! One virtual serial line.

use crate::logfile::LogHandle;
use crate::ring::{PutOutcome, RingBuffer};
use crate::socket::{LineSocket, ReadOutcome};
use std::fmt;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};
use telemux_codec::{FilterVerdict, TelnetFilter, consts, names};
use tracing::trace;

/// Receive ring capacity per line.
pub(crate) const RX_CAPACITY: usize = 256;
/// Transmit ring capacity per line outside buffered mode.
pub(crate) const TX_CAPACITY: usize = 256;
/// Reserved slack. The transmit side pauses its producer when free space
/// falls to this level; the receive side leaves this much room for escape
/// sequences when it reads into an empty ring.
pub(crate) const BUFFER_GUARD: usize = 8;

/// One filtered input byte together with its BREAK flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInput {
    /// The data byte. NUL when `is_break` is set.
    pub byte: u8,
    /// True when this position carried an out-of-band BREAK.
    pub is_break: bool,
}

/// Result of writing one byte to a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The byte was queued (or captured by the transcript log).
    Sent,
    /// No client, no buffering, no log: the byte went nowhere.
    Lost,
    /// The transmit ring is full. Retry after the next transmit poll.
    Stall,
}

/// One virtual serial line of a multiplexer.
///
/// The simulator reads and writes the line as if it were a UART:
/// [`get_char`](TelnetLine::get_char) yields already-filtered input bytes
/// and [`put_char`](TelnetLine::put_char) queues output for the next
/// transmit poll. The Telnet client on the other end sees a clean option
/// negotiation and properly escaped data.
pub struct TelnetLine {
    tag: String,
    conn: Option<LineSocket>,
    peer: Option<Ipv4Addr>,
    connected_at: Option<Instant>,
    rx: RingBuffer,
    rx_break: Box<[bool]>,
    tx: RingBuffer,
    rx_enabled: bool,
    tx_enabled: bool,
    buffered: bool,
    filter: TelnetFilter,
    rx_count: u64,
    tx_count: i64,
    tx_drops: u64,
    tx_log: Option<LogHandle>,
}

impl TelnetLine {
    pub(crate) fn new(tag: String) -> Self {
        Self {
            tag,
            conn: None,
            peer: None,
            connected_at: None,
            rx: RingBuffer::new(RX_CAPACITY),
            rx_break: vec![false; RX_CAPACITY].into_boxed_slice(),
            tx: RingBuffer::new(TX_CAPACITY),
            rx_enabled: false,
            tx_enabled: true,
            buffered: false,
            filter: TelnetFilter::new(),
            rx_count: 0,
            tx_count: 0,
            tx_drops: 0,
            tx_log: None,
        }
    }

    // ===== Connection state =====

    /// True while a client is attached.
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Address of the attached client.
    pub fn peer_addr(&self) -> Option<Ipv4Addr> {
        self.peer
    }

    /// Time since the client attached.
    pub fn connected_for(&self) -> Option<Duration> {
        self.connected_at.map(|at| at.elapsed())
    }

    /// Enables or disables the receive side. A disabled line neither reads
    /// its socket nor yields input.
    pub fn set_rx_enabled(&mut self, enabled: bool) {
        self.rx_enabled = enabled;
    }

    /// Receive gate state.
    pub fn rx_enabled(&self) -> bool {
        self.rx_enabled
    }

    /// Transmit gate state. Cleared by the line itself when the transmit
    /// ring runs near full; restored by the transmit poll once the ring
    /// drains.
    pub fn tx_enabled(&self) -> bool {
        self.tx_enabled
    }

    /// True when output is retained across disconnects.
    pub fn is_buffered(&self) -> bool {
        self.buffered
    }

    /// True when the client has negotiated binary transmission.
    pub fn binary_mode(&self) -> bool {
        self.filter.binary_mode()
    }

    // ===== Statistics =====

    /// Total raw bytes received, before filtering.
    pub fn rx_count(&self) -> u64 {
        self.rx_count
    }

    /// Total bytes written to the socket, connection banners excluded.
    /// Transiently negative while a banner still sits in the queue.
    pub fn tx_count(&self) -> i64 {
        self.tx_count
    }

    /// Bytes dropped for lack of a destination or of ring space.
    pub fn tx_drops(&self) -> u64 {
        self.tx_drops
    }

    /// Filtered bytes waiting to be consumed.
    pub fn rx_queued(&self) -> usize {
        self.rx.used()
    }

    /// Bytes waiting for the next transmit poll.
    pub fn tx_queued(&self) -> usize {
        self.tx.used()
    }

    // ===== Data path =====

    /// Takes the next filtered input byte.
    ///
    /// Returns `None` when no client is attached, the receive side is
    /// disabled, or nothing is queued.
    pub fn get_char(&mut self) -> Option<LineInput> {
        let mut input = None;
        if self.conn.is_some() && self.rx_enabled && !self.rx.is_empty() {
            let at = self.rx.take_index();
            let byte = self.rx.byte_at(at);
            let is_break = std::mem::replace(&mut self.rx_break[at], false);
            self.rx.advance_take(1);
            input = Some(LineInput { byte, is_break });
        }
        self.rx.rewind_if_empty();
        input
    }

    /// Queues one byte for transmission.
    ///
    /// The byte is also appended to the transcript log, when one is
    /// attached, regardless of connection state. An IAC data byte is
    /// doubled on the way into the ring so the client reads it as a
    /// literal.
    ///
    /// Outcomes:
    /// - no client, unbuffered, logging: [`SendOutcome::Sent`], the
    ///   transcript captured the byte;
    /// - no client, unbuffered, no log: [`SendOutcome::Lost`];
    /// - buffered ring full: oldest byte evicted, byte stored,
    ///   [`SendOutcome::Sent`];
    /// - unbuffered ring without room for the byte (and its escape):
    ///   [`SendOutcome::Stall`], retry after the next transmit poll.
    pub fn put_char(&mut self, byte: u8) -> SendOutcome {
        if let Some(log) = &self.tx_log {
            log.write_byte(byte);
        }
        if self.conn.is_none() && !self.buffered {
            if self.tx_log.is_some() {
                return SendOutcome::Sent;
            }
            self.tx_drops += 1;
            return SendOutcome::Lost;
        }
        let needed = if byte == consts::IAC { 2 } else { 1 };
        if !self.buffered && self.tx.available() < needed {
            self.tx_drops += 1;
            self.tx_enabled = false;
            return SendOutcome::Stall;
        }
        if byte == consts::IAC {
            self.push_tx(consts::IAC);
        }
        self.push_tx(byte);
        if !self.buffered && self.tx.available() <= BUFFER_GUARD {
            self.tx_enabled = false;
        }
        SendOutcome::Sent
    }

    fn push_tx(&mut self, byte: u8) {
        if self.tx.put(byte) == PutOutcome::Evicted {
            self.tx_drops += 1;
        }
    }

    /// Writes a message byte-wise through [`put_char`](TelnetLine::put_char),
    /// dropping whatever does not fit.
    pub fn send_message(&mut self, message: &str) {
        for &byte in message.as_bytes() {
            let _ = self.put_char(byte);
        }
    }

    /// Sends a farewell to an attached client and resets the line.
    pub fn disconnect(&mut self) {
        if self.is_connected() {
            self.send_message("\r\nOperator disconnected line\r\n\n");
            self.reset();
        }
    }

    /// Returns the line to its idle state: the transcript log is flushed,
    /// queued output is given one last chance on the wire, the socket is
    /// closed. Under buffered mode the transmit ring contents survive for
    /// replay to the next client.
    pub fn reset(&mut self) {
        if let Some(log) = &self.tx_log {
            log.flush();
        }
        self.flush_tx();
        self.conn = None;
        self.peer = None;
        self.connected_at = None;
        self.filter.reset();
        self.rx.clear();
        self.rx_break.fill(false);
        if !self.buffered {
            self.tx.clear();
        }
        self.tx_enabled = true;
    }

    // ===== Transcript logging =====

    /// Attaches a transcript log. Every byte passed to
    /// [`put_char`](TelnetLine::put_char) is appended to it.
    pub fn set_log(&mut self, log: LogHandle) {
        self.tx_log = Some(log);
    }

    /// Detaches the transcript log, flushing it first.
    pub fn clear_log(&mut self) {
        if let Some(log) = self.tx_log.take() {
            log.flush();
        }
    }

    /// Name of the attached transcript log.
    pub fn log_name(&self) -> Option<&str> {
        self.tx_log.as_ref().map(LogHandle::name)
    }

    // ===== Snapshots =====

    /// Connection status snapshot.
    pub fn status(&self) -> LineStatus {
        LineStatus {
            connected: self.is_connected(),
            peer: self.peer,
            connected_for: self.connected_for(),
            log_name: self.log_name().map(str::to_string),
        }
    }

    /// Traffic statistics snapshot.
    pub fn stats(&self) -> LineStats {
        LineStats {
            connected: self.is_connected(),
            rx_enabled: self.rx_enabled,
            tx_enabled: self.tx_enabled,
            rx_queued: self.rx_queued(),
            rx_total: self.rx_count,
            tx_queued: self.tx_queued(),
            tx_total: self.tx_count,
            tx_drops: self.tx_drops,
            buffer_size: self.buffered.then(|| self.tx.capacity()),
        }
    }

    // ===== Crate-internal plumbing =====

    pub(crate) fn attach(&mut self, socket: LineSocket, peer: Ipv4Addr) {
        self.conn = Some(socket);
        self.peer = Some(peer);
        self.connected_at = Some(Instant::now());
        self.filter.reset();
        self.rx.clear();
        self.rx_break.fill(false);
        self.tx_enabled = true;
    }

    pub(crate) fn send_preamble(&mut self, bytes: &[u8]) {
        if let Some(socket) = self.conn.as_mut() {
            socket.write_all_now(bytes);
            trace!(line = %self.tag, "sent {} preamble bytes: {}", bytes.len(), names::describe_bytes(bytes));
        }
    }

    /// Places the connection banner ahead of whatever the ring already
    /// holds, so a reconnecting client reads the banner first and the
    /// replay second. Returns the number of banner bytes routed through the
    /// ring, for the statistics adjustment; bytes that had to bypass a
    /// too-full ring are written straight to the socket and never counted.
    pub(crate) fn splice_banner(&mut self, banner: &str) -> usize {
        let bytes = banner.as_bytes();
        if !self.buffered {
            self.tx.clear();
            for &byte in bytes {
                let _ = self.tx.put(byte);
            }
            bytes.len()
        } else if self.tx.prepend_unread(bytes) {
            bytes.len()
        } else {
            if let Some(socket) = self.conn.as_mut() {
                socket.write_all_now(bytes);
            }
            0
        }
    }

    pub(crate) fn clear_counters(&mut self) {
        self.rx_count = 0;
        self.tx_count = 0;
        self.tx_drops = 0;
    }

    pub(crate) fn adjust_tx_count(&mut self, delta: i64) {
        self.tx_count += delta;
    }

    pub(crate) fn set_tx_enabled(&mut self, enabled: bool) {
        self.tx_enabled = enabled;
    }

    pub(crate) fn configure_buffered(&mut self, capacity: usize) {
        self.tx = RingBuffer::with_eviction(capacity);
        self.buffered = true;
    }

    pub(crate) fn configure_unbuffered(&mut self) {
        self.tx = RingBuffer::new(TX_CAPACITY);
        self.buffered = false;
    }

    /// Fresh-listener state: no client, empty rings, zeroed statistics.
    pub(crate) fn reset_for_listener(&mut self) {
        self.conn = None;
        self.peer = None;
        self.connected_at = None;
        self.filter.reset();
        self.rx.clear();
        self.rx_break.fill(false);
        self.tx.clear();
        self.clear_counters();
        self.tx_enabled = true;
    }

    /// One receive poll: reads the socket when the ring is empty or a
    /// Telnet escape sequence is waiting for its tail, then filters the
    /// fresh bytes in place.
    pub(crate) fn service_rx(&mut self) {
        if !self.rx_enabled || self.conn.is_none() {
            return;
        }
        let read_limit = if self.rx.is_empty() {
            self.rx.rewind_if_empty();
            self.rx.capacity() - BUFFER_GUARD
        } else if self.filter.in_sequence() {
            // Append into the tail. One slot stays free so the queued
            // region cannot wrap, which in-place filtering depends on.
            (self.rx.capacity() - self.rx.put_index()).saturating_sub(1)
        } else {
            return;
        };
        let start = self.rx.put_index();
        let outcome = {
            let Some(socket) = self.conn.as_mut() else {
                return;
            };
            let space = self.rx.contiguous_write();
            let len = space.len().min(read_limit);
            socket.read(&mut space[..len])
        };
        match outcome {
            ReadOutcome::Closed => self.reset(),
            ReadOutcome::Empty => {}
            ReadOutcome::Bytes(count) => {
                self.rx_break[start..start + count].fill(false);
                self.rx_count += count as u64;
                self.rx.advance_put(count);
                if tracing::enabled!(tracing::Level::TRACE) {
                    let fresh: Vec<u8> =
                        (start..start + count).map(|i| self.rx.byte_at(i)).collect();
                    trace!(line = %self.tag, "received {} bytes: {}", count, names::describe_bytes(&fresh));
                }
                self.filter_new_bytes(start);
                self.rx.rewind_if_empty();
            }
        }
    }

    /// Runs the Telnet filter over the freshly appended region, squeezing
    /// protocol bytes out of the ring and flagging BREAK positions.
    fn filter_new_bytes(&mut self, mut at: usize) {
        while at < self.rx.put_index() {
            let byte = self.rx.byte_at(at);
            match self.filter.advance(byte) {
                FilterVerdict::Keep => at += 1,
                FilterVerdict::Drop => self.remove_rx_at(at),
                FilterVerdict::Break => {
                    self.rx.set_byte(at, 0);
                    self.rx_break[at] = true;
                    at += 1;
                }
            }
        }
    }

    fn remove_rx_at(&mut self, at: usize) {
        let end = self.rx.put_index();
        self.rx.remove_unwrapped(at);
        self.rx_break.copy_within(at + 1..end, at);
    }

    /// One transmit poll: drains the ring to the socket with at most two
    /// wrap-aware writes. Returns the number of bytes still queued; a
    /// partial write leaves the residue for the next poll.
    pub(crate) fn flush_tx(&mut self) -> usize {
        let Some(socket) = self.conn.as_mut() else {
            return self.tx.used();
        };
        for _ in 0..2 {
            let chunk = self.tx.contiguous_read();
            if chunk.is_empty() {
                break;
            }
            let want = chunk.len();
            let sent = socket.write(chunk);
            if sent > 0 && tracing::enabled!(tracing::Level::TRACE) {
                trace!(line = %self.tag, "sent {} bytes: {}", sent, names::describe_bytes(&chunk[..sent]));
            }
            self.tx.advance_take(sent);
            self.tx_count += sent as i64;
            if sent < want {
                break;
            }
        }
        self.tx.used()
    }
}

impl fmt::Debug for TelnetLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelnetLine")
            .field("tag", &self.tag)
            .field("connected", &self.is_connected())
            .field("peer", &self.peer)
            .field("buffered", &self.buffered)
            .field("rx_queued", &self.rx_queued())
            .field("tx_queued", &self.tx_queued())
            .finish()
    }
}

/// Connection status of a line.
#[derive(Debug, Clone)]
pub struct LineStatus {
    /// True while a client is attached.
    pub connected: bool,
    /// Client address.
    pub peer: Option<Ipv4Addr>,
    /// Time since the client attached.
    pub connected_for: Option<Duration>,
    /// Name of the transcript log, when one is attached.
    pub log_name: Option<String>,
}

impl fmt::Display for LineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.connected {
            if let Some(peer) = self.peer {
                write!(f, "IP address {peer}")?;
            }
            if let Some(elapsed) = self.connected_for {
                let total = elapsed.as_secs();
                write!(
                    f,
                    ", connected {:02}:{:02}:{:02}",
                    total / 3600,
                    (total / 60) % 60,
                    total % 60
                )?;
            }
        } else {
            write!(f, "line disconnected")?;
        }
        if let Some(log) = &self.log_name {
            write!(f, "\nLogging to {log}")?;
        }
        Ok(())
    }
}

/// Traffic statistics of a line.
#[derive(Debug, Clone)]
pub struct LineStats {
    /// True while a client is attached.
    pub connected: bool,
    /// Receive gate state.
    pub rx_enabled: bool,
    /// Transmit gate state.
    pub tx_enabled: bool,
    /// Filtered bytes waiting to be consumed.
    pub rx_queued: usize,
    /// Total raw bytes received.
    pub rx_total: u64,
    /// Bytes waiting for the next transmit poll.
    pub tx_queued: usize,
    /// Total bytes written to the socket, banners excluded.
    pub tx_total: i64,
    /// Bytes dropped.
    pub tx_drops: u64,
    /// Transmit ring capacity when the line is buffered.
    pub buffer_size: Option<usize>,
}

impl fmt::Display for LineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn gate(enabled: bool) -> &'static str {
            if enabled { "on" } else { "off" }
        }
        if !self.connected {
            writeln!(f, "line disconnected")?;
        }
        if self.rx_total > 0 {
            writeln!(
                f,
                "  input ({}) queued/total = {}/{}",
                gate(self.rx_enabled),
                self.rx_queued,
                self.rx_total
            )?;
        }
        if self.tx_total != 0 || self.tx_queued > 0 {
            writeln!(
                f,
                "  output ({}) queued/total = {}/{}",
                gate(self.tx_enabled),
                self.tx_queued,
                self.tx_total
            )?;
        }
        if let Some(size) = self.buffer_size {
            writeln!(f, "  output buffer size = {size}")?;
        }
        if self.tx_drops > 0 {
            writeln!(f, "  dropped = {}", self.tx_drops)?;
        }
        Ok(())
    }
}
