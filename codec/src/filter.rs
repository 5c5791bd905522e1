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

use crate::consts;
use tracing::debug;

/// Parsing state of the inbound Telnet filter.
///
/// The filter is a byte-at-a-time state machine. `Normal` is the initial
/// state; every other state represents a partially consumed escape sequence
/// and is re-entered across socket reads, so a negotiation split over two
/// TCP segments parses the same as one delivered whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterState {
    /// Plain data.
    #[default]
    Normal,
    /// An IAC escape byte has been seen.
    Iac,
    /// `IAC WILL` seen, option byte pending.
    Will,
    /// `IAC WONT` seen, option byte pending.
    Wont,
    /// `IAC DO` seen, option byte pending. The request is dropped unanswered.
    Do,
    /// `IAC DONT` seen, option byte pending. The request is dropped unanswered.
    Dont,
    /// Discard the next byte unconditionally.
    Skip,
    /// A carriage return has been delivered; an LF or NUL pad byte may follow.
    CrPad,
}

/// What the caller should do with the byte just examined.
///
/// The filter itself never moves data. The owner of the receive buffer
/// applies the verdict in place: kept bytes stay where they are, dropped
/// bytes are squeezed out of the stream, and a break verdict rewrites the
/// byte to NUL while flagging its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    /// The byte is user data. Leave it in the stream.
    Keep,
    /// The byte belongs to a protocol sequence. Remove it from the stream.
    Drop,
    /// An `IAC BRK` pair completed. Replace the byte with NUL, flag the
    /// position as a BREAK, and keep it in the stream.
    Break,
}

/// Inbound Telnet stream filter.
///
/// Cleanses a received byte stream of protocol escapes so that only user
/// data remains:
///
/// - `IAC IAC` collapses to one literal `0xFF` data byte.
/// - `IAC BRK` becomes a NUL data byte carrying a break flag.
/// - Negotiation triples (`IAC <WILL|WONT|DO|DONT> <option>`) are consumed.
///   The only option tracked is binary transmission: a client that agrees
///   to send binary (`WILL BINARY`) turns carriage return canonicalization
///   off, and a client that declines (`WONT BINARY`) turns it back on.
/// - All other two-byte commands (`GA`, `EL`, `EC`, `AYT`, `AO`, `IP`,
///   `NOP`, `SB`, `DATAMK`, `SE`) are dropped.
/// - Outside binary mode, `CR LF` and `CR NUL` both collapse to a single
///   `CR`. A CR followed by anything else keeps both bytes; some
///   non-conforming clients send bare CRs despite declining binary mode,
///   and stripping their next byte would eat real data.
///
/// # Example
///
/// ```
/// use telemux_codec::{TelnetFilter, FilterVerdict};
///
/// let mut filter = TelnetFilter::new();
/// assert_eq!(filter.advance(b'A'), FilterVerdict::Keep);
/// assert_eq!(filter.advance(0xFF), FilterVerdict::Drop); // IAC
/// assert_eq!(filter.advance(0xF3), FilterVerdict::Break); // BRK
/// assert_eq!(filter.advance(b'B'), FilterVerdict::Keep);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TelnetFilter {
    state: FilterState,
    binary_mode: bool,
}

impl TelnetFilter {
    /// Creates a filter in the initial state with canonicalization enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the filter to its initial state.
    ///
    /// Used when a line is reset or a new client connects; option state
    /// negotiated by the previous client does not carry over.
    pub fn reset(&mut self) {
        self.state = FilterState::Normal;
        self.binary_mode = false;
    }

    /// True while the filter sits inside a partially received escape
    /// sequence.
    pub fn in_sequence(&self) -> bool {
        !matches!(self.state, FilterState::Normal)
    }

    /// True when the peer has agreed to send binary and carriage return
    /// canonicalization is therefore disabled.
    pub fn binary_mode(&self) -> bool {
        self.binary_mode
    }

    /// Current parsing state.
    pub fn state(&self) -> FilterState {
        self.state
    }

    /// Examines one received byte and returns the verdict for it.
    pub fn advance(&mut self, byte: u8) -> FilterVerdict {
        match self.state {
            FilterState::Normal => match byte {
                consts::IAC => {
                    self.state = FilterState::Iac;
                    FilterVerdict::Drop
                }
                consts::CR if !self.binary_mode => {
                    self.state = FilterState::CrPad;
                    FilterVerdict::Keep
                }
                _ => FilterVerdict::Keep,
            },
            FilterState::Iac => match byte {
                consts::IAC => {
                    // Escaped literal 0xFF.
                    self.state = FilterState::Normal;
                    FilterVerdict::Keep
                }
                consts::BRK => {
                    self.state = FilterState::Normal;
                    FilterVerdict::Break
                }
                consts::WILL => {
                    self.state = FilterState::Will;
                    FilterVerdict::Drop
                }
                consts::WONT => {
                    self.state = FilterState::Wont;
                    FilterVerdict::Drop
                }
                consts::DO => {
                    self.state = FilterState::Do;
                    FilterVerdict::Drop
                }
                consts::DONT => {
                    self.state = FilterState::Dont;
                    FilterVerdict::Drop
                }
                _ => {
                    // GA, EL, EC, AYT, AO, IP, NOP, SB, DATAMK, SE and any
                    // unassigned command byte: consumed and ignored.
                    self.state = FilterState::Normal;
                    FilterVerdict::Drop
                }
            },
            FilterState::Will => {
                if byte == consts::option::BINARY && !self.binary_mode {
                    debug!("peer negotiated binary transmission");
                    self.binary_mode = true;
                }
                self.state = FilterState::Normal;
                FilterVerdict::Drop
            }
            FilterState::Wont => {
                if byte == consts::option::BINARY && self.binary_mode {
                    debug!("peer declined binary transmission");
                    self.binary_mode = false;
                }
                self.state = FilterState::Normal;
                FilterVerdict::Drop
            }
            FilterState::Do | FilterState::Dont | FilterState::Skip => {
                self.state = FilterState::Normal;
                FilterVerdict::Drop
            }
            FilterState::CrPad => {
                self.state = FilterState::Normal;
                if byte == consts::LF || byte == consts::NUL {
                    FilterVerdict::Drop
                } else {
                    FilterVerdict::Keep
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(filter: &mut TelnetFilter, input: &[u8]) -> (Vec<u8>, Vec<bool>) {
        let mut data = Vec::new();
        let mut breaks = Vec::new();
        for &byte in input {
            match filter.advance(byte) {
                FilterVerdict::Keep => {
                    data.push(byte);
                    breaks.push(false);
                }
                FilterVerdict::Drop => {}
                FilterVerdict::Break => {
                    data.push(0);
                    breaks.push(true);
                }
            }
        }
        (data, breaks)
    }

    #[test]
    fn plain_data_passes_through() {
        let mut filter = TelnetFilter::new();
        let (data, breaks) = run(&mut filter, b"hello world");
        assert_eq!(data, b"hello world");
        assert!(breaks.iter().all(|&b| !b));
    }

    #[test]
    fn escaped_iac_yields_single_literal() {
        let mut filter = TelnetFilter::new();
        let (data, _) = run(&mut filter, &[0xFF, 0xFF, b'A']);
        assert_eq!(data, &[0xFF, b'A']);
    }

    #[test]
    fn break_sequence_flags_nul() {
        let mut filter = TelnetFilter::new();
        let (data, breaks) = run(&mut filter, &[b'A', 0xFF, consts::BRK, b'B']);
        assert_eq!(data, &[b'A', 0, b'B']);
        assert_eq!(breaks, &[false, true, false]);
    }

    #[test]
    fn negotiation_triples_are_consumed() {
        let mut filter = TelnetFilter::new();
        let (data, _) = run(
            &mut filter,
            &[
                0xFF,
                consts::DO,
                consts::option::ECHO,
                b'X',
                0xFF,
                consts::DONT,
                consts::option::SUPPRESS_GO_AHEAD,
                b'Y',
            ],
        );
        assert_eq!(data, b"XY");
    }

    #[test]
    fn will_binary_disables_cr_stripping() {
        let mut filter = TelnetFilter::new();
        assert!(!filter.binary_mode());
        let (data, _) = run(&mut filter, &[b'A', consts::CR, consts::LF, b'B']);
        assert_eq!(data, &[b'A', consts::CR, b'B']);

        run(&mut filter, &[0xFF, consts::WILL, consts::option::BINARY]);
        assert!(filter.binary_mode());
        let (data, _) = run(&mut filter, &[b'A', consts::CR, consts::LF, b'B']);
        assert_eq!(data, &[b'A', consts::CR, consts::LF, b'B']);

        run(&mut filter, &[0xFF, consts::WONT, consts::option::BINARY]);
        assert!(!filter.binary_mode());
    }

    #[test]
    fn cr_nul_collapses_to_cr() {
        let mut filter = TelnetFilter::new();
        let (data, _) = run(&mut filter, &[consts::CR, consts::NUL, b'Z']);
        assert_eq!(data, &[consts::CR, b'Z']);
    }

    #[test]
    fn bare_cr_keeps_following_byte() {
        // Non-conforming clients send CR followed by data.
        let mut filter = TelnetFilter::new();
        let (data, _) = run(&mut filter, &[consts::CR, b'Q']);
        assert_eq!(data, &[consts::CR, b'Q']);
    }

    #[test]
    fn two_byte_commands_are_ignored() {
        let mut filter = TelnetFilter::new();
        for cmd in [
            consts::GA,
            consts::EL,
            consts::EC,
            consts::AYT,
            consts::AO,
            consts::IP,
            consts::NOP,
            consts::SB,
            consts::DATAMK,
            consts::SE,
        ] {
            let (data, _) = run(&mut filter, &[b'a', 0xFF, cmd, b'b']);
            assert_eq!(data, b"ab");
            assert!(!filter.in_sequence());
        }
    }

    #[test]
    fn sequences_survive_segment_boundaries() {
        let mut filter = TelnetFilter::new();
        let (data, _) = run(&mut filter, &[b'A', 0xFF]);
        assert_eq!(data, b"A");
        assert!(filter.in_sequence());
        let (data, _) = run(&mut filter, &[consts::WILL]);
        assert_eq!(data, b"");
        assert!(filter.in_sequence());
        let (data, _) = run(&mut filter, &[consts::option::BINARY, b'B']);
        assert_eq!(data, b"B");
        assert!(filter.binary_mode());
    }

    #[test]
    fn reset_clears_state_and_mode() {
        let mut filter = TelnetFilter::new();
        run(&mut filter, &[0xFF, consts::WILL, consts::option::BINARY]);
        run(&mut filter, &[0xFF]);
        assert!(filter.in_sequence());
        assert!(filter.binary_mode());
        filter.reset();
        assert!(!filter.in_sequence());
        assert!(!filter.binary_mode());
    }

    #[test]
    fn conforming_stream_is_recovered_exactly() {
        // A peer that escapes IACs and pads CRs delivers exactly the bytes
        // the user typed.
        let typed: &[u8] = &[b'x', 0xFF, consts::CR, b'y', 0x00, 0x1B];
        let mut wire = Vec::new();
        for &byte in typed {
            if byte == 0xFF {
                wire.extend_from_slice(&[0xFF, 0xFF]);
            } else if byte == consts::CR {
                wire.extend_from_slice(&[consts::CR, consts::NUL]);
            } else {
                wire.push(byte);
            }
        }
        let mut filter = TelnetFilter::new();
        let (data, breaks) = run(&mut filter, &wire);
        assert_eq!(data, typed);
        assert!(breaks.iter().all(|&b| !b));
    }
}
