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

//! Telnet protocol constants (RFC 854 / RFC 855).
//!
//! All commands are prefixed on the wire by [`IAC`]. Two-byte commands are
//! `IAC <command>`; negotiation commands are `IAC <verb> <option>`.

/// Interpret As Command, the Telnet escape byte.
pub const IAC: u8 = 0xFF;
/// Refuse a remote option (`IAC DONT <option>`).
pub const DONT: u8 = 0xFE;
/// Request a remote option (`IAC DO <option>`).
pub const DO: u8 = 0xFD;
/// Refuse a local option (`IAC WONT <option>`).
pub const WONT: u8 = 0xFC;
/// Offer a local option (`IAC WILL <option>`).
pub const WILL: u8 = 0xFB;
/// Begin subnegotiation.
pub const SB: u8 = 0xFA;
/// Go ahead.
pub const GA: u8 = 0xF9;
/// Erase line.
pub const EL: u8 = 0xF8;
/// Erase character.
pub const EC: u8 = 0xF7;
/// Are you there.
pub const AYT: u8 = 0xF6;
/// Abort output.
pub const AO: u8 = 0xF5;
/// Interrupt process.
pub const IP: u8 = 0xF4;
/// Break. `IAC BRK` conveys an out-of-band BREAK signal.
pub const BRK: u8 = 0xF3;
/// Data mark.
pub const DATAMK: u8 = 0xF2;
/// No operation.
pub const NOP: u8 = 0xF1;
/// End subnegotiation.
pub const SE: u8 = 0xF0;

/// Carriage return.
pub const CR: u8 = 0x0D;
/// Line feed.
pub const LF: u8 = 0x0A;
/// NUL pad byte, required by RFC 854 after a bare CR in ASCII mode.
pub const NUL: u8 = 0x00;

/// Negotiable Telnet options.
pub mod option {
    /// Binary transmission (RFC 856).
    pub const BINARY: u8 = 0;
    /// Echo (RFC 857).
    pub const ECHO: u8 = 1;
    /// Suppress go ahead (RFC 858).
    pub const SUPPRESS_GO_AHEAD: u8 = 3;
    /// Linemode (RFC 1184).
    pub const LINEMODE: u8 = 34;
}

/// Option negotiation prelude sent to every freshly accepted client.
///
/// `WILL LINEMODE, WILL SGA, WILL ECHO, WILL BINARY, DO BINARY`: the server
/// offers to drive the terminal character-at-a-time with local echo and asks
/// both directions to run binary.
pub const OPTION_PRELUDE: &[u8] = &[
    IAC, WILL, option::LINEMODE,
    IAC, WILL, option::SUPPRESS_GO_AHEAD,
    IAC, WILL, option::ECHO,
    IAC, WILL, option::BINARY,
    IAC, DO, option::BINARY,
];

/// Option negotiation prelude variant used by VAX-family hosts.
///
/// Declines linemode outright and additionally requests suppress-go-ahead
/// from the client, which some historical VMS terminal emulators require
/// before they stop line-buffering.
pub const OPTION_PRELUDE_VAX: &[u8] = &[
    IAC, DONT, option::LINEMODE,
    IAC, WILL, option::SUPPRESS_GO_AHEAD,
    IAC, DO, option::SUPPRESS_GO_AHEAD,
    IAC, WILL, option::ECHO,
    IAC, WILL, option::BINARY,
    IAC, DO, option::BINARY,
];
