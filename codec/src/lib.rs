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

//! # Telemux Telnet Protocol Layer
//!
//! This crate provides the pure protocol layer of the telemux terminal
//! multiplexer: the Telnet constants, the inbound stream filter that
//! cleanses a received byte stream of protocol escapes, and the option
//! negotiation preludes sent to freshly accepted clients.
//!
//! ## Overview
//!
//! The Telnet protocol (RFC 854) multiplexes control sequences into the
//! data stream behind the IAC escape byte (`0xFF`). A terminal multiplexer
//! serving a simulated serial line must remove that control traffic before
//! the simulator sees the data, while preserving three pieces of in-band
//! information:
//!
//! - **Literal `0xFF` data bytes**, transmitted as the doubled escape
//!   `IAC IAC`.
//! - **BREAK conditions**, transmitted as `IAC BRK` and surfaced as a NUL
//!   data byte flagged out of band.
//! - **Binary mode**, negotiated with `WILL BINARY` / `WONT BINARY`, which
//!   controls whether `CR LF` and `CR NUL` pad sequences collapse to a
//!   bare `CR`.
//!
//! ## Core Components
//!
//! ### [`TelnetFilter`]
//!
//! A byte-at-a-time state machine producing a [`FilterVerdict`] for every
//! inbound byte. The filter never owns or moves data; the buffer owner
//! applies the verdicts in place. This keeps the state machine trivially
//! testable and lets the transport filter directly inside its receive ring
//! without copying.
//!
//! ### [`consts`]
//!
//! Command bytes, option codes, and the two option preludes
//! ([`consts::OPTION_PRELUDE`] and [`consts::OPTION_PRELUDE_VAX`]).
//!
//! ### [`names`]
//!
//! Rendering of raw wire traffic with protocol byte names for trace
//! output (`_IAC__WILL_<00>` style).
//!
//! ## Design Notes
//!
//! The filter intentionally answers no negotiation. The multiplexer states
//! its terms once in the option prelude and then ignores whatever requests
//! the client makes, tracking only the client's binary-mode answer. This
//! mirrors the behaviour expected by the historical terminal emulators the
//! multiplexer exists to serve, several of which loop or wedge when
//! confronted with a conforming negotiation engine.

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod consts;
mod filter;
pub mod names;

pub use self::filter::{FilterState, FilterVerdict, TelnetFilter};
