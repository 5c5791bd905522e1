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

//! # Telemux Multiplexer Core
//!
//! A Telnet terminal multiplexer for hardware simulators. One listening
//! TCP port feeds a pool of virtual serial lines; the hosting simulator
//! reads and writes the lines as if they were UARTs while this crate
//! handles Telnet option negotiation, escape removal, carriage return
//! canonicalization, per-line ring buffers, buffered (survive-disconnect)
//! output retention and per-line transcript logging.
//!
//! # Scheduling model
//!
//! Everything is cooperative and polled. The simulator's service loop
//! calls [`Multiplexer::poll_conn`], [`Multiplexer::poll_rx`] and
//! [`Multiplexer::poll_tx`]; between ticks its device models call
//! [`Multiplexer::get_char`] and [`Multiplexer::put_char`]. All socket
//! operations are non-blocking, and no thread is ever spawned. Lines are
//! expected to be driven from one scheduling context; callers wanting
//! parallelism across lines must serialize access to each line
//! themselves.
//!
//! # Quick start
//!
//! ```no_run
//! use telemux_mux::{Multiplexer, MuxConfig, SendOutcome};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut mux = Multiplexer::new(
//!     MuxConfig::new(4)
//!         .with_simulator_name("PDP-11")
//!         .with_device_name("DZ"),
//! );
//! mux.open_master("2323")?;
//!
//! loop {
//!     if let Some(line) = mux.poll_conn() {
//!         mux.line_mut(line).set_rx_enabled(true);
//!     }
//!     mux.poll_rx();
//!     while let Some(input) = mux.get_char(0) {
//!         // hand input.byte (and input.is_break) to the device model
//!         let _ = mux.put_char(0, input.byte); // echo
//!     }
//!     mux.poll_tx();
//!     # break;
//! }
//! # Ok(())
//! # }
//! ```

mod line;
mod logfile;
mod mux;
mod result;
mod ring;
mod socket;

pub use self::line::{LineInput, LineStats, LineStatus, SendOutcome, TelnetLine};
pub use self::logfile::LogHandle;
pub use self::mux::{Multiplexer, MuxConfig};
pub use self::result::{MuxError, MuxResult};
pub use self::ring::{PutOutcome, RingBuffer};
