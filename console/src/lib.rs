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

//! # Telemux Operator Console
//!
//! The hosting simulator's operator console, built on the multiplexer
//! core. The console speaks either to the controlling terminal through
//! the [`LocalConsole`] capability or to a Telnet client on line 0 of an
//! internal single-line multiplexer, and a buffered console lets the
//! simulator keep executing while no client is attached.
//!
//! The command interpreter adjusts the console through typed entry points
//! ([`Console::set_telnet`], [`Console::set_log`], keymap setters on
//! [`ConsoleConfig`]); parsing the operator's command line itself is the
//! interpreter's business, not this crate's.

mod config;
mod console;
mod local;
pub mod mode;
mod result;

pub use self::config::{ConsoleConfig, DEFAULT_DELETE_CHAR, DEFAULT_INTERRUPT_CHAR};
pub use self::console::{Console, ConsoleGate, KeyInput};
pub use self::local::{LocalConsole, ScriptedConsole, StdioConsole};
pub use self::mode::{DEFAULT_PRINTABLE_MASK, OutputMode, convert_input, convert_output};
pub use self::result::{ConsoleError, ConsoleResult};

// The multiplexer's outcome type is part of this crate's API surface.
pub use telemux_mux::SendOutcome;
