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

//! The local console capability.

use crate::result::{ConsoleError, ConsoleResult};
use std::collections::VecDeque;
use std::io::{IsTerminal, Write};

/// Capability interface to the controlling terminal.
///
/// The console adapter drives whatever the process is attached to through
/// this trait; platform-specific raw-mode plumbing lives in the
/// implementations, never in the adapter. `poll_key` must never block.
pub trait LocalConsole: Send {
    /// One-time initialization, called before first use.
    fn init(&mut self) -> ConsoleResult<()> {
        Ok(())
    }

    /// Switches the terminal into character-at-a-time mode for simulator
    /// execution.
    fn enter_raw(&mut self) -> ConsoleResult<()> {
        Ok(())
    }

    /// Returns the terminal to its command-line mode.
    fn leave_raw(&mut self) -> ConsoleResult<()> {
        Ok(())
    }

    /// True when an interactive terminal is attached.
    fn is_tty(&self) -> bool;

    /// Non-blocking poll for one keystroke.
    fn poll_key(&mut self) -> Option<u8>;

    /// Writes one character to the terminal.
    fn write_char(&mut self, byte: u8) -> ConsoleResult<()>;
}

/// Plain standard-stream console.
///
/// Output goes to stdout. Keyboard polling always reports nothing: cooked
/// stdin cannot be polled without blocking, so interactive keystroke input
/// requires a platform raw-mode implementation of [`LocalConsole`]. This
/// fallback serves detached and scripted hosts.
#[derive(Debug, Default)]
pub struct StdioConsole;

impl StdioConsole {
    /// Creates the standard-stream console.
    pub fn new() -> Self {
        Self
    }
}

impl LocalConsole for StdioConsole {
    fn is_tty(&self) -> bool {
        std::io::stdin().is_terminal()
    }

    fn poll_key(&mut self) -> Option<u8> {
        None
    }

    fn write_char(&mut self, byte: u8) -> ConsoleResult<()> {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(&[byte])
            .and_then(|()| stdout.flush())
            .map_err(|err| ConsoleError::Tty(err.to_string()))
    }
}

/// Deterministic console for tests and headless hosts.
///
/// Keystrokes are served from a queue; output is captured for later
/// inspection.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl ScriptedConsole {
    /// Creates an empty scripted console.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues keystrokes for later polls.
    pub fn type_bytes(&mut self, bytes: &[u8]) {
        self.input.extend(bytes);
    }

    /// Everything written so far.
    pub fn output(&self) -> &[u8] {
        &self.output
    }
}

impl LocalConsole for ScriptedConsole {
    fn is_tty(&self) -> bool {
        false
    }

    fn poll_key(&mut self) -> Option<u8> {
        self.input.pop_front()
    }

    fn write_char(&mut self, byte: u8) -> ConsoleResult<()> {
        self.output.push(byte);
        Ok(())
    }
}
