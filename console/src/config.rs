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

//! Process-wide console settings.

use crate::mode::{DEFAULT_PRINTABLE_MASK, OutputMode};
use crate::result::{ConsoleError, ConsoleResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Default interrupt (WRU) character: ^E.
pub const DEFAULT_INTERRUPT_CHAR: u8 = 0o005;
/// Default delete character: DEL.
pub const DEFAULT_DELETE_CHAR: u8 = 0x7F;

/// Console settings shared by every path into the operator console.
///
/// The three keymap bytes classify raw input: the interrupt character
/// stops the simulator, the break character (when nonzero) raises BREAK,
/// and the delete character is normalised to DEL. The printable mask and
/// output mode govern character conversion for the simulated terminal.
/// The stop flag mirrors the hosting simulator's global stop request and
/// cancels the wait for an initial console connection.
///
/// Settings are read-only during any poll; they change only between
/// operator commands.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    simulator_name: String,
    interrupt_char: u8,
    break_char: u8,
    delete_char: u8,
    printable_mask: u32,
    output_mode: OutputMode,
    ksr: bool,
    stop_flag: Arc<AtomicBool>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            simulator_name: "SIM".to_string(),
            interrupt_char: DEFAULT_INTERRUPT_CHAR,
            break_char: 0,
            delete_char: DEFAULT_DELETE_CHAR,
            printable_mask: DEFAULT_PRINTABLE_MASK,
            output_mode: OutputMode::default(),
            ksr: false,
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl ConsoleConfig {
    /// Starts from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulator name used in banners and farewells.
    pub fn with_simulator_name(mut self, name: impl Into<String>) -> Self {
        self.simulator_name = name.into();
        self
    }

    /// Shares the hosting simulator's stop flag.
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_flag = flag;
        self
    }

    /// Simulator name.
    pub fn simulator_name(&self) -> &str {
        &self.simulator_name
    }

    /// Interrupt (WRU) character.
    pub fn interrupt_char(&self) -> u8 {
        self.interrupt_char
    }

    /// Break character; zero disables break mapping.
    pub fn break_char(&self) -> u8 {
        self.break_char
    }

    /// Delete character.
    pub fn delete_char(&self) -> u8 {
        self.delete_char
    }

    /// Printable-character mask for codepoints 0..=31.
    pub fn printable_mask(&self) -> u32 {
        self.printable_mask
    }

    /// Output conversion mode.
    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    /// KSR teleprinter flag.
    pub fn ksr(&self) -> bool {
        self.ksr
    }

    /// True when the hosting simulator has requested a stop.
    pub fn stop_requested(&self) -> bool {
        self.stop_flag.load(Ordering::Relaxed)
    }

    /// Sets the interrupt character. Zero is rejected.
    pub fn set_interrupt_char(&mut self, byte: u8) -> ConsoleResult<()> {
        if byte == 0 {
            return Err(ConsoleError::BadArgument(
                "interrupt character must be nonzero".to_string(),
            ));
        }
        self.interrupt_char = byte;
        Ok(())
    }

    /// Sets the break character. Zero disables break mapping.
    pub fn set_break_char(&mut self, byte: u8) {
        self.break_char = byte;
    }

    /// Sets the delete character. Zero is rejected.
    pub fn set_delete_char(&mut self, byte: u8) -> ConsoleResult<()> {
        if byte == 0 {
            return Err(ConsoleError::BadArgument(
                "delete character must be nonzero".to_string(),
            ));
        }
        self.delete_char = byte;
        Ok(())
    }

    /// Sets the printable-character mask. The lowest two bits may not both
    /// be zero.
    pub fn set_printable_mask(&mut self, mask: u32) -> ConsoleResult<()> {
        if mask & 0x3 == 0 {
            return Err(ConsoleError::BadArgument(format!(
                "printable mask {mask:#x} clears both NUL bits"
            )));
        }
        self.printable_mask = mask;
        Ok(())
    }

    /// Sets the output conversion mode and KSR flag.
    pub fn set_output_mode(&mut self, mode: OutputMode, ksr: bool) {
        self.output_mode = mode;
        self.ksr = ksr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_convention() {
        let config = ConsoleConfig::default();
        assert_eq!(config.interrupt_char(), 0o005);
        assert_eq!(config.break_char(), 0);
        assert_eq!(config.delete_char(), 0x7F);
        assert_eq!(config.printable_mask(), 0x2780);
        assert!(!config.stop_requested());
    }

    #[test]
    fn keymap_validation() {
        let mut config = ConsoleConfig::default();
        assert!(config.set_interrupt_char(0).is_err());
        config.set_interrupt_char(0o020).unwrap();
        assert_eq!(config.interrupt_char(), 0o020);
        assert!(config.set_delete_char(0).is_err());
        config.set_break_char(0);
    }

    #[test]
    fn printable_mask_validation() {
        let mut config = ConsoleConfig::default();
        assert!(config.set_printable_mask(0x2780 & !0x3).is_err());
        config.set_printable_mask(0x2781).unwrap();
    }

    #[test]
    fn stop_flag_is_shared() {
        let flag = Arc::new(AtomicBool::new(false));
        let config = ConsoleConfig::new().with_stop_flag(flag.clone());
        assert!(!config.stop_requested());
        flag.store(true, Ordering::Relaxed);
        assert!(config.stop_requested());
    }
}
