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

//! Human-readable rendering of raw Telnet traffic for trace output.

use crate::consts;

/// Returns the protocol name of a byte, if it has one.
///
/// Only bytes that carry protocol meaning are named; plain data bytes
/// return `None`. Note that option values share the low byte range with
/// data, so `name_of` is only meaningful for bytes in command position.
pub fn name_of(byte: u8) -> Option<&'static str> {
    match byte {
        consts::IAC => Some("IAC"),
        consts::DONT => Some("DONT"),
        consts::DO => Some("DO"),
        consts::WONT => Some("WONT"),
        consts::WILL => Some("WILL"),
        consts::SB => Some("SB"),
        consts::GA => Some("GA"),
        consts::EL => Some("EL"),
        consts::EC => Some("EC"),
        consts::AYT => Some("AYT"),
        consts::AO => Some("AO"),
        consts::IP => Some("IP"),
        consts::BRK => Some("BRK"),
        consts::DATAMK => Some("DATAMK"),
        consts::NOP => Some("NOP"),
        consts::SE => Some("SE"),
        _ => None,
    }
}

/// Renders a byte slice for trace output, substituting `_NAME_` markers for
/// protocol bytes and `<hex>` escapes for unprintable data.
///
/// Allocates a fresh string per call; trace rendering happens off the data
/// path only when the relevant trace level is enabled.
pub fn describe_bytes(buf: &[u8]) -> String {
    let mut out = String::with_capacity(buf.len() * 2);
    for &byte in buf {
        if let Some(name) = name_of(byte) {
            out.push('_');
            out.push_str(name);
            out.push('_');
        } else if (0x20..0x7F).contains(&byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("<{byte:02X}>"));
        }
    }
    out
}
