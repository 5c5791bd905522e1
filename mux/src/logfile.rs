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

//! Shared append-only log sinks.
//!
//! A [`LogHandle`] is a cheaply cloneable reference to an append-only sink.
//! Cloning shares the underlying file; the file is closed when the last
//! clone is dropped. The literal names `STDOUT` and `STDERR` bind to the
//! process streams instead of opening a file, and the literal names `LOG`
//! and `DEBUG` resolve against the simulator-wide log and debug sinks
//! supplied by the caller.

use crate::result::{MuxError, MuxResult};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
enum Sink {
    Stdout,
    Stderr,
    File(Arc<Mutex<File>>),
}

/// Cloneable reference to an append-only log sink.
#[derive(Clone)]
pub struct LogHandle {
    name: Arc<str>,
    sink: Sink,
}

impl LogHandle {
    /// Opens a sink by name.
    ///
    /// `STDOUT` and `STDERR` bind to the process streams; any other name is
    /// opened as a file in append mode, created if absent.
    pub fn open(spec: &str) -> MuxResult<Self> {
        let name = spec.trim();
        if name.is_empty() {
            return Err(MuxError::MissingArgument);
        }
        match name.to_ascii_uppercase().as_str() {
            "STDOUT" => Ok(Self {
                name: Arc::from("STDOUT"),
                sink: Sink::Stdout,
            }),
            "STDERR" => Ok(Self {
                name: Arc::from("STDERR"),
                sink: Sink::Stderr,
            }),
            _ => {
                let file = OpenOptions::new()
                    .append(true)
                    .create(true)
                    .open(name)
                    .map_err(|_| MuxError::OpenFailed(format!("\"{name}\"")))?;
                Ok(Self {
                    name: Arc::from(name),
                    sink: Sink::File(Arc::new(Mutex::new(file))),
                })
            }
        }
    }

    /// Opens a sink by name, additionally resolving the simulator-wide
    /// aliases: `LOG` shares `shared_log` and `DEBUG` shares
    /// `shared_debug`. Either alias fails when the corresponding sink is
    /// not open.
    pub fn resolve(
        spec: &str,
        shared_log: Option<&LogHandle>,
        shared_debug: Option<&LogHandle>,
    ) -> MuxResult<Self> {
        match spec.trim().to_ascii_uppercase().as_str() {
            "LOG" => shared_log
                .cloned()
                .ok_or_else(|| MuxError::BadArgument("no simulator log is open".to_string())),
            "DEBUG" => shared_debug
                .cloned()
                .ok_or_else(|| MuxError::BadArgument("no debug output is open".to_string())),
            _ => Self::open(spec),
        }
    }

    /// Display name of the sink: `STDOUT`, `STDERR`, or the file path.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends one byte. Write failures are ignored; transcript logging
    /// must never disturb the data path.
    pub fn write_byte(&self, byte: u8) {
        self.write_bytes(&[byte]);
    }

    /// Appends a byte slice, ignoring failures.
    pub fn write_bytes(&self, bytes: &[u8]) {
        match &self.sink {
            Sink::Stdout => {
                let _ = std::io::stdout().lock().write_all(bytes);
            }
            Sink::Stderr => {
                let _ = std::io::stderr().lock().write_all(bytes);
            }
            Sink::File(file) => {
                if let Ok(mut file) = file.lock() {
                    let _ = file.write_all(bytes);
                }
            }
        }
    }

    /// Appends a string, ignoring failures.
    pub fn write_str(&self, text: &str) {
        self.write_bytes(text.as_bytes());
    }

    /// Flushes buffered output to the sink.
    pub fn flush(&self) {
        match &self.sink {
            Sink::Stdout => {
                let _ = std::io::stdout().lock().flush();
            }
            Sink::Stderr => {
                let _ = std::io::stderr().lock().flush();
            }
            Sink::File(file) => {
                if let Ok(mut file) = file.lock() {
                    let _ = file.flush();
                }
            }
        }
    }
}

impl fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogHandle").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdout_and_stderr_are_sentinels() {
        let out = LogHandle::open("STDOUT").unwrap();
        assert_eq!(out.name(), "STDOUT");
        let err = LogHandle::open("stderr").unwrap();
        assert_eq!(err.name(), "STDERR");
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(matches!(LogHandle::open("  "), Err(MuxError::MissingArgument)));
    }

    #[test]
    fn file_sink_appends_and_is_shared() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("telemux-log-{}.txt", std::process::id()));
        let path_str = path.to_str().unwrap();
        let _ = std::fs::remove_file(&path);

        let first = LogHandle::open(path_str).unwrap();
        let second = first.clone();
        first.write_str("ab");
        second.write_str("cd");
        drop(first);
        second.flush();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "abcd");
        drop(second);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn aliases_resolve_against_shared_sinks() {
        let log = LogHandle::open("STDOUT").unwrap();
        let resolved = LogHandle::resolve("LOG", Some(&log), None).unwrap();
        assert_eq!(resolved.name(), "STDOUT");
        assert!(LogHandle::resolve("DEBUG", Some(&log), None).is_err());
        assert!(LogHandle::resolve("LOG", None, None).is_err());
    }
}
