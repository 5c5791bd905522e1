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

//! Error types for the multiplexer core

use thiserror::Error;

/// Result type for multiplexer operations
pub type MuxResult<T> = std::result::Result<T, MuxError>;

/// Multiplexer error types
///
/// These cover configuration and resource failures only. Transport-level
/// conditions that are part of normal operation (a transmit ring that is
/// momentarily full, output with nowhere to go) are reported through
/// [`SendOutcome`](crate::SendOutcome), not through errors: socket failures
/// on an established line reset the line locally and are never propagated.
#[derive(Debug, Error)]
pub enum MuxError {
    /// I/O error from the underlying socket layer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required argument was not supplied
    #[error("missing argument")]
    MissingArgument,

    /// More arguments were supplied than the command accepts
    #[error("too many arguments")]
    ExtraArguments,

    /// An argument failed to parse or was out of range
    #[error("invalid argument: {0}")]
    BadArgument(String),

    /// The named parameter does not exist
    #[error("no such parameter: {0}")]
    NoSuchParameter(String),

    /// A listener or logfile could not be opened
    #[error("could not open {0}")]
    OpenFailed(String),

    /// A line index was outside the multiplexer's line array
    #[error("line number out of range: {0}")]
    LineOutOfRange(usize),

    /// Connection ordering was requested on a multiplexer built without it
    #[error("connection order not supported by this multiplexer")]
    OrderNotSupported,
}
