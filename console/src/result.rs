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

//! Error types for the console adapter

use telemux_mux::MuxError;
use thiserror::Error;

/// Result type for console operations
pub type ConsoleResult<T> = std::result::Result<T, ConsoleError>;

/// Console adapter error types
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Failure propagated from the multiplexer layer
    #[error(transparent)]
    Mux(#[from] MuxError),

    /// The local terminal failed
    #[error("terminal I/O failed: {0}")]
    Tty(String),

    /// An argument failed validation
    #[error("invalid argument: {0}")]
    BadArgument(String),

    /// The wait for an initial console connection exhausted its budget
    #[error("console wait timed out")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mux_errors_pass_through() {
        let err = ConsoleError::from(MuxError::MissingArgument);
        assert_eq!(err.to_string(), "missing argument");
    }
}
