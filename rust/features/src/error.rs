// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for extraction runs
pub type Result<T> = std::result::Result<T, Error>;

/// Model-level failures; everything below the model degrades into the records
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid model: {0}")]
    Core(column_qa_core::Error),

    #[error("Model declares no recognizable length unit")]
    UnresolvedLengthUnit,
}

impl From<column_qa_core::Error> for Error {
    fn from(error: column_qa_core::Error) -> Self {
        match error {
            column_qa_core::Error::Io(e) => Error::Io(e),
            column_qa_core::Error::UnresolvedLengthUnit => Error::UnresolvedLengthUnit,
            other => Error::Core(other),
        }
    }
}
