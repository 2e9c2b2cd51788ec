// Copyright 2024 tison <wander4096@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Errors surfaced by holders, background operations and the bundled services.
///
/// The type is `Clone` so that a failed background operation can hand the same error to every
/// task awaiting it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The background operation went away without producing a value, e.g. its task panicked or
    /// the runtime driving it shut down.
    #[error("background operation was abandoned before producing a value")]
    Abandoned,
    /// An exchange rate that cannot be used for conversion.
    #[error("invalid exchange rate: {rate}")]
    InvalidRate {
        /// The rejected rate.
        rate: f64,
    },
    /// Construction parameters that cannot produce an instance.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
