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

//! Services that are only ever reachable through a single shared instance.
//!
//! Each service keeps its constructor private and offers two ways in:
//!
//! * a process-wide `get_instance`, backed by a `static` holder;
//! * a `holder()` function returning a fresh, empty holder bound to the private constructor, for
//!   applications that create the holder at startup and pass it to whoever needs the service.
//!
//! Constructing a service never waits: any slow work is started in the background and awaited
//! by the service's accessors.

pub mod currency;
pub mod database;
pub mod delayed;
