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

//! A currency converter whose exchange rate is loaded in the background.

use std::time::Duration;

use crate::Error;
use crate::deferred::Deferred;
use crate::singleton::Singleton;

/// How long loading an exchange rate takes.
pub const LOAD_DELAY: Duration = Duration::from_secs(5);

/// Converts amounts with an exchange rate fixed at construction.
///
/// # Examples
///
/// ```
/// # #[tokio::main(flavor = "current_thread", start_paused = true)]
/// # async fn main() {
/// use solus::services::currency::CurrencyConverter;
///
/// let euro = CurrencyConverter::get_instance(0.85);
/// assert_eq!(euro.convert(100.0).await.unwrap(), 85.0);
///
/// // later arguments are ignored
/// let dollar = CurrencyConverter::get_instance(1.15);
/// assert!(std::ptr::eq(euro, dollar));
/// assert_eq!(dollar.convert(100.0).await.unwrap(), 85.0);
/// # }
/// ```
#[derive(Debug)]
pub struct CurrencyConverter {
    rate: Deferred<Result<f64, Error>>,
}

impl CurrencyConverter {
    fn new(rate: f64) -> Self {
        log::info!("start");
        CurrencyConverter {
            rate: Deferred::spawn(load(rate)),
        }
    }

    /// Returns the process-wide converter, constructing it with `rate` on first access.
    pub fn get_instance(rate: f64) -> &'static CurrencyConverter {
        static INSTANCE: Singleton<CurrencyConverter, f64> = CurrencyConverter::holder();
        INSTANCE.get_instance(rate)
    }

    /// Returns an empty holder for a converter owned by the caller.
    pub const fn holder() -> Singleton<CurrencyConverter, f64> {
        Singleton::new(CurrencyConverter::new)
    }

    /// Waits for the exchange rate to load and returns it.
    ///
    /// A rejected rate is reported on every call.
    pub async fn rate(&self) -> Result<f64, Error> {
        self.rate.get().await?.clone()
    }

    /// Converts `amount` with the loaded exchange rate.
    pub async fn convert(&self, amount: f64) -> Result<f64, Error> {
        let rate = self.rate().await?;
        Ok(rate * amount)
    }
}

async fn load(rate: f64) -> Result<f64, Error> {
    tokio::time::sleep(LOAD_DELAY).await;
    if rate.is_finite() && rate > 0.0 {
        log::info!("exchange rate {rate} loaded");
        Ok(rate)
    } else {
        Err(Error::InvalidRate { rate })
    }
}
