/*
 *  pacer.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Fixed-period tick pacing
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

pub struct TickPacer {
    next_deadline: Instant,
    period: Duration,
}

impl TickPacer {
    pub fn new(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        Self { next_deadline: Instant::now() + period, period }
    }

    #[inline]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Sleep until the next tick boundary.
    /// A tick that overran does not get a burst of catch-up ticks; the
    /// schedule restarts one period from now.
    pub async fn wait(&mut self) {
        let now = Instant::now();
        if self.next_deadline <= now {
            self.next_deadline = now + self.period;
            return;
        }
        sleep_until(self.next_deadline).await;
        self.next_deadline += self.period;
    }
}
