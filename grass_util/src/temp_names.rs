/*
This file is part of the OSM Road Comparison Tool
Copyright (C) 2022 Novel-T

The OSM Road Comparison Tool is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

static LAST_MICROS: AtomicI64 = AtomicI64::new(0);

/// Suffix shared by all temporary maps of one run, `<seconds>_<microseconds>` of the
/// time it was created.
///
/// Ids handed out by one process are strictly increasing, so two runs started in the
/// same microsecond still get distinct temporary maps.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProcessId(String);

impl ProcessId {
    pub fn new() -> Self {
        let now = Utc::now().timestamp_micros();

        let mut prev = LAST_MICROS.load(Ordering::SeqCst);
        let micros = loop {
            let candidate = if now > prev { now } else { prev + 1 };
            match LAST_MICROS.compare_exchange(prev, candidate, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => break candidate,
                Err(actual) => prev = actual,
            }
        };

        ProcessId::from_micros(micros)
    }

    pub fn from_micros(micros: i64) -> Self {
        ProcessId(format!("{}_{:06}", micros / 1_000_000, micros % 1_000_000))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `ref_buffer` -> `ref_buffer_1650000000_123456`
    pub fn name(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.0)
    }

    /// g.list / g.remove wildcard matching every map of this run
    pub fn pattern(&self) -> String {
        format!("*{}*", self.0)
    }
}

impl Default for ProcessId {
    fn default() -> Self {
        ProcessId::new()
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
