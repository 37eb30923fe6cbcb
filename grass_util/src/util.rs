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
use std::time::{Duration, Instant};

use log::info;

pub fn format_duration(d: Duration) -> String {
    let mut secs = d.as_secs();
    let hours = secs / 3600;
    secs = secs % 3600;
    let minutes = secs / 60;
    secs = secs % 60;

    let ms = d.as_millis() % 1000;

    format!("{}h {}m {}s {}ms", hours, minutes, secs, ms )
}

pub fn log_remaining_time(start: &Instant, num_processed: u32, num_total: u32) {
    let d = start.elapsed();
    let time_per_result = if num_processed == 0 {
        d
    } else {
        d / num_processed
    };
    let est_remaining_time = time_per_result * num_total.saturating_sub(num_processed);
    info!("Through {} of {} Elapsed: {} Est. Remaining: {}",
             num_processed, num_total,
             format_duration(d),
             format_duration(est_remaining_time));
}

/// Rounds half away from zero to one decimal
pub fn round1(v: f64) -> f64 {
    (v * 10.).round() / 10.
}

/// Renders a float always keeping a decimal part, `12` is written `12.0`
pub fn py_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0. && v.abs() < 1e16 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

/// Percentage of `part` in `total`
pub fn percent(part: f64, total: f64) -> f64 {
    part / total * 100.
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(3_723_004)), "1h 2m 3s 4ms");
        assert_eq!(format_duration(Duration::from_secs(0)), "0h 0m 0s 0ms");
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(1234.56), 1234.6);
        assert_eq!(round1(0.04), 0.);
        assert_eq!(round1(-2.25), -2.3);
        assert_eq!(round1(100.), 100.);
    }

    #[test]
    fn test_py_float() {
        assert_eq!(py_float(12.), "12.0");
        assert_eq!(py_float(12.5), "12.5");
        assert_eq!(py_float(round1(1234.56)), "1234.6");
        assert_eq!(py_float(-0.5), "-0.5");
        assert_eq!(py_float(0.), "0.0");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(25., 200.), 12.5);
    }
}
