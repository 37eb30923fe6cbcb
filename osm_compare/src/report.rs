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
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use grass_util::util::{percent, py_float, round1};

pub const STATS_HEADER: &str =
    "BUFFER(m)|OSM_IN(m)|OSM_IN(%)|OSM_OUT(m)|OSM_OUT(%)|REF_IN(m)|REF_IN(%)|REF_OUT(m)|REF_OUT(%)";

/// Lengths (map units) for one buffer width
#[derive(Clone, Debug, PartialEq)]
pub struct BufferStats {
    pub buffer: f64,
    /// OSM inside / outside the buffer around REF
    pub osm_in: f64,
    pub osm_out: f64,
    /// REF inside / outside the buffer around OSM
    pub ref_in: f64,
    pub ref_out: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OverlapReport {
    pub ref_length: f64,
    pub osm_length: f64,
    pub rows: Vec<BufferStats>,
}

impl OverlapReport {
    pub fn difference(&self) -> f64 {
        self.ref_length - self.osm_length
    }

    pub fn difference_percent(&self) -> f64 {
        percent(self.difference(), self.ref_length)
    }

    fn format_row(&self, row: &BufferStats) -> String {
        let len = |v: f64| py_float(round1(v));
        let osm_p = |v: f64| py_float(round1(percent(v, self.osm_length)));
        let ref_p = |v: f64| py_float(round1(percent(v, self.ref_length)));

        format!("{}|{}|{}|{}|{}|{}|{}|{}|{}",
                py_float(row.buffer),
                len(row.osm_in), osm_p(row.osm_in),
                len(row.osm_out), osm_p(row.osm_out),
                len(row.ref_in), ref_p(row.ref_in),
                len(row.ref_out), ref_p(row.ref_out))
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        writeln!(w, "REF length: {} m", py_float(round1(self.ref_length)))?;
        writeln!(w, "OSM length: {} m", py_float(round1(self.osm_length)))?;
        writeln!(w, "REF-OSM difference: {} m ({}%)",
                 py_float(round1(self.difference())),
                 py_float(round1(self.difference_percent())))?;
        writeln!(w)?;
        writeln!(w, "{}", STATS_HEADER)?;
        for row in self.rows.iter() {
            writeln!(w, "{}", self.format_row(row))?;
        }
        Ok(())
    }

    pub fn write_file(&self, path: &Path) -> Result<()> {
        let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut w = BufWriter::new(f);
        self.write(&mut w)?;
        w.flush()?;
        Ok(())
    }
}

/// Lengths before and after the angular extraction
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractionReport {
    pub ref_length: f64,
    pub osm_length: f64,
    pub processed_length: f64,
}

impl ExtractionReport {
    pub fn osm_difference(&self) -> f64 {
        self.osm_length - self.processed_length
    }

    pub fn ref_difference(&self) -> f64 {
        self.ref_length - self.processed_length
    }

    fn comparison_lines(&self) -> Vec<String> {
        vec![
            format!("Original OSM dataset length: {} m", py_float(round1(self.osm_length))),
            format!("Processed OSM dataset length: {} m", py_float(round1(self.processed_length))),
            format!("Difference between OSM original and processed datasets length: {} m ({}%)",
                    py_float(round1(self.osm_difference())),
                    py_float(round1(percent(self.osm_difference(), self.osm_length)))),
            format!("Difference between REF dataset and processed OSM dataset length: {} m ({}%)",
                    py_float(round1(self.ref_difference())),
                    py_float(round1(percent(self.ref_difference(), self.ref_length)))),
        ]
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        writeln!(w, "REF dataset length: {} m", py_float(round1(self.ref_length)))?;
        for line in self.comparison_lines() {
            writeln!(w, "{}", line)?;
        }
        Ok(())
    }

    pub fn write_file(&self, path: &Path) -> Result<()> {
        let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut w = BufWriter::new(f);
        self.write(&mut w)?;
        w.flush()?;
        Ok(())
    }

    /// Framed block printed at the end of a run
    pub fn summary(&self) -> String {
        let frame = "#".repeat(69);
        let mut s = format!("{}\n\n", frame);
        for line in self.comparison_lines() {
            s.push_str(&line);
            s.push_str("\n\n");
        }
        s.push_str(&frame);
        s.push('\n');
        s
    }
}
