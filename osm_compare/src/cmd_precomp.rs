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
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Result};
use grass_util::util::format_duration;
use grass_util::vector::{cleanup, remove_matching, require_vector, total_length};
use grass_util::{GrassSession, ModuleCall, ProcessId};
use log::info;
use structopt::StructOpt;

use crate::plot::write_graphs;
use crate::report::{BufferStats, OverlapReport};

///
/// Length of each dataset inside and outside buffers of increasing width around the other one
#[derive(StructOpt)]
pub struct PrecompArgs {
    #[structopt(long, help="OpenStreetMap dataset")]
    pub(crate) osm: String,

    #[structopt(long = "ref", help="Reference dataset")]
    pub(crate) reference: String,

    #[structopt(long, use_delimiter = true, required = true,
        help="List of buffer values around reference and OpenStreetMap dataset (map units), e.g. 1,5,10")]
    pub(crate) buffers: Vec<f64>,

    #[structopt(long, help="Clipping mask")]
    pub(crate) roi: Option<String>,

    #[structopt(long, parse(from_os_str), help="Folder for output graphs")]
    pub(crate) out_graphs: Option<PathBuf>,

    #[structopt(long, parse(from_os_str), help="Name for output file")]
    pub(crate) output: PathBuf,
}

pub fn precomp(session: &dyn GrassSession, args: &PrecompArgs) -> Result<()> {
    let now = Instant::now();

    if args.buffers.is_empty() {
        bail!("At least one buffer value is needed");
    }
    if let Some(b) = args.buffers.iter().find(|b| !b.is_finite() || **b <= 0.) {
        bail!("Buffer values must be positive, got {}", b);
    }

    require_vector(session, &args.osm)?;
    require_vector(session, &args.reference)?;
    if let Some(roi) = &args.roi {
        require_vector(session, roi)?;
    }

    let pid = ProcessId::new();
    let report = compare_datasets(session, &pid, args);
    cleanup(session, &pid);
    let report = report?;

    report.write_file(&args.output)?;
    info!("Statistics written to {}", args.output.display());

    if let Some(out_graphs) = &args.out_graphs {
        write_graphs(out_graphs, &report)?;
    }

    info!("Finished in {}", format_duration(now.elapsed()));

    Ok(())
}

fn clip(session: &dyn GrassSession, input: &str, roi: &str, output: &str) -> Result<()> {
    session.run(&ModuleCall::new("v.overlay")
        .opt("ainput", input)
        .opt("atype", "line")
        .opt("binput", roi)
        .opt("operator", "and")
        .opt("output", output)
        .flags("t")
        .quiet())
}

fn compare_datasets(session: &dyn GrassSession, pid: &ProcessId, args: &PrecompArgs) -> Result<OverlapReport> {
    let (osm, reference) = match &args.roi {
        Some(roi) => {
            let ref_roi = pid.name("ref_roi");
            let osm_roi = pid.name("osm_roi");
            clip(session, &args.reference, roi, &ref_roi)?;
            clip(session, &args.osm, roi, &osm_roi)?;
            (osm_roi, ref_roi)
        }
        None => (args.osm.clone(), args.reference.clone()),
    };

    let ref_length = total_length(session, &reference)?;
    let osm_length = total_length(session, &osm)?;

    if ref_length == 0. {
        bail!("No reference data for comparison");
    }
    if osm_length == 0. {
        bail!("No OSM data for comparison");
    }

    info!("REF length {:.1} OSM length {:.1}", ref_length, osm_length);

    let mut rows = Vec::with_capacity(args.buffers.len());
    for (idx, b) in args.buffers.iter().enumerate() {
        info!("Buffer {} ({} of {})", b, idx + 1, args.buffers.len());
        rows.push(buffer_stats(session, &osm, &reference, *b)?);
    }

    Ok(OverlapReport {
        ref_length,
        osm_length,
        rows,
    })
}

fn overlay(session: &dyn GrassSession, ainput: &str, binput: &str, operator: &str, output: &str) -> Result<()> {
    session.run(&ModuleCall::new("v.overlay")
        .opt("ainput", ainput)
        .opt("binput", binput)
        .opt("operator", operator)
        .opt("output", output)
        .opt("atype", "line")
        .flags("t")
        .overwrite()
        .quiet())
}

fn buffer(session: &dyn GrassSession, input: &str, output: &str, distance: f64) -> Result<()> {
    session.run(&ModuleCall::new("v.buffer")
        .opt("input", input)
        .opt("output", output)
        .opt("distance", distance)
        .opt("type", "line")
        .overwrite()
        .quiet())
}

/// In / out lengths for one buffer width, temporary maps get their own process id
pub(crate) fn buffer_stats(session: &dyn GrassSession, osm: &str, reference: &str, width: f64) -> Result<BufferStats> {
    let pid = ProcessId::new();

    let stats = buffer_stats_inner(session, &pid, osm, reference, width);
    if stats.is_err() {
        cleanup(session, &pid);
        return stats;
    }
    remove_matching(session, &pid)?;

    stats
}

fn buffer_stats_inner(session: &dyn GrassSession, pid: &ProcessId, osm: &str, reference: &str, width: f64) -> Result<BufferStats> {
    let ref_buffer = pid.name("ref_buffer");
    let osm_buffer = pid.name("osm_buffer");
    let ref_in = pid.name("ref_in");
    let ref_out = pid.name("ref_out");
    let osm_in = pid.name("osm_in");
    let osm_out = pid.name("osm_out");

    // REF in and out of the OSM buffer
    buffer(session, osm, &osm_buffer, width)?;
    overlay(session, reference, &osm_buffer, "and", &ref_in)?;
    overlay(session, reference, &osm_buffer, "not", &ref_out)?;

    // OSM in and out of the REF buffer
    buffer(session, reference, &ref_buffer, width)?;
    overlay(session, osm, &ref_buffer, "and", &osm_in)?;
    overlay(session, osm, &ref_buffer, "not", &osm_out)?;

    Ok(BufferStats {
        buffer: width,
        osm_in: total_length(session, &osm_in)?,
        osm_out: total_length(session, &osm_out)?,
        ref_in: total_length(session, &ref_in)?,
        ref_out: total_length(session, &ref_out)?,
    })
}


#[cfg(test)]
mod precomp_tests {
    use std::fs;

    use grass_util::test_util::{get_temp_dir, ScriptedSession};
    use grass_util::ModuleOutput;

    use super::*;

    /// Lengths by map name prefix, every map has 2 lines
    fn fake_grass(call: &ModuleCall) -> ModuleOutput {
        let map = call.get_opt("map").unwrap_or_default();
        match call.module.as_str() {
            "g.findfile" => {
                if call.get_opt("file") == Some("missing") {
                    ModuleOutput::failed("")
                } else {
                    ModuleOutput::ok("file='/g/x'\n")
                }
            }
            "v.info" => {
                if map.starts_with("ref_out_") {
                    ModuleOutput::ok("nodes=0\npoints=0\nlines=0\n")
                } else {
                    ModuleOutput::ok("nodes=4\npoints=0\nlines=2\n")
                }
            }
            "v.to.db" => {
                let length = if map.starts_with("ref_in_") {
                    "1|500\n2|300\n"
                } else if map.starts_with("osm_in_") {
                    "1|600\n2|150\n"
                } else if map.starts_with("osm_out_") {
                    "1|200\n2|50\n"
                } else if map.starts_with("osm") {
                    "1|600\n2|400\n"
                } else {
                    "1|500\n2|300\n"
                };
                ModuleOutput::ok(&format!("cat|length\n{}", length))
            }
            _ => ModuleOutput::ok(""),
        }
    }

    fn args(dir: &std::path::Path) -> PrecompArgs {
        PrecompArgs {
            osm: "osm_roads".to_string(),
            reference: "ref_roads".to_string(),
            buffers: vec![1., 2.5],
            roi: None,
            out_graphs: None,
            output: dir.join("stats.txt"),
        }
    }

    #[test]
    fn test_precomp_report() {
        let dir = get_temp_dir("precomp");
        let session = ScriptedSession::new(fake_grass);
        let args = args(&dir);

        precomp(&session, &args).unwrap();

        let text = fs::read_to_string(&args.output).unwrap();
        assert_eq!(text, "REF length: 800.0 m
OSM length: 1000.0 m
REF-OSM difference: -200.0 m (-25.0%)

BUFFER(m)|OSM_IN(m)|OSM_IN(%)|OSM_OUT(m)|OSM_OUT(%)|REF_IN(m)|REF_IN(%)|REF_OUT(m)|REF_OUT(%)
1.0|750.0|75.0|250.0|25.0|800.0|100.0|0.0|0.0
2.5|750.0|75.0|250.0|25.0|800.0|100.0|0.0|0.0
");

        let buffers = session.calls_to("v.buffer");
        assert_eq!(buffers.len(), 4);
        assert_eq!(buffers[0].get_opt("input"), Some("osm_roads"));
        assert_eq!(buffers[0].get_opt("distance"), Some("1"));
        assert_eq!(buffers[1].get_opt("input"), Some("ref_roads"));
        assert_eq!(buffers[3].get_opt("distance"), Some("2.5"));

        let overlays = session.calls_to("v.overlay");
        assert_eq!(overlays.len(), 8);
        assert_eq!(overlays[0].get_opt("ainput"), Some("ref_roads"));
        assert_eq!(overlays[0].get_opt("operator"), Some("and"));
        assert_eq!(overlays[1].get_opt("operator"), Some("not"));
        assert_eq!(overlays[0].get_opt("binput"), buffers[0].get_opt("output"));
        assert!(overlays.iter().all(|c| c.has_flag('t') && c.get_opt("atype") == Some("line")));

        // one removal per buffer width and a final one
        let removes = session.calls_to("g.remove");
        assert_eq!(removes.len(), 3);
        assert_ne!(removes[0].get_opt("pattern"), removes[1].get_opt("pattern"));
    }

    #[test]
    fn test_precomp_roi_and_graphs() {
        let dir = get_temp_dir("precomp_roi");
        let session = ScriptedSession::new(fake_grass);
        let mut args = args(&dir);
        args.roi = Some("area".to_string());
        args.out_graphs = Some(dir.join("graphs"));

        precomp(&session, &args).unwrap();

        let overlays = session.calls_to("v.overlay");
        assert_eq!(overlays[0].get_opt("binput"), Some("area"));
        assert_eq!(overlays[0].get_opt("ainput"), Some("ref_roads"));
        assert_eq!(overlays[1].get_opt("ainput"), Some("osm_roads"));

        // Afterwards the clipped maps are used
        let clipped_ref = overlays[0].get_opt("output").unwrap();
        assert!(clipped_ref.starts_with("ref_roi_"));
        assert_eq!(overlays[2].get_opt("ainput"), Some(clipped_ref));

        assert!(dir.join("graphs").join("osm_in_perc.png").is_file());
        assert!(dir.join("graphs").join("similarity.csv").is_file());
    }

    #[test]
    fn test_precomp_missing_map() {
        let dir = get_temp_dir("precomp_missing");
        let session = ScriptedSession::new(fake_grass);
        let mut args = args(&dir);
        args.reference = "missing".to_string();

        let err = precomp(&session, &args).unwrap_err();
        assert_eq!(err.to_string(), "Vector map <missing> not found");
        assert!(session.calls_to("v.buffer").is_empty());
        assert!(!args.output.exists());
    }

    #[test]
    fn test_precomp_empty_reference() {
        let dir = get_temp_dir("precomp_empty");
        let session = ScriptedSession::new(|call| {
            if call.module == "v.info" && call.get_opt("map") == Some("ref_roads") {
                ModuleOutput::ok("lines=0\n")
            } else {
                fake_grass(call)
            }
        });

        let err = precomp(&session, &args(&dir)).unwrap_err();
        assert_eq!(err.to_string(), "No reference data for comparison");
        // Temporary maps are still removed
        assert_eq!(session.calls_to("g.remove").len(), 1);
    }

    #[test]
    fn test_precomp_bad_buffers() {
        let dir = get_temp_dir("precomp_buffers");
        let session = ScriptedSession::new(fake_grass);
        let mut args = args(&dir);
        args.buffers = vec![5., -1.];

        assert!(precomp(&session, &args).is_err());
        assert!(session.calls().is_empty());
    }

    #[test]
    fn test_precomp_empty_osm() {
        let dir = get_temp_dir("precomp_empty_osm");
        let session = ScriptedSession::new(|call| {
            if call.module == "v.info" && call.get_opt("map") == Some("osm_roads") {
                ModuleOutput::ok("lines=0\n")
            } else {
                fake_grass(call)
            }
        });
        let args = args(&dir);

        let err = precomp(&session, &args).unwrap_err();
        assert_eq!(err.to_string(), "No OSM data for comparison");
        assert!(session.calls_to("v.buffer").is_empty());
        assert_eq!(session.calls_to("g.remove").len(), 1);
        assert!(!args.output.exists());
    }

    #[test]
    fn test_precomp_missing_roi() {
        let dir = get_temp_dir("precomp_missing_roi");
        let session = ScriptedSession::new(fake_grass);
        let mut args = args(&dir);
        args.roi = Some("missing".to_string());

        let err = precomp(&session, &args).unwrap_err();
        assert_eq!(err.to_string(), "Vector map <missing> not found");
        assert!(session.calls_to("v.overlay").is_empty());
        assert!(!args.output.exists());
    }
}
