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
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, bail, Result};
use crossbeam::channel::{bounded, unbounded};
use grass_util::util::{format_duration, log_remaining_time, py_float};
use grass_util::vector::{categories, cleanup, column_values, db_connection, db_login, feature_count,
                         line_slope, list_maps, remove_maps, require_vector,
                         set_db_connection, total_length, vector_exists, DbConnection};
use grass_util::{GrassSession, ModuleCall, ProcessId};
use log::{debug, error, info, warn};
use structopt::StructOpt;

use crate::angular::{slope_angle_difference, within_threshold};
use crate::report::ExtractionReport;

/// Buffer used to select the OSM lines covered by the patched result
const FINAL_SNAP_DISTANCE: f64 = 0.0001;

#[derive(StructOpt)]
pub struct PgArgs {
    #[structopt(long, help="PostgreSQL database used as attribute backend while workers run")]
    pub(crate) pg_database: Option<String>,

    #[structopt(long)]
    pub(crate) pg_user: Option<String>,

    #[structopt(long, default_value = "localhost")]
    pub(crate) pg_host: String,

    #[structopt(long, default_value = "5432")]
    pub(crate) pg_port: u16,
}

///
/// Keeps the OSM features running in the same direction as a nearby reference feature
#[derive(StructOpt)]
pub struct PreprocArgs {
    #[structopt(long, help="OpenStreetMap dataset")]
    pub(crate) osm: String,

    #[structopt(long = "ref", help="Reference dataset")]
    pub(crate) reference: String,

    #[structopt(long, help="Buffer around reference dataset (map units)")]
    pub(crate) buffer: f64,

    #[structopt(long, help="Threshold value for angular coefficient comparison (degrees)")]
    pub(crate) angle_thres: f64,

    #[structopt(long, help="Name for output map")]
    pub(crate) output: String,

    #[structopt(long, help="Threshold value for Douglas-Peucker algorithm (map units)")]
    pub(crate) douglas_thres: Option<f64>,

    #[structopt(long, parse(from_os_str), help="Name for output file with statistics (if omitted or \"-\" output to stdout)")]
    pub(crate) out_file: Option<PathBuf>,

    #[structopt(long, default_value = "1", help="Number of features compared in parallel")]
    pub(crate) nprocs: usize,

    #[structopt(long, help="Replace the output map if it exists")]
    pub(crate) overwrite: bool,

    #[structopt(flatten)]
    pub(crate) pg: PgArgs,
}

/// Everything a worker needs to compare one reference feature
struct FeatureTask<'a> {
    pid: &'a ProcessId,
    reference: &'a str,
    osm: &'a str,
    buffer: f64,
    angle_thres: f64,
    end_lines: &'a HashSet<String>,
}

#[derive(Clone, Debug, PartialEq)]
enum FeatureOutcome {
    NoOverlap,
    Compared { kept: usize, rejected: usize },
}

impl<'a> FeatureTask<'a> {
    fn seed_patch(&self) -> String {
        format!("{}_0_0", self.pid.name("patch"))
    }

    fn patch(&self, f: &str, sub: &str) -> String {
        format!("{}_{}_{}", self.pid.name("patch"), f, sub)
    }

    fn temp(&self, prefix: &str, f: &str) -> String {
        format!("{}_{}", self.pid.name(prefix), f)
    }
}

pub fn preproc(session: &dyn GrassSession, args: &PreprocArgs) -> Result<()> {
    let now = Instant::now();

    if !(args.buffer > 0.) {
        bail!("Buffer must be positive, got {}", args.buffer);
    }
    if args.nprocs == 0 {
        bail!("nprocs must be at least 1");
    }

    require_vector(session, &args.osm)?;
    require_vector(session, &args.reference)?;

    if !args.overwrite && vector_exists(session, &args.output)? {
        bail!("Vector map <{}> already exists, use --overwrite", args.output);
    }

    let pid = ProcessId::new();
    let report = extract_matching(session, &pid, args);
    cleanup(session, &pid);
    let report = report?;

    if let Some(p) = stats_file(&args.out_file) {
        report.write_file(p)?;
        info!("Statistics written to {}", p.display());
    }

    println!("{}", report.summary());

    info!("Finished in {}", format_duration(now.elapsed()));

    Ok(())
}

/// `-` means the statistics only go to stdout
fn stats_file(out_file: &Option<PathBuf>) -> Option<&Path> {
    match out_file {
        Some(p) if p.as_os_str() != "-" => Some(p.as_path()),
        _ => None,
    }
}

fn extract_matching(session: &dyn GrassSession, pid: &ProcessId, args: &PreprocArgs) -> Result<ExtractionReport> {
    let osm_length = total_length(session, &args.osm)?;
    let ref_length = total_length(session, &args.reference)?;

    if ref_length == 0. {
        bail!("No reference data for comparison");
    }
    if osm_length == 0. {
        bail!("No OSM data for comparison");
    }

    let mut reference = args.reference.clone();
    if let Some(doug) = args.douglas_thres {
        let ref_gen = pid.name("ref_gen");
        session.run(&ModuleCall::new("v.generalize")
            .opt("input", &reference)
            .opt("output", &ref_gen)
            .opt("method", "douglas")
            .opt("threshold", doug)
            .quiet())?;
        reference = ref_gen;
    }

    let ref_split = pid.name("ref_split");
    split_lines(session, &reference, &ref_split)?;
    let osm_split = pid.name("osm_split");
    split_lines(session, &args.osm, &osm_split)?;

    let end_lines = find_end_lines(session, pid, &ref_split)?;
    debug!("{} end lines", end_lines.len());

    let task = FeatureTask {
        pid,
        reference: &ref_split,
        osm: &osm_split,
        buffer: args.buffer,
        angle_thres: args.angle_thres,
        end_lines: &end_lines,
    };

    session.run(&ModuleCall::new("v.edit")
        .opt("map", task.seed_patch())
        .opt("tool", "create")
        .quiet())?;

    let features = categories(session, &ref_split)?;
    info!("Comparing {} reference features using {} workers", features.len(), args.nprocs);

    let old_db = switch_database(session, &args.pg)?;
    let results = compare_features(session, &task, &features, args.nprocs);
    if let Some(old_db) = &old_db {
        set_db_connection(session, old_db)?;
    }
    let results = results?;

    let failed: Vec<&String> = results.iter()
        .filter(|(_, r)| r.is_err())
        .map(|(f, _)| f)
        .collect();
    if !failed.is_empty() {
        error!("Some errors occurred during analysis");
        bail!("Comparison failed for {} of {} reference features, first: {}",
              failed.len(), features.len(), failed[0]);
    }

    let (kept, rejected) = results.iter().fold((0, 0), |acc, (_, r)| match r {
        Ok(FeatureOutcome::Compared { kept, rejected }) => (acc.0 + kept, acc.1 + rejected),
        _ => acc,
    });
    info!("{} OSM segments kept, {} rejected", kept, rejected);

    build_output(session, pid, &args.osm, &args.output, args.overwrite)?;

    let processed_length = total_length(session, &args.output)?;

    Ok(ExtractionReport {
        ref_length,
        osm_length,
        processed_length,
    })
}

/// Splits every line into 2 vertex segments, then rebuilds polylines keeping the categories
fn split_lines(session: &dyn GrassSession, input: &str, output: &str) -> Result<()> {
    let rebuilt = format!("new_{}", output);

    session.run(&ModuleCall::new("v.split")
        .opt("input", input)
        .opt("output", output)
        .opt("vertices", 2)
        .quiet())?;
    session.run(&ModuleCall::new("v.build.polylines")
        .opt("input", output)
        .opt("output", &rebuilt)
        .opt("cats", "same")
        .overwrite()
        .quiet())?;
    remove_maps(session, &[output])?;
    session.run(&ModuleCall::new("g.rename")
        .opt("vector", format!("{},{}", rebuilt, output))
        .quiet())
}

/// Categories of the reference lines touching a node of minimum degree (dead ends)
fn find_end_lines(session: &dyn GrassSession, pid: &ProcessId, reference: &str) -> Result<HashSet<String>> {
    let deg_points = pid.name("deg_points");
    let degmin_points = pid.name("degmin_points");
    let ref_degmin = pid.name("ref_degmin");

    session.run(&ModuleCall::new("v.net.centrality")
        .opt("input", reference)
        .opt("output", &deg_points)
        .opt("degree", "degree")
        .flags("a")
        .quiet())?;

    let mut degrees = Vec::new();
    for v in column_values(session, &deg_points, "degree")? {
        degrees.push(v.parse::<f64>().map_err(|e| anyhow!("Bad degree '{}': {}", v, e))?);
    }

    let degmin = match degrees.into_iter().reduce(f64::min) {
        Some(d) => d,
        None => {
            warn!("No network nodes found in {}", reference);
            return Ok(HashSet::new());
        }
    };

    session.run(&ModuleCall::new("v.extract")
        .opt("input", &deg_points)
        .opt("output", &degmin_points)
        .opt("where", format!("degree={}", py_float(degmin)))
        .quiet())?;
    session.run(&ModuleCall::new("v.select")
        .opt("ainput", reference)
        .opt("binput", &degmin_points)
        .opt("output", &ref_degmin)
        .opt("operator", "overlap")
        .quiet())?;

    Ok(categories(session, &ref_degmin)?.into_iter().collect())
}

fn switch_database(session: &dyn GrassSession, pg: &PgArgs) -> Result<Option<DbConnection>> {
    let database = match &pg.pg_database {
        Some(d) => d,
        None => return Ok(None),
    };

    let old = db_connection(session)?;
    set_db_connection(session, &DbConnection {
        driver: "pg".to_string(),
        database: database.clone(),
    })?;
    if let Some(user) = &pg.pg_user {
        if let Err(e) = db_login(session, user, &pg.pg_host, pg.pg_port) {
            set_db_connection(session, &old)?;
            return Err(e);
        }
    }
    info!("Attribute database switched from {} to pg {}", old.driver, database);

    Ok(Some(old))
}

/// Runs [`compare_feature`] for every feature on `nprocs` threads.
///
/// Features are fed through a queue of size 1, results come back in completion order.
fn compare_features(session: &dyn GrassSession, task: &FeatureTask, features: &[String], nprocs: usize)
    -> Result<Vec<(String, Result<FeatureOutcome>)>>
{
    let (in_tx, in_rx) = bounded::<String>(1);
    let (out_tx, out_rx) = unbounded();

    let start = Instant::now();
    let mut last_output = Instant::now();

    crossbeam::scope(|s| {
        for _ in 0..nprocs {
            let in_rx = in_rx.clone();
            let out_tx = out_tx.clone();
            s.spawn(move |_| {
                for f in in_rx.iter() {
                    let r = compare_feature(session, task, &f);
                    if let Err(e) = &r {
                        warn!("Feature {} failed: {:#}", f, e);
                    }
                    if out_tx.send((f, r)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(out_tx);

        s.spawn(move |_| {
            for f in features {
                if in_tx.send(f.clone()).is_err() {
                    break;
                }
            }
        });

        let mut results = Vec::with_capacity(features.len());
        for r in out_rx.iter() {
            results.push(r);

            if last_output.elapsed().as_secs() >= 3 {
                last_output = Instant::now();
                log_remaining_time(&start, results.len() as u32, features.len() as u32);
            }
        }
        results
    }).map_err(|_| anyhow!("A worker thread panicked"))
}

fn compare_feature(session: &dyn GrassSession, task: &FeatureTask, f: &str) -> Result<FeatureOutcome> {
    let fdata = task.temp("fdata", f);
    let fbuffer = task.temp("fbuffer", f);
    let odata = task.temp("odata", f);

    session.run(&ModuleCall::new("v.extract")
        .opt("input", task.reference)
        .opt("output", &fdata)
        .opt("where", format!("cat={}", f))
        .quiet())?;
    session.run(&ModuleCall::new("g.copy")
        .opt("vector", format!("{},{}", task.seed_patch(), task.patch(f, "0")))
        .quiet())?;

    let mut buffer_call = ModuleCall::new("v.buffer")
        .opt("input", &fdata)
        .opt("output", &fbuffer)
        .opt("distance", task.buffer)
        .quiet();
    if task.end_lines.contains(f) {
        buffer_call = buffer_call.flags("c");
    }
    session.run(&buffer_call)?;

    session.run(&ModuleCall::new("v.overlay")
        .opt("ainput", task.osm)
        .opt("atype", "line")
        .opt("binput", &fbuffer)
        .opt("output", &odata)
        .opt("operator", "and")
        .quiet())?;

    if feature_count(session, &odata)? == 0 {
        remove_maps(session, &[&fdata, &fbuffer, &odata])?;
        return Ok(FeatureOutcome::NoOverlap);
    }

    let sub_features = categories(session, &odata)?;
    let m_ref = line_slope(session, &fdata);

    let mut last_patch = task.patch(f, "0");
    let mut kept = 0;
    let mut rejected = 0;

    for sf in sub_features.iter() {
        let sub_data = format!("{}_{}", odata, sf);
        session.run(&ModuleCall::new("v.extract")
            .opt("input", &odata)
            .opt("output", &sub_data)
            .opt("where", format!("cat={}", sf))
            .quiet())?;

        let m_osm = line_slope(session, &sub_data);
        let angle = slope_angle_difference(m_ref, m_osm);

        if within_threshold(angle, task.angle_thres) {
            let out_patch = task.patch(f, sf);
            session.run(&ModuleCall::new("v.patch")
                .opt_list("input", &[&last_patch, &sub_data])
                .opt("output", &out_patch)
                .quiet())?;
            remove_maps(session, &[&last_patch, &sub_data])?;
            last_patch = out_patch;
            kept += 1;
        } else {
            remove_maps(session, &[&sub_data])?;
            rejected += 1;
        }
    }

    remove_maps(session, &[&fdata, &fbuffer, &odata])?;

    Ok(FeatureOutcome::Compared { kept, rejected })
}

/// Patches all per feature results together and selects the original OSM lines they cover
fn build_output(session: &dyn GrassSession, pid: &ProcessId, osm: &str, output: &str, overwrite: bool) -> Result<()> {
    let patches = list_maps(session, &format!("{}_*", pid.name("patch")))?;
    if patches.is_empty() {
        bail!("No patch maps found for {}", pid);
    }

    let final_patch = format!("{}_final", pid.name("patch"));
    let out_buffer = pid.name("outbuff");

    session.run(&ModuleCall::new("v.patch")
        .opt_list("input", &patches)
        .opt("output", &final_patch)
        .quiet())?;
    session.run(&ModuleCall::new("v.buffer")
        .opt("input", &final_patch)
        .opt("output", &out_buffer)
        .opt("distance", FINAL_SNAP_DISTANCE)
        .quiet())?;

    let mut overlay = ModuleCall::new("v.overlay")
        .opt("ainput", osm)
        .opt("atype", "line")
        .opt("binput", &out_buffer)
        .opt("output", output)
        .opt("operator", "and")
        .flags("t")
        .quiet();
    if overwrite {
        overlay = overlay.overwrite();
    }
    session.run(&overlay)
}
