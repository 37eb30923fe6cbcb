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
//! Similarity graphs of a precomp run.
//!
//! Each graph is a PNG line chart (buffer width on x, length or percentage on y) with
//! title, axis descriptions, tick values and a legend holding the total length.
//! The plotted series with their totals also go to `similarity.csv` in the same folder.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use log::{debug, info};
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use serde::Serialize;

use crate::report::OverlapReport;
use grass_util::util::{py_float, round1};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;

const FONT_FAMILY: &str = "sans-serif";
const FONT_ENV: &str = "OSM_COMPARE_FONT";
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const OSM_COLOR: RGBColor = RGBColor(220, 30, 30);
const REF_COLOR: RGBColor = RGBColor(30, 30, 220);

static FONT: OnceLock<std::result::Result<(), String>> = OnceLock::new();

/// One chart, x values are the buffer widths
struct Graph {
    file_name: &'static str,
    title: &'static str,
    x_desc: &'static str,
    y_desc: &'static str,
    legend: String,
    legend_top: bool,
    values: Vec<f64>,
    y_max: f64,
    color: RGBColor,
}

#[derive(Serialize)]
struct GraphRow {
    buffer: f64,
    osm_total_km: f64,
    osm_in_km: f64,
    osm_in_perc: f64,
    osm_out_km: f64,
    osm_out_perc: f64,
    ref_total_km: f64,
    ref_in_km: f64,
    ref_in_perc: f64,
    ref_out_km: f64,
    ref_out_perc: f64,
}

/// Km and percentage of one dataset inside / outside the buffers
struct Similarity {
    total_km: f64,
    in_km: Vec<f64>,
    in_perc: Vec<f64>,
    out_km: Vec<f64>,
    out_perc: Vec<f64>,
}

impl Similarity {
    fn new(lengths_in: &[f64], total: f64) -> Self {
        let in_m: Vec<f64> = lengths_in.iter().map(|v| round1(*v)).collect();
        let in_perc: Vec<f64> = in_m.iter().map(|v| v / total * 100.).collect();

        Similarity {
            total_km: total / 1000.,
            in_km: in_m.iter().map(|v| v / 1000.).collect(),
            out_km: in_m.iter().map(|v| (total - v) / 1000.).collect(),
            out_perc: in_perc.iter().map(|p| 100. - p).collect(),
            in_perc,
        }
    }
}

fn font_path() -> Option<PathBuf> {
    if let Ok(p) = env::var(FONT_ENV) {
        return Some(PathBuf::from(p));
    }
    FONT_CANDIDATES.iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

fn load_font() -> Result<()> {
    let path = font_path()
        .ok_or_else(|| anyhow!("No TrueType font found for the graphs, set {}", FONT_ENV))?;
    let bytes = fs::read(&path).with_context(|| format!("reading font {}", path.display()))?;

    // The font registry keeps the data for the rest of the process
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    register_font(FONT_FAMILY, FontStyle::Normal, bytes)
        .map_err(|_| anyhow!("Invalid font {}", path.display()))?;

    debug!("Graph font {}", path.display());
    Ok(())
}

fn ensure_font() -> Result<()> {
    FONT.get_or_init(|| load_font().map_err(|e| format!("{:#}", e)))
        .clone()
        .map_err(|e| anyhow!(e))
}

fn graphs(osm: &Similarity, reference: &Similarity) -> Vec<Graph> {
    let km = |s: &Similarity| s.total_km * 1.05;
    let osm_legend = format!("OSM total length = {} km", py_float(osm.total_km));
    let ref_legend = format!("REF total length = {} km", py_float(reference.total_km));

    let osm_graph = |file_name: &'static str, y_desc: &'static str, values: &Vec<f64>, y_max: f64,
                     legend_top: bool| Graph {
        file_name,
        title: "Similarity of OSM compared to REF",
        x_desc: "Buffer width around REF dataset [m]",
        y_desc,
        legend: osm_legend.clone(),
        legend_top,
        values: values.clone(),
        y_max,
        color: OSM_COLOR,
    };
    let ref_graph = |file_name: &'static str, y_desc: &'static str, values: &Vec<f64>, y_max: f64,
                     legend_top: bool| Graph {
        file_name,
        title: "Similarity of REF compared to OSM",
        x_desc: "Buffer width around OSM dataset [m]",
        y_desc,
        legend: ref_legend.clone(),
        legend_top,
        values: values.clone(),
        y_max,
        color: REF_COLOR,
    };

    vec![
        osm_graph("osm_in_km.png", "OSM length included in the buffer [km]", &osm.in_km, km(osm), false),
        osm_graph("osm_in_perc.png", "OSM length included in the buffer [%]", &osm.in_perc, 100., false),
        osm_graph("osm_out_km.png", "OSM length not included in the buffer [km]", &osm.out_km, km(osm), true),
        osm_graph("osm_out_perc.png", "OSM length not included in the buffer [%]", &osm.out_perc, 100., true),
        ref_graph("ref_in_km.png", "REF length included in the buffer [km]", &reference.in_km, km(reference), false),
        ref_graph("ref_in_perc.png", "REF length included in the buffer [%]", &reference.in_perc, 100., false),
        ref_graph("ref_out_km.png", "REF length not included in the buffer [km]", &reference.out_km, km(reference), true),
        ref_graph("ref_out_perc.png", "REF length not included in the buffer [%]", &reference.out_perc, 100., true),
    ]
}

/// Writes the eight similarity graphs and `similarity.csv` into `out_dir`
pub fn write_graphs(out_dir: &Path, report: &OverlapReport) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    ensure_font()?;

    let buffers: Vec<f64> = report.rows.iter().map(|r| r.buffer).collect();
    let osm_in: Vec<f64> = report.rows.iter().map(|r| r.osm_in).collect();
    let ref_in: Vec<f64> = report.rows.iter().map(|r| r.ref_in).collect();

    let osm = Similarity::new(&osm_in, report.osm_length);
    let reference = Similarity::new(&ref_in, report.ref_length);

    let x_max = buffers.iter().cloned().fold(0., f64::max) * 1.05;

    let mut written = Vec::new();
    for g in graphs(&osm, &reference) {
        let img = render_chart(&g, &buffers, x_max)?;
        let path = out_dir.join(g.file_name);
        img.save(&path).with_context(|| format!("saving image {}", path.display()))?;
        written.push(path);
    }

    let csv_path = out_dir.join("similarity.csv");
    let mut wtr = csv::Writer::from_path(&csv_path)
        .with_context(|| format!("creating {}", csv_path.display()))?;
    for (i, b) in buffers.iter().enumerate() {
        wtr.serialize(GraphRow {
            buffer: *b,
            osm_total_km: osm.total_km,
            osm_in_km: osm.in_km[i],
            osm_in_perc: osm.in_perc[i],
            osm_out_km: osm.out_km[i],
            osm_out_perc: osm.out_perc[i],
            ref_total_km: reference.total_km,
            ref_in_km: reference.in_km[i],
            ref_in_perc: reference.in_perc[i],
            ref_out_km: reference.out_km[i],
            ref_out_perc: reference.out_perc[i],
        })?;
    }
    wtr.flush()?;
    written.push(csv_path);

    info!("Wrote {} graph files to {}", written.len(), out_dir.display());

    Ok(written)
}

/// Title, grid with tick values, axis descriptions, the series as a line with a dot on
/// every sample and the legend
fn render_chart(g: &Graph, xs: &[f64], x_max: f64) -> Result<RgbImage> {
    let mut buf = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(g.title, (FONT_FAMILY, 24))
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(0f64..x_max, 0f64..g.y_max)?;

        chart.configure_mesh()
            .x_desc(g.x_desc)
            .y_desc(g.y_desc)
            .label_style((FONT_FAMILY, 14))
            .axis_desc_style((FONT_FAMILY, 16))
            .draw()?;

        let points: Vec<(f64, f64)> = xs.iter().cloned().zip(g.values.iter().cloned()).collect();
        let color = g.color;

        chart.draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))?
            .label(g.legend.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart.draw_series(points.iter().map(|p| Circle::new(*p, 4, color.filled())))?;

        chart.configure_series_labels()
            .position(if g.legend_top { SeriesLabelPosition::UpperRight } else { SeriesLabelPosition::LowerRight })
            .label_font((FONT_FAMILY, 14))
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;

        root.present()?;
    }

    RgbImage::from_raw(WIDTH, HEIGHT, buf).ok_or_else(|| anyhow!("Chart buffer has the wrong size"))
}
