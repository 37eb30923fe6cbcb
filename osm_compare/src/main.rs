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
use anyhow::Result;
use grass_util::CliSession;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use structopt::StructOpt;

use crate::cmd_precomp::{precomp, PrecompArgs};
use crate::cmd_preproc::{preproc, PreprocArgs};

mod angular;
mod cmd_precomp;
mod cmd_preproc;
mod plot;
mod report;

#[derive(StructOpt)]
struct Cli {

    #[structopt(long, default_value = "Warn")]
    log_level: LevelFilter,

    #[structopt(long, env = "OSM_COMPARE_GRASS_EXEC",
        help="Command prefix used to run GRASS modules outside of a GRASS session, e.g. \"grass /grassdata/location/mapset --exec\"")]
    grass_exec: Option<String>,

    #[structopt(subcommand)]  // Note that we mark a field as a subcommand
    cmd: Command
}

#[derive(StructOpt)]
enum Command {
    #[structopt(help="Preliminary comparison between OSM and reference datasets, length in and out of buffers")]
    Precomp(PrecompArgs),

    #[structopt(help="Extracts road features in the OSM dataset which have a correspondence in the reference dataset")]
    Preproc(PreprocArgs),
}


fn run() -> Result<()> {
    let args = Cli::from_args();

    SimpleLogger::new().with_level(args.log_level).init()?;

    let session = match &args.grass_exec {
        Some(exec) => CliSession::with_exec_prefix(exec),
        None => CliSession::new(),
    };

    match &args.cmd {
        Command::Precomp(r) => {
            precomp(&session, r)?;
        }
        Command::Preproc(r) => {
            preproc(&session, r)?;
        }
    }

    Ok(())
}


fn main() {
    if let Err(e) = run() {
        eprintln!("ERROR: {:#}", e);
        std::process::exit(1);
    }
}
