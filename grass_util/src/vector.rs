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
//! Operations on named vector maps of the current mapset.
//!
//! Every function is a short sequence of module calls followed by parsing of the
//! printed tables, see [`crate::parse`].

use anyhow::Result;
use log::{debug, warn};

use crate::errors::GrassError;
use crate::parse::{parse_column, parse_feature_count, parse_first_coordinate, parse_key_values, parse_length_table};
use crate::session::{GrassSession, ModuleCall};
use crate::temp_names::ProcessId;

/// Slope used for vertical lines or lines whose end points could not be read
pub const VERTICAL_SLOPE: f64 = 1e9;

pub fn vector_exists(session: &dyn GrassSession, name: &str) -> Result<bool> {
    // g.findfile exits with 1 when nothing is found
    let out = session.output(&ModuleCall::new("g.findfile")
        .opt("element", "vector")
        .opt("file", name))?;

    let kv = parse_key_values(&out.stdout);
    Ok(kv.get("file").map_or(false, |f| !f.is_empty()))
}

pub fn require_vector(session: &dyn GrassSession, name: &str) -> Result<()> {
    if !vector_exists(session, name)? {
        return Err(GrassError::MapNotFound(name.to_string()).into());
    }
    Ok(())
}

pub fn feature_count(session: &dyn GrassSession, map: &str) -> Result<u64> {
    let text = session.read(&ModuleCall::new("v.info")
        .opt("map", map)
        .flags("t")
        .quiet())?;
    parse_feature_count(&text)
}

/// Total length of all lines in map units, 0 for a map without lines
pub fn total_length(session: &dyn GrassSession, map: &str) -> Result<f64> {
    if feature_count(session, map)? == 0 {
        debug!("{} has no lines", map);
        return Ok(0.);
    }

    let text = session.read(&ModuleCall::new("v.to.db")
        .opt("map", map)
        .opt("option", "length")
        .flags("p"))?;

    parse_length_table(&text)
}

pub fn column_values(session: &dyn GrassSession, map: &str, column: &str) -> Result<Vec<String>> {
    let text = session.read(&ModuleCall::new("v.db.select")
        .opt("map", map)
        .opt("columns", column)
        .flags("c")
        .quiet())?;
    Ok(parse_column(&text))
}

pub fn categories(session: &dyn GrassSession, map: &str) -> Result<Vec<String>> {
    column_values(session, map, "cat")
}

fn end_point(session: &dyn GrassSession, map: &str, option: &str) -> Result<(f64, f64)> {
    let text = session.read(&ModuleCall::new("v.to.db")
        .opt("map", map)
        .opt("option", option)
        .opt("type", "line")
        .flags("p"))?;
    parse_first_coordinate(&text)
}

/// Angular coefficient of the first line of the map, from its start and end point
pub fn line_slope(session: &dyn GrassSession, map: &str) -> f64 {
    let ends = end_point(session, map, "start")
        .and_then(|start| Ok((start, end_point(session, map, "end")?)));

    match ends {
        Ok(((x_start, y_start), (x_end, y_end))) => {
            if x_end - x_start != 0. {
                (y_end - y_start) / (x_end - x_start)
            } else {
                VERTICAL_SLOPE
            }
        }
        Err(e) => {
            warn!("Could not read end points of {}: {}", map, e);
            VERTICAL_SLOPE
        }
    }
}

pub fn remove_maps<S: AsRef<str>>(session: &dyn GrassSession, names: &[S]) -> Result<()> {
    if names.is_empty() {
        return Ok(());
    }
    session.run(&ModuleCall::new("g.remove")
        .opt("type", "vector")
        .opt_list("name", names)
        .flags("f")
        .quiet())
}

/// Removes every vector map carrying the process id
pub fn remove_matching(session: &dyn GrassSession, pid: &ProcessId) -> Result<()> {
    session.run(&ModuleCall::new("g.remove")
        .opt("type", "vector")
        .opt("pattern", pid.pattern())
        .flags("f")
        .quiet())
}

/// Same as [`remove_matching`], only logging failures.  Used on error paths.
pub fn cleanup(session: &dyn GrassSession, pid: &ProcessId) {
    if let Err(e) = remove_matching(session, pid) {
        warn!("Could not remove temporary maps {}: {}", pid.pattern(), e);
    }
}

pub fn list_maps(session: &dyn GrassSession, pattern: &str) -> Result<Vec<String>> {
    let text = session.read(&ModuleCall::new("g.list")
        .opt("type", "vector")
        .opt("pattern", pattern)
        .quiet())?;
    Ok(parse_column(&text))
}

#[derive(Clone, Debug, PartialEq)]
pub struct DbConnection {
    pub driver: String,
    pub database: String,
}

pub fn db_connection(session: &dyn GrassSession) -> Result<DbConnection> {
    let text = session.read(&ModuleCall::new("db.connect").flags("g"))?;
    let kv = parse_key_values(&text);

    let driver = kv.get("driver").ok_or(GrassError::MissingKey {
        key: "driver",
        module: "db.connect",
    })?;
    let database = kv.get("database").ok_or(GrassError::MissingKey {
        key: "database",
        module: "db.connect",
    })?;

    Ok(DbConnection {
        driver: driver.clone(),
        database: database.clone(),
    })
}

pub fn set_db_connection(session: &dyn GrassSession, conn: &DbConnection) -> Result<()> {
    session.run(&ModuleCall::new("db.connect")
        .opt("driver", &conn.driver)
        .opt("database", &conn.database))
}

pub fn db_login(session: &dyn GrassSession, user: &str, host: &str, port: u16) -> Result<()> {
    session.run(&ModuleCall::new("db.login")
        .opt("user", user)
        .opt("host", host)
        .opt("port", port)
        .overwrite()
        .quiet())
}


#[cfg(test)]
mod vector_tests {
    use float_cmp::{ApproxEq, F64Margin};

    use crate::session::ModuleOutput;
    use crate::test_util::ScriptedSession;

    use super::*;

    fn margin() -> F64Margin {
        F64Margin { epsilon: 1e-9, ulps: 4 }
    }

    #[test]
    fn test_vector_exists() {
        let session = ScriptedSession::new(|call| {
            match call.get_opt("file") {
                Some("roads") => ModuleOutput::ok("name='roads'\nmapset='PERMANENT'\nfile='/g/roads'\n"),
                _ => ModuleOutput {
                    success: false,
                    code: Some(1),
                    stdout: "name=''\nmapset=''\nfile=''\n".to_string(),
                    stderr: String::new(),
                },
            }
        });

        assert!(vector_exists(&session, "roads").unwrap());
        assert!(!vector_exists(&session, "nothing").unwrap());

        let err = require_vector(&session, "nothing").unwrap_err();
        assert_eq!(err.to_string(), "Vector map <nothing> not found");
    }

    #[test]
    fn test_total_length() {
        let session = ScriptedSession::new(|call| {
            match (call.module.as_str(), call.get_opt("map")) {
                ("v.info", Some("empty")) => ModuleOutput::ok("nodes=0\npoints=0\nlines=0\n"),
                ("v.info", _) => ModuleOutput::ok("nodes=4\npoints=0\nlines=2\n"),
                ("v.to.db", _) => ModuleOutput::ok("cat|length\n1|10.5\n2|4.5\n"),
                _ => ModuleOutput::failed("unexpected"),
            }
        });

        assert!(total_length(&session, "roads").unwrap().approx_eq(15., margin()));
        assert!(total_length(&session, "empty").unwrap().approx_eq(0., margin()));

        // v.to.db is never asked for the empty map
        let calls = session.calls_to("v.to.db");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].get_opt("map"), Some("roads"));
        assert_eq!(calls[0].get_opt("option"), Some("length"));
    }

    #[test]
    fn test_line_slope() {
        let session = ScriptedSession::new(|call| {
            let map = call.get_opt("map").unwrap_or_default();
            let option = call.get_opt("option").unwrap_or_default();
            match (map, option) {
                ("diag", "start") => ModuleOutput::ok("cat|x|y|z\n1|0|0|0\n"),
                ("diag", "end") => ModuleOutput::ok("cat|x|y|z\n1|2|1|0\n"),
                ("vertical", "start") => ModuleOutput::ok("cat|x|y|z\n1|5|0|0\n"),
                ("vertical", "end") => ModuleOutput::ok("cat|x|y|z\n1|5|10|0\n"),
                ("broken", _) => ModuleOutput::ok("cat|x|y|z\n"),
                _ => ModuleOutput::failed("no map"),
            }
        });

        assert!(line_slope(&session, "diag").approx_eq(0.5, margin()));
        assert_eq!(line_slope(&session, "vertical"), VERTICAL_SLOPE);
        assert_eq!(line_slope(&session, "broken"), VERTICAL_SLOPE);
        assert_eq!(line_slope(&session, "missing"), VERTICAL_SLOPE);
    }

    #[test]
    fn test_remove_and_list() {
        let session = ScriptedSession::new(|call| {
            if call.module == "g.list" {
                ModuleOutput::ok("patch_1_0_0\npatch_1_3_7\n")
            } else {
                ModuleOutput::ok("")
            }
        });
        let pid = ProcessId::from_micros(1_000_001);

        remove_maps::<&str>(&session, &[]).unwrap();
        remove_maps(&session, &["a", "b"]).unwrap();
        remove_matching(&session, &pid).unwrap();
        assert_eq!(list_maps(&session, "patch_1_*").unwrap(), vec!["patch_1_0_0", "patch_1_3_7"]);

        let removes = session.calls_to("g.remove");
        assert_eq!(removes.len(), 2);
        assert_eq!(removes[0].get_opt("name"), Some("a,b"));
        assert_eq!(removes[1].get_opt("pattern"), Some("*1_000001*"));
    }

    #[test]
    fn test_db_connection() {
        let session = ScriptedSession::new(|call| {
            if call.has_flag('g') {
                ModuleOutput::ok("driver=sqlite\ndatabase=/g/sqlite.db\n")
            } else {
                ModuleOutput::ok("")
            }
        });

        let conn = db_connection(&session).unwrap();
        assert_eq!(conn, DbConnection { driver: "sqlite".to_string(), database: "/g/sqlite.db".to_string() });

        set_db_connection(&session, &conn).unwrap();
        let calls = session.calls_to("db.connect");
        assert_eq!(calls[1].get_opt("driver"), Some("sqlite"));
        assert_eq!(calls[1].get_opt("database"), Some("/g/sqlite.db"));
    }
}
