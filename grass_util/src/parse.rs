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
use std::collections::HashMap;

use anyhow::Result;

use crate::errors::GrassError;

/// `key=value` lines as printed by g.findfile, db.connect -g or v.info -t.
/// Surrounding single quotes are removed from the values.
pub fn parse_key_values(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| {
            let mut it = line.splitn(2, '=');
            let key = it.next()?.trim();
            let value = it.next()?.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim_matches('\'').to_string()))
        })
        .collect()
}

/// Number of line features from `v.info -t`
pub fn parse_feature_count(text: &str) -> Result<u64> {
    let kv = parse_key_values(text);
    let lines = kv.get("lines").ok_or(GrassError::MissingKey {
        key: "lines",
        module: "v.info",
    })?;

    let n = lines.parse::<u64>().map_err(|_| GrassError::Parse {
        value: lines.clone(),
        module: "v.info",
        err: None,
    })?;
    Ok(n)
}

fn parse_f64(value: &str, module: &'static str) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|e| GrassError::Parse {
        value: value.to_string(),
        module,
        err: Some(e),
    }.into())
}

/// Sums the second column of `v.to.db -p option=length`, first row is the header
pub fn parse_length_table(text: &str) -> Result<f64> {
    let mut total = 0.;
    for line in text.lines().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let value = line.split('|').nth(1).ok_or_else(|| GrassError::Parse {
            value: line.to_string(),
            module: "v.to.db",
            err: None,
        })?;
        total += parse_f64(value, "v.to.db")?;
    }
    Ok(total)
}

/// Values printed by `v.db.select -c`, one per line
pub fn parse_column(text: &str) -> Vec<String> {
    text.lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string())
        .collect()
}

/// x and y of the first row of `v.to.db -p option=start` (or end), rows are `cat|x|y|z`
pub fn parse_first_coordinate(text: &str) -> Result<(f64, f64)> {
    let row = text.lines().nth(1).unwrap_or_default();
    let mut fields = row.split('|').skip(1);

    let x = fields.next().unwrap_or_default();
    let y = fields.next().unwrap_or_default();

    Ok((parse_f64(x, "v.to.db")?, parse_f64(y, "v.to.db")?))
}


#[cfg(test)]
mod parse_tests {
    use float_cmp::{ApproxEq, F64Margin};

    use super::*;

    const V_INFO_T: &str = "nodes=12\npoints=0\nlines=7\nboundaries=0\ncentroids=0\nareas=0\nislands=0\nprimitives=7\nmap3d=0\n";

    #[test]
    fn test_key_values() {
        let kv = parse_key_values("name='roads'\nmapset='PERMANENT'\nfile='/grassdata/loc/PERMANENT/vector/roads'\nfullname='roads@PERMANENT'\n");
        assert_eq!(kv["name"], "roads");
        assert_eq!(kv["file"], "/grassdata/loc/PERMANENT/vector/roads");

        let kv = parse_key_values("driver=sqlite\ndatabase=$GISDBASE/$LOCATION_NAME/$MAPSET/sqlite/sqlite.db\n");
        assert_eq!(kv["driver"], "sqlite");
        assert_eq!(kv["database"], "$GISDBASE/$LOCATION_NAME/$MAPSET/sqlite/sqlite.db");

        let kv = parse_key_values("file=''\n\ngarbage\n");
        assert_eq!(kv["file"], "");
        assert_eq!(kv.len(), 1);
    }

    #[test]
    fn test_feature_count() {
        assert_eq!(parse_feature_count(V_INFO_T).unwrap(), 7);
        assert!(parse_feature_count("nodes=1\n").is_err());
        assert!(parse_feature_count("lines=x\n").is_err());
    }

    #[test]
    fn test_length_table() {
        let margin = F64Margin { epsilon: 1e-9, ulps: 4 };
        let total = parse_length_table("cat|length\n1|100.5\n2|49.5\n3|0.25\n").unwrap();
        assert!(total.approx_eq(150.25, margin));

        assert!(parse_length_table("cat|length\n").unwrap().approx_eq(0., margin));
        assert!(parse_length_table("cat|length\n1|abc\n").is_err());
        assert!(parse_length_table("cat|length\n1\n").is_err());
    }

    #[test]
    fn test_column() {
        assert_eq!(parse_column("1\n2\n\n10\n"), vec!["1", "2", "10"]);
        assert!(parse_column("").is_empty());
    }

    #[test]
    fn test_first_coordinate() {
        let (x, y) = parse_first_coordinate("cat|x|y|z\n4|10.5|-3|0\n5|1|1|0\n").unwrap();
        assert_eq!(x, 10.5);
        assert_eq!(y, -3.);

        assert!(parse_first_coordinate("cat|x|y|z\n").is_err());
        assert!(parse_first_coordinate("").is_err());
    }
}
