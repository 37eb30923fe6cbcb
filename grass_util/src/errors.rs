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
use std::num::ParseFloatError;

use thiserror::Error;


#[derive(Clone, PartialEq, Debug, Error)]
pub enum GrassError {
    #[error("Vector map <{0}> not found")]
    MapNotFound(String),
    #[error(
        "Could not start GRASS module '{}': {}",
        module, msg
    )]
    Spawn {
        module: String,
        msg: String,
    },
    #[error(
        "GRASS module '{}' failed with exit code {:?}. Error msg: '{}'",
        module, code, stderr
    )]
    ModuleFailed {
        module: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("Missing key '{}' in output of {}", key, module)]
    MissingKey {
        key: &'static str,
        module: &'static str,
    },
    #[error("Could not parse '{}' in output of {}: {:?}", value, module, err)]
    Parse {
        value: String,
        module: &'static str,
        err: Option<ParseFloatError>,
    },
}
