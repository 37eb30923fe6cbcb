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
//! Helpers to drive GRASS GIS modules as subprocesses and read their text output.

pub mod errors;
pub mod parse;
pub mod session;
pub mod temp_names;
pub mod test_util;
pub mod util;
pub mod vector;

pub use errors::GrassError;
pub use session::{CliSession, GrassSession, ModuleCall, ModuleOutput};
pub use temp_names::ProcessId;
