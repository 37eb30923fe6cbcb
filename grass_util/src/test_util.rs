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
//! A fake GRASS session for tests, answering module calls from a closure and
//! recording every call it receives.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use uuid::Uuid;

use crate::session::{GrassSession, ModuleCall, ModuleOutput};

type Responder = Box<dyn Fn(&ModuleCall) -> ModuleOutput + Send + Sync>;

pub struct ScriptedSession {
    responder: Responder,
    calls: Mutex<Vec<ModuleCall>>,
}

impl ScriptedSession {
    pub fn new<F>(responder: F) -> Self
        where F: Fn(&ModuleCall) -> ModuleOutput + Send + Sync + 'static
    {
        ScriptedSession {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ModuleCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, module: &str) -> Vec<ModuleCall> {
        self.calls().into_iter().filter(|c| c.module == module).collect()
    }
}

impl GrassSession for ScriptedSession {
    fn output(&self, call: &ModuleCall) -> Result<ModuleOutput> {
        self.calls.lock().unwrap().push(call.clone());
        Ok((self.responder)(call))
    }
}

/// A fresh empty directory under the system temp dir
pub fn get_temp_dir(name: &str) -> PathBuf {
    let dir: PathBuf = [env::temp_dir(), PathBuf::from(Uuid::new_v4().to_string()), PathBuf::from(name)]
        .iter().collect();
    fs::create_dir_all(&dir).unwrap();
    dir
}
