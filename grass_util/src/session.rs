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
use std::fmt;
use std::process::Command;

use anyhow::Result;
use itertools::Itertools;
use log::{debug, trace};

use crate::errors::GrassError;

/// One invocation of a GRASS module, e.g. `v.buffer input=roads output=b distance=5 --quiet`
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleCall {
    pub module: String,
    pub options: Vec<(String, String)>,
    pub flags: String,
    pub overwrite: bool,
    pub quiet: bool,
}

impl ModuleCall {
    pub fn new(module: &str) -> Self {
        ModuleCall {
            module: module.to_string(),
            options: Vec::new(),
            flags: String::new(),
            overwrite: false,
            quiet: false,
        }
    }

    pub fn opt<V: ToString>(mut self, key: &str, value: V) -> Self {
        self.options.push((key.to_string(), value.to_string()));
        self
    }

    /// Multiple answers for the same option are comma separated
    pub fn opt_list<V: AsRef<str>>(self, key: &str, values: &[V]) -> Self {
        let joined = values.iter().map(|v| v.as_ref()).join(",");
        self.opt(key, joined)
    }

    pub fn flags(mut self, flags: &str) -> Self {
        self.flags.push_str(flags);
        self
    }

    pub fn overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }

    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    pub fn get_opt(&self, key: &str) -> Option<&str> {
        self.options.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_flag(&self, flag: char) -> bool {
        self.flags.contains(flag)
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.options.len() + 3);

        if !self.flags.is_empty() {
            args.push(format!("-{}", self.flags));
        }
        for (k, v) in self.options.iter() {
            args.push(format!("{}={}", k, v));
        }
        if self.overwrite {
            args.push("--overwrite".to_string());
        }
        if self.quiet {
            args.push("--quiet".to_string());
        }

        args
    }
}

impl fmt::Display for ModuleCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.module, self.to_args().join(" "))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModuleOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ModuleOutput {
    pub fn ok(stdout: &str) -> Self {
        ModuleOutput {
            success: true,
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: &str) -> Self {
        ModuleOutput {
            success: false,
            code: Some(1),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    fn into_checked(self, module: &str) -> Result<ModuleOutput> {
        if !self.success {
            return Err(GrassError::ModuleFailed {
                module: module.to_string(),
                code: self.code,
                stderr: self.stderr.trim().to_string(),
            }.into());
        }
        Ok(self)
    }
}

/// Something able to execute GRASS modules against a location/mapset.
///
/// Shared between worker threads, hence `Send + Sync`.
pub trait GrassSession: Send + Sync {

    /// Runs the module and returns whatever it printed, even if it failed
    fn output(&self, call: &ModuleCall) -> Result<ModuleOutput>;

    /// Runs the module, failing on a non zero exit code
    fn run(&self, call: &ModuleCall) -> Result<()> {
        self.output(call)?.into_checked(&call.module)?;
        Ok(())
    }

    /// Runs the module and returns its standard output
    fn read(&self, call: &ModuleCall) -> Result<String> {
        Ok(self.output(call)?.into_checked(&call.module)?.stdout)
    }
}

/// Spawns the module executables.
///
/// Inside a running GRASS session the modules are on the PATH and no prefix is needed.
/// From outside, a prefix such as `grass /data/grassdata/location/mapset --exec` starts
/// a throwaway session per call.
#[derive(Clone, Debug, Default)]
pub struct CliSession {
    exec_prefix: Vec<String>,
}

impl CliSession {
    pub fn new() -> Self {
        CliSession::default()
    }

    pub fn with_exec_prefix(exec: &str) -> Self {
        CliSession {
            exec_prefix: exec.split_whitespace().map(|s| s.to_string()).collect(),
        }
    }

    pub fn exec_prefix(&self) -> &[String] {
        &self.exec_prefix
    }

    fn command(&self, call: &ModuleCall) -> Command {
        let mut cmd = match self.exec_prefix.split_first() {
            Some((program, rest)) => {
                let mut c = Command::new(program);
                c.args(rest).arg(&call.module);
                c
            }
            None => Command::new(&call.module),
        };
        cmd.args(call.to_args());
        cmd
    }
}

impl GrassSession for CliSession {
    fn output(&self, call: &ModuleCall) -> Result<ModuleOutput> {
        debug!("Running {}", call);

        let out = self.command(call).output().map_err(|e| GrassError::Spawn {
            module: call.module.clone(),
            msg: e.to_string(),
        })?;

        let r = ModuleOutput {
            success: out.status.success(),
            code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        };

        trace!("{} exit {:?}\n{}", call.module, r.code, r.stdout);

        Ok(r)
    }
}


#[cfg(test)]
mod session_tests {
    use super::*;

    #[test]
    fn test_module_call_args() {
        let call = ModuleCall::new("v.overlay")
            .opt("ainput", "roads")
            .opt("binput", "buf")
            .opt("operator", "and")
            .flags("t")
            .overwrite()
            .quiet();

        assert_eq!(call.to_args(), vec![
            "-t", "ainput=roads", "binput=buf", "operator=and", "--overwrite", "--quiet"
        ]);
        assert_eq!(call.to_string(),
                   "v.overlay -t ainput=roads binput=buf operator=and --overwrite --quiet");
        assert_eq!(call.get_opt("operator"), Some("and"));
        assert!(call.has_flag('t'));
        assert!(!call.has_flag('c'));
    }

    #[test]
    fn test_opt_list_and_numbers() {
        let call = ModuleCall::new("g.remove")
            .opt("type", "vector")
            .opt_list("name", &["a", "b", "c"])
            .opt("distance", 0.0001)
            .opt("threshold", 5.0);

        assert_eq!(call.to_args(), vec![
            "type=vector", "name=a,b,c", "distance=0.0001", "threshold=5"
        ]);
    }

    #[test]
    fn test_exec_prefix() {
        let s = CliSession::with_exec_prefix("grass  /data/loc/PERMANENT --exec");
        assert_eq!(s.exec_prefix(), &["grass", "/data/loc/PERMANENT", "--exec"]);

        let cmd = s.command(&ModuleCall::new("v.info").opt("map", "roads").flags("t"));
        assert_eq!(cmd.get_program(), "grass");
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["/data/loc/PERMANENT", "--exec", "v.info", "-t", "map=roads"]);
    }

    #[test]
    fn test_missing_executable() {
        let s = CliSession::new();
        let r = s.output(&ModuleCall::new("v.this_module_does_not_exist_anywhere"));
        let err = r.unwrap_err();
        match err.downcast_ref::<GrassError>() {
            Some(GrassError::Spawn { module, .. }) => {
                assert_eq!(module, "v.this_module_does_not_exist_anywhere");
            }
            _ => panic!("unexpected error {:?}", err),
        }
    }

    #[test]
    fn test_checked_failure() {
        let out = ModuleOutput::failed("ERROR: boom\n");
        let err = out.into_checked("v.buffer").unwrap_err();
        assert_eq!(err.to_string(),
                   "GRASS module 'v.buffer' failed with exit code Some(1). Error msg: 'ERROR: boom'");
    }
}
