//! Program loading.
//!
//! This module is responsible for:
//! - Reading the program source from disk.
//! - Compiling it into its module unit.
//!
//! It has no knowledge of instrumentation, so a loaded program can be run
//! directly or handed to the debugger unchanged.

use crate::runtime::compiler::compile_program;
use crate::runtime::unit::CompiledUnit;
use crate::{DebuggerError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::info;

/// Output of a successful [`load_program`] call.
#[derive(Debug)]
pub struct LoadedProgram {
    pub path: PathBuf,
    pub source: Rc<str>,
    pub unit: CompiledUnit,
}

/// Read and compile the program at `path`.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_program(path: &Path) -> Result<LoadedProgram> {
    info!("Loading program");

    let source = fs::read_to_string(path).map_err(|e| {
        DebuggerError::LoadError(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let filename = path.display().to_string();
    let unit = compile_program(&source, &filename)
        .map_err(|e| DebuggerError::SyntaxError(format!("{}: {}", filename, e)))?;

    info!(
        instructions = unit.len(),
        units = unit.walk().len(),
        "Program compiled"
    );

    Ok(LoadedProgram {
        path: path.to_path_buf(),
        source: Rc::from(source),
        unit,
    })
}
