//! External tool lookup
//!
//! Both the peripheral probe and the scanner are external programs. A bare
//! program name is resolved against `PATH`; anything containing a path
//! separator is checked as given.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Locate an external program
///
/// Returns `None` if the program is not installed.
pub fn find_tool(program: &str) -> Option<PathBuf> {
    if program.contains(std::path::MAIN_SEPARATOR) || program.contains('/') {
        let path = Path::new(program);
        return path.is_file().then(|| path.to_path_buf());
    }

    match which::which(program) {
        Ok(path) => Some(path),
        Err(e) => {
            debug!("{} not found: {}", program, e);
            None
        }
    }
}
