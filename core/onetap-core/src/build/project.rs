//! Project detection in a working directory.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Result, TapError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Project {
    Workspace(PathBuf),
    XcodeProject(PathBuf),
    /// Detected so the user gets a clear message; not buildable.
    SwiftPackage(PathBuf),
}

impl Project {
    pub fn path(&self) -> &Path {
        match self {
            Project::Workspace(p) | Project::XcodeProject(p) | Project::SwiftPackage(p) => p,
        }
    }

    /// `-workspace <path>` / `-project <path>` for xcodebuild.
    pub fn xcodebuild_args(&self) -> Option<[String; 2]> {
        let path = self.path().to_string_lossy().into_owned();
        match self {
            Project::Workspace(_) => Some(["-workspace".to_string(), path]),
            Project::XcodeProject(_) => Some(["-project".to_string(), path]),
            Project::SwiftPackage(_) => None,
        }
    }
}

/// Finds the project in `dir`.
///
/// One `.xcworkspace` wins; otherwise one `.xcodeproj`; otherwise a
/// `Package.swift`. More than one of the winning kind is an error rather than
/// a guess.
pub fn detect_project(dir: &Path) -> Result<Project> {
    if !dir.is_dir() {
        return Err(TapError::ProjectNotFound(dir.to_path_buf()));
    }

    let mut workspaces = Vec::new();
    let mut projects = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        match entry.path().extension().and_then(|e| e.to_str()) {
            Some("xcworkspace") => workspaces.push(entry.into_path()),
            Some("xcodeproj") => projects.push(entry.into_path()),
            _ => {}
        }
    }

    if let Some(found) = single(workspaces)? {
        return Ok(Project::Workspace(found));
    }
    if let Some(found) = single(projects)? {
        return Ok(Project::XcodeProject(found));
    }
    if dir.join("Package.swift").is_file() {
        return Ok(Project::SwiftPackage(dir.to_path_buf()));
    }

    Err(TapError::ProjectNotFound(dir.to_path_buf()))
}

/// Resolves `--project`: a workspace or project path is used as-is, any other
/// path is searched; no path means the current directory.
pub fn resolve_project(path: Option<&Path>) -> Result<Project> {
    let dir = match path {
        Some(path) => match path.extension().and_then(|e| e.to_str()) {
            Some("xcworkspace") if path.exists() => return Ok(Project::Workspace(path.to_path_buf())),
            Some("xcodeproj") if path.exists() => return Ok(Project::XcodeProject(path.to_path_buf())),
            _ => path.to_path_buf(),
        },
        None => std::env::current_dir().map_err(|e| TapError::io("reading current directory", e))?,
    };
    detect_project(&dir)
}

fn single(mut found: Vec<PathBuf>) -> Result<Option<PathBuf>> {
    match found.len() {
        0 => Ok(None),
        1 => Ok(found.pop()),
        _ => Err(TapError::MultipleProjectsFound(
            found
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect(),
        )),
    }
}
