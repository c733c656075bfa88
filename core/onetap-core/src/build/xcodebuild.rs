//! Building an app for a simulator with `xcodebuild`.
//!
//! Each build gets a fresh derived-data directory that is removed afterwards;
//! the `.app` is copied out to a stable location first so it can still be
//! installed once the build directory is gone.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use super::project::Project;
use crate::command;
use crate::error::{Result, TapError};

const ERROR_LINE_LIMIT: usize = 5;
const TAIL_LINE_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
struct SchemeList {
    workspace: Option<SchemeContainer>,
    project: Option<SchemeContainer>,
}

#[derive(Debug, Deserialize)]
struct SchemeContainer {
    #[serde(default)]
    schemes: Vec<String>,
}

/// Parses `xcodebuild -list -json`. Workspace schemes win over project ones.
///
/// xcodebuild sometimes prints warnings before the JSON body; anything before
/// the first `{` is skipped.
pub fn parse_scheme_list(output: &str) -> Result<Vec<String>> {
    let body = output.find('{').map_or(output, |start| &output[start..]);
    let list: SchemeList = serde_json::from_str(body).map_err(|e| TapError::Json {
        context: "parsing xcodebuild scheme list".to_string(),
        source: e,
    })?;
    Ok(list
        .workspace
        .or(list.project)
        .map(|c| c.schemes)
        .unwrap_or_default())
}

pub fn list_schemes(project: &Project) -> Result<Vec<String>> {
    let Some([flag, path]) = project.xcodebuild_args() else {
        return Ok(Vec::new());
    };
    let output = command::run("xcodebuild", &["-list", "-json", &flag, &path])?;
    parse_scheme_list(&output)
}

/// The only scheme, else the first that isn't a test scheme, else the first.
pub fn pick_scheme(schemes: &[String]) -> Result<String> {
    schemes
        .iter()
        .find(|s| !s.to_lowercase().contains("test"))
        .or_else(|| schemes.first())
        .cloned()
        .ok_or(TapError::NoSchemeFound)
}

#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub project: Project,
    pub scheme: String,
    pub udid: String,
    pub configuration: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    /// Stable copy of the built bundle.
    pub app_path: PathBuf,
    pub bundle_id: String,
}

/// Builds for the simulator, streaming xcodebuild's stdout to `on_line`.
pub fn build(request: &BuildRequest, on_line: &mut dyn FnMut(&str)) -> Result<BuildOutput> {
    let Some([flag, path]) = request.project.xcodebuild_args() else {
        return Err(TapError::BuildFailed(
            "Swift packages without an iOS app project are not supported".to_string(),
        ));
    };

    let derived_data = tempfile::Builder::new()
        .prefix("onetap-build-")
        .tempdir()
        .map_err(|e| TapError::io("creating derived data directory", e))?;
    let derived_data_path = derived_data.path().to_string_lossy().into_owned();
    let destination = format!("platform=iOS Simulator,id={}", request.udid);

    tracing::info!(
        scheme = %request.scheme,
        configuration = %request.configuration,
        udid = %request.udid,
        "Building"
    );

    let args = [
        flag.as_str(),
        path.as_str(),
        "-scheme",
        request.scheme.as_str(),
        "-configuration",
        request.configuration.as_str(),
        "-destination",
        destination.as_str(),
        "-derivedDataPath",
        derived_data_path.as_str(),
        "build",
    ];
    command::run_streaming("xcodebuild", &args, on_line).map_err(build_failure)?;

    let products = derived_data
        .path()
        .join("Build/Products")
        .join(format!("{}-iphonesimulator", request.configuration));
    let app = find_app(&products)?;
    let bundle_id = read_bundle_id(&app)?;
    let app_path = copy_app_bundle(&app, &app_copy_dir(&request.udid))?;

    tracing::debug!(app = %app_path.display(), bundle_id = %bundle_id, "Build products copied");
    Ok(BuildOutput { app_path, bundle_id })
}

/// Keeps xcodebuild's exit code and trims its log to the useful part.
fn build_failure(error: TapError) -> TapError {
    match error {
        TapError::ExternalCommandFailed { code, output, .. } => TapError::XcodebuildFailed {
            code,
            details: extract_build_error(&output),
        },
        other => other,
    }
}

/// Where built bundles for `udid` are kept. One directory per simulator, so
/// sessions building the same app never replace each other's copy.
pub fn app_copy_dir(udid: &str) -> PathBuf {
    std::env::temp_dir().join("onetap-apps").join(udid)
}

/// Condenses a failed build log: the first few `error:` lines, or the tail
/// of the log if there are none.
pub fn extract_build_error(output: &str) -> String {
    let lines: Vec<&str> = output.lines().collect();
    let errors: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|line| line.contains("error:"))
        .take(ERROR_LINE_LIMIT)
        .collect();

    if errors.is_empty() {
        let start = lines.len().saturating_sub(TAIL_LINE_LIMIT);
        lines[start..].join("\n")
    } else {
        errors.join("\n")
    }
}

/// First `.app` bundle in the products directory.
pub fn find_app(products_dir: &Path) -> Result<PathBuf> {
    WalkDir::new(products_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| e.path().extension().is_some_and(|ext| ext == "app"))
        .map(|e| e.into_path())
        .ok_or_else(|| TapError::BuildFailed("No .app found in build products".to_string()))
}

/// Reads `CFBundleIdentifier` from the bundle's `Info.plist` via `plutil`.
pub fn read_bundle_id(app: &Path) -> Result<String> {
    let plist = app.join("Info.plist");
    let plist = plist.to_string_lossy();
    let output = command::run("plutil", &["-extract", "CFBundleIdentifier", "raw", "-o", "-", &plist])
        .map_err(|_| TapError::BuildFailed("Could not read bundle id from built app".to_string()))?;

    let bundle_id = output.trim();
    if bundle_id.is_empty() {
        return Err(TapError::BuildFailed(
            "Could not read bundle id from built app".to_string(),
        ));
    }
    Ok(bundle_id.to_string())
}

/// Copies `app` into `dest_dir`, replacing any earlier copy. Returns the new path.
pub fn copy_app_bundle(app: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let name = app
        .file_name()
        .ok_or_else(|| TapError::BuildFailed(format!("Invalid app path: {}", app.display())))?;
    let target = dest_dir.join(name);

    if target.exists() {
        fs_err::remove_dir_all(&target).map_err(|e| TapError::io("removing previous app copy", e))?;
    }
    fs_err::create_dir_all(&target).map_err(|e| TapError::io("creating app copy directory", e))?;

    for entry in WalkDir::new(app).min_depth(1) {
        let entry = entry.map_err(|e| {
            let message = e.to_string();
            TapError::io(
                "walking app bundle",
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other(message)),
            )
        })?;
        let Ok(relative) = entry.path().strip_prefix(app) else {
            continue;
        };
        let dest = target.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs_err::create_dir_all(&dest).map_err(|e| TapError::io("copying app bundle", e))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &dest)?;
        } else {
            fs_err::copy(entry.path(), &dest).map_err(|e| TapError::io("copying app bundle", e))?;
        }
    }

    Ok(target)
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    let link = fs_err::read_link(src).map_err(|e| TapError::io("reading bundle symlink", e))?;
    std::os::unix::fs::symlink(&link, dest).map_err(|e| TapError::io("copying bundle symlink", e))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    fs_err::copy(src, dest)
        .map(drop)
        .map_err(|e| TapError::io("copying bundle symlink", e))
}
