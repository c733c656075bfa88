//! Build collaborator: project detection and `xcodebuild` invocation.

mod project;
mod xcodebuild;

pub use project::{detect_project, resolve_project, Project};
pub use xcodebuild::{
    app_copy_dir, build, copy_app_bundle, extract_build_error, find_app, list_schemes, parse_scheme_list,
    pick_scheme, read_bundle_id, BuildOutput, BuildRequest,
};
