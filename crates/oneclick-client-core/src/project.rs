//! The generated project is a flat map of file name to file content.

use std::collections::BTreeMap;

pub type ProjectFileSet = BTreeMap<String, String>;

/// The document the preview pane renders.
pub const PREVIEW_DOCUMENT: &str = "index.html";

const DEFAULT_PREVIEW_CONTENT: &str =
    "<h1 style=\"color:cyan; text-align:center; padding:50px;\">Start Building with OneClick Studio...</h1>";

/// File set a fresh session starts with: a single placeholder preview page.
pub fn default_project_files() -> ProjectFileSet {
    let mut files = ProjectFileSet::new();
    files.insert(PREVIEW_DOCUMENT.to_string(), DEFAULT_PREVIEW_CONTENT.to_string());
    files
}

/// Key-wise merge, last write wins. Files absent from `incoming` are kept.
pub fn merge_files(target: &mut ProjectFileSet, incoming: &ProjectFileSet) {
    for (name, content) in incoming {
        target.insert(name.clone(), content.clone());
    }
}
