//! Decompiled application handle.

use crate::{error::Kind, features::FeatureVector};
use anyhow::{Context, Result};
use log::{debug, warn};
use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

/// Suffix the decompiler appends to the package file name for its output folder.
pub const UNCOMPRESSED_SUFFIX: &str = ".uncompressed";
/// Extension of Android application packages.
pub const PACKAGE_EXTENSION: &str = ".apk";
/// Name of the manifest file in the decompiled output.
pub const MANIFEST_FILE: &str = "AndroidManifest.xml";

/// Folders that never contain application code worth inspecting.
const IGNORED_FOLDERS: [&str; 3] = ["original", "classes/android", "classes/com/google/android/gms"];

/// One decompiled application.
///
/// Owns the feature vector once the analysis has finished. The list of source files is collected
/// once when the handle is opened and then shared by every check.
#[derive(Debug)]
pub struct ApplicationHandle {
    name: String,
    path: PathBuf,
    manifest: Option<PathBuf>,
    sources: Vec<PathBuf>,
    features: Option<FeatureVector>,
}

impl ApplicationHandle {
    /// Opens the decompiled application at the given path.
    ///
    /// Fails with `Kind::AppEmpty` if there is nothing to analyze in it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = absolute(path.as_ref())?;
        let name = app_name(&path);

        if !path.is_dir() {
            return Err(Kind::AppEmpty { path }.into());
        }

        let manifest = Some(path.join(MANIFEST_FILE)).filter(|m| m.is_file());
        let mut sources = Vec::new();
        collect_sources(&path, &path, &mut sources)
            .with_context(|| format!("could not list the files in `{}`", path.display()))?;
        sources.sort();

        if manifest.is_none() && sources.is_empty() {
            return Err(Kind::AppEmpty { path }.into());
        }
        debug!(
            "{} source files found for `{}` (manifest: {})",
            sources.len(),
            name,
            manifest.is_some()
        );

        Ok(Self {
            name,
            path,
            manifest,
            sources,
            features: None,
        })
    }

    /// Gets the application name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the root folder of the decompiled application.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the path of the manifest, if the decompiler produced one.
    pub fn manifest(&self) -> Option<&Path> {
        self.manifest.as_deref()
    }

    /// Reads the manifest, if there is one.
    pub fn read_manifest(&self) -> Result<Option<String>> {
        self.manifest
            .as_ref()
            .map(|m| {
                fs::read_to_string(m).with_context(|| format!("could not read `{}`", m.display()))
            })
            .transpose()
    }

    /// Gets the source files (`.java`, `.smali` and `.xml`) of the application, sorted.
    pub fn sources(&self) -> impl Iterator<Item = &Path> {
        self.sources.iter().map(PathBuf::as_path)
    }

    /// Gets the feature vector, once the analysis has been performed.
    pub fn features(&self) -> Option<&FeatureVector> {
        self.features.as_ref()
    }

    /// Attaches the final feature vector.
    pub fn set_features(&mut self, features: FeatureVector) {
        self.features = Some(features);
    }
}

/// Derives the application name from the decompiled folder path.
///
/// `com.example.apk.uncompressed` becomes `com.example`.
pub fn app_name<P: AsRef<Path>>(path: P) -> String {
    let file_name = path
        .as_ref()
        .file_name()
        .map(OsStr::to_string_lossy)
        .unwrap_or_default();
    let name = file_name.trim_end();
    let name = name.strip_suffix(UNCOMPRESSED_SUFFIX).unwrap_or(name);
    let name = name.strip_suffix(PACKAGE_EXTENSION).unwrap_or(name);

    name.to_owned()
}

/// Makes the path absolute against the current directory, without touching the filesystem.
pub fn absolute<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("could not get the current directory")?
            .join(path))
    }
}

fn collect_sources(root: &Path, dir: &Path, sources: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("there was an error reading the directory {}: {}", dir.display(), e);
                return Err(e.into());
            }
        };
        let entry_path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            let relative = entry_path.strip_prefix(root).unwrap_or(entry_path.as_path());
            if IGNORED_FOLDERS.iter().any(|f| relative == Path::new(f)) {
                continue;
            }
            collect_sources(root, &entry_path, sources)?;
        } else if file_type.is_file() {
            let is_source = entry_path
                .extension()
                .and_then(OsStr::to_str)
                .map_or(false, |ext| matches!(ext, "java" | "smali" | "xml"));
            if is_source && entry_path.file_name() != Some(OsStr::new(MANIFEST_FILE)) {
                sources.push(entry_path);
            }
        }
    }

    Ok(())
}
