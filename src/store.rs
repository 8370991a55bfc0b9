//! Feature vector persistence.

use crate::{app::ApplicationHandle, config::StoreConfig, features::FeatureVector};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::ser;
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

/// Trait that represents a place where feature vectors can be stored.
pub trait ResultStore {
    /// Stores the feature vector attached to the application, replacing any previous one.
    fn write(&mut self, app: &ApplicationHandle) -> Result<()>;
}

/// Stored representation of one analyzed application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredApp {
    /// Name of the application.
    pub app_name: String,
    /// Features found in the application.
    pub features: FeatureVector,
    /// When the analysis was stored.
    pub analyzed_at: DateTime<Local>,
}

/// Store writing one JSON file per application.
#[derive(Debug, Clone)]
pub struct JsonStore {
    folder: PathBuf,
}

impl JsonStore {
    /// Creates a new JSON store from its configuration.
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            folder: config.results_folder().to_path_buf(),
        }
    }

    /// Gets the file where the given application is stored.
    pub fn file_for<S: AsRef<str>>(&self, app_name: S) -> PathBuf {
        self.folder.join(format!("{}.json", app_name.as_ref()))
    }

    /// Reads back the stored results of an application.
    pub fn read<S: AsRef<str>>(&self, app_name: S) -> Result<StoredApp> {
        let path = self.file_for(app_name);
        let f = BufReader::new(
            File::open(&path).with_context(|| format!("could not open `{}`", path.display()))?,
        );
        serde_json::from_reader(f).with_context(|| format!("could not parse `{}`", path.display()))
    }
}

impl ResultStore for JsonStore {
    fn write(&mut self, app: &ApplicationHandle) -> Result<()> {
        let features = app
            .features()
            .ok_or_else(|| anyhow!("`{}` has not been analyzed yet", app.name()))?;
        let stored = StoredApp {
            app_name: app.name().to_owned(),
            features: *features,
            analyzed_at: Local::now(),
        };

        fs::create_dir_all(&self.folder).with_context(|| {
            format!("could not create the results folder `{}`", self.folder.display())
        })?;

        // A stored vector is either complete or absent.
        let path = self.file_for(app.name());
        let tmp_path = path.with_extension("json.tmp");
        {
            let mut f = BufWriter::new(
                File::create(&tmp_path)
                    .with_context(|| format!("could not create `{}`", tmp_path.display()))?,
            );
            ser::to_writer_pretty(&mut f, &stored)?;
            f.flush()?;
        }
        fs::rename(&tmp_path, &path)
            .with_context(|| format!("could not write `{}`", path.display()))?;

        Ok(())
    }
}

/// Appends one JSON line per record to a file.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    /// Creates a ledger writing to the given file.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Appends a record to the ledger.
    pub fn append<T: Serialize>(&self, record: &T) -> Result<()> {
        let mut f = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("could not open the ledger `{}`", self.path.display()))?;
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        f.write_all(&line)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{JsonStore, Ledger, ResultStore};
    use crate::{
        app::ApplicationHandle,
        config::StoreConfig,
        features::{Feature, FeatureVector},
    };
    use serde_json::Value;
    use std::fs;

    fn analyzed_app(root: &std::path::Path, features: FeatureVector) -> ApplicationHandle {
        fs::create_dir_all(root).unwrap();
        fs::write(root.join("AndroidManifest.xml"), "<manifest/>").unwrap();
        let mut app = ApplicationHandle::open(root).unwrap();
        app.set_features(features);
        app
    }

    #[test]
    fn it_json_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(&StoreConfig::new(dir.path().join("results")));

        let mut features = FeatureVector::default();
        features.set(Feature::Internet, true);
        features.set(Feature::UseSsl, true);
        let app = analyzed_app(&dir.path().join("com.example.apk.uncompressed"), features);

        store.write(&app).unwrap();
        let stored = store.read("com.example").unwrap();
        assert_eq!(stored.app_name, "com.example");
        assert_eq!(stored.features, features);

        // Overwriting keeps a single, up to date entry.
        let mut app = app;
        features.set(Feature::Sharing, true);
        app.set_features(features);
        store.write(&app).unwrap();
        assert_eq!(store.read("com.example").unwrap().features, features);
        assert_eq!(fs::read_dir(dir.path().join("results")).unwrap().count(), 1);
    }

    #[test]
    fn it_json_store_refuses_unanalyzed_apps() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(&StoreConfig::new(dir.path().join("results")));
        let root = dir.path().join("raw.apk.uncompressed");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("AndroidManifest.xml"), "<manifest/>").unwrap();
        let app = ApplicationHandle::open(&root).unwrap();

        assert!(store.write(&app).is_err());
        assert!(!store.file_for("raw").exists());
    }

    #[test]
    fn it_ledger_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("ledger.jsonl"));
        ledger.append(&serde_json::json!({"index": 1})).unwrap();
        ledger.append(&serde_json::json!({"index": 2})).unwrap();

        let content = fs::read_to_string(dir.path().join("ledger.jsonl")).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["index"], 2);
    }
}
