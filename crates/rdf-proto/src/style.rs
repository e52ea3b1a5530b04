/// Named draw-setting presets loaded from `RDFStyles.json`.
///
/// File layout:
///
/// ```json
/// {
///   "default": "RING",
///   "RING": { "name": "Ring", "circleRadius": 20, ... },
///   "LANGEN": { ... }
/// }
/// ```
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::error::RdfError;
use crate::settings::{DrawSettings, Rgb};

const DEFAULT_KEY: &str = "default";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub name: String,
    pub circle_radius: i32,
    pub circle_precision: i32,
    pub circle_threshold: i32,
    pub low_altitude: i32,
    pub high_altitude: i32,
    pub low_precision: i32,
    pub high_precision: i32,
    #[serde(rename = "rdfRGB")]
    pub rdf_rgb: String,
    #[serde(rename = "rdfConcurRGB")]
    pub rdf_concur_rgb: String,
    pub draw_controller: bool,
}

impl Style {
    /// Copy every field into `settings`.  A colour that does not parse keeps the
    /// previous colour and is reported.
    pub fn apply_to(&self, settings: &mut DrawSettings) -> Vec<RdfError> {
        settings.circle_radius = self.circle_radius;
        settings.circle_precision = self.circle_precision;
        settings.circle_threshold = self.circle_threshold;
        settings.low_altitude = self.low_altitude;
        settings.high_altitude = self.high_altitude;
        settings.low_precision = self.low_precision;
        settings.high_precision = self.high_precision;
        settings.draw_controller = self.draw_controller;

        let mut faults = Vec::new();
        for (raw, target, key) in [
            (&self.rdf_rgb, &mut settings.rdf_color, "rdfRGB"),
            (&self.rdf_concur_rgb, &mut settings.rdf_concurrent_color, "rdfConcurRGB"),
        ] {
            match raw.parse::<Rgb>() {
                Ok(c) => *target = c,
                Err(e) => {
                    let e = RdfError::config(format!("{}.{}", self.name, key), e.to_string());
                    warn!("{}", e);
                    faults.push(e);
                }
            }
        }
        faults
    }

    fn langen() -> Self {
        Style {
            name: "Langen".into(),
            circle_radius: 20,
            circle_precision: 0,
            circle_threshold: 999_999,
            // disabled until switched on
            low_altitude: 999_999,
            high_altitude: 0,
            low_precision: 10,
            high_precision: 20,
            rdf_rgb: "114:150:102".into(),
            rdf_concur_rgb: "114:150:102".into(),
            draw_controller: false,
        }
    }

    fn ring() -> Self {
        Style {
            name: "Ring".into(),
            circle_radius: 20,
            circle_precision: 0,
            circle_threshold: -1,
            low_altitude: 999_999,
            high_altitude: 0,
            low_precision: 0,
            high_precision: 0,
            rdf_rgb: "114:150:102".into(),
            rdf_concur_rgb: "114:150:102".into(),
            draw_controller: false,
        }
    }
}

pub struct StyleManager {
    path: PathBuf,
    styles: BTreeMap<String, Style>,
    default_style: String,
}

impl StyleManager {
    /// Create a manager for `path` and load it.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let mut mgr = Self {
            path: path.as_ref().to_path_buf(),
            styles: BTreeMap::new(),
            default_style: "LANGEN".to_string(),
        };
        mgr.load();
        mgr
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the style file, writing the built-in presets first if it is
    /// missing.  Errors are logged and leave the manager empty.
    pub fn load(&mut self) {
        self.styles.clear();
        if !self.path.exists() {
            if let Err(e) = self.write_default_config() {
                error!("failed to create {:?}: {}", self.path, e);
            }
        }
        if let Err(e) = self.load_inner() {
            error!("Error loading styles: {}", e);
            self.styles.clear();
        }
        info!("loaded {} styles, default {}", self.styles.len(), self.default_style);
    }

    fn load_inner(&mut self) -> anyhow::Result<()> {
        let content = std::fs::read_to_string(&self.path)?;
        let root: Map<String, Value> = serde_json::from_str(&content)?;

        if let Some(Value::String(name)) = root.get(DEFAULT_KEY) {
            self.default_style = name.clone();
        }
        for (key, value) in root {
            if key == DEFAULT_KEY {
                continue;
            }
            let style: Style = serde_json::from_value(value)
                .map_err(|e| anyhow::anyhow!("style {}: {}", key, e))?;
            debug!("style {} -> {}", key, style.name);
            self.styles.insert(key, style);
        }
        Ok(())
    }

    fn write_default_config(&self) -> anyhow::Result<()> {
        let mut root = Map::new();
        root.insert(DEFAULT_KEY.into(), Value::String("RING".into()));
        root.insert("LANGEN".into(), serde_json::to_value(Style::langen())?);
        root.insert("RING".into(), serde_json::to_value(Style::ring())?);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&Value::Object(root))?)?;
        info!("wrote default styles to {:?}", self.path);
        Ok(())
    }

    pub fn styles(&self) -> &BTreeMap<String, Style> {
        &self.styles
    }

    pub fn has_style(&self, key: &str) -> bool {
        self.styles.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Style> {
        self.styles.get(key)
    }

    pub fn default_style(&self) -> Option<&Style> {
        self.get(&self.default_style)
    }
}
