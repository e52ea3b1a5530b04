/// Per-surface draw settings.
///
/// Surface `-1` is the plugin-global default.  Every other surface gets a clone
/// of `-1` the first time it is looked up and is mutated independently from then
/// on.  Readers (draw-position generation) vastly outnumber writers (reload and
/// commands), hence the `RwLock`.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use tracing::{debug, trace, warn};

use crate::error::{RdfError, Result};

pub const GLOBAL_SURFACE: i32 = -1;

// ── setting keys ──────────────────────────────────────────────────────────────

pub const SETTING_RGB: &str = "RGB";
pub const SETTING_CONCURRENT_RGB: &str = "ConcurrentTransmissionRGB";
pub const SETTING_CIRCLE_RADIUS: &str = "Radius";
pub const SETTING_THRESHOLD: &str = "Threshold";
pub const SETTING_PRECISION: &str = "Precision";
pub const SETTING_LOW_ALTITUDE: &str = "LowAltitude";
pub const SETTING_HIGH_ALTITUDE: &str = "HighAltitude";
pub const SETTING_LOW_PRECISION: &str = "LowPrecision";
pub const SETTING_HIGH_PRECISION: &str = "HighPrecision";
pub const SETTING_DRAW_CONTROLLERS: &str = "DrawControllers";
pub const SETTING_STYLE: &str = "Style";
pub const SETTING_ENDPOINT: &str = "TrackAudioEndpoint";
pub const SETTING_HELPER_MODE: &str = "TrackAudioMode";
pub const SETTING_LOG_LEVEL: &str = "LogLevel";

// ── colour ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

fn rgb_regex() -> &'static Regex {
    static RX: OnceLock<Regex> = OnceLock::new();
    RX.get_or_init(|| Regex::new(r"^(\d{1,3}):(\d{1,3}):(\d{1,3})$").expect("valid rgb regex"))
}

impl FromStr for Rgb {
    type Err = RdfError;

    /// `r:g:b`, each component 0..=255.
    fn from_str(s: &str) -> Result<Self> {
        let caps = rgb_regex()
            .captures(s.trim())
            .ok_or_else(|| RdfError::parse(format!("not an r:g:b colour: {s:?}")))?;
        let mut parts = [0u8; 3];
        for (i, part) in parts.iter_mut().enumerate() {
            let v: u16 = caps[i + 1].parse()?;
            *part = u8::try_from(v)
                .map_err(|_| RdfError::parse(format!("colour component out of range: {v}")))?;
        }
        Ok(Rgb::new(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.r, self.g, self.b)
    }
}

// ── DrawSettings ──────────────────────────────────────────────────────────────

/// How transmissions are drawn on one surface.
///
/// * `low_altitude` filters targets regardless of anything else.
/// * `circle_threshold < 0`: fixed-pixel mode, `circle_radius` in pixels,
///   `circle_precision` as jitter offset, low/high ignored.
/// * precision mode otherwise: see `draw::DrawPositionGenerator`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawSettings {
    pub circle_radius: i32,
    pub circle_precision: i32,
    pub circle_threshold: i32,
    pub low_altitude: i32,
    pub high_altitude: i32,
    pub low_precision: i32,
    pub high_precision: i32,
    pub rdf_color: Rgb,
    pub rdf_concurrent_color: Rgb,
    pub draw_controller: bool,
}

impl Default for DrawSettings {
    fn default() -> Self {
        Self {
            circle_radius: 20,
            circle_precision: 0,
            circle_threshold: -1,
            low_altitude: 0,
            high_altitude: 0,
            low_precision: 0,
            high_precision: 0,
            rdf_color: Rgb::new(255, 255, 255),
            rdf_concurrent_color: Rgb::new(255, 0, 0),
            draw_controller: false,
        }
    }
}

// ── key/value sources ─────────────────────────────────────────────────────────

/// A string key/value settings store owned by the host (plugin settings file,
/// per-display data, ...).
pub trait SettingsSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, description: &str, value: &str);
}

/// Surface lookup falls back to the global source when the surface has no value.
fn lookup(key: &str, surface: Option<&dyn SettingsSource>, global: &dyn SettingsSource) -> Option<String> {
    surface
        .and_then(|s| s.get(key))
        .or_else(|| global.get(key))
        .filter(|v| !v.trim().is_empty())
}

fn parse_int(key: &str, raw: &str, accept: impl Fn(i32) -> bool) -> Result<i32> {
    let v: i32 = raw
        .trim()
        .parse()
        .map_err(|_| RdfError::config(key, format!("not an integer: {raw:?}")))?;
    if accept(v) {
        Ok(v)
    } else {
        Err(RdfError::config(key, format!("value out of range: {v}")))
    }
}

// ── SettingsStore ─────────────────────────────────────────────────────────────

pub struct SettingsStore {
    surfaces: RwLock<HashMap<i32, DrawSettings>>,
    /// Surface whose settings drive draw-position generation.
    active: AtomicI32,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore {
    pub fn new() -> Self {
        let mut surfaces = HashMap::new();
        surfaces.insert(GLOBAL_SURFACE, DrawSettings::default());
        Self {
            surfaces: RwLock::new(surfaces),
            active: AtomicI32::new(GLOBAL_SURFACE),
        }
    }

    /// Settings for `surface`, seeding it from the global entry if unknown.
    pub fn get(&self, surface: i32) -> DrawSettings {
        {
            let guard = self.surfaces.read().unwrap_or_else(|e| e.into_inner());
            if let Some(s) = guard.get(&surface) {
                return s.clone();
            }
        }
        let mut guard = self.surfaces.write().unwrap_or_else(|e| e.into_inner());
        Self::entry(&mut guard, surface).clone()
    }

    fn entry(map: &mut HashMap<i32, DrawSettings>, surface: i32) -> &mut DrawSettings {
        if !map.contains_key(&surface) {
            let seed = map.get(&GLOBAL_SURFACE).cloned().unwrap_or_default();
            debug!("seeding settings for surface {} from global", surface);
            map.insert(surface, seed);
        }
        map.entry(surface).or_default()
    }

    /// Mutate one surface under the write lock.
    pub fn update<R>(&self, surface: i32, f: impl FnOnce(&mut DrawSettings) -> R) -> R {
        let mut guard = self.surfaces.write().unwrap_or_else(|e| e.into_inner());
        f(Self::entry(&mut guard, surface))
    }

    pub fn set_active(&self, surface: i32) {
        self.active.store(surface, Ordering::Relaxed);
    }

    pub fn active(&self) -> i32 {
        self.active.load(Ordering::Relaxed)
    }

    pub fn active_settings(&self) -> DrawSettings {
        self.get(self.active())
    }

    /// Known surface ids, global first.
    pub fn surfaces(&self) -> Vec<i32> {
        let guard = self.surfaces.read().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<i32> = guard.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Forget every surface and reseed the global entry with defaults.
    pub fn reset(&self) {
        let mut guard = self.surfaces.write().unwrap_or_else(|e| e.into_inner());
        guard.clear();
        guard.insert(GLOBAL_SURFACE, DrawSettings::default());
    }

    /// Load `surface` from its own source (if any) with fallback to `global`.
    ///
    /// Each key is applied independently; a bad value leaves the field as it
    /// was and is reported in the returned list.
    pub fn load(
        &self,
        surface: i32,
        surface_source: Option<&dyn SettingsSource>,
        global: &dyn SettingsSource,
    ) -> Vec<RdfError> {
        debug!("loading drawing settings, surface {}", surface);
        let get = |key: &str| lookup(key, surface_source, global);
        let mut faults = Vec::new();

        self.update(surface, |ds| {
            let mut record = |r: Result<()>| {
                if let Err(e) = r {
                    warn!("{}", e);
                    faults.push(e);
                }
            };

            if let Some(v) = get(SETTING_RGB) {
                record(v.parse::<Rgb>().map(|c| ds.rdf_color = c).map_err(|e| RdfError::config(SETTING_RGB, e.to_string())));
            }
            if let Some(v) = get(SETTING_CONCURRENT_RGB) {
                record(
                    v.parse::<Rgb>()
                        .map(|c| ds.rdf_concurrent_color = c)
                        .map_err(|e| RdfError::config(SETTING_CONCURRENT_RGB, e.to_string())),
                );
            }

            let ints: [(&str, &mut i32, fn(i32) -> bool); 7] = [
                (SETTING_CIRCLE_RADIUS, &mut ds.circle_radius, |v| v > 0),
                (SETTING_THRESHOLD, &mut ds.circle_threshold, |_| true),
                (SETTING_PRECISION, &mut ds.circle_precision, |v| v >= 0),
                (SETTING_LOW_ALTITUDE, &mut ds.low_altitude, |_| true),
                (SETTING_HIGH_ALTITUDE, &mut ds.high_altitude, |v| v > 0),
                (SETTING_LOW_PRECISION, &mut ds.low_precision, |v| v >= 0),
                (SETTING_HIGH_PRECISION, &mut ds.high_precision, |v| v >= 0),
            ];
            for (key, field, accept) in ints {
                if let Some(v) = get(key) {
                    record(parse_int(key, &v, accept).map(|parsed| {
                        trace!("{}: {}", key, parsed);
                        *field = parsed;
                    }));
                }
            }

            if let Some(v) = get(SETTING_DRAW_CONTROLLERS) {
                record(parse_int(SETTING_DRAW_CONTROLLERS, &v, |_| true).map(|n| ds.draw_controller = n != 0));
            }
        });

        faults
    }
}

// ── FileSettings ──────────────────────────────────────────────────────────────

/// TOML-backed settings file: one table per surface (`global`, `surface-0`, ...)
/// of string values.  Writes are flushed immediately.
pub struct FileSettings {
    path: PathBuf,
    tables: Mutex<BTreeMap<String, BTreeMap<String, String>>>,
}

impl FileSettings {
    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Arc<Self>> {
        let path = path.as_ref().to_path_buf();
        let tables = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content)?
        } else {
            BTreeMap::new()
        };
        Ok(Arc::new(Self {
            path,
            tables: Mutex::new(tables),
        }))
    }

    pub fn table_name(surface: i32) -> String {
        if surface == GLOBAL_SURFACE {
            "global".to_string()
        } else {
            format!("surface-{surface}")
        }
    }

    /// Settings view for one surface.
    pub fn scope(self: &Arc<Self>, surface: i32) -> ScopedSettings {
        ScopedSettings {
            file: Arc::clone(self),
            table: Self::table_name(surface),
        }
    }

    /// Surfaces that have a table of their own in the file.
    pub fn surfaces(&self) -> Vec<i32> {
        let tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables
            .keys()
            .filter_map(|name| name.strip_prefix("surface-")?.parse().ok())
            .filter(|surface| *surface != GLOBAL_SURFACE)
            .collect()
    }

    fn save(&self, tables: &BTreeMap<String, BTreeMap<String, String>>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, toml::to_string_pretty(tables)?)?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct ScopedSettings {
    file: Arc<FileSettings>,
    table: String,
}

impl SettingsSource for ScopedSettings {
    fn get(&self, key: &str) -> Option<String> {
        let tables = self.file.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables.get(&self.table).and_then(|t| t.get(key)).cloned()
    }

    fn set(&self, key: &str, description: &str, value: &str) {
        let mut tables = self.file.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables
            .entry(self.table.clone())
            .or_default()
            .insert(key.to_string(), value.to_string());
        debug!("[{}] {} ({}) = {}", self.table, key, description, value);
        if let Err(e) = self.file.save(&tables) {
            warn!("failed to save settings to {:?}: {}", self.file.path, e);
        }
    }
}
