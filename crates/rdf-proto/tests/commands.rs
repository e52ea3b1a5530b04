use rdf_proto::command::{Command, CommandTarget};
use rdf_proto::settings::{FileSettings, Rgb, SettingsSource, SettingsStore, GLOBAL_SURFACE};
use rdf_proto::style::StyleManager;

fn run(store: &SettingsStore, file: &std::sync::Arc<FileSettings>, styles: &StyleManager, surface: i32, line: &str) -> bool {
    let Some(cmd) = Command::parse(line) else {
        return false;
    };
    let scope = file.scope(surface);
    CommandTarget {
        store,
        surface,
        source: &scope,
        styles,
    }
    .apply(&cmd)
}

#[test]
fn test_surface_commands_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let settings_path = dir.path().join("settings.toml");
    let styles = StyleManager::new(dir.path().join("RDFStyles.json"));
    let file = FileSettings::open(&settings_path).unwrap();
    let store = SettingsStore::new();

    assert!(run(&store, &file, &styles, 3, ".RDF radius 35"));
    assert!(run(&store, &file, &styles, 3, ".rdf rgb 10:20:30"));
    assert!(run(&store, &file, &styles, GLOBAL_SURFACE, ".RDF altitude L1500"));
    assert!(!run(&store, &file, &styles, 3, ".RDF radius 0"));
    assert!(!run(&store, &file, &styles, 3, ".RDF bogus 1"));

    // a fresh store rebuilt from the file sees the same values
    let reopened = FileSettings::open(&settings_path).unwrap();
    let fresh = SettingsStore::new();
    let global = reopened.scope(GLOBAL_SURFACE);
    let surface = reopened.scope(3);
    assert!(fresh.load(GLOBAL_SURFACE, None, &global).is_empty());
    assert!(fresh.load(3, Some(&surface), &global).is_empty());

    let s3 = fresh.get(3);
    assert_eq!(s3.circle_radius, 35);
    assert_eq!(s3.rdf_color, Rgb::new(10, 20, 30));
    assert_eq!(s3.low_altitude, 1500);
    assert_eq!(fresh.get(GLOBAL_SURFACE).circle_radius, 20);
}

#[test]
fn test_style_command_applies_preset() {
    let dir = tempfile::tempdir().unwrap();
    let styles = StyleManager::new(dir.path().join("RDFStyles.json"));
    let file = FileSettings::open(dir.path().join("settings.toml")).unwrap();
    let store = SettingsStore::new();

    let ring = styles.get("RING").unwrap().clone();
    assert!(run(&store, &file, &styles, GLOBAL_SURFACE, ".RDF style ring"));
    let applied = store.get(GLOBAL_SURFACE);
    let mut expected = rdf_proto::settings::DrawSettings::default();
    assert!(ring.apply_to(&mut expected).is_empty());
    assert_eq!(applied, expected);

    // unknown styles are reported but still count as handled
    assert!(run(&store, &file, &styles, GLOBAL_SURFACE, ".RDF style nope"));
    assert_eq!(store.get(GLOBAL_SURFACE), expected);
}

#[test]
fn test_style_on_unseen_surface() {
    let dir = tempfile::tempdir().unwrap();
    let styles = StyleManager::new(dir.path().join("RDFStyles.json"));
    let file = FileSettings::open(dir.path().join("settings.toml")).unwrap();
    let store = SettingsStore::new();
    store.update(GLOBAL_SURFACE, |s| s.circle_radius = 44);

    assert!(run(&store, &file, &styles, 7, ".RDF STYLE langen"));
    assert_eq!(store.surfaces(), vec![-1, 7]);

    let langen = styles.get("LANGEN").unwrap();
    let s7 = store.get(7);
    assert_eq!(s7.circle_radius, langen.circle_radius);
    assert_eq!(s7.circle_threshold, langen.circle_threshold);
    assert_eq!(store.get(GLOBAL_SURFACE).circle_radius, 44);

    assert_eq!(file.scope(7).get("Style").as_deref(), Some(langen.name.as_str()));
    assert_eq!(file.scope(GLOBAL_SURFACE).get("Style"), None);
    assert_eq!(file.surfaces(), vec![7]);
}
