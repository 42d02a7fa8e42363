//! Builtin fixups run against the in-memory catalog.

mod common;

use common::{
    config, config_at, document, episode, mappings, movie, show, strings, Call, MemoryCatalog,
    TableProbe,
};
use mediafixup_core::catalog::{ItemEdit, ItemField, SectionType, TagField};
use mediafixup_core::config::{ConfigFile, GenreCleanupEntry};
use mediafixup_core::fixup::{Fixup, RunContext};
use mediafixup_core::fixups::{
    PreserveCollections, SyncSortTitle, SyncTitle, VideoGenreCleanup,
};
use mediafixup_core::{CollectionsCache, FixupError};
use std::sync::Arc;
use tempfile::TempDir;

const LIVE: RunContext = RunContext {
    dry_run: false,
    verbose: true,
};
const DRY: RunContext = RunContext {
    dry_run: true,
    verbose: false,
};

fn args(yaml: &str) -> serde_yaml::Mapping {
    serde_yaml::from_str(if yaml.is_empty() { "{}" } else { yaml }).unwrap()
}

/// Reads made by a run, without the reloads that verify a write.
fn reads_outside_verification(catalog: &MemoryCatalog) -> Vec<Call> {
    let calls = catalog.calls();
    calls
        .iter()
        .enumerate()
        .filter(|(i, call)| {
            let verifies = matches!(call, Call::Reload(_)) && *i > 0 && calls[i - 1].is_write();
            !call.is_write() && !verifies
        })
        .map(|(_, call)| call.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// sync_sort_title
// ---------------------------------------------------------------------------

fn sort_title_catalog() -> MemoryCatalog {
    let catalog = MemoryCatalog::new();
    catalog.add_section("1", SectionType::Movie, "Movies");
    catalog.add_section("2", SectionType::Show, "TV Shows");
    catalog.add_item(movie("10", "1", "Die Hard", "Die Hard"));
    catalog.add_item(movie("11", "1", "Die Hard 2", "D"));
    catalog.add_item(show("20", "2", "Fargo"));
    catalog.add_episode("20", episode("21", "2", "The Crocodile's Dilemma", "x"));
    catalog
}

#[tokio::test]
async fn test_sort_title_converges() {
    let catalog = sort_title_catalog();
    let config = config(document());

    SyncSortTitle
        .run(&catalog, LIVE, &config, &args(""))
        .await
        .unwrap();

    assert_eq!(
        catalog.writes(),
        vec![
            Call::Edit(
                "11".into(),
                ItemEdit::SetField {
                    field: ItemField::TitleSort,
                    value: "Die Hard 2".into(),
                    lock: true,
                }
            ),
            Call::Edit(
                "21".into(),
                ItemEdit::SetField {
                    field: ItemField::TitleSort,
                    value: "The Crocodile's Dilemma".into(),
                    lock: true,
                }
            ),
        ]
    );
    let reloads = catalog
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Reload(_)))
        .count();
    assert_eq!(reloads, 2);
    assert_eq!(catalog.item("11").title_sort, "Die Hard 2");
}

#[tokio::test]
async fn test_sort_title_is_idempotent() {
    let catalog = sort_title_catalog();
    let config = config(document());
    let args = args("remove_punctuation: true\n");

    SyncSortTitle.run(&catalog, LIVE, &config, &args).await.unwrap();
    assert!(!catalog.writes().is_empty());
    assert_eq!(catalog.item("21").title_sort, "The Crocodiles Dilemma");

    catalog.clear_calls();
    SyncSortTitle.run(&catalog, LIVE, &config, &args).await.unwrap();
    assert!(catalog.writes().is_empty());
}

#[tokio::test]
async fn test_dry_run_reads_the_same_and_writes_nothing() {
    let live = sort_title_catalog();
    let dry = sort_title_catalog();
    let config = config(document());

    SyncSortTitle.run(&dry, DRY, &config, &args("")).await.unwrap();
    SyncSortTitle.run(&live, LIVE, &config, &args("")).await.unwrap();

    assert!(dry.writes().is_empty());
    assert_eq!(dry.item("11").title_sort, "D");
    assert!(!live.writes().is_empty());
    assert_eq!(dry.reads(), reads_outside_verification(&live));
}

#[tokio::test]
async fn test_sort_title_section_selection() {
    let catalog = sort_title_catalog();
    let config = config(document());

    SyncSortTitle
        .run(&catalog, LIVE, &config, &args("section_types: show\n"))
        .await
        .unwrap();
    assert_eq!(catalog.item("11").title_sort, "D");
    assert_eq!(catalog.item("21").title_sort, "The Crocodile's Dilemma");

    catalog.clear_calls();
    SyncSortTitle
        .run(&catalog, LIVE, &config, &args("section_pattern: '^Film'\n"))
        .await
        .unwrap();
    assert_eq!(catalog.calls(), vec![Call::Sections]);
}

#[tokio::test]
async fn test_sort_title_verification_mismatch() {
    let catalog = sort_title_catalog();
    catalog.ignore_edits();
    let config = config(document());

    let err = SyncSortTitle
        .run(&catalog, LIVE, &config, &args(""))
        .await
        .unwrap_err();

    match err {
        FixupError::VerificationMismatch {
            item,
            field,
            expected,
            actual,
        } => {
            assert_eq!(item, "movie \"Die Hard 2\"");
            assert_eq!(field, "titleSort");
            assert_eq!(expected, "Die Hard 2");
            assert_eq!(actual, "D");
        }
        other => panic!("unexpected error: {other}"),
    }
    // The run stopped at the first failing item.
    assert_eq!(catalog.writes().len(), 1);
}

// ---------------------------------------------------------------------------
// catalog failures
// ---------------------------------------------------------------------------

fn assert_catalog_failure(err: FixupError, expected_action: &str) {
    match err {
        FixupError::CatalogOperation {
            action,
            message,
            report,
        } => {
            assert_eq!(action, expected_action);
            assert!(message.contains("HTTP 500"), "{}", message);
            assert!(!report.succeeded);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_failed_section_listing_stops_the_run() {
    let catalog = sort_title_catalog();
    catalog.fail_calls(|c| matches!(c, Call::Sections));

    let err = SyncSortTitle
        .run(&catalog, LIVE, &config(document()), &args(""))
        .await
        .unwrap_err();

    assert_catalog_failure(err, "Cannot list sections");
    assert_eq!(catalog.calls(), vec![Call::Sections]);
}

#[tokio::test]
async fn test_failed_item_listing_stops_the_run() {
    let catalog = sort_title_catalog();
    catalog.fail_calls(|c| *c == Call::Items("1".into()));

    let err = SyncSortTitle
        .run(&catalog, LIVE, &config(document()), &args(""))
        .await
        .unwrap_err();

    assert_catalog_failure(err, "Cannot list all items in section of type movie: \"Movies\"");
    // The show section is never listed.
    assert_eq!(catalog.calls(), vec![Call::Sections, Call::Items("1".into())]);
}

#[tokio::test]
async fn test_failed_episode_listing_stops_the_run() {
    let catalog = sort_title_catalog();
    catalog.fail_calls(|c| *c == Call::Episodes("20".into()));

    let err = SyncSortTitle
        .run(&catalog, LIVE, &config(document()), &args(""))
        .await
        .unwrap_err();

    assert_catalog_failure(err, "Cannot list episodes of show \"Fargo\"");
    assert_eq!(catalog.calls().last(), Some(&Call::Episodes("20".into())));
    assert_eq!(catalog.item("21").title_sort, "x");
}

#[tokio::test]
async fn test_failed_reload_stops_the_run() {
    let catalog = genre_catalog();
    catalog.limit_listing_tags(1);
    catalog.fail_calls(|c| *c == Call::Reload("10".into()));

    let err = VideoGenreCleanup
        .run(&catalog, LIVE, &genre_config(), &args("language: en\n"))
        .await
        .unwrap_err();

    assert_catalog_failure(err, "Cannot reload movie \"Die Hard\"");
    assert_eq!(
        catalog.calls(),
        vec![
            Call::Sections,
            Call::Items("1".into()),
            Call::Reload("10".into())
        ]
    );
}

#[tokio::test]
async fn test_failed_edit_stops_the_run() {
    let catalog = sort_title_catalog();
    catalog.fail_calls(Call::is_write);

    let err = SyncSortTitle
        .run(&catalog, LIVE, &config(document()), &args(""))
        .await
        .unwrap_err();

    assert_catalog_failure(
        err,
        "Cannot set the titleSort field of movie \"Die Hard 2\" to \"Die Hard 2\"",
    );
    assert_eq!(
        catalog.calls(),
        vec![
            Call::Sections,
            Call::Items("1".into()),
            Call::Edit(
                "11".into(),
                ItemEdit::SetField {
                    field: ItemField::TitleSort,
                    value: "Die Hard 2".into(),
                    lock: true,
                }
            ),
        ]
    );
}

#[tokio::test]
async fn test_failed_restore_keeps_collections_file() {
    let dir = TempDir::new().unwrap();
    let config = config_at(dir.path().join("config.yml"), document());
    let file = dir.path().join("collections.yml");
    std::fs::write(
        &file,
        "'10':\n  section: Movies\n  title: Die Hard\n  year: 1988\n  collections:\n  - Noir\n",
    )
    .unwrap();
    let before = std::fs::read_to_string(&file).unwrap();
    let catalog = collections_catalog();
    catalog.fail_calls(Call::is_write);

    let err = PreserveCollections
        .run(&catalog, LIVE, &config, &args("collections_file: collections.yml\n"))
        .await
        .unwrap_err();

    assert_catalog_failure(err, "Cannot restore collections [\"Noir\"] of movie \"Die Hard\"");
    assert_eq!(std::fs::read_to_string(&file).unwrap(), before);
}

// ---------------------------------------------------------------------------
// video_genre_cleanup
// ---------------------------------------------------------------------------

fn genre_config() -> ConfigFile {
    let entry: GenreCleanupEntry = serde_yaml::from_str(
        "language: en\n\
         change:\n  Action: [Action Film, Action/Adventure]\n  Drama:\n\
         remove: [Short]\n\
         if_empty: Unknown\n",
    )
    .unwrap();
    let mut document = document();
    document.video_genre_cleanup = vec![entry];
    config(document)
}

fn genre_catalog() -> MemoryCatalog {
    let catalog = MemoryCatalog::new();
    catalog.add_section("1", SectionType::Movie, "Movies");
    let mut a = movie("10", "1", "Die Hard", "Die Hard");
    a.genres = strings(&["Action Film", "Short", "Drama"]);
    let mut b = movie("11", "1", "Shorts", "Shorts");
    b.genres = strings(&["Short"]);
    let mut c = movie("12", "1", "Heat", "Heat");
    c.genres = strings(&["Action", "Drama"]);
    catalog.add_item(a);
    catalog.add_item(b);
    catalog.add_item(c);
    catalog
}

#[tokio::test]
async fn test_genre_cleanup() {
    let catalog = genre_catalog();

    VideoGenreCleanup
        .run(&catalog, LIVE, &genre_config(), &args("language: en\n"))
        .await
        .unwrap();

    assert_eq!(catalog.item("10").genres, strings(&["Action", "Drama"]));
    assert_eq!(catalog.item("11").genres, strings(&["Unknown"]));
    assert_eq!(catalog.item("12").genres, strings(&["Action", "Drama"]));
    assert_eq!(
        catalog.writes()[0],
        Call::Edit(
            "10".into(),
            ItemEdit::ReplaceTags {
                field: TagField::Genre,
                remove: strings(&["Action Film", "Short", "Drama"]),
                add: strings(&["Action", "Drama"]),
            }
        )
    );
    assert_eq!(catalog.writes().len(), 2);

    catalog.clear_calls();
    VideoGenreCleanup
        .run(&catalog, LIVE, &genre_config(), &args("language: en\n"))
        .await
        .unwrap();
    assert!(catalog.writes().is_empty());
}

#[tokio::test]
async fn test_genre_cleanup_reloads_partial_items() {
    let catalog = genre_catalog();
    catalog.limit_listing_tags(1);

    VideoGenreCleanup
        .run(&catalog, DRY, &genre_config(), &args("language: en\n"))
        .await
        .unwrap();

    let reloads = catalog
        .reads()
        .into_iter()
        .filter(|c| matches!(c, Call::Reload(_)))
        .count();
    assert_eq!(reloads, 3);
    assert!(catalog.writes().is_empty());
}

#[tokio::test]
async fn test_genre_cleanup_dry_run_reads_the_same() {
    let live = genre_catalog();
    let dry = genre_catalog();
    live.limit_listing_tags(1);
    dry.limit_listing_tags(1);
    let args = args("language: en\n");

    VideoGenreCleanup
        .run(&dry, DRY, &genre_config(), &args)
        .await
        .unwrap();
    VideoGenreCleanup
        .run(&live, LIVE, &genre_config(), &args)
        .await
        .unwrap();

    assert!(dry.writes().is_empty());
    assert_eq!(live.writes().len(), 2);
    assert_eq!(dry.reads(), reads_outside_verification(&live));
}

#[tokio::test]
async fn test_genre_order_is_verified() {
    let catalog = genre_catalog();
    catalog.reorder_genres();

    let err = VideoGenreCleanup
        .run(&catalog, LIVE, &genre_config(), &args("language: en\n"))
        .await
        .unwrap_err();

    assert!(matches!(err, FixupError::VerificationMismatch { ref field, .. } if field == "genre"));
}

#[tokio::test]
async fn test_genre_cleanup_requires_known_language() {
    let err = VideoGenreCleanup
        .validate(&genre_config(), &args("language: de\n"))
        .unwrap_err();
    assert!(err.to_string().contains("language de"));

    let err = VideoGenreCleanup
        .validate(&genre_config(), &args(""))
        .unwrap_err();
    assert!(err.to_string().contains("'language'"));
}

// ---------------------------------------------------------------------------
// preserve_collections
// ---------------------------------------------------------------------------

fn collections_catalog() -> MemoryCatalog {
    let catalog = MemoryCatalog::new();
    catalog.add_section("1", SectionType::Movie, "Movies");
    let mut item = movie("10", "1", "Die Hard", "Die Hard");
    item.collections = strings(&["Action Classics"]);
    catalog.add_item(item);
    catalog
}

#[tokio::test]
async fn test_collections_are_recorded_and_restored() {
    let dir = TempDir::new().unwrap();
    let config = config_at(dir.path().join("config.yml"), document());
    let args = args("collections_file: collections.yml\n");
    let file = dir.path().join("collections.yml");
    let catalog = collections_catalog();

    PreserveCollections.run(&catalog, LIVE, &config, &args).await.unwrap();
    let cache = CollectionsCache::load(&file).unwrap();
    assert_eq!(
        cache.get("10").unwrap().collections,
        strings(&["Action Classics"])
    );
    assert!(catalog.writes().is_empty());

    // The server loses the tag and gains a new one.
    catalog.update("10", |item| item.collections = strings(&["Favorites"]));
    catalog.clear_calls();
    PreserveCollections.run(&catalog, LIVE, &config, &args).await.unwrap();

    assert_eq!(
        catalog.writes(),
        vec![Call::Edit(
            "10".into(),
            ItemEdit::AddTags {
                field: TagField::Collection,
                add: strings(&["Favorites", "Action Classics"]),
                lock: true,
            }
        )]
    );
    let mut live = catalog.item("10").collections;
    live.sort();
    assert_eq!(live, strings(&["Action Classics", "Favorites"]));
    let cache = CollectionsCache::load(&file).unwrap();
    assert_eq!(
        cache.get("10").unwrap().collections,
        strings(&["Action Classics", "Favorites"])
    );

    // Converged: nothing to write, and the file is rewritten unchanged.
    let before = std::fs::read_to_string(&file).unwrap();
    catalog.clear_calls();
    PreserveCollections.run(&catalog, LIVE, &config, &args).await.unwrap();
    assert!(catalog.writes().is_empty());
    assert_eq!(std::fs::read_to_string(&file).unwrap(), before);
}

#[tokio::test]
async fn test_collections_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = config_at(dir.path().join("config.yml"), document());
    let file = dir.path().join("collections.yml");
    std::fs::write(
        &file,
        "'10':\n  section: Movies\n  title: Die Hard\n  year: 1988\n  collections:\n  - Noir\n",
    )
    .unwrap();
    let before = std::fs::read_to_string(&file).unwrap();
    let catalog = collections_catalog();

    PreserveCollections
        .run(&catalog, DRY, &config, &args("collections_file: collections.yml\n"))
        .await
        .unwrap();

    assert!(catalog.writes().is_empty());
    assert_eq!(std::fs::read_to_string(&file).unwrap(), before);
}

#[tokio::test]
async fn test_collections_dry_run_reads_the_same() {
    let mut runs = Vec::new();
    for ctx in [DRY, LIVE] {
        let dir = TempDir::new().unwrap();
        let config = config_at(dir.path().join("config.yml"), document());
        std::fs::write(
            dir.path().join("collections.yml"),
            "'10':\n  section: Movies\n  title: Die Hard\n  year: 1988\n  collections:\n  - Noir\n",
        )
        .unwrap();
        let catalog = collections_catalog();
        PreserveCollections
            .run(&catalog, ctx, &config, &args("collections_file: collections.yml\n"))
            .await
            .unwrap();
        runs.push(catalog);
    }
    let (dry, live) = (&runs[0], &runs[1]);

    assert!(dry.writes().is_empty());
    assert_eq!(live.writes().len(), 1);
    assert_eq!(dry.reads(), reads_outside_verification(live));
}

#[tokio::test]
async fn test_collections_file_parse_error_fails() {
    let dir = TempDir::new().unwrap();
    let config = config_at(dir.path().join("config.yml"), document());
    std::fs::write(dir.path().join("collections.yml"), "'10': [unclosed\n").unwrap();
    let catalog = collections_catalog();

    let err = PreserveCollections
        .run(&catalog, LIVE, &config, &args("collections_file: collections.yml\n"))
        .await
        .unwrap_err();

    assert!(matches!(err, FixupError::Yaml { .. }));
    assert!(catalog.calls().is_empty());
}

// ---------------------------------------------------------------------------
// sync_title
// ---------------------------------------------------------------------------

struct TitleFixture {
    dir: TempDir,
    catalog: MemoryCatalog,
    config: ConfigFile,
}

fn title_fixture() -> TitleFixture {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("Movies")).unwrap();
    for name in ["a.mkv", "b1.mkv", "b2.mkv", "c.mkv"] {
        std::fs::write(dir.path().join("Movies").join(name), b"").unwrap();
    }

    let catalog = MemoryCatalog::new();
    catalog.add_section("1", SectionType::Movie, "Movies");
    let mut a = movie("10", "1", "a", "a");
    a.parts = vec!["/volume1/video/Movies/a.mkv".into()];
    let mut b = movie("11", "1", "b", "b");
    b.parts = vec![
        "/volume1/video/Movies/b1.mkv".into(),
        "/volume1/video/Movies/b2.mkv".into(),
    ];
    let mut c = movie("12", "1", "c", "c");
    c.parts = vec!["/volume1/video/Movies/c.mkv".into()];
    catalog.add_item(a);
    catalog.add_item(b);
    catalog.add_item(c);

    let mut document = document();
    document.path_mappings = mappings("/volume1/video", dir.path());
    let config = config(document);
    TitleFixture {
        dir,
        catalog,
        config,
    }
}

#[tokio::test]
async fn test_title_sync() {
    let fixture = title_fixture();
    let movies = fixture.dir.path().join("Movies");
    let probe = TableProbe::default()
        .with(movies.join("a.mkv"), Some("Alpha"))
        .with(movies.join("b1.mkv"), Some("Beta, Part 1"))
        .with(movies.join("b2.mkv"), Some("Beta, Part 2"))
        .with(movies.join("c.mkv"), None);
    let fixup = SyncTitle::with_probe(Arc::new(probe));

    fixup
        .run(&fixture.catalog, LIVE, &fixture.config, &args(""))
        .await
        .unwrap();

    assert_eq!(fixture.catalog.item("10").title, "Alpha");
    // Ambiguous and untagged items are left alone.
    assert_eq!(fixture.catalog.item("11").title, "b");
    assert_eq!(fixture.catalog.item("12").title, "c");
    assert_eq!(fixture.catalog.writes().len(), 1);

    fixture.catalog.clear_calls();
    fixup
        .run(&fixture.catalog, LIVE, &fixture.config, &args(""))
        .await
        .unwrap();
    assert!(fixture.catalog.writes().is_empty());
}

#[tokio::test]
async fn test_title_sync_dry_run_reads_the_same_files() {
    let mut runs = Vec::new();
    for ctx in [DRY, LIVE] {
        let fixture = title_fixture();
        let movies = fixture.dir.path().join("Movies");
        let probe = Arc::new(
            TableProbe::default()
                .with(movies.join("a.mkv"), Some("Alpha"))
                .with(movies.join("b1.mkv"), Some("Beta"))
                .with(movies.join("b2.mkv"), Some("Beta"))
                .with(movies.join("c.mkv"), None),
        );
        SyncTitle::with_probe(probe.clone())
            .run(&fixture.catalog, ctx, &fixture.config, &args(""))
            .await
            .unwrap();
        let probed: Vec<_> = probe
            .probed()
            .iter()
            .map(|p| p.strip_prefix(fixture.dir.path()).unwrap().to_path_buf())
            .collect();
        runs.push((fixture, probed));
    }
    let (dry, dry_probed) = &runs[0];
    let (live, live_probed) = &runs[1];

    assert!(dry.catalog.writes().is_empty());
    assert_eq!(live.catalog.writes().len(), 2);
    assert_eq!(dry.catalog.reads(), reads_outside_verification(&live.catalog));
    assert_eq!(dry_probed, live_probed);
    assert_eq!(dry_probed.len(), 4);
}

#[tokio::test]
async fn test_title_sync_unmapped_path() {
    let fixture = title_fixture();
    fixture
        .catalog
        .update("10", |item| item.parts = vec!["/elsewhere/a.mkv".into()]);
    let fixup = SyncTitle::with_probe(Arc::new(TableProbe::default()));

    let err = fixup
        .run(&fixture.catalog, LIVE, &fixture.config, &args(""))
        .await
        .unwrap_err();

    assert!(matches!(err, FixupError::UnmappedPath { ref server_path, .. } if server_path == "/elsewhere/a.mkv"));
}

#[tokio::test]
async fn test_title_sync_missing_local_file() {
    let fixture = title_fixture();
    std::fs::remove_file(fixture.dir.path().join("Movies").join("a.mkv")).unwrap();
    let probe = Arc::new(TableProbe::default());
    let fixup = SyncTitle::with_probe(probe.clone());

    let err = fixup
        .run(&fixture.catalog, LIVE, &fixture.config, &args(""))
        .await
        .unwrap_err();

    assert!(matches!(err, FixupError::MissingMediaFile { ref item, .. } if item == "movie \"a\""));
    assert!(probe.probed().is_empty());
}

#[tokio::test]
async fn test_title_sync_skips_show_items() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("e1.mkv"), b"").unwrap();
    let catalog = MemoryCatalog::new();
    catalog.add_section("2", SectionType::Show, "TV Shows");
    let mut fargo = show("20", "2", "Fargo");
    fargo.parts = vec!["/volume1/video/missing.mkv".into()];
    catalog.add_item(fargo);
    let mut e1 = episode("21", "2", "Episode 1", "Episode 1");
    e1.parts = vec!["/volume1/video/e1.mkv".into()];
    catalog.add_episode("20", e1);

    let mut document = document();
    document.path_mappings = mappings("/volume1/video", dir.path());
    let probe = TableProbe::default().with(dir.path().join("e1.mkv"), Some("The Crocodile's Dilemma"));

    SyncTitle::with_probe(Arc::new(probe))
        .run(&catalog, LIVE, &config(document), &args(""))
        .await
        .unwrap();

    assert_eq!(catalog.item("20").title, "Fargo");
    assert_eq!(catalog.item("21").title, "The Crocodile's Dilemma");
}
