//! End-to-end builds of the fixture project, including every fatal error path.

use quire::BuildError;
use quire::data::DataError;
use quire::generate::GenerateError;
use quire::partials::NamespaceError;
use quire::routes::RouteError;
use quire::site;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if src_path.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

const PAGES: &str = "src/theme/views/pages";

#[test]
fn build_publishes_every_route() {
    let tmp = setup_fixtures();
    let report = site::build(tmp.path()).unwrap();

    for record in &report.routes {
        let path = tmp.path().join("dist").join(&record.output);
        assert!(path.is_file(), "missing {}", path.display());
    }
    assert!(tmp.path().join("dist/feed.xml").is_file());
    assert!(!tmp.path().join(".dist.staging").exists());
}

#[test]
fn manifest_round_trips_report() {
    let tmp = setup_fixtures();
    let report = site::build(tmp.path()).unwrap();
    let manifest = tmp.path().join("build.json");
    quire::generate::write_manifest(&report, &manifest).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(manifest).unwrap()).unwrap();
    let routes = json["routes"].as_array().unwrap();
    assert_eq!(routes.len(), report.routes.len());
    let listing = routes.iter().find(|r| r["route"] == "blog/page/2").unwrap();
    assert_eq!(listing["kind"], serde_json::json!({"listing": {"page": 2}}));
    assert_eq!(listing["url"], "/blog/page/2/");
}

#[test]
fn later_data_file_overwrites_top_level_key() {
    let tmp = setup_fixtures();
    write(tmp.path(), "src/store/zz-override.json", r#"{"metadata": {"title": "Late"}}"#);
    let site = site::load(tmp.path()).unwrap();
    assert_eq!(site.data["metadata"]["title"], "Late");
    assert!(site.data["metadata"].get("author").is_none());
}

#[test]
fn orphan_pages_directory_is_ambiguous() {
    let tmp = setup_fixtures();
    write(tmp.path(), &format!("{PAGES}/docs/intro.jinja"), "docs");
    match site::build(tmp.path()) {
        Err(BuildError::Route(RouteError::Ambiguous { directory, .. })) => {
            assert!(directory.ends_with("pages/docs"));
        }
        other => panic!("expected ambiguous route, got {other:?}"),
    }
}

#[test]
fn orphan_pages_directory_descends_when_configured() {
    let tmp = setup_fixtures();
    let config = fs::read_to_string(tmp.path().join("config.toml")).unwrap();
    write(
        tmp.path(),
        "config.toml",
        &format!("orphan_directories = \"descend\"\n{config}"),
    );
    write(tmp.path(), &format!("{PAGES}/docs/intro.jinja"), "docs");
    let report = site::build(tmp.path()).unwrap();
    assert!(report.routes.iter().any(|r| r.route == "docs/intro"));
    assert!(!tmp.path().join("dist/docs/index.html").exists());
}

#[test]
fn page_colliding_with_article_names_both() {
    let tmp = setup_fixtures();
    write(tmp.path(), &format!("{PAGES}/intro.jinja"), "page");
    let err = site::build(tmp.path()).unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, BuildError::Route(RouteError::Collision { .. })));
    assert!(message.contains("intro.jinja"));
    assert!(message.contains("intro.md"));
}

#[test]
fn partial_key_collision_is_fatal() {
    let tmp = setup_fixtures();
    write(tmp.path(), "src/theme/markdown/partials/collections.md", "leaf");
    let err = site::build(tmp.path()).unwrap_err();
    assert!(matches!(
        err,
        BuildError::Namespace(NamespaceError::Collision { .. })
    ));
}

#[test]
fn listing_over_missing_collection_fails() {
    let tmp = setup_fixtures();
    write(
        tmp.path(),
        &format!("{PAGES}/catalog.jinja"),
        r#"@frontmatter {"paginate": "query_store", "per_page": 5, "query": {"collection": "nothing"}} @endfrontmatter"#,
    );
    let err = site::build(tmp.path()).unwrap_err();
    assert!(matches!(
        err,
        BuildError::Route(RouteError::Data(DataError::Path { .. }))
    ));
}

#[test]
fn query_store_on_mapping_fails_render() {
    let tmp = setup_fixtures();
    write(
        tmp.path(),
        &format!("{PAGES}/bad.jinja"),
        r#"{{ query_store({"collection": "metadata"}) }}"#,
    );
    let err = site::build(tmp.path()).unwrap_err();
    assert!(matches!(
        err,
        BuildError::Generate(GenerateError::Template(_))
    ));
    assert!(err.to_string().contains("metadata"));
}

#[test]
fn feed_without_title_fails() {
    let tmp = setup_fixtures();
    let config = fs::read_to_string(tmp.path().join("config.toml"))
        .unwrap()
        .replace("title = \"Example Notes\"", "title = \"\"");
    write(tmp.path(), "config.toml", &config);
    assert!(matches!(
        site::build(tmp.path()),
        Err(BuildError::Feed(_))
    ));
}

#[test]
fn malformed_data_names_file() {
    let tmp = setup_fixtures();
    write(tmp.path(), "src/store/broken.json", "{ not json");
    let err = site::build(tmp.path()).unwrap_err();
    assert!(matches!(err, BuildError::Data(DataError::Source(_))));
    assert!(err.to_string().contains("broken.json"));
}

#[test]
fn malformed_front_matter_names_file() {
    let tmp = setup_fixtures();
    write(
        tmp.path(),
        "src/theme/markdown/articles/oops.md",
        "@frontmatter {\"title\": } @endfrontmatter\nbody",
    );
    let err = site::build(tmp.path()).unwrap_err();
    assert!(matches!(err, BuildError::Source(_)));
    assert!(err.to_string().contains("oops.md"));
}

#[test]
fn unknown_config_key_rejected() {
    let tmp = setup_fixtures();
    write(tmp.path(), "config.toml", "pages_rot = \"x\"\n");
    assert!(matches!(
        site::build(tmp.path()),
        Err(BuildError::Config(_))
    ));
}

#[test]
fn output_over_project_or_sources_rejected() {
    for output_dir in [".", "src/store", "src"] {
        let tmp = setup_fixtures();
        let config = fs::read_to_string(tmp.path().join("config.toml")).unwrap();
        write(
            tmp.path(),
            "config.toml",
            &format!("output_dir = \"{output_dir}\"\n{config}"),
        );
        assert!(
            matches!(site::build(tmp.path()), Err(BuildError::Config(_))),
            "output_dir {output_dir} should be rejected"
        );
        assert!(tmp.path().join("config.toml").is_file());
        assert!(tmp.path().join(PAGES).join("about.jinja").is_file());
        assert!(tmp.path().join("src/store/products.json").is_file());
    }
}

#[test]
fn absolute_output_over_project_rejected() {
    let tmp = setup_fixtures();
    let canonical = fs::canonicalize(tmp.path()).unwrap();
    let mut settings = quire::config::load_config(tmp.path()).unwrap();
    settings.output_dir = canonical.join("src/store").to_string_lossy().into_owned();
    assert!(matches!(
        site::Site::load(tmp.path(), settings),
        Err(BuildError::Config(_))
    ));
    assert!(tmp.path().join("src/store/products.json").is_file());
}

#[test]
fn failed_build_keeps_previous_output() {
    let tmp = setup_fixtures();
    site::build(tmp.path()).unwrap();
    let before = fs::read_to_string(tmp.path().join("dist/index.html")).unwrap();

    write(tmp.path(), &format!("{PAGES}/broken.jinja"), "{% for %}");
    assert!(site::build(tmp.path()).is_err());

    let after = fs::read_to_string(tmp.path().join("dist/index.html")).unwrap();
    assert_eq!(before, after);
    assert!(!tmp.path().join("dist/broken").exists());
    assert!(!tmp.path().join(".dist.staging").exists());
}

#[test]
fn check_plans_without_output() {
    let tmp = setup_fixtures();
    let plan = site::check(tmp.path()).unwrap();
    assert_eq!(plan.routes.len(), 10);
    assert_eq!(plan.feed.as_deref(), Some(Path::new("feed.xml")));
    assert!(!tmp.path().join("dist").exists());
}
