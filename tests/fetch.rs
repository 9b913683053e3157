// Integration tests for the serial fetch loop: CSV-driven downloads,
// collision handling, failure accumulation, and the login-marker heuristic.

use std::fs;
use std::path::PathBuf;

use gispull::{fetch_links, links_from_csv, FetchOptions, Link, PortalSession};
use tempfile::TempDir;

fn write_csv(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("links.csv");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn csv_rows_become_downloads_named_by_extension() {
    let mut server = mockito::Server::new();
    let first = server.mock("GET", "/data/tile_a.bin").with_body("alpha").create();
    let second = server.mock("GET", "/data/tile_b.bin").with_body("bravo").create();

    let dir = TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        &format!(
            "url,extension\n{0}/data/tile_a.bin,zip\n{0}/data/tile_b.bin,zip\n",
            server.url()
        ),
    );

    let links = links_from_csv(&csv, "url", "extension", None).unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0].file_name, "tile_a.zip");
    assert_eq!(links[1].file_name, "tile_b.zip");

    let out = dir.path().join("out");
    let session = PortalSession::anonymous(0).unwrap();
    let report = fetch_links(&session, &links, &out, &FetchOptions::default()).unwrap();

    first.assert();
    second.assert();
    assert!(report.failed.is_empty());
    assert_eq!(report.completed.len(), 2);
    assert_eq!(fs::read_to_string(out.join("tile_a.zip")).unwrap(), "alpha");
    assert_eq!(fs::read_to_string(out.join("tile_b.zip")).unwrap(), "bravo");
}

#[test]
fn name_column_overrides_the_url_basename() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        "sheet,format,link\nm_12345_ne,tif,https://host/dl/q123.bin\n",
    );

    let links = links_from_csv(&csv, "link", "format", Some("sheet")).unwrap();
    assert_eq!(
        links,
        vec![Link {
            url: "https://host/dl/q123.bin".to_string(),
            file_name: "m_12345_ne.tif".to_string(),
        }]
    );
}

#[test]
fn missing_csv_columns_are_an_error() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(&dir, "a,b\n1,2\n");
    assert!(links_from_csv(&csv, "url", "extension", None).is_err());
}

#[test]
fn repeated_names_get_an_incrementing_suffix() {
    let mut server = mockito::Server::new();
    let mock = server.mock("GET", "/t").with_body("same tile").expect(2).create();

    let dir = TempDir::new().unwrap();
    let link = Link {
        url: format!("{}/t", server.url()),
        file_name: "tile.zip".to_string(),
    };
    let links = vec![link.clone(), link];

    let session = PortalSession::anonymous(0).unwrap();
    let report = fetch_links(&session, &links, dir.path(), &FetchOptions::default()).unwrap();

    mock.assert();
    assert_eq!(report.completed.len(), 2);
    assert!(dir.path().join("tile.zip").exists());
    assert!(dir.path().join("tile_1.zip").exists());
}

#[test]
fn keep_going_records_failures_and_continues() {
    let mut server = mockito::Server::new();
    server.mock("GET", "/good").with_body("ok").create();
    server.mock("GET", "/bad").with_status(404).create();

    let dir = TempDir::new().unwrap();
    let links = vec![
        Link { url: format!("{}/bad", server.url()), file_name: "bad.zip".to_string() },
        Link { url: format!("{}/good", server.url()), file_name: "good.zip".to_string() },
    ];

    let session = PortalSession::anonymous(0).unwrap();
    let opts = FetchOptions { keep_going: true, verbose: 0 };
    let report = fetch_links(&session, &links, dir.path(), &opts).unwrap();

    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].url.ends_with("/bad"));
    assert_eq!(report.completed.len(), 1);
    assert!(dir.path().join("good.zip").exists());
    // The failed download leaves nothing behind under its final name.
    assert!(!dir.path().join("bad.zip").exists());
}

#[test]
fn the_first_failure_aborts_without_keep_going() {
    let mut server = mockito::Server::new();
    server.mock("GET", "/bad").with_status(500).create();
    let good = server.mock("GET", "/good").with_body("ok").expect(0).create();

    let dir = TempDir::new().unwrap();
    let links = vec![
        Link { url: format!("{}/bad", server.url()), file_name: "bad.zip".to_string() },
        Link { url: format!("{}/good", server.url()), file_name: "good.zip".to_string() },
    ];

    let session = PortalSession::anonymous(0).unwrap();
    let result = fetch_links(&session, &links, dir.path(), &FetchOptions::default());

    assert!(result.is_err());
    good.assert();
    assert!(!dir.path().join("good.zip").exists());
}

#[test]
fn fetch_report_serializes_to_json() {
    let mut server = mockito::Server::new();
    server.mock("GET", "/missing").with_status(404).create();

    let dir = TempDir::new().unwrap();
    let links = vec![Link {
        url: format!("{}/missing", server.url()),
        file_name: "missing.zip".to_string(),
    }];

    let session = PortalSession::anonymous(0).unwrap();
    let opts = FetchOptions { keep_going: true, verbose: 0 };
    let report = fetch_links(&session, &links, dir.path(), &opts).unwrap();

    let report_path = dir.path().join("report.json");
    report.write_json(&report_path).unwrap();

    let parsed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(parsed["failed"].as_array().unwrap().len(), 1);
    assert_eq!(parsed["failed"][0]["file_name"], "missing.zip");
}

#[test]
fn fetch_json_parses_a_clean_body() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/heatmap/api")
        .with_body(r#"{"type": "FeatureCollection", "features": []}"#)
        .create();

    let session = PortalSession::anonymous(0).unwrap();
    let value = session
        .fetch_json(&format!("{}/heatmap/api", server.url()), &[])
        .unwrap();
    assert!(value["features"].as_array().unwrap().is_empty());
}

#[test]
fn login_marker_in_a_response_body_is_an_error() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/heatmap/api")
        .with_body("<html>please login to continue</html>")
        .create();

    let session = PortalSession::anonymous(0).unwrap();
    let err = session
        .fetch_json(&format!("{}/heatmap/api", server.url()), &[])
        .unwrap_err();
    assert!(format!("{err:#}").contains("not logged in"));
}

#[test]
fn connect_posts_the_login_form_once() {
    let mut server = mockito::Server::new();
    let login = server
        .mock("POST", "/login")
        .match_header("content-type", "application/x-www-form-urlencoded")
        .with_body("welcome")
        .create();

    let auth = gispull::PortalAuth {
        login_url: format!("{}/login", server.url()),
        username: "admin".to_string(),
        password: "hunter2".to_string(),
    };
    PortalSession::connect(&auth, 0).unwrap();

    login.assert();
}

#[test]
fn a_rejected_login_is_an_error() {
    let mut server = mockito::Server::new();
    server.mock("POST", "/login").with_status(403).create();

    let auth = gispull::PortalAuth {
        login_url: format!("{}/login", server.url()),
        username: "admin".to_string(),
        password: "wrong".to_string(),
    };
    assert!(PortalSession::connect(&auth, 0).is_err());
}
