//! End-to-end closure builds through the library API.

use nix_closure::closure::ClosureBuilder;
use nix_closure::core::ClosureError;
use nix_closure::hash::{file_hash, tree_hash};
use nix_closure::test_utils::{CannedGraph, StoreFixture, init_test_logging};

const IMAGE_MANIFEST: &str = r#"{
  "schemaVersion": 2,
  "config": {
    "mediaType": "application/vnd.oci.image.config.v1+json",
    "digest": "sha256:6d9e5f4a1c2b3d4e5f60718293a4b5c6d7e8f90123456789abcdef0123456789",
    "size": 2048
  },
  "layers": []
}"#;

/// An application depending on a library which depends on libc, plus an unrelated path.
fn app_store() -> (StoreFixture, String) {
    let fixture = StoreFixture::new();
    let app = fixture.add_package(
        "0a1b2c-server-1.4.2",
        &[("bin/server", b"\x7fELF server"), ("share/doc/server/README", b"docs")],
    );
    fixture.add_package("3d4e5f-openssl-3.0.13", &[("lib/libssl.so.3", b"ssl")]);
    fixture.add_package("6a7b8c-glibc-2.39-52", &[("lib/libc.so.6", b"libc")]);
    fixture.link_result("result", &app);

    let dot = fixture.dot_graph(
        &["0a1b2c-server-1.4.2", "3d4e5f-openssl-3.0.13", "6a7b8c-glibc-2.39-52"],
        &[
            ("0a1b2c-server-1.4.2", "3d4e5f-openssl-3.0.13"),
            ("3d4e5f-openssl-3.0.13", "6a7b8c-glibc-2.39-52"),
            ("0a1b2c-server-1.4.2", "6a7b8c-glibc-2.39-52"),
        ],
    );
    (fixture, dot)
}

#[tokio::test]
async fn test_build_binary_artifact() {
    init_test_logging(None);
    let (fixture, dot) = app_store();
    let app = fixture.store_root().join("0a1b2c-server-1.4.2");

    let closure = ClosureBuilder::new(CannedGraph::new(dot))
        .store_root(fixture.store_root())
        .max_parallel(4)
        .build(fixture.output_dir(), "result")
        .await
        .unwrap();

    let artifact = &closure.artifact;
    assert_eq!(artifact.name, "server");
    assert_eq!(artifact.version, "1.4.2");
    assert_eq!(artifact.result_digest, "0a1b2c");
    assert_eq!(artifact.result_hash, tree_hash(&app).unwrap());
    assert_eq!(artifact.binary_hash, file_hash(&app.join("bin/server")).unwrap());

    assert_eq!(closure.graph.node_count(), 3);
    assert_eq!(closure.graph.edge_count(), 3);
    assert_eq!(closure.unknown_count(), 0);

    // hyphenated versions split from the right
    let node = closure.graph.find("6a7b8c-glibc-2.39-52").unwrap();
    assert_eq!(node.name(), Some("2.39"));
    assert_eq!(node.version(), Some("52"));
}

#[tokio::test]
async fn test_build_image_artifact() {
    let fixture = StoreFixture::new();
    let image = fixture
        .add_package("9f8e7d-server-image-1.4.2", &[("manifest.json", IMAGE_MANIFEST.as_bytes())]);
    fixture.link_result("result", &image);
    let dot = fixture.dot_graph(&["9f8e7d-server-image-1.4.2"], &[]);

    let closure = ClosureBuilder::new(CannedGraph::new(dot))
        .store_root(fixture.store_root())
        .build(fixture.output_dir(), "result")
        .await
        .unwrap();

    assert_eq!(
        closure.artifact.binary_hash,
        "6d9e5f4a1c2b3d4e5f60718293a4b5c6d7e8f90123456789abcdef0123456789"
    );
    assert_eq!(closure.artifact.name, "image");
}

#[tokio::test]
async fn test_custom_symlink_name() {
    let (fixture, dot) = app_store();
    let lib = fixture.store_root().join("3d4e5f-openssl-3.0.13");
    fixture.link_result("result-lib", &lib);

    let closure = ClosureBuilder::new(CannedGraph::new(dot))
        .store_root(fixture.store_root())
        .build(fixture.output_dir(), "result-lib")
        .await
        .unwrap();

    assert_eq!(closure.artifact.name, "openssl");
    // no bin/ and no manifest
    assert_eq!(closure.artifact.binary_hash, "");
}

#[tokio::test]
async fn test_repeated_builds_are_identical() {
    let (fixture, dot) = app_store();
    let source = CannedGraph::new(dot);

    let first = ClosureBuilder::new(source.clone())
        .store_root(fixture.store_root())
        .max_parallel(1)
        .build(fixture.output_dir(), "result")
        .await
        .unwrap();
    let second = ClosureBuilder::new(source.clone())
        .store_root(fixture.store_root())
        .max_parallel(16)
        .build(fixture.output_dir(), "result")
        .await
        .unwrap();

    assert_eq!(first.artifact, second.artifact);
    assert_eq!(first.graph.to_dot(None), second.graph.to_dot(None));
    assert_eq!(source.queries().len(), 2);
}

#[tokio::test]
async fn test_garbage_collected_dependency() {
    let (fixture, dot) = app_store();
    std::fs::remove_dir_all(fixture.store_root().join("3d4e5f-openssl-3.0.13")).unwrap();

    let closure = ClosureBuilder::new(CannedGraph::new(dot))
        .store_root(fixture.store_root())
        .build(fixture.output_dir(), "result")
        .await
        .unwrap();

    assert_eq!(closure.graph.node_count(), 3);
    assert_eq!(closure.graph.annotated_count(), 2);
    assert_eq!(closure.unknown_count(), 1);
}

#[tokio::test]
async fn test_graph_with_undeclared_node_fails() {
    let (fixture, _) = app_store();
    let dot = format!(
        "digraph G {{\n\"{0}/0a1b2c-server-1.4.2\";\n\"{0}/0a1b2c-server-1.4.2\" -> \"{0}/x-y-1\";\n}}\n",
        fixture.store_root().display()
    );

    let err = ClosureBuilder::new(CannedGraph::new(dot))
        .store_root(fixture.store_root())
        .build(fixture.output_dir(), "result")
        .await
        .unwrap_err();
    assert!(matches!(err, ClosureError::GraphAnalysis { .. }));
}
