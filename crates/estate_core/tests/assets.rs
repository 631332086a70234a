use estate_core::asset::parse_path;
use estate_core::{
    AssetClass, AssetError, AssetKind, AssetRepository, CollisionPolicy, LocalBlobStore,
    MemoryBlobStore, PathError,
};
use futures::StreamExt;
use std::sync::Arc;

#[tokio::test]
async fn uploaded_bytes_are_readable_through_the_returned_url() {
    let (blobs, repo) = memory_repo(CollisionPolicy::Disambiguate);

    let descriptor = repo
        .upload(
            &AssetKind::ApartmentImage,
            Some("apt-7"),
            "kitchen.png",
            b"png-bytes".to_vec(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(descriptor.path, "apartment-images/apt-7/kitchen.png");
    assert_eq!(descriptor.class, AssetClass::Image);
    assert_eq!(descriptor.owner.as_deref(), Some("apt-7"));
    assert_eq!(descriptor.content_type, "image/png");
    assert_eq!(descriptor.size, 9);
    assert_eq!(blobs.read_url(&descriptor.url).unwrap(), b"png-bytes");
    assert_eq!(
        repo.path_for_url(&descriptor.url).as_deref(),
        Some(descriptor.path.as_str())
    );

    let described = repo.describe(&descriptor.path).await.unwrap();
    assert_eq!(described, descriptor);
}

#[tokio::test]
async fn missing_assets_are_not_found() {
    let (_, repo) = memory_repo(CollisionPolicy::Disambiguate);

    assert!(repo
        .resolve_url("images/none.jpg")
        .await
        .unwrap_err()
        .is_not_found());
    assert!(repo.delete("images/none.jpg").await.unwrap_err().is_not_found());
    assert!(repo
        .describe("models/none.glb")
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn invalid_names_fail_before_touching_the_store() {
    let (blobs, repo) = memory_repo(CollisionPolicy::Disambiguate);

    let err = repo
        .upload(&AssetKind::Image, None, "../escape.jpg", vec![1], None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AssetError::Path(PathError::InvalidSegment { .. })
    ));

    let err = repo
        .upload(&AssetKind::FloorPanorama, None, "view.jpg", vec![1], None)
        .await
        .unwrap_err();
    assert!(matches!(err, AssetError::Path(PathError::MissingOwner(_))));

    let err = repo
        .upload(&AssetKind::Model, None, "tower.obj", vec![1], None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AssetError::Path(PathError::UnsupportedExtension { .. })
    ));

    assert_eq!(blobs.object_count(), 0);
}

#[tokio::test]
async fn store_failures_during_upload_are_upload_errors_under_every_policy() {
    for policy in [
        CollisionPolicy::Disambiguate,
        CollisionPolicy::Reject,
        CollisionPolicy::Overwrite,
    ] {
        let (blobs, repo) = memory_repo(policy);
        blobs.fail_path("images/x.jpg");

        let err = repo
            .upload(&AssetKind::Image, None, "x.jpg", vec![1], None)
            .await
            .unwrap_err();
        match err {
            AssetError::Upload { path, .. } => assert_eq!(path, "images/x.jpg", "{policy:?}"),
            other => panic!("unexpected error under {policy:?}: {other}"),
        }
        assert_eq!(blobs.object_count(), 0);
    }
}

#[tokio::test]
async fn upload_file_routes_by_file_name() {
    let (_, repo) = memory_repo(CollisionPolicy::Disambiguate);

    let floor_model = repo
        .upload_file("ground-floor.glb", vec![1], None)
        .await
        .unwrap();
    assert_eq!(floor_model.path, "floors/ground-floor.glb");

    let model = repo.upload_file("tower.gltf", vec![1], None).await.unwrap();
    assert_eq!(model.path, "models/tower.gltf");

    let image = repo.upload_file("facade.webp", vec![1], None).await.unwrap();
    assert_eq!(image.path, "images/facade.webp");

    let environment = repo.upload_file("dusk.hdr", vec![1], None).await.unwrap();
    assert_eq!(environment.path, "environments/dusk.hdr");

    let other = repo
        .upload_file("brochure.pdf", vec![1], None)
        .await
        .unwrap();
    assert_eq!(other.path, "uploads/brochure.pdf");
    assert_eq!(other.class, AssetClass::Other);
}

#[tokio::test]
async fn listing_is_sorted_by_file_name_and_restartable() {
    let (_, repo) = memory_repo(CollisionPolicy::Overwrite);
    for name in ["c.jpg", "a.jpg", "b.jpg"] {
        repo.upload(&AssetKind::FloorPanorama, Some("F1"), name, vec![1], None)
            .await
            .unwrap();
    }

    let listing = repo.list("floors/F1").await.unwrap().sort_by_file_name();
    assert_eq!(listing.len(), 3);
    let paths: Vec<&str> = listing.paths().collect();
    assert_eq!(paths, ["floors/F1/a.jpg", "floors/F1/b.jpg", "floors/F1/c.jpg"]);

    let first_pass: Vec<String> = listing
        .url_stream()
        .map(|result| result.unwrap())
        .collect()
        .await;
    let second_pass: Vec<String> = listing
        .url_stream()
        .map(|result| result.unwrap())
        .collect()
        .await;
    assert_eq!(first_pass, second_pass);
    assert!(first_pass[0].ends_with("floors/F1/a.jpg"));
}

#[tokio::test]
async fn one_unreadable_item_does_not_abort_the_listing() {
    let (blobs, repo) = memory_repo(CollisionPolicy::Overwrite);
    for name in ["a.jpg", "b.jpg", "c.jpg"] {
        repo.upload(&AssetKind::Image, None, name, vec![1], None)
            .await
            .unwrap();
    }
    blobs.fail_path("images/b.jpg");

    let results = repo.list("images").await.unwrap().collect().await;
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(AssetError::Store(_))));
    assert!(results[2].is_ok());
}

#[tokio::test]
async fn unreadable_sub_prefix_becomes_a_listing_error_item() {
    let (blobs, repo) = memory_repo(CollisionPolicy::Overwrite);
    repo.upload(&AssetKind::FloorPanorama, Some("F1"), "a.jpg", vec![1], None)
        .await
        .unwrap();
    repo.upload(&AssetKind::FloorPanorama, Some("F2"), "a.jpg", vec![1], None)
        .await
        .unwrap();
    repo.upload(&AssetKind::FloorModel, Some("F3"), "f3.glb", vec![1], None)
        .await
        .unwrap();
    blobs.fail_listing("floors/F2");

    let listing = repo.list("floors").await.unwrap().sort_by_file_name();
    let results = listing.collect().await;
    assert_eq!(results.len(), 3);
    let ok: Vec<String> = results
        .iter()
        .filter_map(|result| result.as_ref().ok())
        .map(|descriptor| descriptor.path.clone())
        .collect();
    assert_eq!(ok, ["floors/F3.glb", "floors/F1/a.jpg"]);
    assert!(matches!(
        results.last(),
        Some(Err(AssetError::Listing { .. }))
    ));

    blobs.fail_listing("floors");
    assert!(repo.list("floors").await.is_err());
}

#[tokio::test]
async fn local_store_serves_public_urls_and_maps_them_back() {
    let dir = tempfile::tempdir().unwrap();
    let blobs = LocalBlobStore::new(dir.path()).with_public_base_url("https://cdn.estate.test");
    let repo = AssetRepository::new(Arc::new(blobs), CollisionPolicy::Reject);

    let descriptor = repo
        .upload(
            &AssetKind::Texture {
                category: "floors".to_string(),
            },
            None,
            "oak.jpg",
            vec![7; 16],
            None,
        )
        .await
        .unwrap();
    assert_eq!(descriptor.path, "textures/floors/oak.jpg");
    assert_eq!(
        descriptor.url,
        "https://cdn.estate.test/textures/floors/oak.jpg"
    );
    assert!(dir.path().join("textures/floors/oak.jpg").is_file());
    assert_eq!(
        repo.path_for_url(&descriptor.url).as_deref(),
        Some("textures/floors/oak.jpg")
    );
    assert!(repo.path_for_url("https://elsewhere.test/x.jpg").is_none());

    let err = repo
        .upload(
            &AssetKind::Texture {
                category: "floors".to_string(),
            },
            None,
            "oak.jpg",
            vec![8],
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AssetError::AlreadyExists(_)));

    repo.delete(&descriptor.path).await.unwrap();
    assert!(repo
        .resolve_url(&descriptor.path)
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn rename_keeps_bytes_and_refuses_fixed_or_foreign_paths() {
    let (blobs, repo) = memory_repo(CollisionPolicy::Disambiguate);
    let texture = repo
        .upload(
            &AssetKind::Texture {
                category: "walls".to_string(),
            },
            None,
            "brick.png",
            vec![5, 6],
            None,
        )
        .await
        .unwrap();

    let renamed = repo.rename(&texture.path, "red-brick.png").await.unwrap();
    assert_eq!(renamed.path, "textures/walls/red-brick.png");
    assert_eq!(renamed.content_type, "image/png");
    assert_eq!(blobs.read_url(&renamed.url).unwrap(), vec![5, 6]);
    assert!(repo
        .resolve_url(&texture.path)
        .await
        .unwrap_err()
        .is_not_found());
    assert_eq!(blobs.object_count(), 1);

    let model = repo
        .upload(&AssetKind::FloorModel, Some("f9"), "f9.glb", vec![1], None)
        .await
        .unwrap();
    let err = repo.rename(&model.path, "other.glb").await.unwrap_err();
    assert!(matches!(
        err,
        AssetError::Path(PathError::FixedFileName("floor-model"))
    ));

    let err = repo.rename("somewhere/else.bin", "x.bin").await.unwrap_err();
    assert!(matches!(err, AssetError::Path(PathError::NonCanonical(_))));
    assert_eq!(blobs.object_count(), 2);
}

#[test]
fn resolved_paths_parse_back_to_their_kind() {
    let parsed = parse_path("apartment-images/apt-1/main.jpg").unwrap();
    assert_eq!(parsed.kind, AssetKind::ApartmentImage);
    assert_eq!(parsed.owner.as_deref(), Some("apt-1"));
    assert!(parse_path("somewhere/else.bin").is_none());
}

fn memory_repo(policy: CollisionPolicy) -> (Arc<MemoryBlobStore>, AssetRepository<MemoryBlobStore>) {
    let blobs = Arc::new(MemoryBlobStore::default());
    let repo = AssetRepository::new(Arc::clone(&blobs), policy);
    (blobs, repo)
}
