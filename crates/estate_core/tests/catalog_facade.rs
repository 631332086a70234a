use estate_core::model::apartment::ApartmentRef;
use estate_core::store::blob::BlobStore;
use estate_core::store::document::DocumentStore;
use estate_core::{
    AngleHotspots, ApartmentPatch, ApartmentStatus, AssetError, AssetKind, AssetRepository,
    BuyerContact, BuyerStatus, CatalogRepository, CatalogService, CatalogServiceError,
    CollisionPolicy, DefaultAsset, DefaultAssetLookup, FloorStatus, Hotspot, MemoryBlobStore,
    NewApartment, NewBuyer, NewFloor, NewPicture, NumericRange, PathError, PictureFilter,
    PictureType, RepoError, SqliteDocumentStore,
};
use serde_json::Value;
use std::sync::Arc;

type Service = CatalogService<SqliteDocumentStore, MemoryBlobStore>;

struct Fixture {
    documents: Arc<SqliteDocumentStore>,
    blobs: Arc<MemoryBlobStore>,
    service: Service,
}

#[tokio::test]
async fn floor_scenario_links_apartments_pictures_and_buyers() {
    let fx = fixture();
    let catalog = fx.service.catalog();
    let floor_id = catalog
        .create_floor(NewFloor::new(1, "First", FloorStatus::Active))
        .await
        .unwrap();
    let a1 = catalog
        .create_apartment(NewApartment::new(
            &floor_id,
            "A1",
            70.0,
            150_000.0,
            ApartmentStatus::Available,
        ))
        .await
        .unwrap();
    let a2 = catalog
        .create_apartment(NewApartment::new(
            &floor_id,
            "A2",
            95.0,
            240_000.0,
            ApartmentStatus::Reserved,
        ))
        .await
        .unwrap();

    fx.service
        .add_apartment_picture(&a1, "main.jpg", vec![1], None, PictureType::Main)
        .await
        .unwrap();
    fx.service
        .add_apartment_picture(&a1, "bath.jpg", vec![2], None, PictureType::Interior)
        .await
        .unwrap();

    let mut input = NewBuyer::new(
        "Ana",
        BuyerContact::new("ana@buyers.test", "555-0100"),
        BuyerStatus::Negotiating,
    );
    input.interested_apartment_ids = vec![a1.clone(), "deleted-apartment".to_string()];
    let buyer_id = catalog.create_buyer(input).await.unwrap();

    let apartments = fx.service.apartments_on_floor(&floor_id).await.unwrap();
    assert_eq!(apartments.len(), 2);

    let rows = fx.service.apartments_with_pictures(&floor_id).await.unwrap();
    let a1_row = rows
        .iter()
        .find(|row| row.apartment.id == a1)
        .unwrap();
    assert_eq!(a1_row.picture_urls.len(), 2);
    assert!(a1_row.picture_urls[0].ends_with("/main.jpg"));
    let a2_row = rows
        .iter()
        .find(|row| row.apartment.id == a2)
        .unwrap();
    assert!(a2_row.picture_urls.is_empty());

    let main = fx.service.main_picture(&a1).await.unwrap().unwrap();
    assert_eq!(main.order, 0);
    assert!(fx.service.main_picture(&a2).await.unwrap().is_none());

    let interested = fx.service.buyers_interested_in(&a1).await.unwrap();
    assert_eq!(interested.len(), 1);
    assert_eq!(interested[0].id, buyer_id);
    assert!(fx.service.buyers_interested_in(&a2).await.unwrap().is_empty());

    let refs = fx
        .service
        .resolve_interested_apartments(&buyer_id)
        .await
        .unwrap();
    assert_eq!(refs.len(), 2);
    assert!(matches!(&refs[0], ApartmentRef::Known(apartment) if apartment.lot_number == "A1"));
    assert_eq!(
        refs[1],
        ApartmentRef::Unknown("deleted-apartment".to_string())
    );
    assert_eq!(refs[1].label(), "unknown apartment");

    let overview = fx.service.floor_overview(&floor_id).await.unwrap();
    assert_eq!(overview.live_apartment_count, 2);
    assert!(!overview.count_drifted());

    let err = catalog.delete_floor(&floor_id).await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn pictures_come_back_in_display_order() {
    let fx = fixture();
    let apartment_id = seeded_apartment(&fx).await;
    let catalog = fx.service.catalog();
    for (order, name) in [(2, "c"), (0, "a"), (1, "b")] {
        catalog
            .create_picture(NewPicture::new(
                &apartment_id,
                format!("memory://assets/{name}.jpg"),
                PictureType::Interior,
                order,
            ))
            .await
            .unwrap();
    }

    let urls: Vec<String> = fx
        .service
        .pictures_for_apartment(&apartment_id)
        .await
        .unwrap()
        .into_iter()
        .map(|picture| picture.url)
        .collect();
    assert_eq!(
        urls,
        [
            "memory://assets/a.jpg",
            "memory://assets/b.jpg",
            "memory://assets/c.jpg"
        ]
    );
}

#[tokio::test]
async fn added_pictures_append_and_removal_deletes_the_image() {
    let fx = fixture();
    let apartment_id = seeded_apartment(&fx).await;

    let first = fx
        .service
        .add_apartment_picture(&apartment_id, "living.jpg", vec![1, 2], None, PictureType::Main)
        .await
        .unwrap();
    let second = fx
        .service
        .add_apartment_picture(&apartment_id, "living.jpg", vec![3], None, PictureType::Interior)
        .await
        .unwrap();
    assert_eq!(first.order, 0);
    assert_eq!(second.order, 1);
    assert_ne!(first.url, second.url);
    assert_eq!(fx.blobs.read_url(&first.url).unwrap(), vec![1, 2]);
    assert_eq!(fx.blobs.object_count(), 2);

    fx.service.remove_picture(&first.id).await.unwrap();
    assert!(fx
        .service
        .catalog()
        .find_picture(&first.id)
        .await
        .unwrap()
        .is_none());
    assert_eq!(fx.blobs.object_count(), 1);
    assert!(fx.blobs.read_url(&first.url).is_err());

    let err = fx
        .service
        .add_apartment_picture("ghost", "x.jpg", vec![1], None, PictureType::Main)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(fx.blobs.object_count(), 1);

    let err = fx
        .service
        .add_apartment_picture(
            &apartment_id,
            "plan.pdf",
            vec![1],
            Some("application/pdf"),
            PictureType::FloorPlan,
        )
        .await
        .unwrap_err();
    assert!(!err.is_not_found());
    assert_eq!(fx.blobs.object_count(), 1);
}

#[tokio::test]
async fn floor_model_upload_replaces_and_links_the_model() {
    let fx = fixture();
    let floor_id = fx
        .service
        .catalog()
        .create_floor(NewFloor::new(2, "Second", FloorStatus::Active))
        .await
        .unwrap();

    let first = fx
        .service
        .upload_floor_model(&floor_id, vec![1])
        .await
        .unwrap();
    let second = fx
        .service
        .upload_floor_model(&floor_id, vec![2, 2])
        .await
        .unwrap();
    assert_eq!(first.path, format!("floors/{floor_id}.glb"));
    assert_eq!(first.path, second.path);
    assert_eq!(fx.blobs.object_count(), 1);
    assert_eq!(fx.blobs.read_url(&second.url).unwrap(), vec![2, 2]);

    let floor = fx.service.catalog().get_floor(&floor_id).await.unwrap();
    assert_eq!(floor.model_ref.as_deref(), Some(second.url.as_str()));

    let err = fx
        .service
        .upload_floor_model("ghost", vec![1])
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn panoramas_are_sorted_by_file_name_with_even_angles() {
    let fx = fixture();
    let floor_id = fx
        .service
        .catalog()
        .create_floor(NewFloor::new(3, "Third", FloorStatus::Active))
        .await
        .unwrap();
    for index in [2usize, 0, 1] {
        fx.service
            .upload_floor_panorama(&floor_id, index, vec![index as u8])
            .await
            .unwrap();
    }
    fx.service
        .upload_floor_panorama(&floor_id, 1, vec![9])
        .await
        .unwrap();

    let urls = fx.service.floor_panorama_urls(&floor_id).await;
    assert_eq!(urls.len(), 3);
    for (index, url) in urls.iter().enumerate() {
        assert!(url.ends_with(&format!("floor-{floor_id}-angle-{index}.jpg")));
    }
    assert_eq!(fx.blobs.read_url(&urls[1]).unwrap(), vec![9]);

    let angles: Vec<f64> = fx
        .service
        .floor_panorama_views(&floor_id)
        .await
        .into_iter()
        .map(|view| view.angle)
        .collect();
    assert_eq!(angles, [0.0, 120.0, 240.0]);
}

#[tokio::test]
async fn panorama_listing_soft_fails() {
    let fx = fixture();
    let floor_id = fx
        .service
        .catalog()
        .create_floor(NewFloor::new(4, "Fourth", FloorStatus::Active))
        .await
        .unwrap();

    assert!(fx.service.floor_panorama_urls(&floor_id).await.is_empty());
    assert!(fx.service.floor_panorama_urls("../escape").await.is_empty());
    assert!(fx.service.floor_panorama_views(&floor_id).await.is_empty());

    for index in 0..3 {
        fx.service
            .upload_floor_panorama(&floor_id, index, vec![1])
            .await
            .unwrap();
    }
    fx.blobs
        .fail_path(&format!("floors/{floor_id}/floor-{floor_id}-angle-1.jpg"));
    let urls = fx.service.floor_panorama_urls(&floor_id).await;
    assert_eq!(urls.len(), 2);
    assert!(urls[1].ends_with("angle-2.jpg"));

    fx.blobs.fail_listing(&format!("floors/{floor_id}"));
    assert!(fx.service.floor_panorama_urls(&floor_id).await.is_empty());
}

#[tokio::test]
async fn panorama_order_is_lexicographic_past_ten_images() {
    let fx = fixture();
    let floor_id = fx
        .service
        .catalog()
        .create_floor(NewFloor::new(5, "Fifth", FloorStatus::Active))
        .await
        .unwrap();
    for index in [2usize, 10] {
        fx.service
            .upload_floor_panorama(&floor_id, index, vec![1])
            .await
            .unwrap();
    }

    let urls = fx.service.floor_panorama_urls(&floor_id).await;
    assert!(urls[0].ends_with("angle-10.jpg"));
    assert!(urls[1].ends_with("angle-2.jpg"));
}

#[tokio::test]
async fn ranges_on_price_and_area_are_combined() {
    let fx = fixture();
    let catalog = fx.service.catalog();
    let floor_id = catalog
        .create_floor(NewFloor::new(1, "First", FloorStatus::Active))
        .await
        .unwrap();
    for (lot, area, price) in [
        ("A1", 60.0, 140_000.0),
        ("A2", 95.0, 190_000.0),
        ("A3", 75.0, 210_000.0),
        ("A4", 80.0, 400_000.0),
    ] {
        catalog
            .create_apartment(NewApartment::new(
                &floor_id,
                lot,
                area,
                price,
                ApartmentStatus::Available,
            ))
            .await
            .unwrap();
    }

    let lots: Vec<String> = fx
        .service
        .apartments_in_ranges(
            NumericRange::between(100_000.0, 300_000.0),
            NumericRange::between(70.0, 90.0),
        )
        .await
        .unwrap()
        .into_iter()
        .map(|apartment| apartment.lot_number)
        .collect();
    assert_eq!(lots, ["A3"]);

    let by_area: Vec<String> = fx
        .service
        .apartments_in_ranges(NumericRange::default(), NumericRange::at_least(80.0))
        .await
        .unwrap()
        .into_iter()
        .map(|apartment| apartment.lot_number)
        .collect();
    assert_eq!(by_area, ["A4", "A2"]);
}

#[tokio::test]
async fn overview_reports_counter_drift() {
    let fx = fixture();
    let apartment_id = seeded_apartment(&fx).await;
    let apartment = fx
        .service
        .catalog()
        .get_apartment(&apartment_id)
        .await
        .unwrap();

    let mut drift = serde_json::Map::new();
    drift.insert("apartmentCount".to_string(), Value::from(5));
    fx.documents
        .update("floors", &apartment.floor_id, drift)
        .await
        .unwrap();

    let overview = fx.service.floor_overview(&apartment.floor_id).await.unwrap();
    assert!(overview.count_drifted());
    assert_eq!(overview.floor.apartment_count, 5);
    assert_eq!(overview.live_apartment_count, 1);

    assert!(fx
        .service
        .floor_overview("ghost")
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn default_assets_fall_back_until_uploaded() {
    let fx = fixture();
    assert_eq!(
        fx.service.default_environment().await,
        DefaultAssetLookup::UseDefault
    );
    assert_eq!(
        fx.service.default_floor_texture().await,
        DefaultAssetLookup::UseDefault
    );

    fx.blobs
        .put(DefaultAsset::FloorTexture.path(), vec![1], "image/jpeg")
        .await
        .unwrap();
    let texture = fx.service.default_floor_texture().await;
    assert!(texture
        .url()
        .unwrap()
        .ends_with("textures/floors/default-floor.jpg"));

    fx.blobs.fail_path(DefaultAsset::FloorTexture.path());
    assert_eq!(
        fx.service.default_floor_texture().await,
        DefaultAssetLookup::UseDefault
    );
}

#[tokio::test]
async fn hotspots_resolve_apartments_and_replace_angles() {
    let fx = fixture();
    let apartment_id = seeded_apartment(&fx).await;
    let catalog = fx.service.catalog();
    let floor_id = catalog.get_apartment(&apartment_id).await.unwrap().floor_id;

    let mut angles = AngleHotspots::new();
    angles.insert("0".to_string(), vec![Hotspot::new(&apartment_id, 30.0, 40.0)]);
    angles.insert("90".to_string(), vec![Hotspot::new("ghost", 60.0, 10.0)]);
    catalog
        .update_floor_hotspots(
            &floor_id,
            Some(vec![
                Hotspot::new(&apartment_id, 10.0, 20.0).with_size(5.0, 5.0),
                Hotspot::new("ghost", 50.0, 50.0),
            ]),
            Some(angles),
        )
        .await
        .unwrap();

    let placed = fx.service.floor_hotspots(&floor_id).await.unwrap();
    assert_eq!(placed.top_view.len(), 2);
    assert!(placed.top_view[0].apartment.is_known());
    assert_eq!(placed.top_view[0].apartment.label(), "A1");
    assert_eq!(placed.top_view[0].hotspot.width, Some(5.0));
    assert_eq!(placed.top_view[1].apartment.label(), "unknown apartment");
    let keys: Vec<&str> = placed.angles.keys().map(String::as_str).collect();
    assert_eq!(keys, ["0", "90"]);
    assert!(!placed.angles["90"][0].apartment.is_known());

    let mut replacement = AngleHotspots::new();
    replacement.insert("180".to_string(), vec![Hotspot::new(&apartment_id, 1.0, 2.0)]);
    catalog
        .update_floor_hotspots(&floor_id, None, Some(replacement))
        .await
        .unwrap();
    let floor = catalog.get_floor(&floor_id).await.unwrap();
    assert_eq!(floor.top_view_hotspots.len(), 2);
    let keys: Vec<&str> = floor.angle_hotspots.keys().map(String::as_str).collect();
    assert_eq!(keys, ["180"]);

    let err = catalog
        .update_floor_hotspots(&floor_id, Some(vec![Hotspot::new(&apartment_id, 150.0, 2.0)]), None)
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(catalog.get_floor(&floor_id).await.unwrap().top_view_hotspots.len(), 2);

    assert!(catalog
        .update_floor_hotspots("ghost-floor", Some(Vec::new()), None)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(fx.service.floor_hotspots("ghost-floor").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn panorama_rename_moves_the_image_without_replacing_others() {
    let fx = fixture();
    let floor_id = fx
        .service
        .catalog()
        .create_floor(NewFloor::new(6, "Sixth", FloorStatus::Active))
        .await
        .unwrap();
    for index in 0..2 {
        fx.service
            .upload_floor_panorama(&floor_id, index, vec![index as u8 + 1])
            .await
            .unwrap();
    }

    let renamed = fx
        .service
        .rename_floor_panorama(&floor_id, &format!("floor-{floor_id}-angle-0.jpg"), "front.jpg")
        .await
        .unwrap();
    assert_eq!(renamed.path, format!("floors/{floor_id}/front.jpg"));
    assert_eq!(renamed.content_type, "image/jpeg");
    assert_eq!(fx.blobs.read_url(&renamed.url).unwrap(), vec![1]);
    assert_eq!(fx.blobs.object_count(), 2);

    let err = fx
        .service
        .rename_floor_panorama(&floor_id, &format!("floor-{floor_id}-angle-1.jpg"), "front.jpg")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogServiceError::Asset(AssetError::AlreadyExists(_))
    ));

    let err = fx
        .service
        .rename_floor_panorama(&floor_id, "missing.jpg", "other.jpg")
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = fx
        .service
        .rename_floor_panorama(&floor_id, "front.jpg", "front.txt")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogServiceError::Asset(AssetError::Path(PathError::UnsupportedExtension { .. }))
    ));
    assert_eq!(fx.blobs.object_count(), 2);
    assert_eq!(fx.service.floor_panorama_urls(&floor_id).await.len(), 2);
}

#[tokio::test]
async fn deleting_an_apartment_removes_its_files() {
    let fx = fixture();
    let apartment_id = seeded_apartment(&fx).await;
    let catalog = fx.service.catalog();
    let floor_id = catalog.get_apartment(&apartment_id).await.unwrap().floor_id;
    let neighbour = catalog
        .create_apartment(NewApartment::new(
            &floor_id,
            "A2",
            60.0,
            120_000.0,
            ApartmentStatus::Available,
        ))
        .await
        .unwrap();

    let model = fx
        .service
        .assets()
        .upload(&AssetKind::Model, None, "tower.glb", vec![1], None)
        .await
        .unwrap();
    catalog
        .update_apartment(
            &apartment_id,
            ApartmentPatch {
                model_ref: Some(model.url.clone()),
                ..ApartmentPatch::default()
            },
        )
        .await
        .unwrap();
    for name in ["living.jpg", "bath.jpg"] {
        fx.service
            .add_apartment_picture(&apartment_id, name, vec![2], None, PictureType::Interior)
            .await
            .unwrap();
    }
    fx.service
        .assets()
        .upload(&AssetKind::ApartmentImage, Some(apartment_id.as_str()), "stray.png", vec![3], None)
        .await
        .unwrap();
    let kept = fx
        .service
        .add_apartment_picture(&neighbour, "main.jpg", vec![4], None, PictureType::Main)
        .await
        .unwrap();
    assert_eq!(fx.blobs.object_count(), 5);

    fx.service.delete_apartment(&apartment_id).await.unwrap();
    assert!(catalog.find_apartment(&apartment_id).await.unwrap().is_none());
    assert!(catalog
        .list_pictures(&PictureFilter::for_apartment(&apartment_id))
        .await
        .unwrap()
        .is_empty());
    assert_eq!(fx.blobs.object_count(), 1);
    assert_eq!(fx.blobs.read_url(&kept.url).unwrap(), vec![4]);

    assert!(fx.service.delete_apartment("ghost").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn deleting_a_floor_removes_its_model_and_panoramas() {
    let fx = fixture();
    let apartment_id = seeded_apartment(&fx).await;
    let floor_id = fx
        .service
        .catalog()
        .get_apartment(&apartment_id)
        .await
        .unwrap()
        .floor_id;
    fx.service
        .upload_floor_model(&floor_id, vec![1])
        .await
        .unwrap();
    for index in 0..2 {
        fx.service
            .upload_floor_panorama(&floor_id, index, vec![1])
            .await
            .unwrap();
    }
    assert_eq!(fx.blobs.object_count(), 3);

    let err = fx.service.delete_floor(&floor_id).await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(fx.blobs.object_count(), 3);

    fx.service.delete_apartment(&apartment_id).await.unwrap();
    fx.service.delete_floor(&floor_id).await.unwrap();
    assert!(fx.service.catalog().find_floor(&floor_id).await.unwrap().is_none());
    assert_eq!(fx.blobs.object_count(), 0);
}

#[tokio::test]
async fn file_cleanup_failures_do_not_fail_the_delete() {
    let fx = fixture();
    let floor_id = fx
        .service
        .catalog()
        .create_floor(NewFloor::new(7, "Seventh", FloorStatus::Active))
        .await
        .unwrap();
    fx.service
        .upload_floor_model(&floor_id, vec![1])
        .await
        .unwrap();
    fx.blobs.fail_path(&format!("floors/{floor_id}.glb"));

    fx.service.delete_floor(&floor_id).await.unwrap();
    assert!(fx.service.catalog().find_floor(&floor_id).await.unwrap().is_none());
    assert_eq!(fx.blobs.object_count(), 1);
}

fn fixture() -> Fixture {
    let documents = Arc::new(SqliteDocumentStore::open_in_memory().unwrap());
    let blobs = Arc::new(MemoryBlobStore::new("https://cdn.estate.test"));
    let service = CatalogService::new(
        CatalogRepository::new(Arc::clone(&documents)),
        AssetRepository::new(Arc::clone(&blobs), CollisionPolicy::Disambiguate),
    );
    Fixture {
        documents,
        blobs,
        service,
    }
}

async fn seeded_apartment(fx: &Fixture) -> String {
    let catalog = fx.service.catalog();
    let floor_id = catalog
        .create_floor(NewFloor::new(1, "First", FloorStatus::Active))
        .await
        .unwrap();
    catalog
        .create_apartment(NewApartment::new(
            &floor_id,
            "A1",
            70.0,
            150_000.0,
            ApartmentStatus::Available,
        ))
        .await
        .unwrap()
}
