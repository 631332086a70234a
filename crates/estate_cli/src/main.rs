//! Catalog summary entry point.
//!
//! # Responsibility
//! - Build the store clients from configuration once and inject them.
//! - Print a deterministic floor summary for quick local sanity checks.
//!
//! Usage: `estate_cli [config.json]`. `ESTATE_*` variables override the file.

use estate_core::store::blob::BlobStore;
use estate_core::store::document::DocumentStore;
use estate_core::{
    init_logging, AssetRepository, CatalogConfig, CatalogRepository, CatalogService,
    DefaultAssetLookup, FloorFilter, LocalBlobStore, MemoryBlobStore, SqliteDocumentStore,
};
use log::info;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("estate_cli: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = CatalogConfig::load(config_path.as_deref())?;

    if let Some(dir) = config.log.dir.as_deref() {
        init_logging(&config.log.level, absolute(dir)?)?;
    }
    info!(
        "event=cli_start module=core status=ok collision_policy={}",
        config.collision_policy.as_str()
    );

    let documents = Arc::new(match config.database_path.as_deref() {
        Some(path) => SqliteDocumentStore::open(path)?,
        None => SqliteDocumentStore::open_in_memory()?,
    });
    let catalog = CatalogRepository::new(documents);

    match config.asset_root.as_deref() {
        Some(root) => {
            let mut blobs = LocalBlobStore::new(root);
            if let Some(base) = config.public_base_url.as_deref() {
                blobs = blobs.with_public_base_url(base);
            }
            let assets = AssetRepository::new(Arc::new(blobs), config.collision_policy);
            print_summary(&CatalogService::new(catalog, assets)).await
        }
        None => {
            let assets = AssetRepository::new(
                Arc::new(MemoryBlobStore::default()),
                config.collision_policy,
            );
            print_summary(&CatalogService::new(catalog, assets)).await
        }
    }
}

async fn print_summary<D, B>(service: &CatalogService<D, B>) -> Result<(), Box<dyn Error>>
where
    D: DocumentStore,
    B: BlobStore,
{
    println!("estate_core version={}", estate_core::core_version());

    let floors = service
        .catalog()
        .list_floors(&FloorFilter::default())
        .await?;
    println!("floors={}", floors.len());
    for floor in floors {
        let overview = service.floor_overview(&floor.id).await?;
        let panoramas = service.floor_panorama_urls(&floor.id).await.len();
        println!(
            "floor number={} name={:?} status={} apartments={} drifted={} panoramas={}",
            floor.number,
            floor.name,
            floor.status.as_str(),
            overview.live_apartment_count,
            overview.count_drifted(),
            panoramas
        );
    }

    println!(
        "default_environment={}",
        describe_default(&service.default_environment().await)
    );
    println!(
        "default_floor_texture={}",
        describe_default(&service.default_floor_texture().await)
    );
    Ok(())
}

fn describe_default(lookup: &DefaultAssetLookup) -> &str {
    match lookup {
        DefaultAssetLookup::Found(url) => url,
        DefaultAssetLookup::UseDefault => "built-in",
    }
}

fn absolute(dir: &Path) -> std::io::Result<PathBuf> {
    if dir.is_absolute() {
        Ok(dir.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(dir))
    }
}
