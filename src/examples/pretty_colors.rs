//! Pretty Colors Example
//!
//! Walks a collection through its whole lifecycle: create, wait until ready,
//! upload five RGB colors, search for the closest ones, delete, and wait
//! until it is gone. Errors are logged and the walk continues.
//!
//! Run with:
//!   CONIFER_API_KEY=... CONIFER_CONTROL_URL=https://controller.<region>.<provider>/ \
//!     cargo run --example pretty_colors

use conifer_rs::{ApiResponse, Client, ClientConfig, CollectionSpec, Metric, Point};
use serde_json::json;

const NAME: &str = "pretty-colors";
const RULE: &str = "-------------------------------------------------------------------------";

fn report<T: std::fmt::Debug>(what: &str, result: conifer_rs::Result<T>) {
    let result = ApiResponse::from(result);
    match (result.err, result.response) {
        (Some(err), _) => tracing::error!("{} failed: {}", what, err),
        (None, response) => tracing::info!("{} succeeded: {:?}", what, response),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig::from_env()?;
    let _guard = conifer_rs::telemetry::init_telemetry(&config.telemetry)?;
    let client = Client::new(config)?;

    println!("{}", RULE);
    let spec = CollectionSpec::new(3, Metric::DotProduct);
    report("Create collection", client.create_collection(NAME, &spec).await);

    println!("Waiting for \"{}\" to be ready...", NAME);
    report("Wait until ready", client.wait_until_ready(NAME).await);

    println!("{}", RULE);
    report("List collections", client.get_collections().await);
    report("Describe collection", client.get_collection(NAME).await);

    println!("{}", RULE);
    let points = vec![
        Point::new("colors-1", vec![0.9, 0.1, 0.1]).with_metadata("color", "red"),
        Point::new("colors-2", vec![0.1, 0.9, 0.1]).with_metadata("color", "green"),
        Point::new("colors-3", vec![0.1, 0.1, 0.9]).with_metadata("color", "blue"),
        Point::new("colors-4", vec![1.0, 0.1, 0.9]).with_metadata("color", "purple"),
        Point::new("colors-5", vec![0.1, 0.9, 0.8]).with_metadata("color", "cyan"),
    ];
    report("Upload points", client.upload_points(NAME, &points).await);

    println!("{}", RULE);
    let purplish = [0.8, 0.1, 0.7];
    match client.search_collection(NAME, &purplish, Some(2), None).await {
        Ok(found) => {
            println!("Search results for {:?}", purplish);
            for (i, hit) in found.hits().enumerate() {
                println!("   {}. {} (score: {:.4}) {:?}", i + 1, hit.id, hit.score, hit.metadata);
            }
        }
        Err(err) => tracing::error!("Couldn't search {:?}: {}", purplish, err),
    }

    let filter = json!({"color": {"$in": ["cyan"]}});
    match client
        .search_collection(NAME, &purplish, Some(1), Some(filter.clone()))
        .await
    {
        Ok(found) => {
            println!("Search results for {:?} with {}", purplish, filter);
            for hit in found.hits() {
                println!("   {} (score: {:.4})", hit.id, hit.score);
            }
        }
        Err(err) => tracing::error!("Couldn't search {:?} with {}: {}", purplish, filter, err),
    }

    println!("{}", RULE);
    report("Delete collection", client.delete_collection(NAME).await);
    report("Wait until deleted", client.wait_until_deleted(NAME).await);

    Ok(())
}
