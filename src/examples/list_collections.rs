//! List Collections Example
//!
//! Prints every collection visible to the API key together with its
//! readiness and data-plane host.
//!
//! Run with: cargo run --example list_collections

use conifer_rs::{Client, ClientConfig, CollectionEntry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig::from_env()?;
    let _guard = conifer_rs::telemetry::init_telemetry(&config.telemetry)?;
    let client = Client::new(config)?;

    let collections = client.get_collections().await?;
    println!("{} collection(s) at {}", collections.len(), client.control_plane_url());

    for entry in &collections {
        let Some(name) = entry.name() else {
            continue;
        };

        let descriptor = match entry {
            CollectionEntry::Descriptor(descriptor) => descriptor.clone(),
            CollectionEntry::Name(_) => match client.get_collection(name).await {
                Ok(descriptor) => descriptor,
                Err(err) => {
                    println!("   {}: unavailable ({})", name, err);
                    continue;
                }
            },
        };

        println!(
            "   {}: ready={} host={}",
            name,
            descriptor.status.ready,
            descriptor.data_plane_url().unwrap_or_else(|| "-".to_string())
        );
    }

    Ok(())
}
