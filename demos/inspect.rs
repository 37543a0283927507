use std::{env, fs};

use log::error;
use tomb_assets::{formats::misc::Txt, AssetError, AssetManager, AssetType, ResourceUrn};

/// Load each `urn=path` argument as a text asset, then look up the last urn's resource by its
/// bare name
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let manager = AssetManager::builder()
        .with_asset_type(AssetType::<String>::default())
        .build();

    let mut last = None;
    for arg in env::args().skip(1) {
        let Some((urn, path)) = arg.split_once('=') else {
            eprintln!("Expected urn=path, got '{arg}'");
            continue;
        };
        let urn: ResourceUrn = urn.parse()?;
        let bytes = fs::read(path)?;
        let text = manager.load_bytes(urn.clone(), &bytes, &Txt)?;
        println!("{} ({} bytes)", text.urn(), text.data()?.len());
        last = Some(urn);
    }

    let Some(urn) = last else {
        eprintln!("Missing argument: urn=path");
        return Ok(());
    };
    match manager.find_asset::<String>(urn.resource().as_str()) {
        Ok(Some(asset)) => println!("'{}' resolves to {}", urn.resource(), asset.urn()),
        Ok(None) => println!("'{}' is not loaded", urn.resource()),
        Err(AssetError::AmbiguousResource { candidates, .. }) => {
            println!("'{}' is ambiguous:", urn.resource());
            for candidate in candidates {
                println!("\t{candidate}");
            }
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        error!("{e}");
        eprintln!("{e}");
    }
}
