//! Basic example demonstrating soiltex library usage.
//!
//! Run with: cargo run -p soiltex --features fetch --example basic

use soiltex::{Coordinates, SoilError, SoilServiceBuilder};

fn main() -> Result<(), SoilError> {
    let service = SoilServiceBuilder::from_env().build()?;

    let locations = [
        ("Wuhan, China", 114.3, 30.6),
        ("Iowa farmland, USA", -93.6, 42.0),
        ("Pampas, Argentina", -61.0, -34.5),
    ];

    for (name, lon, lat) in &locations {
        println!("{}", name);
        println!("{:-<60}", "");

        match service.texture(Coordinates::new(*lon, *lat)) {
            Ok(samples) if samples.is_empty() => println!("  no texture data"),
            Ok(samples) => {
                for s in samples {
                    println!(
                        "  {:>8}: clay {:>6.2}%  sand {:>6.2}%  silt {:>6.2}%",
                        s.depth, s.clay_percent, s.sand_percent, s.silt_percent
                    );
                    if let Ok(m) = service.classify(s.clay_percent, s.silt_percent) {
                        println!(
                            "            class {} ({})",
                            m.normalized_code,
                            m.name.unwrap_or_default()
                        );
                    }
                }
            }
            Err(e) => println!("  error - {}", e),
        }
        println!();
    }

    Ok(())
}
