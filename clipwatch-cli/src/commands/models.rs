//! Model listing

use clipwatch_client::catalog::MODELS;
use colored::*;

/// Print every model the catalog knows, with its accepted parameters
pub fn print_models() {
    println!("{}", format!("Found {} model(s):", MODELS.len()).bold());
    println!();
    for spec in MODELS {
        println!("  {} {}", "▸".cyan(), spec.id.bold());
        println!("    Provider: {}", spec.provider.to_string().dimmed());
        println!(
            "    Seconds:  {} (default {})",
            spec.seconds_options.join(", "),
            spec.default_seconds
        );
        if spec.size_options.is_empty() {
            println!("    Size:     any (default {})", spec.default_size);
        } else {
            println!(
                "    Size:     {} (default {})",
                spec.size_options.join(", "),
                spec.default_size
            );
        }
        if let Some(ratio) = spec.aspect_ratio {
            println!("    Aspect:   {ratio}");
        }
        if spec.supports_image_reference {
            println!("    Accepts an image reference");
        }
        println!();
    }
}
