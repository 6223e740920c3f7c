//! CLI command implementations

pub mod build;
pub mod cid;
pub mod deploy;
pub mod split;
pub mod validate;

use wardrobe_catalog::CatalogBuild;

/// Print one line per failed asset, with field-level issues when `detailed`
pub(crate) fn print_failures(build: &CatalogBuild, detailed: bool) {
    if build.failures.is_empty() {
        return;
    }
    println!("\nFailed assets:");
    for failure in &build.failures {
        println!("  {}", failure);
        if detailed {
            for issue in &failure.issues {
                println!("      {}", issue);
            }
        }
    }
}

/// Full error details were asked for, by flag or by `VERBOSE_ASSET_ERRORS`
pub(crate) fn detailed_errors(verbose: bool) -> bool {
    verbose || std::env::var("VERBOSE_ASSET_ERRORS").is_ok_and(|v| v == "1" || v == "true")
}
