//! Init command implementation.

use anyhow::{bail, Result};
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# palinter configuration
# Folders are declared with a leading `/`; rules apply to a folder's children
# and, unless `non_recursive` is set, to everything below it.

# Paths skipped entirely
ignore:
  - "**/node_modules/**"
  - "**/dist/**"
  - "**/.git/**"

# Only these files have their content read
analyze_content_of_files_types: [ts, tsx, js, jsx]

# Reusable rules, referenced by name
blocks:
  kebab_case_folder:
    if_folder: any
    expect:
      name_case_is: kebab-case

# Applied in every folder, after local rules
global_rules:
  - if_file: { has_name: "*.test.ts" }
    expect: any

./:
  allow_unconfigured_files: true
  has_files_in_root: [package.json]

  /src:
    rules:
      - kebab_case_folder
      - if_file: { has_extension: [ts, tsx] }
        expect:
          name_case_is: camelCase
        error_msg: "`{{fileName}}` should be camelCase"

    /components:
      optional: true
      rules:
        - if_file: { has_extension: tsx }
          expect:
            name_case_is: PascalCase
            content_matches: ["export const {{fileName}}"]
"#;

/// Runs the init command.
pub fn run(force: bool) -> Result<bool> {
    let config_path = Path::new("palinter.yaml");

    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(config_path, DEFAULT_CONFIG)?;

    println!("Created palinter.yaml");
    println!("\nNext steps:");
    println!("  1. Edit palinter.yaml to describe your project layout");
    println!("  2. Run: palinter check");

    Ok(true)
}
