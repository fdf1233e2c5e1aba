//! Build script for the rxauth0 crate.
//!
//! This script loads environment variables at compile time, making them available
//! to the `option_env!()` macro in the source code.
//!
//! Priority order:
//! 1. Environment variables already set (e.g., from CI/CD, system env)
//! 2. Variables from `.env` file (if it exists)
//! 3. Variables from `.env.example` file (fallback for CI builds)

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    // Tell Cargo to rerun this build script if .env or .env.example changes
    println!("cargo:rerun-if-changed=.env");
    println!("cargo:rerun-if-changed=.env.example");
    println!("cargo:rerun-if-changed=../.env");
    println!("cargo:rerun-if-changed=../.env.example");

    // Env files live next to the crate or one level up in a workspace
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_default());
    let env_file = find_up(&manifest_dir, ".env");
    let env_example_file = find_up(&manifest_dir, ".env.example");

    // Count how many variables are already set in the environment
    let required_vars = [
        "AUTH0_DOMAIN",
        "AUTH0_CLIENT_ID",
        "AUTH0_AUDIENCE",
        "AUTH0_REDIRECT_URI",
    ];
    let env_vars_set = required_vars
        .iter()
        .filter(|&var| env::var(var).is_ok())
        .count();

    // Determine which env file to load
    let (file_to_load, file_description) = match (env_file, env_example_file) {
        (Some(env_file), _) => (Some(env_file), ".env"),
        (None, Some(example)) if env_vars_set == 0 => (Some(example), ".env.example (fallback)"),
        _ => (None, ""),
    };

    // Load the env file if one was found
    if let Some(file_path) = file_to_load {
        println!(
            "cargo:warning=Found {} file, loading configuration (environment variables take priority)",
            file_description
        );

        let Ok(contents) = fs::read_to_string(&file_path) else {
            println!("cargo:warning=Failed to read {}", file_path.display());
            return;
        };

        for line in contents.lines() {
            // Skip empty lines and comments
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // Parse KEY=VALUE
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"');

                // Only set if not already set in environment
                if env::var(key).is_err() {
                    println!("cargo:rustc-env={}={}", key, value);
                }
            }
        }
    } else if env_vars_set > 0 {
        println!(
            "cargo:warning=Using Auth0 configuration from environment variables ({}/{} set)",
            env_vars_set,
            required_vars.len()
        );
    } else {
        println!(
            "cargo:warning=No .env or .env.example file found and no environment variables set"
        );
        println!("cargo:warning=Set AUTH0_* environment variables or create a .env file");
    }
}

/// Looks for `name` in `dir` and then its parent.
fn find_up(dir: &Path, name: &str) -> Option<PathBuf> {
    [Some(dir), dir.parent()]
        .into_iter()
        .flatten()
        .map(|d| d.join(name))
        .find(|path| path.exists())
}
