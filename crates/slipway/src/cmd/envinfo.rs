use std::collections::BTreeMap;

use serde::Serialize;
use slipway_pipeline::PipelineConfig;

use crate::cmd::EnvinfoArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct PlatformInfo {
    os: String,
    arch: String,
}

#[derive(Serialize)]
struct PipelineDefaults {
    buffer_size: usize,
    trigger_level: usize,
    max_packet_len: usize,
    unit_stack_size: usize,
}

#[derive(Serialize)]
struct EnvInfoOutput {
    schema_id: &'static str,
    version: String,
    target: String,
    rust_version: String,
    git_hash: String,
    platform: PlatformInfo,
    features: Vec<String>,
    pipeline_defaults: PipelineDefaults,
    environment: BTreeMap<String, Option<String>>,
}

pub fn run(_args: EnvinfoArgs, format: OutputFormat) -> CliResult<i32> {
    let defaults = PipelineConfig::default();

    let mut env = BTreeMap::new();
    env.insert("RUST_LOG".to_string(), std::env::var("RUST_LOG").ok());
    env.insert(
        "RUST_MIN_STACK".to_string(),
        std::env::var("RUST_MIN_STACK").ok(),
    );

    let output = EnvInfoOutput {
        schema_id: "slipway/cli/v1/envinfo",
        version: env!("CARGO_PKG_VERSION").to_string(),
        target: target_triple(),
        rust_version: option_env!("RUSTC_VERSION")
            .unwrap_or("unknown")
            .to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        platform: PlatformInfo {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        },
        features: active_features(),
        pipeline_defaults: PipelineDefaults {
            buffer_size: defaults.buffer_size,
            trigger_level: defaults.trigger_level,
            max_packet_len: defaults.max_packet_len,
            unit_stack_size: defaults.unit_stack_size(),
        },
        environment: env,
    };

    print_envinfo(&output, format);
    Ok(SUCCESS)
}

fn target_triple() -> String {
    if let Some(target) = option_env!("SLIPWAY_BUILD_TARGET") {
        return target.to_string();
    }

    match (std::env::consts::ARCH, std::env::consts::OS) {
        ("aarch64", "macos") => "aarch64-apple-darwin".to_string(),
        ("x86_64", "macos") => "x86_64-apple-darwin".to_string(),
        ("aarch64", "linux") => "aarch64-unknown-linux-gnu".to_string(),
        ("x86_64", "linux") => "x86_64-unknown-linux-gnu".to_string(),
        ("x86_64", "windows") => "x86_64-pc-windows-msvc".to_string(),
        (arch, os) => format!("{arch}-unknown-{os}"),
    }
}

fn print_envinfo(output: &EnvInfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("slipway environment\n");
            println!("  Version:    {}", output.version);
            println!("  Target:     {}", output.target);
            println!("  Rust:       {}", output.rust_version);
            println!("  Git hash:   {}", output.git_hash);
            println!(
                "  Platform:   {} ({})",
                output.platform.os, output.platform.arch
            );
            println!("  Features:   {}", output.features.join(", "));
            println!("\n  Pipeline defaults:");
            let defaults = &output.pipeline_defaults;
            println!("    {:<16} {}", "buffer_size", defaults.buffer_size);
            println!("    {:<16} {}", "trigger_level", defaults.trigger_level);
            println!("    {:<16} {}", "max_packet_len", defaults.max_packet_len);
            println!("    {:<16} {}", "unit_stack_size", defaults.unit_stack_size);
            println!("\n  Environment:");
            for (k, v) in &output.environment {
                println!("    {:<16} {}", k, v.as_deref().unwrap_or("(not set)"));
            }
        }
        OutputFormat::Raw => println!("{}", output.version),
    }
}

fn active_features() -> Vec<String> {
    let mut features = Vec::new();
    if cfg!(feature = "async") {
        features.push("async".to_string());
    }
    if cfg!(feature = "cli") {
        features.push("cli".to_string());
    }
    features
}
