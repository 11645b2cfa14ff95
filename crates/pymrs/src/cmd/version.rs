use serde::Serialize;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct VersionOutput {
    name: &'static str,
    version: &'static str,
    target: String,
    os: &'static str,
    arch: &'static str,
    rustc: &'static str,
    git_hash: &'static str,
    features: Vec<&'static str>,
}

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    if !args.extended {
        println!("pymrs {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let out = VersionOutput {
        name: "pymrs",
        version: env!("CARGO_PKG_VERSION"),
        target: target_triple(),
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        rustc: option_env!("RUSTC_VERSION").unwrap_or("unknown"),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        features: active_features(),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        _ => {
            println!("name: {}", out.name);
            println!("version: {}", out.version);
            println!("target: {}", out.target);
            println!("target_os: {}", out.os);
            println!("target_arch: {}", out.arch);
            println!("rustc: {}", out.rustc);
            println!("git_hash: {}", out.git_hash);
            println!("features: {}", out.features.join(", "));
        }
    }
    Ok(SUCCESS)
}

fn target_triple() -> String {
    option_env!("PYMRS_BUILD_TARGET")
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}-unknown-{}", std::env::consts::ARCH, std::env::consts::OS))
}

fn active_features() -> Vec<&'static str> {
    let mut features = vec!["cli"];
    if cfg!(feature = "tokio") {
        features.push("tokio");
    }
    features
}
