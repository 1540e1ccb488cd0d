//! Hash command - compute the build hash for a set of inputs

use crate::cache::{compute_build_hash, BuildOptions, BuildType, OptionValue, Toolchain};
use crate::cli::args::HashArgs;
use crate::config::Config;
use crate::error::{KilnError, KilnResult};
use crate::optimizer::extract_dependencies;

/// Execute the hash command
///
/// Prints the 64-hex build hash on stdout, nothing else, so the output
/// can be captured by scripts.
pub async fn execute(args: HashArgs, _config: &Config) -> KilnResult<()> {
    let build_type = BuildType::parse(&args.build_type).ok_or_else(|| {
        KilnError::User(format!(
            "Unknown build type '{}'. Use Debug, Release, RelWithDebInfo, or MinSizeRel",
            args.build_type
        ))
    })?;

    let arch = args
        .arch
        .unwrap_or_else(|| std::env::consts::ARCH.to_string());
    let toolchain = Toolchain::new(args.compiler, args.compiler_version, arch, build_type);

    let mut options = BuildOptions::new();
    for (key, value) in args.options {
        let value = match value.as_str() {
            "true" => OptionValue::Bool(true),
            "false" => OptionValue::Bool(false),
            _ => OptionValue::Str(value),
        };
        options.insert(key, value);
    }

    let mut deps = args.deps;
    if args.scan_deps {
        deps.extend(extract_dependencies(&args.sources));
    }

    let hash = compute_build_hash(&args.sources, &options, &deps, &toolchain)?;
    println!("{}", hash);

    Ok(())
}
