//! `panc build`, the full compilation pipeline.
//!
//! 1. Load `panc.toml` and apply command-line overrides
//! 2. Collect the object templates to build (given files and names, or all)
//! 3. Optionally drop objects whose profiles are up to date
//! 4. Compile, build, validate and emit on the stage worker pools
//! 5. Report failures and statistics

use panc_build::{Compiler, CompilerOptions};
use panc_common::TemplateName;

use crate::pipeline::{
    absolute_files, apply_path_args, apply_threads, discover_object_templates, load_project,
    print_report,
};
use crate::{BuildArgs, GlobalArgs};

/// Runs the `panc build` command.
///
/// Returns exit code 0 if every object was written, 1 otherwise.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let mut config = load_project(global)?;
    apply_path_args(&mut config, &args.paths, &cwd);
    apply_threads(&mut config, args.threads);
    if args.gzip {
        config.gzip = true;
    }
    if let Some(pattern) = &args.ignore_dependencies {
        config.ignore_dependency_pattern = Some(pattern.clone());
    }

    let names = args
        .objects
        .iter()
        .map(|n| TemplateName::parse(n))
        .collect::<Result<Vec<_>, _>>()?;
    let files = if args.files.is_empty() && names.is_empty() {
        discover_object_templates(&config.include_dirs)
    } else {
        absolute_files(&args.files, &cwd)
    };

    if files.is_empty() && names.is_empty() {
        if !global.quiet {
            eprintln!("warning: no object templates found");
        }
        return Ok(0);
    }

    if !global.quiet {
        eprintln!(
            "   Compiling {} templates into {}",
            files.len() + names.len(),
            config.output_dir.display()
        );
    }

    let compiler = Compiler::new(CompilerOptions::from_config(&config))?;
    let report = if args.incremental {
        compiler.run_incremental(&files, &names)
    } else {
        compiler.run(&files, &names)
    };

    print_report(&report, global);
    Ok(if report.is_success() { 0 } else { 1 })
}
