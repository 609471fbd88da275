//! `panc outdated`, lists object templates that need rebuilding.

use panc_build::CompilerOptions;
use panc_cache::{DependencyChecker, FileStatCache, Staleness};

use crate::pipeline::{absolute_files, apply_path_args, discover_object_templates, load_project};
use crate::{GlobalArgs, OutdatedArgs};

/// Runs the `panc outdated` command.
///
/// Prints one outdated file per line on stdout, followed by the reason when
/// verbose. Always returns exit code 0 once the check has run.
pub fn run(args: &OutdatedArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let mut config = load_project(global)?;
    apply_path_args(&mut config, &args.paths, &cwd);
    if let Some(pattern) = &args.ignore_dependencies {
        config.ignore_dependency_pattern = Some(pattern.clone());
    }

    let files = if args.files.is_empty() {
        discover_object_templates(&config.include_dirs)
    } else {
        absolute_files(&args.files, &cwd)
    };

    let options = CompilerOptions::from_config(&config);
    let mut checker =
        DependencyChecker::new(options.repository, options.output_dir, options.formatters);
    if let Some(pattern) = &options.ignore_dependency_pattern {
        checker = checker.with_ignore_pattern(pattern)?;
    }

    if global.verbose {
        let stats = FileStatCache::new();
        for file in &files {
            if let Staleness::Outdated(reason) = checker.check(file, &stats) {
                println!("{}: {reason}", file.display());
            }
        }
        eprintln!("    Checked {} files ({} stat calls)", files.len(), stats.stat_calls());
    } else {
        let outdated = checker.filter_outdated(&files);
        for file in &outdated {
            println!("{}", file.display());
        }
        if !global.quiet {
            eprintln!("    Checked {} files, {} outdated", files.len(), outdated.len());
        }
    }
    Ok(0)
}
