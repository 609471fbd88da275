//! `panc check`, syntax checking without building.

use panc_build::{Compiler, CompilerOptions};

use crate::pipeline::{
    absolute_files, apply_path_args, apply_threads, discover_templates, load_project, print_report,
};
use crate::{CheckArgs, GlobalArgs};

/// Runs the `panc check` command.
///
/// Every file is parsed on the compile pool; nothing is written. Returns
/// exit code 0 if all files parse, 1 otherwise.
pub fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let mut config = load_project(global)?;
    apply_path_args(&mut config, &args.paths, &cwd);
    apply_threads(&mut config, args.threads);
    config.syntax_only = true;

    let files = if args.files.is_empty() {
        discover_templates(&config.include_dirs)
    } else {
        absolute_files(&args.files, &cwd)
    };
    if files.is_empty() {
        if !global.quiet {
            eprintln!("warning: no templates found");
        }
        return Ok(0);
    }

    if !global.quiet {
        eprintln!("    Checking {} templates", files.len());
    }

    let compiler = Compiler::new(CompilerOptions::from_config(&config))?;
    let report = compiler.run(&files, &[]);
    print_report(&report, global);
    Ok(if report.is_success() { 0 } else { 1 })
}
