use super::{json_pretty, open_image, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use hextractor_core::{InstallEvent, InstallPlan, InstallReport, InstallSelection, Installer};
use hextractor_schema::placeholders;
use indicatif::ProgressBar;
use std::path::Path;

pub struct InstallOptions<'a> {
    pub dry_run: bool,
    pub report: Option<&'a Path>,
    pub json: bool,
}

pub fn run(image: &Path, selection: InstallSelection, opts: &InstallOptions<'_>) -> Result<u8, String> {
    let image = open_image(image)?;
    let installer = Installer::new(image.as_ref(), selection);

    if opts.dry_run {
        let plan = installer.plan().map_err(|e| e.to_string())?;
        if opts.json {
            println!("{}", json_pretty(&plan)?);
        } else {
            print_plan(&plan);
        }
        return Ok(EXIT_SUCCESS);
    }

    let report = if opts.json {
        installer.install()
    } else {
        install_with_spinners(&installer)
    }
    .map_err(|e| e.to_string())?;

    if let Some(path) = opts.report {
        report.write_to_file(path).map_err(|e| e.to_string())?;
    }
    if opts.json {
        println!("{}", json_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(EXIT_SUCCESS)
}

fn install_with_spinners(installer: &Installer<'_>) -> Result<InstallReport, hextractor_core::CoreError> {
    let mut current: Option<(ProgressBar, String)> = None;
    let result = installer.install_with(|event| match event {
        InstallEvent::TargetStarted(t) => {
            let msg = format!("{} -> {}", t.label, t.destination.display());
            current = Some((spinner(&format!("installing {msg}")), msg));
        }
        InstallEvent::SharedTreeStarted(tree) => {
            let msg = format!("shared tree -> {}", tree.root.display());
            current = Some((spinner(&format!("copying {msg}")), msg));
        }
        InstallEvent::TargetFinished(_) | InstallEvent::SharedTreeFinished(_) => {
            if let Some((pb, msg)) = current.take() {
                spin_ok(&pb, &msg);
            }
        }
    });
    if let Some((pb, msg)) = current.take() {
        spin_fail(&pb, &msg);
    }
    result
}

/// `{install_root}/hfs{iso_version}` -> `from {install_root}/hfs{iso_version} (install_root, iso_version)`.
fn template_line(template: &str) -> String {
    let names = placeholders(template);
    if names.is_empty() {
        format!("from {template}")
    } else {
        format!("from {template} ({})", names.join(", "))
    }
}

fn print_plan(plan: &InstallPlan) {
    if plan.is_empty() {
        println!("nothing to install");
        return;
    }
    for target in plan.targets() {
        let version = target.version.as_deref().unwrap_or("-");
        println!(
            "{:<14} {:<12} -> {}",
            target.label,
            version,
            target.destination.display()
        );
        println!("    {}", template_line(&target.template));
        for archive in &target.archives {
            println!("    {}/{archive}", target.source_dir);
        }
    }
    if let Some(tree) = &plan.shared_tree {
        println!(
            "{:<14} {:<12} -> {}",
            "shared tree",
            "-",
            tree.root.display()
        );
        println!(
            "    {} files, {} directories, {} optional skipped",
            tree.files.len(),
            tree.dirs.len(),
            tree.skipped.len()
        );
    }
}

fn print_report(report: &InstallReport) {
    for target in &report.targets {
        let entries: usize = target.archives.iter().map(|a| a.entries).sum();
        println!(
            "installed {} into {} ({} archives, {entries} entries)",
            target.label,
            target.destination.display(),
            target.archives.len()
        );
    }
    if let Some(tree) = &report.shared_tree {
        println!(
            "copied {} shared files into {} ({} optional skipped)",
            tree.copied,
            tree.destination.display(),
            tree.skipped_optional
        );
    }
    if report.targets.is_empty() && report.shared_tree.is_none() {
        println!("nothing installed");
    }
}
