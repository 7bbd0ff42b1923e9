mod commands;
mod config;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use commands::install::InstallOptions;
use commands::exit_code_for;
use config::{DirsConfig, InstallConfig, Settings};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "hextractor",
    version,
    about = "Install Houdini and its add-ons from a SideFX offline image",
    subcommand_negates_reqs = true
)]
struct Cli {
    #[command(flatten)]
    install: InstallArgs,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// `--install-<x>` / `--no-install-<x>` pairs. The last one given wins; with
/// neither, the config file or platform default decides.
fn toggle(on: bool, off: bool) -> Option<bool> {
    if on {
        Some(true)
    } else if off {
        Some(false)
    } else {
        None
    }
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Args)]
struct InstallArgs {
    /// Offline image: an ISO file, or the root of a mounted or unpacked copy.
    #[arg(required = true, value_name = "IMAGE")]
    image: Option<PathBuf>,

    /// Print what would be installed without writing anything.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Write a JSON install report to this path.
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// TOML config file (default: ~/.config/hextractor/config.toml if present).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Install Houdini (default: on).
    #[arg(long, overrides_with = "no_install_houdini")]
    install_houdini: bool,
    #[arg(long, hide = true)]
    no_install_houdini: bool,

    /// Install Houdini Engine for Maya (default: off).
    #[arg(long, overrides_with = "no_install_engine_maya")]
    install_engine_maya: bool,
    #[arg(long, hide = true)]
    no_install_engine_maya: bool,

    /// Install Houdini Engine for Unity (default: off).
    #[arg(long, overrides_with = "no_install_engine_unity")]
    install_engine_unity: bool,
    #[arg(long, hide = true)]
    no_install_engine_unity: bool,

    /// Install Houdini Engine for Unreal (default: off).
    #[arg(long, overrides_with = "no_install_engine_unreal")]
    install_engine_unreal: bool,
    #[arg(long, hide = true)]
    no_install_engine_unreal: bool,

    /// Install the SideFX Labs package (default: off).
    #[arg(long, overrides_with = "no_install_sidefxlabs")]
    install_sidefxlabs: bool,
    #[arg(long, hide = true)]
    no_install_sidefxlabs: bool,

    /// Install the shared Houdini file system tree (default: on).
    #[arg(long, overrides_with = "no_install_shfs")]
    install_shfs: bool,
    #[arg(long, hide = true)]
    no_install_shfs: bool,

    /// Include optional files of the shared tree (default: on).
    #[arg(long, overrides_with = "no_install_optional_shfs")]
    install_optional_shfs: bool,
    #[arg(long, hide = true)]
    no_install_optional_shfs: bool,

    /// Houdini destination template.
    #[arg(long, value_name = "TEMPLATE")]
    houdini_dir: Option<String>,

    /// Houdini Engine for Maya destination template.
    #[arg(long, value_name = "TEMPLATE")]
    engine_maya_dir: Option<String>,

    /// Houdini Engine for Unity destination template.
    #[arg(long, value_name = "TEMPLATE")]
    engine_unity_dir: Option<String>,

    /// Houdini Engine for Unreal destination template.
    #[arg(long, value_name = "TEMPLATE")]
    engine_unreal_dir: Option<String>,

    /// SideFX Labs destination template.
    #[arg(long, value_name = "TEMPLATE")]
    sidefxlabs_dir: Option<String>,

    /// Shared tree destination template.
    #[arg(long, value_name = "TEMPLATE")]
    shfs_dir: Option<String>,

    /// Value of {install_root} in every template.
    #[arg(long, value_name = "DIR")]
    install_root: Option<String>,
}

impl InstallArgs {
    fn settings(&self) -> Settings {
        Settings {
            install_root: self.install_root.clone(),
            dirs: DirsConfig {
                houdini: self.houdini_dir.clone(),
                engine_maya: self.engine_maya_dir.clone(),
                engine_unity: self.engine_unity_dir.clone(),
                engine_unreal: self.engine_unreal_dir.clone(),
                sidefxlabs: self.sidefxlabs_dir.clone(),
                shfs: self.shfs_dir.clone(),
            },
            install: InstallConfig {
                houdini: toggle(self.install_houdini, self.no_install_houdini),
                engine_maya: toggle(self.install_engine_maya, self.no_install_engine_maya),
                engine_unity: toggle(self.install_engine_unity, self.no_install_engine_unity),
                engine_unreal: toggle(self.install_engine_unreal, self.no_install_engine_unreal),
                sidefxlabs: toggle(self.install_sidefxlabs, self.no_install_sidefxlabs),
                shfs: toggle(self.install_shfs, self.no_install_shfs),
                optional_shfs: toggle(self.install_optional_shfs, self.no_install_optional_shfs),
            },
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the products and packages an image contains.
    List {
        /// Offline image: an ISO file or an image root directory.
        image: PathBuf,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn run_install(args: &InstallArgs, json: bool) -> Result<u8, String> {
    let Some(image) = args.image.as_deref() else {
        return Err("no image given".to_owned());
    };
    let file = match &args.config {
        Some(path) => Some(Settings::load(path)?),
        None => Settings::load_default()?,
    };
    let settings = Settings::platform_defaults()
        .merge(file.unwrap_or_default())
        .merge(args.settings());
    tracing::debug!("effective settings: {settings:?}");

    commands::install::run(
        image,
        settings.into_selection(),
        &InstallOptions {
            dry_run: args.dry_run,
            report: args.report.as_deref(),
            json,
        },
    )
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("HEXTRACTOR_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;
    let result = match cli.command {
        None => run_install(&cli.install, json_output),
        Some(Commands::List { image }) => commands::list::run(&image, json_output),
        Some(Commands::Completions { shell }) => commands::completions::run::<Cli>(shell),
        Some(Commands::ManPages { dir }) => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}
