use std::path::PathBuf;

use clap::Parser;
use michi::{report, scaffold_workspace, watch_workspace, Builder, Error, Options, WorkspaceConfig};

#[derive(Parser, Debug)]
#[clap(name = "michi", about, version)]
struct Args {
    /// Build every configured project once.
    #[clap(long, conflicts_with_all = &["watch", "setup"])]
    build: bool,

    /// Build every configured project, then rebuild on every change.
    #[clap(long, conflicts_with = "setup")]
    watch: bool,

    /// Create a starter workspace in the current directory.
    #[clap(long)]
    setup: bool,

    /// Workspace root directory.
    #[clap(long, parse(from_os_str), default_value = "michi")]
    main_dir: PathBuf,

    /// Output root (defaults to <main-dir>/build).
    #[clap(long, parse(from_os_str))]
    build_dir: Option<PathBuf>,

    /// Source root (defaults to <main-dir>/src).
    #[clap(long, parse(from_os_str))]
    src_dir: Option<PathBuf>,

    /// Workspace configuration module (defaults to <main-dir>/michi.config.js).
    #[clap(long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Increase output logging verbosity.
    #[clap(short, long)]
    debug: bool,
}

impl Args {
    fn options(&self) -> Options {
        let mut options = Options::new(&self.main_dir).with_debug(self.debug);
        if let Some(build_dir) = &self.build_dir {
            options = options.with_build_dir(build_dir);
        }
        if let Some(src_dir) = &self.src_dir {
            options = options.with_src_dir(src_dir);
        }
        if let Some(config) = &self.config {
            options = options.with_config_file(config);
        }
        options
    }
}

fn main() {
    let args = Args::parse();
    let options = args.options();
    if let Err(e) = simple_logger::init_with_level(if options.debug() {
        log::Level::Debug
    } else {
        log::Level::Info
    }) {
        eprintln!("Failed to initialize logger: {}", e);
    }
    report::banner(&format!("Michi {}", env!("CARGO_PKG_VERSION")));

    if args.setup {
        if let Err(e) = scaffold_workspace(".") {
            report::report_error(&e);
        }
        return;
    }

    log::debug!("{:?}", options);
    if args.build || args.watch {
        sweep(&options);
    }
    if args.watch {
        if let Err(e) = watch_workspace(&options) {
            report::report_error(&e);
        }
    }
}

fn sweep(options: &Options) {
    report::describe("Building");
    let workspace = match WorkspaceConfig::load(options) {
        Ok(workspace) => workspace,
        Err(e) => {
            if let Some(Error::NoProjects(path)) = e.downcast_ref::<Error>() {
                report::line(&path.display().to_string(), false, "NO PROJECTS TO BUILD");
            } else {
                report::report_error(&e);
            }
            return;
        }
    };
    match Builder::new(options).build_workspace(&workspace) {
        Ok(sweep) => log::info!("{}", sweep.summary()),
        Err(e) => report::report_error(&e),
    }
}
