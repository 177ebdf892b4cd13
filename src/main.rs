use clap::{Parser, Subcommand};
use quire::{config, generate, output, site, template};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let describe = env!("QUIRE_GIT_DESCRIBE");
    let release_tag = format!("v{}", env!("CARGO_PKG_VERSION"));
    if describe.is_empty() || describe == release_tag {
        env!("CARGO_PKG_VERSION")
    } else {
        // Leaked once at startup
        Box::leak(format!("dev@{describe}").into_boxed_str())
    }
}

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Assemble a static site from Jinja templates, markdown and data")]
#[command(long_about = "\
Assemble a static site from Jinja templates, markdown and data

The directory layout is the configuration. Templates under the pages root
become routes, markdown articles are wrapped by the nearest layout, and data
files are merged into every template's scope.

Project structure (default paths):

  site/
  ├── config.toml                      # Build settings (optional)
  ├── src/store/                       # JSON/TOML data, merged by sorted path
  │   └── metadata.json                # `metadata` feeds the document <head>
  └── src/theme/
      ├── views/
      │   ├── home.jinja               # Route /
      │   ├── pages/
      │   │   ├── about.jinja          # Route /about/
      │   │   ├── blog.jinja           # Route /blog/ (paginated listing)
      │   │   └── blog/
      │   │       └── archive.jinja    # Route /blog/archive/
      │   └── articles/
      │       ├── layout.jinja         # Layout for every article...
      │       └── blog/layout.jinja    # ...except those under blog/
      └── markdown/
          ├── articles/blog/first.md   # Route /blog/first/
          └── partials/footer.md       # Template variable `footer`

Run 'quire gen-config' to print a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Project directory
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Log pipeline progress (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render every route and publish the output directory
    Build {
        /// Also write the build report as JSON to this file
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Load sources and plan routes without writing anything
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
    /// Print the current UTC time as YYYY-MM-DDTHH:MM:SSZ
    Now,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Build { manifest } => {
            let settings = config::load_config(&cli.root)?;
            init_thread_pool(&settings.processing);

            println!("==> Loading {}", cli.root.display());
            let site = site::Site::load(&cli.root, settings)?;

            println!("==> Rendering → {}", site.roots.output.display());
            let report = site.build()?;
            output::print_build_report(&report, &cli.root);

            if let Some(path) = manifest {
                generate::write_manifest(&report, &path)?;
                println!("==> Manifest written to {}", path.display());
            }
            println!("==> Build complete: {}", report.output.display());
        }
        Command::Check => {
            let settings = config::load_config(&cli.root)?;
            init_thread_pool(&settings.processing);

            println!("==> Checking {}", cli.root.display());
            let plan = site::Site::load(&cli.root, settings)?.plan()?;
            output::print_plan(&plan, &cli.root);
            println!("==> Site is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Now => {
            println!("{}", template::now_utc());
        }
    }

    Ok(())
}

/// Install the fmt subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "quire=info" } else { "quire=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; config can lower it, not raise it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
