use clap::{Args, Parser, Subcommand};
use obset_products::config::{self, Config};
use obset_products::naming::ObsetFilenames;
use obset_products::products::{self, ObsetError, ObsetProducts};
use obset_products::tree::ObsetTree;
use obset_products::{naming, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Manifest inputs shared by the per-obset commands.
#[derive(Args, Clone)]
struct ManifestArgs {
    /// Poller manifest files (one obset each)
    #[arg(required = true)]
    manifests: Vec<PathBuf>,

    /// Print JSON instead of the text listing
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
#[command(name = "obset-products")]
#[command(version)]
#[command(about = "Name the HLA products of pipeline poller obsets")]
#[command(long_about = "\
Name the HLA products of pipeline poller obsets

Reads the header-less manifest the pipeline poller writes for an obset:

  filename,proposal_id,program_id,obset_id,exptime,filters,detector,path
  ia1s70jtq_flt.fits,11150,A1S,70,149.23,F110W,IR,/ifs/archive/.../ia1s70jtq_flt.fits

groups the exposures by detector and filter, lists the products to build
(total detection, filter and single exposure) and derives their filenames:

  total detection product 00
      image: hst_11150_70_wfc3_ir_total_ia1s70_drz.fits
      point source catalog: hst_11150_70_wfc3_ir_total_ia1s70_point-cat.ecsv
      segment source catalog: hst_11150_70_wfc3_ir_total_ia1s70_segment-cat.ecsv

Set RUST_LOG=debug to trace product allocation.
Run 'obset-products gen-config' to generate a documented config file.")]
struct Cli {
    /// Config file (defaults to ./obset-products.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fail unless every manifest has exactly this many rows
    #[arg(long, global = true)]
    expected_rows: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the detector → filter → exposure grouping
    Tree(ManifestArgs),
    /// List products with their info strings and input files
    Products(ManifestArgs),
    /// List products with their generated filenames
    Names(ManifestArgs),
    /// Generate filenames for one product from its category and info string
    Name {
        /// Product category, e.g. "filter product 00" or "multivisit mosaic product"
        category: String,
        /// Space-separated info string, e.g. "11150 70 wfc3 ir f110w ia1s70jtq drz"
        info: String,
    },
    /// Print a stock config file with all options documented
    GenConfig,
}

/// Everything derived from one manifest.
struct Interpreted {
    name: String,
    tree: ObsetTree,
    products: ObsetProducts,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Tree(args) => {
            let config = resolve_config(cli.config.as_deref())?;
            let results = interpret_all(&args.manifests, &config, cli.expected_rows)?;
            if args.json {
                let trees: Vec<(String, ObsetTree)> =
                    results.into_iter().map(|r| (r.name, r.tree)).collect();
                println!("{}", output::format_json(&trees)?);
            } else {
                for result in &results {
                    print_header(&results, &result.name);
                    output::print_tree_output(&result.tree);
                }
            }
        }
        Command::Products(args) => {
            let config = resolve_config(cli.config.as_deref())?;
            let results = interpret_all(&args.manifests, &config, cli.expected_rows)?;
            if args.json {
                let products: Vec<(String, ObsetProducts)> =
                    results.into_iter().map(|r| (r.name, r.products)).collect();
                println!("{}", output::format_json(&products)?);
            } else {
                for result in &results {
                    print_header(&results, &result.name);
                    output::print_products_output(&result.products);
                }
            }
        }
        Command::Names(args) => {
            let config = resolve_config(cli.config.as_deref())?;
            let results = interpret_all(&args.manifests, &config, cli.expected_rows)?;
            let names = name_all(&results)?;
            if args.json {
                println!("{}", output::format_json(&names)?);
            } else {
                for (name, filenames) in &names {
                    print_header(&results, name);
                    output::print_names_output(filenames);
                }
            }
        }
        Command::Name { category, info } => {
            let filenames = naming::run_generator(&category, &info)?;
            for line in output::format_filenames(&filenames, 0) {
                println!("{}", line);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config from `--config`, or from the working directory.
fn resolve_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    match path {
        Some(path) => config::load_config(path),
        None => config::load_config_in(Path::new(".")),
    }
}

/// Interpret every manifest in parallel, keeping input order.
fn interpret_all(
    paths: &[PathBuf],
    config: &Config,
    expected_rows: Option<usize>,
) -> Result<Vec<Interpreted>, ObsetError> {
    init_thread_pool(&config.processing);
    let obsets = products::interpret_manifest_files(paths, config, expected_rows)?;
    Ok(paths
        .iter()
        .zip(obsets)
        .map(|(path, obset)| Interpreted {
            name: path.display().to_string(),
            tree: obset.tree,
            products: obset.products,
        })
        .collect())
}

/// Generate the filenames of every interpreted manifest.
fn name_all(results: &[Interpreted]) -> Result<Vec<(String, ObsetFilenames)>, ObsetError> {
    let mut names = Vec::with_capacity(results.len());
    for result in results {
        let filenames = naming::generate_product_filenames(&result.products)?;
        names.push((result.name.clone(), filenames));
    }
    Ok(names)
}

/// Label each listing with its manifest when several were given.
fn print_header(results: &[Interpreted], name: &str) {
    if results.len() > 1 {
        println!("==> {}", name);
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the config can only lower it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
