use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use ip_proxy_checker::{
    config::AppConfig,
    logger::init_logger,
    proxy::{InputParser, ProxyType},
    render::render_table,
    session::{Delivery, Session},
    shell::Shell,
    storage::{Storage, API_KEY_SETTING},
    table::{CsvStyle, Record, SortConfig, SortDirection, StatusFilter, TableController},
    LocalService,
};
use log::LevelFilter;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Whois and IP-quality checker for IP and proxy lists
#[derive(Parser)]
#[command(name = "ip-proxy-checker")]
#[command(about = "Whois and IP-quality checker for IP and proxy lists")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// YAML config file (defaults to ./config.yml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: LevelFilter,

    /// SQLite database for settings and the whois cache (overrides config)
    #[arg(long, global = true)]
    database: Option<PathBuf>,
}

/// Table view options shared by the check commands
#[derive(clap::Args)]
struct ViewArgs {
    /// Column to sort by
    #[arg(short, long)]
    sort: Option<String>,
    /// Sort descending
    #[arg(long)]
    desc: bool,
    /// Case-insensitive text filter
    #[arg(long)]
    search: Option<String>,
    /// Write the displayed rows to CSV in this directory
    #[arg(short, long)]
    export: Option<PathBuf>,
    /// Write CSV cells without quoting
    #[arg(long)]
    verbatim_csv: bool,
}

impl ViewArgs {
    fn csv_style(&self) -> CsvStyle {
        if self.verbatim_csv {
            CsvStyle::Verbatim
        } else {
            CsvStyle::Quoted
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive shell
    Shell {
        /// Directory for CSV exports
        #[arg(long, default_value = ".")]
        export_dir: PathBuf,
        /// Write CSV cells without quoting
        #[arg(long)]
        verbatim_csv: bool,
    },
    /// Split input into bare IPs and proxies
    Parse {
        /// Input file ("-" for stdin)
        input: PathBuf,
        /// Output file for parsed proxies
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Proxy type (http, https, socks4, socks5)
        #[arg(short = 't', long, default_value = "http")]
        proxy_type: String,
    },
    /// Whois lookup of the bare IPs in the input
    Whois {
        /// Input file ("-" for stdin)
        input: PathBuf,
        /// Concurrent lookups (overrides config)
        #[arg(short = 'n', long)]
        threads: Option<usize>,
        /// MaxMind City database for offline lookups (overrides config)
        #[arg(long)]
        mmdb: Option<PathBuf>,
        /// Skip the whois cache
        #[arg(long)]
        no_cache: bool,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// IP-quality check of the proxies in the input
    Quality {
        /// Input file ("-" for stdin)
        input: PathBuf,
        /// Concurrent checks (overrides config)
        #[arg(short = 'n', long)]
        threads: Option<usize>,
        /// API key (overrides the stored one)
        #[arg(long)]
        api_key: Option<String>,
        /// Status filter (all, live, dead)
        #[arg(long, default_value = "all")]
        status: StatusFilter,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Manage stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Store the IP-quality API key
    SetKey { key: String },
    /// Print the stored IP-quality API key
    GetKey,
    /// Print the effective configuration as YAML
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.log_level)?;

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config = config.with_db_path(database);
    }

    let command = cli.command.unwrap_or(Commands::Shell {
        export_dir: PathBuf::from("."),
        verbatim_csv: false,
    });

    match command {
        Commands::Shell {
            export_dir,
            verbatim_csv,
        } => {
            let storage = Storage::open(&config.storage.db_path).await?;
            let service = LocalService::from_config(&config, Some(storage.clone()))?;
            let style = if verbatim_csv {
                CsvStyle::Verbatim
            } else {
                CsvStyle::Quoted
            };
            Shell::new(service, storage)
                .with_export_dir(export_dir)
                .with_csv_style(style)
                .run()
                .await?;
        }
        Commands::Parse {
            input,
            output,
            proxy_type,
        } => {
            let ptype = parse_proxy_type(&proxy_type)?;
            let parsed = InputParser::parse(&read_input(&input)?, ptype);

            println!(
                "Parsed {} lines from {:?}: {} IPs, {} proxies",
                parsed.total,
                input,
                parsed.ips.len(),
                parsed.proxies.len()
            );

            if let Some(output_path) = output {
                InputParser::save_to_file(&parsed.proxies, &output_path)?;
                println!("Saved parsed proxies to {:?}", output_path);
            } else {
                for entry in &parsed.ips {
                    println!("{} ({})", entry.ip, entry.version);
                }
                for proxy in &parsed.proxies {
                    println!("{}", proxy.to_full_string());
                }
            }
        }
        Commands::Whois {
            input,
            threads,
            mmdb,
            no_cache,
            view,
        } => {
            if let Some(threads) = threads {
                config = config.with_pool_size(threads);
            }
            config = config.with_mmdb_path(mmdb);
            let storage = if no_cache || !config.storage.cache_enabled {
                None
            } else {
                Some(Storage::open(&config.storage.db_path).await?)
            };

            let service = LocalService::from_config(&config, storage)?;
            let text = read_input(&input)?;

            let mut session = Session::new();
            let delivery = session.check_whois(&service, &text).await;
            fail_on_notice(&mut session, delivery)?;
            show(&mut session.whois, &view)?;
        }
        Commands::Quality {
            input,
            threads,
            api_key,
            status,
            view,
        } => {
            if let Some(threads) = threads {
                config = config.with_pool_size(threads);
            }
            let storage = Storage::open(&config.storage.db_path).await?;
            let api_key = match api_key {
                Some(key) => key,
                None => storage.api_key().await?,
            };

            let service = LocalService::from_config(&config, Some(storage))?;
            let text = read_input(&input)?;

            let mut session = Session::new();
            let delivery = session.check_quality(&service, &text, &api_key).await;
            fail_on_notice(&mut session, delivery)?;
            session.quality.set_status_filter(status);
            show(&mut session.quality, &view)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::SetKey { key } => {
                let storage = Storage::open(&config.storage.db_path).await?;
                storage.set_setting(API_KEY_SETTING, key.trim()).await?;
                println!("API key saved to {:?}", config.storage.db_path);
            }
            ConfigAction::GetKey => {
                let storage = Storage::open(&config.storage.db_path).await?;
                let key = storage.api_key().await?;
                if key.is_empty() {
                    println!("No API key set.");
                } else {
                    println!("{}", key);
                }
            }
            ConfigAction::Show => {
                print!("{}", serde_yaml::to_string(&config)?);
            }
        },
    }

    Ok(())
}

/// Turn a failed check into an error carrying its notices
fn fail_on_notice(session: &mut Session, delivery: Delivery) -> Result<()> {
    let notices = session.take_notices();
    if delivery != Delivery::Failed {
        return Ok(());
    }
    let message = notices
        .iter()
        .map(|notice| notice.error.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    Err(anyhow!(message))
}

fn show<R: Record>(table: &mut TableController<R>, view: &ViewArgs) -> Result<()> {
    if let Some(key) = &view.sort {
        let key = key.to_lowercase();
        if !table.spec().has_column(&key) {
            let known: Vec<&str> = table.spec().columns.iter().map(|c| c.key).collect();
            bail!("Unknown column '{}', expected one of: {}", key, known.join(", "));
        }
        let direction = if view.desc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        table.set_sort(SortConfig::by(key, direction));
    }
    if let Some(term) = &view.search {
        table.set_search(term.as_str());
    }

    print!("{}", render_table(table));

    if let Some(dir) = &view.export {
        match table.export_to(dir, view.csv_style())? {
            Some(path) => println!("Exported to {:?}", path),
            None => println!("Nothing to export."),
        }
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        return Ok(content);
    }
    Ok(std::fs::read_to_string(path)?)
}

fn parse_proxy_type(s: &str) -> Result<ProxyType> {
    match s.to_lowercase().as_str() {
        "http" => Ok(ProxyType::Http),
        "https" => Ok(ProxyType::Https),
        "socks4" => Ok(ProxyType::Socks4),
        "socks5" => Ok(ProxyType::Socks5),
        _ => Err(anyhow!(
            "Invalid proxy type: {}. Use: http, https, socks4, socks5",
            s
        )),
    }
}
