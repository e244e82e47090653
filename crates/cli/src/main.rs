mod terminal;

use clap::{Parser, Subcommand};
use reportchat::app::App;
use reportchat::auth::{AuthBackend, HttpAuthBackend, SsoSdk, StaticSdk, VerifyOutcome};
use reportchat::chat::{CatalogClient, SendError};
use std::path::PathBuf;
use std::sync::Arc;
use terminal::TerminalSurface;

#[derive(Parser)]
#[command(name = "reportchat")]
#[command(about = "Report assistant chat client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Write a default configuration file.
    Init {
        /// Config file path (default: REPORTCHAT_CONFIG_PATH or ~/.reportchat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Sign in (if a token is available) and chat with the report assistant (interactive).
    Chat {
        /// Config file path (default: REPORTCHAT_CONFIG_PATH or ~/.reportchat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// SSO token (default: REPORTCHAT_SSO_TOKEN or sso.token in config)
        #[arg(long, value_name = "TOKEN")]
        token: Option<String>,

        /// Host name to report in the SSO context (default: sso.host in config, else "terminal")
        #[arg(long, value_name = "HOST")]
        host: Option<String>,

        /// Skip SSO even when a token is available; input is never gated.
        #[arg(long)]
        standalone: bool,
    },

    /// Fetch system status, sidebar and sample queries from the backend.
    Status {
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Verify an SSO token against the backend and print the resulting identity.
    SsoCheck {
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        #[arg(long, value_name = "TOKEN")]
        token: Option<String>,

        /// Use /auth/token-exchange instead of /auth/verify.
        #[arg(long)]
        exchange: bool,
    },

    /// End the backend session.
    Logout {
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("reportchat {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat {
            config,
            token,
            host,
            standalone,
        }) => {
            if let Err(e) = run_chat(config, token, host, standalone).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Status { config }) => {
            if let Err(e) = run_status(config).await {
                log::error!("status failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::SsoCheck {
            config,
            token,
            exchange,
        }) => {
            if let Err(e) = run_sso_check(config, token, exchange).await {
                log::error!("sso check failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Logout { config }) => {
            if let Err(e) = run_logout(config).await {
                log::error!("logout failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(reportchat::config::default_config_path);
    if reportchat::config::init_config(&path)? {
        println!("wrote default configuration to {}", path.display());
    } else {
        println!("configuration already exists at {}", path.display());
    }
    Ok(())
}

async fn run_chat(
    config_path: Option<PathBuf>,
    token: Option<String>,
    host: Option<String>,
    standalone: bool,
) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let (config, path) = reportchat::config::load_config(config_path)?;
    log::debug!("loaded config from {}", path.display());

    // Without a token there is nothing to sign in with; run as a standalone host.
    let token = token.or_else(|| reportchat::config::resolve_sso_token(&config));
    let sdk: Option<Arc<dyn SsoSdk>> = match token {
        Some(token) if !standalone => {
            let host = host
                .or_else(|| config.sso.host.clone())
                .unwrap_or_else(|| "terminal".to_string());
            Some(Arc::new(StaticSdk::new(Some(host), Some(token))))
        }
        _ => None,
    };

    let terminal = Arc::new(TerminalSurface::default());
    let mut app = App::new(&config, terminal.clone(), terminal.clone(), sdk);
    let state = app.start().await;
    println!("auth: {}", state);
    if let Some(route) = terminal.redirected_to() {
        anyhow::bail!("authentication requires interaction (redirected to {})", route);
    }
    app.connect().await;
    app.load_panels().await;

    let session = app.session().clone();
    let gate = app.gate().clone();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if !app.input().input_allowed() {
            if let Some(hint) = terminal.prompt_hint() {
                println!("({})", hint);
            }
        }
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }

        let result = if input.eq_ignore_ascii_case("/clear") {
            session.clear_chat().await
        } else if input.eq_ignore_ascii_case("/logout") {
            gate.logout().await;
            // Sign in again so the prompt does not stay locked.
            println!("auth: {}", gate.initialize().await);
            continue;
        } else if input.eq_ignore_ascii_case("/status") {
            let status = gate.status();
            println!(
                "auth: {} | chat: {}",
                status.state,
                session.connection().label()
            );
            continue;
        } else if let Some(n) = input.strip_prefix("/sample ") {
            match n.trim().parse::<usize>().ok().and_then(|i| terminal.sample(i)) {
                Some(query) => session.send_sample_query(&query).await,
                None => {
                    eprintln!("no such sample: {}", n.trim());
                    continue;
                }
            }
        } else {
            let count = session.set_draft(input);
            if count.over_limit() {
                eprintln!("message too long ({})", count);
                continue;
            }
            session.send_draft().await
        };

        match result {
            Ok(()) => {}
            // Already rendered in the transcript.
            Err(SendError::NotConnected) | Err(SendError::Emit(_)) => {}
            Err(e) => eprintln!("not sent: {}", e),
        }
    }

    Ok(())
}

async fn run_status(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (config, _) = reportchat::config::load_config(config_path)?;
    let catalog = CatalogClient::new(reportchat::config::resolve_base_url(&config));
    let (status, sidebar, samples) =
        tokio::join!(catalog.system_status(), catalog.sidebar(), catalog.samples());

    let status = status?;
    println!("status: {}", status.status.as_deref().unwrap_or("unknown"));
    println!("approach: {}", status.approach_label());
    println!("sidebar items: {}", status.configuration.sidebar_items_count);
    match sidebar {
        Ok(s) => println!("sidebar sections: {}", s.sections.len()),
        Err(e) => println!("sidebar: Failed to load menu ({})", e),
    }
    match samples {
        Ok(categories) => {
            for c in categories {
                println!("{}: {} queries", c.name, c.queries.len());
            }
        }
        Err(e) => println!("samples: Failed to load samples ({})", e),
    }
    Ok(())
}

async fn run_sso_check(
    config_path: Option<PathBuf>,
    token: Option<String>,
    exchange: bool,
) -> anyhow::Result<()> {
    let (config, _) = reportchat::config::load_config(config_path)?;
    let token = token
        .or_else(|| reportchat::config::resolve_sso_token(&config))
        .ok_or_else(|| anyhow::anyhow!("no SSO token (pass --token or set REPORTCHAT_SSO_TOKEN)"))?;
    let backend = HttpAuthBackend::new(reportchat::config::resolve_base_url(&config));

    if exchange {
        let user = backend.exchange(&token).await?;
        println!("{}", serde_json::to_string_pretty(&user)?);
        return Ok(());
    }

    match backend.verify(&token).await? {
        VerifyOutcome::Verified { user, registration } => {
            let identity = reportchat::auth::Identity::new(user, registration);
            println!("verified: {}", identity.header_label());
            if let Some(email) = identity.email() {
                println!("email: {}", email);
            }
            println!("registered: {}", identity.is_registered());
        }
        VerifyOutcome::Rejected { status, error } => {
            anyhow::bail!("rejected ({}): {}", status, error);
        }
    }
    Ok(())
}

async fn run_logout(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (config, _) = reportchat::config::load_config(config_path)?;
    HttpAuthBackend::new(reportchat::config::resolve_base_url(&config))
        .logout()
        .await?;
    println!("logged out");
    Ok(())
}
