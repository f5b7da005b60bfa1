//! CLI entry point for `mailshare`.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};

use mailshare::config::{self, Config};
use mailshare::model::mail::MailRecord;
use mailshare::model::token::{ApiType, CreateToken, TokenUpdate};
use mailshare::parser::header::{decode_encoded_words, header_value, parse_date, split_headers};
use mailshare::parser::eml::read_eml;
use mailshare::proxy::{parse_response, MailQuery};
use mailshare::store::{FileStore, TokenStore};
use mailshare::{extract_part, i18n, render, MailShareError};

#[derive(Parser)]
#[command(name = "mailshare", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Language (en, zh). Defaults to system locale.
    #[arg(long, global = true, value_name = "LANG")]
    lang: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the plain or HTML body of an .eml file
    Extract {
        file: PathBuf,
        #[arg(short, long, default_value = "plain", value_parser = ["plain", "html"])]
        part: String,
    },
    /// Show decoded headers of an .eml file
    Headers {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Show an .eml file
    Show {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Render an upstream mail list response
    Mails {
        /// JSON file, or '-' for stdin
        input: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Manage distribution tokens
    Token {
        #[command(subcommand)]
        command: TokenCommand,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(Subcommand)]
enum TokenCommand {
    /// Create a token
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        worker_url: String,
        /// user, user_api or admin
        #[arg(long, default_value = "user")]
        api_type: String,
        #[arg(long)]
        jwt: Option<String>,
        #[arg(long)]
        admin_auth: Option<String>,
        #[arg(long)]
        custom_auth: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// RFC 3339 or "YYYY-MM-DD HH:MM:SS" (UTC)
        #[arg(long)]
        expires_at: Option<String>,
        #[arg(long)]
        viewer_url: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// List tokens
    List {
        #[arg(long)]
        json: bool,
    },
    /// Delete a token
    Delete { id: String },
    /// Update a token
    Update {
        id: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        worker_url: Option<String>,
        #[arg(long)]
        api_type: Option<String>,
        #[arg(long)]
        jwt: Option<String>,
        #[arg(long)]
        admin_auth: Option<String>,
        #[arg(long)]
        custom_auth: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// New expiry, or "never" to clear it
        #[arg(long)]
        expires_at: Option<String>,
        #[arg(long, conflicts_with = "enable")]
        disable: bool,
        #[arg(long)]
        enable: bool,
    },
    /// Check a token as a viewer would
    Check {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Authorize a token and print its upstream mail request (counts one access)
    Request {
        id: String,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, default_value_t = 0)]
        offset: u32,
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

/// Detect language early from --lang arg or system env, before clap processes --help.
fn detect_lang_early() -> i18n::Lang {
    let args: Vec<String> = std::env::args().collect();
    for (i, arg) in args.iter().enumerate() {
        let code = if arg == "--lang" {
            args.get(i + 1).map(String::as_str)
        } else {
            arg.strip_prefix("--lang=")
        };
        if let Some(lang) = code.and_then(i18n::Lang::from_code) {
            return lang;
        }
    }
    i18n::detect_system_lang()
}

fn localized_about(name: &str) -> Option<&'static str> {
    Some(match name {
        "extract" => i18n::help_cmd_extract(),
        "headers" => i18n::help_cmd_headers(),
        "show" => i18n::help_cmd_show(),
        "mails" => i18n::help_cmd_mails(),
        "token" => i18n::help_cmd_token(),
        "create" => i18n::help_cmd_token_create(),
        "list" => i18n::help_cmd_token_list(),
        "delete" => i18n::help_cmd_token_delete(),
        "update" => i18n::help_cmd_token_update(),
        "check" => i18n::help_cmd_token_check(),
        "request" => i18n::help_cmd_token_request(),
        "completions" => i18n::help_cmd_completions(),
        "manpage" => i18n::help_cmd_manpage(),
        _ => return None,
    })
}

fn localize(cmd: clap::Command) -> clap::Command {
    let names: Vec<String> = cmd
        .get_subcommands()
        .map(|sub| sub.get_name().to_string())
        .collect();
    names.iter().fold(cmd, |cmd, name| {
        cmd.mut_subcommand(name, |sub| {
            let sub = match localized_about(name) {
                Some(about) => sub.about(about),
                None => sub,
            };
            localize(sub)
        })
    })
}

/// Build a localized clap Command using i18n strings.
fn build_localized_command() -> clap::Command {
    let cmd = Cli::command()
        .about(i18n::app_about())
        .long_about(i18n::app_long_about())
        .after_help(i18n::app_after_help());
    localize(cmd)
}

fn main() -> anyhow::Result<()> {
    // Detect language BEFORE clap parsing so --help is localized
    i18n::set_lang(detect_lang_early());

    let matches = build_localized_command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;

    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Extract { file, part } => cmd_extract(&file, &part),
        Commands::Headers { file, json } => cmd_headers(&file, json),
        Commands::Show { file, json } => cmd_show(&file, json, &config),
        Commands::Mails { input, json } => cmd_mails(&input, json, &config),
        Commands::Token { command } => cmd_token(command, &config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_path = config::log_file_path(config);
    let log_dir = log_path.parent().map(Path::to_path_buf).unwrap_or_default();
    let log_name = log_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "mailshare.log".into());
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, log_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailshare", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let man = clap_mangen::Man::new(Cli::command());
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

fn load_eml(path: &Path) -> anyhow::Result<String> {
    match read_eml(path) {
        Ok(raw) => Ok(raw),
        Err(MailShareError::FileNotFound(p)) => {
            anyhow::bail!("{}: {}", i18n::err_file_not_found(), p.display())
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_extract(path: &Path, part: &str) -> anyhow::Result<()> {
    let raw = load_eml(path)?;
    let body = extract_part(&raw, part);
    if !body.is_empty() {
        println!("{body}");
    }
    Ok(())
}

fn cmd_headers(path: &Path, json: bool) -> anyhow::Result<()> {
    let raw = load_eml(path)?;
    let headers = split_headers(&raw).headers;
    let subject = decode_encoded_words(&header_value(headers, "subject"));
    let from = decode_encoded_words(&header_value(headers, "from"));
    let to = decode_encoded_words(&header_value(headers, "to"));
    let date = header_value(headers, "date");

    if json {
        let output = serde_json::json!({
            "subject": subject,
            "from": from,
            "to": to,
            "date": parse_date(&date).map(|d| d.to_rfc3339()),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let date = render::format_date(parse_date(&date), &date);
        print!("{}", render::header_block(&subject, &from, &to, &date));
    }
    Ok(())
}

fn cmd_show(path: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    let raw = load_eml(path)?;
    let detail = MailRecord::from_raw(raw).detail(config.viewer.raw_preview_chars);
    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        print!("{}", render::mail_detail_text(&detail));
    }
    Ok(())
}

fn cmd_mails(input: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    let body = if input == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        if !input.exists() {
            anyhow::bail!("{}: {}", i18n::err_file_not_found(), input.display());
        }
        std::fs::read_to_string(input).map_err(|e| MailShareError::io(input, e))?
    };

    let mails = parse_response(&body)?;
    let summaries: Vec<_> = mails
        .iter()
        .map(|m| m.summary(config.viewer.list_header_scan_bytes))
        .collect();
    tracing::debug!(count = summaries.len(), "Parsed upstream response");

    if json {
        let output = serde_json::json!({
            "count": summaries.len(),
            "results": summaries,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!();
        print!("{}", render::mail_list_table(&summaries));
        println!();
    }
    Ok(())
}

fn parse_expiry(value: &str) -> anyhow::Result<chrono::DateTime<Utc>> {
    parse_date(value).ok_or_else(|| anyhow::anyhow!("{}: {value}", i18n::err_bad_expiry()))
}

/// Turn viewer-facing token errors into localized messages.
fn localize_error(err: MailShareError) -> anyhow::Error {
    let message = match err {
        MailShareError::TokenNotFound(id) => format!("{}: {id}", i18n::err_token_not_found()),
        MailShareError::TokenInvalid => i18n::err_token_invalid().to_string(),
        MailShareError::TokenExpired => i18n::err_token_expired().to_string(),
        MailShareError::TokenDisabled => i18n::err_token_disabled().to_string(),
        other => return other.into(),
    };
    anyhow::anyhow!(message)
}

fn open_token_store(config: &Config) -> anyhow::Result<TokenStore<FileStore>> {
    let kv = FileStore::open(config::token_store_path(config))?;
    Ok(TokenStore::with_viewer_url(
        kv,
        config.viewer.viewer_url.clone(),
    ))
}

fn cmd_token(command: TokenCommand, config: &Config) -> anyhow::Result<()> {
    let mut store = open_token_store(config)?;

    match command {
        TokenCommand::Create {
            email,
            worker_url,
            api_type,
            jwt,
            admin_auth,
            custom_auth,
            description,
            expires_at,
            viewer_url,
            json,
        } => {
            let request = CreateToken {
                email_address: email,
                description,
                mail_worker_url: worker_url,
                api_type: ApiType::from_name(&api_type),
                jwt_token: jwt,
                admin_auth,
                custom_auth,
                expires_at: expires_at.as_deref().map(parse_expiry).transpose()?,
                viewer_url,
            };
            let created = store.create(request)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&created)?);
            } else {
                println!("  {}: {}", i18n::msg_token_created(), created.id);
                println!("  {}: {}", i18n::msg_share_link(), created.url);
            }
        }
        TokenCommand::List { json } => {
            let tokens = store.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tokens)?);
            } else {
                println!();
                print!("{}", render::token_table(&tokens, Utc::now()));
                println!();
            }
        }
        TokenCommand::Delete { id } => {
            store.delete(&id)?;
            println!("  {}: {id}", i18n::msg_token_deleted());
        }
        TokenCommand::Update {
            id,
            email,
            worker_url,
            api_type,
            jwt,
            admin_auth,
            custom_auth,
            description,
            expires_at,
            disable,
            enable,
        } => {
            let expires_at = match expires_at.as_deref() {
                None => None,
                Some("never" | "none" | "") => Some(None),
                Some(value) => Some(Some(parse_expiry(value)?)),
            };
            let update = TokenUpdate {
                email_address: email,
                description,
                mail_worker_url: worker_url,
                api_type: api_type.as_deref().map(ApiType::from_name),
                jwt_token: jwt,
                admin_auth,
                custom_auth,
                expires_at,
                disabled: (disable || enable).then_some(disable),
            };
            store.update(&id, update).map_err(localize_error)?;
            println!("  {}: {id}", i18n::msg_token_updated());
        }
        TokenCommand::Check { id, json } => {
            let record = store.authorize(&id, Utc::now()).map_err(localize_error)?;
            let viewer = TokenStore::<FileStore>::public_config(&record);
            if json {
                let output = serde_json::json!({
                    "success": true,
                    "config": viewer,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("  {}", i18n::msg_token_valid());
                println!("  {:<14} {}", i18n::col_email(), viewer.email_address);
                if !viewer.description.is_empty() {
                    println!("  {:<14} {}", i18n::col_description(), viewer.description);
                }
                println!("  {:<14} {}", i18n::col_access(), record.access_count);
            }
        }
        TokenCommand::Request {
            id,
            limit,
            offset,
            keyword,
            json,
        } => {
            let query = MailQuery {
                limit: limit.unwrap_or_else(|| config.page_limit()),
                offset,
                keyword,
            };
            let request = store
                .mail_request(&id, Utc::now(), &query)
                .map_err(localize_error)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&request)?);
            } else {
                println!("GET {}", request.url);
                for (name, value) in &request.headers {
                    println!("{name}: {value}");
                }
            }
        }
    }
    Ok(())
}
