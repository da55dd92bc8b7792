use anyhow::Result;
use clap::Parser;
use rustblf::config::{Cli, Command, Config};
use rustblf::contact::{ContactStore, MemoryContactStore};
use rustblf::dialog_info::backoff::{wait_fail, wait_term};
use rustblf::dialog_info::status::resolve;
use rustblf::dialog_info::{AccountProvider, TerminationReason};
use rustblf::useragent::UserAgent;
use std::fs::File;
use tracing::{info, level_filters::LevelFilter, warn};

fn check(config: Config) -> Result<()> {
    let store = MemoryContactStore::from_config(&config.contacts)?;
    let ua = UserAgent::new(config.ua.clone(), config.accounts.clone());
    match ua.find_account() {
        Some(account) => println!("account: {}", account.aor),
        None => warn!("no usable account, every subscribe would fail"),
    }
    let mut monitored = 0;
    for contact in store.contacts() {
        if contact.wants_dialog_info() {
            monitored += 1;
            println!("{}\t{}", contact.name, contact.address.outbound());
        }
    }
    info!(
        monitored,
        total = store.contacts().len(),
        expires = config.dialog_info.expires,
        "dialog-info contacts"
    );
    Ok(())
}

fn parse(path: &str) -> Result<()> {
    let body = std::fs::read(path).map_err(|e| anyhow::anyhow!("{}: {}", e, path))?;
    let resolved = resolve(&body);
    if resolved.parse_error {
        warn!(path, "body is not well formed, showing recovered fields");
    }
    println!("{}", serde_json::to_string_pretty(&resolved.state)?);
    Ok(())
}

fn backoff() {
    println!("failures\twait");
    for failures in 1..=4 {
        println!("{}\t{}", failures, wait_fail(failures));
    }
    println!("reason\twait");
    for reason in [
        TerminationReason::Deactivated,
        TerminationReason::Timeout,
        TerminationReason::Rejected,
        TerminationReason::NoResource,
        TerminationReason::Probation,
        TerminationReason::GiveUp,
    ] {
        println!("{}\t{}", reason.name(), wait_term(&reason, None));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.conf.as_deref() {
        Some(conf) if std::path::Path::new(conf).exists() => Config::load(conf)?,
        _ => Config::default(),
    };

    let mut log_fmt = tracing_subscriber::fmt();
    if let Some(ref level) = config.log_level {
        if let Ok(lv) = level.as_str().parse::<LevelFilter>() {
            log_fmt = log_fmt.with_max_level(lv);
        }
    }

    let _guard = if let Some(ref log_file) = config.log_file {
        let file = File::create(log_file)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        log_fmt.with_writer(non_blocking).try_init().ok();
        Some(guard)
    } else {
        log_fmt.try_init().ok();
        None
    };

    match cli.command.unwrap_or(Command::Check) {
        Command::Check => check(config),
        Command::Parse { path } => parse(&path),
        Command::Backoff => {
            backoff();
            Ok(())
        }
    }
}
