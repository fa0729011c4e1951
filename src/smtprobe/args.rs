//! Manage command line arguments here.
use clap::{App, Arg};
use std::str::FromStr;
use std::time::Duration;

use probelib::error::{ProbeError, ProbeResult};
use probelib::smtp::config::{AuthMethod, ProbeParams, SmtpConfig};

/// This structure holds the command line arguments.
#[derive(Debug)]
pub struct CliOptions {
    pub config: SmtpConfig,
    pub params: ProbeParams,
    /// Resolve this name instead of taking --host verbatim.
    pub domain: Option<String>,
    /// DNS server used for --domain.
    pub dns: Option<String>,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl CliOptions {
    pub fn options() -> ProbeResult<Self> {
        let matches = App::new("SMTP credential prober")
            .version("0.1")
            .about(
                r#"Probes SMTP AUTH credentials against a server, optionally
resolving the target through DNS first.

Only use against servers you are authorized to test.
"#,
            )
            .arg(
                Arg::new("host")
                    .short('H')
                    .long("host")
                    .long_help("Target SMTP server (name or address)")
                    .takes_value(true),
            )
            .arg(
                Arg::new("domain")
                    .short('d')
                    .long("domain")
                    .long_help("Resolve this domain to find the target (needs --dns)")
                    .takes_value(true),
            )
            .arg(
                Arg::new("dns")
                    .short('n')
                    .long("dns")
                    .long_help("DNS server queried for --domain")
                    .takes_value(true),
            )
            .arg(
                Arg::new("port")
                    .short('p')
                    .long("port")
                    .long_help("SMTP port")
                    .takes_value(true),
            )
            .arg(
                Arg::new("users")
                    .short('u')
                    .long("users")
                    .required(true)
                    .long_help("Comma-separated list of usernames")
                    .takes_value(true),
            )
            .arg(
                Arg::new("passwords")
                    .short('w')
                    .long("passwords")
                    .required(true)
                    .long_help("Comma-separated list of passwords")
                    .takes_value(true),
            )
            .arg(
                Arg::new("auth")
                    .short('a')
                    .long("auth")
                    .long_help("Auth method: login, plain, cram-md5 or auto")
                    .takes_value(true),
            )
            .arg(
                Arg::new("tls")
                    .long("tls")
                    .long_help("Upgrade the session with STARTTLS")
                    .takes_value(false),
            )
            .arg(
                Arg::new("timeout")
                    .long("timeout")
                    .long_help("Per-I/O timeout in seconds")
                    .takes_value(true),
            )
            .arg(
                Arg::new("retries")
                    .long("retries")
                    .long_help("Retries per credential on recoverable failures")
                    .takes_value(true),
            )
            .arg(
                Arg::new("parallel")
                    .short('j')
                    .long("parallel")
                    .long_help("Number of concurrent workers")
                    .takes_value(true),
            )
            .arg(
                Arg::new("stop-on-success")
                    .short('s')
                    .long("stop-on-success")
                    .long_help("Stop handing out credentials after the first hit")
                    .takes_value(false),
            )
            .arg(
                Arg::new("ehlo")
                    .long("ehlo")
                    .long_help("Domain announced in EHLO")
                    .takes_value(true),
            )
            .get_matches();

        let domain = matches.value_of("domain").map(String::from);
        let dns = matches.value_of("dns").map(String::from);

        let host = match (matches.value_of("host"), &domain) {
            (Some(host), _) => String::from(host),
            (None, Some(_)) if dns.is_some() => String::new(),
            _ => {
                return Err(ProbeError::protocol(
                    "either --host or --domain with --dns is required",
                ))
            }
        };

        // save all cli options into the config records
        let mut config = SmtpConfig::new(&host);
        if let Some(port) = matches.value_of("port") {
            config.port = port.parse::<u16>().map_err(|e| e.to_string())?;
        }
        if let Some(auth) = matches.value_of("auth") {
            config.auth_method = AuthMethod::from_str(auth)?;
        }
        if let Some(timeout) = matches.value_of("timeout") {
            let secs = timeout.parse::<u64>().map_err(|e| e.to_string())?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = matches.value_of("retries") {
            config.max_retries = retries.parse::<u16>().map_err(|e| e.to_string())?;
        }
        if let Some(ehlo) = matches.value_of("ehlo") {
            config.ehlo_domain = String::from(ehlo);
        }
        config.use_tls = matches.is_present("tls");

        let mut params = ProbeParams::new(
            split_list(matches.value_of("users").unwrap()),
            split_list(matches.value_of("passwords").unwrap()),
        );
        if let Some(parallel) = matches.value_of("parallel") {
            params.parallelism = parallel.parse::<u16>().map_err(|e| e.to_string())?;
        }
        params.stop_on_first_success = matches.is_present("stop-on-success");

        Ok(CliOptions {
            config,
            params,
            domain,
            dns,
        })
    }
}
