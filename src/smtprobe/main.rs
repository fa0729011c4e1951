//! SMTP credential prober: resolve the target, run the worker pool, report.
use std::sync::Arc;
use std::time::Duration;

use log::debug;

use probelib::error::ProbeResult;
use probelib::resolver::Resolver;
use probelib::smtp::prober::{ProbeStatus, Prober};

mod args;
use args::CliOptions;

mod display;
use display::{display_report, DisplayWrapper};

// resolved addresses stay valid for this long
const RESOLVER_CACHE_TTL: Duration = Duration::from_secs(300);

fn main() -> ProbeResult<()> {
    env_logger::init();

    // manage arguments from command line
    let mut options = CliOptions::options()?;
    debug!("options: {:?}", &options);

    // resolve the target through the cache-backed resolver when asked to
    if let (Some(domain), Some(dns)) = (&options.domain, &options.dns) {
        let resolver = Resolver::new(dns, options.config.timeout, RESOLVER_CACHE_TTL);
        match resolver.resolve(domain)? {
            Some(address) => {
                println!("{} resolved to {}", domain, address);
                options.config.host = address;
            }
            None => {
                eprintln!("no A record for {}", domain);
                std::process::exit(1);
            }
        }
    }

    let mut prober = Prober::new(options.config, options.params);
    prober.set_success_callback(Arc::new(|outcome| {
        println!("hit: {}", DisplayWrapper(outcome));
    }));
    prober.set_progress_callback(Arc::new(|total, done| {
        debug!("progress: {}/{}", done, total);
    }));

    let report = prober.run();
    display_report(&report);

    if matches!(report.status, ProbeStatus::Aborted(_)) {
        std::process::exit(1);
    }

    Ok(())
}
