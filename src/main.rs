// Publish a disk image to a private OpenStack image store.
//
// Hashes the image, uploads it with checksum and version properties and
// then deletes the private images that had the same name before.
// Credentials come from the usual OS_* environment variables.
#[macro_use]
extern crate log;
use serde::Deserialize;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

mod config;
mod digest;
mod error;
mod glance;
mod publish;
mod session;
mod store;

use config::CloudConfig;
use error::Error;
use glance::GlanceStore;
use publish::Outcome;
use session::Session;

const USAGE: &str = "
Usage: glance-publish [options] <image>

Options:
    -n, --name NAME  Image name [default: punoko]
    --timeout SECS   Seconds to wait for the upload to become active [default: 600]
";

#[derive(Deserialize, Debug)]
struct Args {
    arg_image: PathBuf,
    flag_name: String,
    flag_timeout: u64,
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn main() -> Result<(), Error> {
    init_logging();
    let args: Args = docopt::Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    let config = CloudConfig::from_env()?;
    info!("Connecting to openstack");
    let store = GlanceStore::new(Session::connect(&config)?);

    let outcome = publish::publish(
        &store,
        &args.arg_image,
        &args.flag_name,
        publish::today(),
        Duration::from_secs(args.flag_timeout),
    )?;
    if outcome == Outcome::UploadFailed {
        std::process::exit(1);
    }
    info!("End of script");
    Ok(())
}
