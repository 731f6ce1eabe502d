use anyhow::{Context, Error};
use getopts::Options;
use log::*;
use logosaurus::{self, Logger, L_LEVEL, L_TIME};
use reqwest::Client as HttpClient;
use std::env;
use std::io;
use std::process;
use tokenfetch::secrets::{JsonFile, SpotifySecrets};
use tokenfetch::spotify::{self, CLIENT_CREDENTIALS_INSTRUCTIONS};

const DEFAULT_SECRETS: &str = "secrets.json";

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = env::args().collect::<Vec<String>>();

    let mut opts = Options::new();
    opts.optopt("s", "secrets", "path to the secrets file (default: secrets.json)", "PATH");
    opts.optflag("v", "verbose", "log debug output");
    opts.optflag("h", "help", "print this help");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(e) => {
            eprint!("{}\n", e);
            print_usage(&args[0], &opts);
            process::exit(2);
        }
    };
    if matches.opt_present("h") {
        print_usage(&args[0], &opts);
        eprint!("\nTo obtain CLIENT_ID and CLIENT_SECRET:\n");
        eprint!("{}\n", CLIENT_CREDENTIALS_INSTRUCTIONS);
        return Ok(());
    }
    if !matches.free.is_empty() {
        print_usage(&args[0], &opts);
        process::exit(2);
    }

    let level = if matches.opt_present("v") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let logger = Logger::builder(io::stderr())
        .set_prefix("spotifytoken: ")
        .set_flags(L_LEVEL | L_TIME)
        .set_level(level)
        .build();
    logosaurus::init(logger).context("init logger")?;

    let file = JsonFile::new(
        matches
            .opt_str("s")
            .unwrap_or_else(|| DEFAULT_SECRETS.to_string()),
    );

    let c = spotify::Client::new(HttpClient::new());
    let rsp = match file.load::<SpotifySecrets>() {
        Ok(secrets) => c.obtain_access_token(&secrets).await,
        Err(e) => Err(e),
    };
    let tok = match rsp {
        Ok(tok) => tok,
        Err(e) if e.is_config() => {
            error!("{:#}", Error::from(e));
            error!(
                "define CLIENT_ID and CLIENT_SECRET in {}",
                file.path().display()
            );
            process::exit(2);
        }
        Err(e) => return Err(e).context("obtain Spotify access token"),
    };

    if let Some(at) = tok.expires_at {
        info!("access token expires at {}", at.to_rfc3339());
    }
    println!("{}", tok.value);
    Ok(())
}

fn print_usage(prog: &str, opts: &Options) {
    eprint!("{}", opts.usage(&format!("usage: {} [options]", prog)));
}
