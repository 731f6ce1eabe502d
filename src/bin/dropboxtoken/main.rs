use anyhow::{Context, Error};
use getopts::Options;
use log::*;
use logosaurus::{self, Logger, L_LEVEL, L_TIME};
use reqwest::Client as HttpClient;
use std::env;
use std::io;
use std::process;
use tokenfetch::dropbox::{self, ACCESS_CODE_INSTRUCTIONS};
use tokenfetch::secrets::{DropboxSecrets, JsonFile, ACCESS_CODE};
use tokenfetch::AuthError;

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
        print_help(&args[0], &opts);
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
        .set_prefix("dropboxtoken: ")
        .set_flags(L_LEVEL | L_TIME)
        .set_level(level)
        .build();
    logosaurus::init(logger).context("init logger")?;

    let file = JsonFile::new(
        matches
            .opt_str("s")
            .unwrap_or_else(|| DEFAULT_SECRETS.to_string()),
    );
    let secrets: DropboxSecrets = match file.load() {
        Ok(s) => s,
        Err(e) => config_failure(&file, &DropboxSecrets::default(), e),
    };

    let c = dropbox::Client::new(HttpClient::new());
    let tok = match c.obtain_access_token(&secrets, &file).await {
        Ok(tok) => tok,
        Err(e) if e.is_config() => config_failure(&file, &secrets, e),
        Err(AuthError::RefreshTokenNotSaved { pair, source }) => {
            error!("save refresh token: {:#}", Error::from(*source));
            error!(
                "add REFRESH_TOKEN to {} by hand, the access code cannot be used again",
                file.path().display()
            );
            eprint!("REFRESH_TOKEN: {}\n", pair.refresh_token);
            println!("{}", pair.access_token.value);
            process::exit(1);
        }
        Err(e) => return Err(e).context("obtain Dropbox access token"),
    };

    if let Some(at) = tok.expires_at {
        info!("access token expires at {}", at.to_rfc3339());
    }
    println!("{}", tok.value);
    Ok(())
}

fn config_failure(file: &JsonFile, secrets: &DropboxSecrets, e: AuthError) -> ! {
    let missing_code = matches!(e, AuthError::MissingCredential(ACCESS_CODE));
    error!("{:#}", Error::from(e));
    error!(
        "set all variables inside {} before proceeding",
        file.path().display()
    );
    if missing_code {
        if let Some(id) = secrets.client_id.as_deref().filter(|id| !id.is_empty()) {
            info!("get an access code at {}", dropbox::authorize_url(id));
        }
    }
    process::exit(2);
}

fn print_usage(prog: &str, opts: &Options) {
    eprint!("{}", opts.usage(&format!("usage: {} [options]", prog)));
}

fn print_help(prog: &str, opts: &Options) {
    print_usage(prog, opts);
    eprint!("\nBefore the first run:\n");
    eprint!("{}\n", ACCESS_CODE_INSTRUCTIONS);
    eprint!(
        "\nThe authorize URL is {}\n",
        dropbox::authorize_url("<CLIENT_ID>")
    );
}
