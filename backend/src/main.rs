//! Backend entry-point: loads configuration, installs logging and runs the
//! HTTP server with its background loops.

mod server;

use std::ffi::OsString;

use color_eyre::eyre::{Result, eyre};
use ortho_config::OrthoConfig as _;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use server::AppSettings;

#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = load_settings(std::env::args_os())?;
    server::run(settings).await
}

/// Layer defaults, configuration files, `GDE_KOFE_*` variables and `args`.
fn load_settings<I, T>(args: I) -> Result<AppSettings>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    AppSettings::load_from_iter(args).map_err(|err| eyre!("failed to load configuration: {err}"))
}

#[cfg(test)]
mod tests {
    use env_lock::lock_env;

    use super::*;

    #[test]
    fn settings_load_through_the_entry_point() {
        let _guard = lock_env([
            ("GDE_KOFE_BIND_ADDR", None::<String>),
            ("GDE_KOFE_DATABASE_URL", None),
        ]);

        let settings = load_settings(["gde-kofe-backend"]).expect("settings load");

        assert!(settings.bind_addr().is_ok());
    }
}
