//! # Microapp configuration
//!
//! Microapps have no filesystem and no heap, so settings are fixed when the
//! image is built. This crate is used twice by a microapp crate:
//!
//! ## In `build.rs`
//!
//! ```toml
//! [build-dependencies]
//! microapp-config = { path = "../../source/config", features = ["use-std"] }
//! ```
//!
//! ```rust,ignore
//! # #[derive(serde::Serialize, serde::Deserialize)]
//! # struct AppSettings { blink_ms: u32 }
//! use microapp_config::buildtime::render_file;
//! fn main() {
//!     render_file::<AppSettings>("microapp.toml").unwrap();
//! }
//! ```
//!
//! [`buildtime::render_all`] renders every `.toml` file in a directory
//! instead, for crates that build several variants.
//!
//! The TOML file has a `[shim]` table, with any of the
//! [`ShimSettings`](microapp::ShimSettings) fields (missing ones keep their
//! defaults), and an `[app]` table for the microapp's own settings:
//!
//! ```toml
//! [shim]
//! mesh_buffer_slots = 2
//!
//! [app]
//! blink_ms = 500
//! ```
//!
//! ## In the microapp
//!
//! ```rust,ignore
//! fn shim_settings() -> microapp::ShimSettings {
//!     match microapp_config::include_config!(AppSettings) {
//!         Ok(config) => config.shim,
//!         Err(_) => microapp::ShimSettings::DEFAULT,
//!     }
//! }
//!
//! microapp::microapp_main!(setup = setup, loop = tick, settings = shim_settings());
//! ```

#![cfg_attr(not(any(feature = "use-std", test)), no_std)]

use microapp::ShimSettings;
use serde::{Deserialize, Serialize};

/// Everything configured at build time. `App` is the microapp's own
/// settings type.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MicroappConfig<App> {
    #[serde(default)]
    pub shim: ShimSettings,
    pub app: App,
}

pub const CONFIG_DIR_VAR: &str = "MICROAPP_CONFIG_DIR";
pub const CONFIG_FILE_VAR: &str = "MICROAPP_CONFIG";

/// For use in `build.rs` scripts.
#[cfg(feature = "use-std")]
pub mod buildtime {
    const OUT_DIR: &str = "OUT_DIR";
    const TAG: &str = concat!(module_path!(), ":");

    use std::{env, fs, path::Path};

    use super::*;
    use miette::{Context, IntoDiagnostic, Result};
    use serde::de::DeserializeOwned;

    /// Parse a TOML config and encode it the way
    /// [`include_config!`](crate::include_config) expects.
    pub fn render_str<App>(toml: &str) -> Result<Vec<u8>>
    where
        App: Serialize + DeserializeOwned,
    {
        let config: MicroappConfig<App> = toml::from_str(toml).into_diagnostic()?;
        postcard::to_stdvec(&config).into_diagnostic()
    }

    /// Render every `.toml` file in `config_dir` into `OUT_DIR`. Each can be
    /// embedded by name with [`include_config!`](crate::include_config).
    pub fn render_all<App>(config_dir: impl AsRef<Path>) -> Result<()>
    where
        App: Serialize + DeserializeOwned,
    {
        let config_dir = config_dir.as_ref();
        let dir_disp = config_dir.display();
        let out_dir = out_dir()?;

        println!("cargo:rerun-if-changed={dir_disp}");
        println!("cargo:rustc-env={CONFIG_DIR_VAR}={out_dir}");

        let mut rendered = 0;
        let mut skipped = 0;
        let entries = fs::read_dir(config_dir)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read config directory '{dir_disp}'"))?;
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(error) => {
                    println!("cargo:warning=Error reading config dir entry: {error}");
                    continue;
                }
            };
            if !path.is_file() || path.extension().map_or(true, |ext| ext != "toml") {
                eprintln!("{TAG} skipping '{}'", path.display());
                skipped += 1;
                continue;
            }

            render_file_to::<App>(&path, &out_dir)?;
            rendered += 1;
        }

        if rendered == 0 {
            Err(miette::MietteDiagnostic::new("No config files were rendered!")
                .with_help(format!("'{dir_disp}' held {skipped} other entries")))?;
        }
        Ok(())
    }

    /// Render one config file into `OUT_DIR`, for
    /// [`include_config!`](crate::include_config) without a name.
    pub fn render_file<App>(path: impl AsRef<Path>) -> Result<()>
    where
        App: Serialize + DeserializeOwned,
    {
        let out_dir = out_dir()?;
        let out = render_file_to::<App>(path, out_dir)?;
        println!("cargo:rustc-env={CONFIG_FILE_VAR}={}", out.display());
        Ok(())
    }

    fn out_dir() -> Result<String> {
        env::var(OUT_DIR)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read '{OUT_DIR}' env variable"))
    }

    fn render_file_to<App>(
        path: impl AsRef<Path>,
        out_dir: impl AsRef<Path>,
    ) -> Result<std::path::PathBuf>
    where
        App: Serialize + DeserializeOwned,
    {
        let path = path.as_ref();
        let path_disp = path.display();

        (|| {
            let filename = path
                .file_name()
                .ok_or_else(|| miette::miette!("Path has no filename!"))?;
            eprintln!("{TAG} rendering '{path_disp}'");
            let toml = fs::read_to_string(path).into_diagnostic()?;
            let encoded = render_str::<App>(&toml)?;

            let mut out = out_dir.as_ref().join(filename);
            out.set_extension("postcard");
            fs::write(&out, encoded).into_diagnostic()?;
            println!("cargo:rerun-if-changed={path_disp}");
            Ok::<_, miette::Report>(out)
        })()
        .wrap_err_with(|| format!("Failed to render config file '{path_disp}'"))
    }
}

/// For use in the microapp itself.
pub mod runtime {
    use crate::MicroappConfig;
    use serde::de::DeserializeOwned;

    #[derive(Debug, PartialEq)]
    pub enum Error {
        Postcard(postcard::Error),
    }

    pub fn from_postcard<App>(bytes: &[u8]) -> Result<MicroappConfig<App>, Error>
    where
        App: DeserializeOwned,
    {
        postcard::from_bytes(bytes).map_err(Error::Postcard)
    }
}

/// Load a config rendered by [`buildtime::render_file`] (no name) or
/// [`buildtime::render_all`] (by file stem).
#[macro_export]
macro_rules! include_config {
    ($app: ty, $name: literal) => {{
        const MICROAPP_CONFIG: &[u8] =
            include_bytes!(concat!(env!("MICROAPP_CONFIG_DIR"), "/", $name, ".postcard"));
        $crate::runtime::from_postcard::<$app>(MICROAPP_CONFIG)
    }};
    ($app: ty) => {{
        const MICROAPP_CONFIG: &[u8] = include_bytes!(env!("MICROAPP_CONFIG"));
        $crate::runtime::from_postcard::<$app>(MICROAPP_CONFIG)
    }};
}
