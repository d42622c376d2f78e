//! Filesystem-backed installations.
//!
//! Layout of a Discord installation's `resources` directory:
//!
//! ```text
//! unpatched              patched                    patched + OpenAsar
//! ─────────              ───────                    ──────────────────
//! app.asar               app.asar/   (shim dir)     app.asar/
//!                          index.js                   index.js
//!                          package.json               package.json
//!                        _app.asar   (original)     _app.asar          (OpenAsar)
//!                                                   _app.asar.original (original)
//! ```
//!
//! The shim's `index.js` requires the downloaded patcher, which in turn
//! loads `_app.asar`.

mod discovery;
mod installation;

pub use discovery::{FsSource, FsSourceConfig, default_search_roots};
pub use installation::FsInstallation;
