//! CLI command implementations.
//!
//! | Module    | Commands handled |
//! |-----------|------------------|
//! | `project` | `Init`           |
//! | `stages`  | `Stages`         |
//! | `run`     | `Run`            |
//! | `config`  | `Config`         |

pub mod config;
pub mod project;
pub mod run;
pub mod stages;

pub use config::cmd_config;
pub use project::cmd_init;
pub use run::{RunArgs, cmd_run};
pub use stages::cmd_stages;
