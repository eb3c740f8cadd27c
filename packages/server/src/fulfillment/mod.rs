mod grants;
mod sweeper;

pub use grants::{DownloadGrants, Resolution};
pub use sweeper::run_verification_sweeper;
