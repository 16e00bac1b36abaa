use clap::Args;

use crate::config::ConfigArgs;

#[derive(Args)]
pub struct ServerCommand {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Skip loading the image model at startup
    #[arg(long)]
    pub lazy_image_model: bool,
}
