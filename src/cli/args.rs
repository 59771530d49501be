use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "teams-watcher")]
#[command(about = "Relays Teams recording notifications to a transcription service", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Manage the Graph webhook subscription
    Subscriptions(SubscriptionsCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct SubscriptionsCliArgs {
    #[command(subcommand)]
    pub command: SubscriptionsCommand,
}

#[derive(Subcommand, Debug)]
pub enum SubscriptionsCommand {
    /// Ensure exactly one active subscription pointing at the webhook URL
    Create {
        /// Public URL of the /webhook endpoint
        #[arg(long)]
        webhook_url: String,
    },
    /// List all subscriptions registered with the provider
    List,
    /// Extend a subscription's expiration by the standard window
    Renew {
        /// Provider-assigned subscription id
        #[arg(long)]
        id: String,
    },
    /// Delete a subscription
    Delete {
        /// Provider-assigned subscription id
        #[arg(long)]
        id: String,
    },
}
