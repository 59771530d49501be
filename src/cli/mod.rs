mod args;
mod subscriptions;

pub use args::{Cli, CliCommand, SubscriptionsCliArgs};
pub use subscriptions::handle_subscriptions_command;
