//! One-shot subscription management commands for operators.

use anyhow::Result;

use super::args::{SubscriptionsCliArgs, SubscriptionsCommand};
use crate::app;
use crate::config::Config;
use crate::store::StoredSubscription;

pub async fn handle_subscriptions_command(args: SubscriptionsCliArgs) -> Result<()> {
    let config = Config::from_env()?;
    let components = app::build_components(&config)?;

    match args.command {
        SubscriptionsCommand::Create { webhook_url } => {
            let subscription = components
                .subscriptions
                .ensure(&webhook_url, &components.store)
                .await?;
            println!("{}", serde_json::to_string_pretty(&subscription)?);
        }
        SubscriptionsCommand::List => {
            let subscriptions = components.subscriptions.list().await?;
            println!("{}", serde_json::to_string_pretty(&subscriptions)?);
        }
        SubscriptionsCommand::Renew { id } => {
            let subscription = components.subscriptions.renew(&id).await?;
            let record = StoredSubscription {
                id: subscription.id.clone(),
                expires_at: subscription.expiration_date_time,
            };
            components.store.save(&record)?;
            println!("{}", serde_json::to_string_pretty(&subscription)?);
        }
        SubscriptionsCommand::Delete { id } => {
            components.subscriptions.delete(&id).await?;
            if components
                .store
                .load()
                .is_some_and(|record| record.id == id)
            {
                components.store.clear()?;
            }
            println!("Deleted subscription {id}");
        }
    }

    Ok(())
}
