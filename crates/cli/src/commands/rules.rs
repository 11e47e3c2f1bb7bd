use clap::{Args, Subcommand};

use autotag_core::config::LoadOptions;
use autotag_core::{
    AnalyticsId, CategoryId, NewRule, PartnerId, ProductId, RuleConditions, RuleId, RuleStatus,
    RuleUpdate, TagId,
};

use crate::commands::{execute, CommandResult, Failure, Services};

#[derive(Debug, Subcommand)]
pub enum RulesCommand {
    #[command(about = "List rules, most recently updated first")]
    List {
        #[arg(long, help = "draft | confirmed | archived")]
        status: Option<String>,
    },
    #[command(about = "Create a draft rule")]
    Create(CreateArgs),
    #[command(about = "Edit a draft rule; given conditions replace the current set")]
    Update(UpdateArgs),
    #[command(about = "Activate a draft rule")]
    Confirm { id: String },
    #[command(about = "Retire a confirmed rule")]
    Archive { id: String },
    #[command(about = "Delete a draft rule")]
    Delete { id: String },
}

#[derive(Debug, Clone, Default, Args)]
pub struct ConditionArgs {
    #[arg(long)]
    pub partner: Option<String>,
    #[arg(long = "tag")]
    pub partner_tag: Option<String>,
    #[arg(long)]
    pub product: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
}

impl ConditionArgs {
    fn is_empty(&self) -> bool {
        self.partner.is_none()
            && self.partner_tag.is_none()
            && self.product.is_none()
            && self.category.is_none()
    }

    fn into_conditions(self) -> RuleConditions {
        RuleConditions {
            partner_id: self.partner.map(PartnerId),
            partner_tag_id: self.partner_tag.map(TagId),
            product_id: self.product.map(ProductId),
            product_category_id: self.category.map(CategoryId),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct CreateArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub description: Option<String>,
    #[command(flatten)]
    pub conditions: ConditionArgs,
    #[arg(long, help = "Cost center the rule assigns")]
    pub analytics: String,
}

impl CreateArgs {
    pub fn into_new_rule(self) -> NewRule {
        NewRule {
            name: self.name,
            description: self.description,
            conditions: self.conditions.into_conditions(),
            analytics_id: AnalyticsId(self.analytics),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct UpdateArgs {
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long, conflicts_with = "clear_description")]
    pub description: Option<String>,
    #[arg(long)]
    pub clear_description: bool,
    #[command(flatten)]
    pub conditions: ConditionArgs,
    #[arg(long)]
    pub analytics: Option<String>,
}

impl UpdateArgs {
    pub fn into_update(self) -> RuleUpdate {
        let description = if self.clear_description {
            Some(None)
        } else {
            self.description.map(Some)
        };
        let conditions =
            (!self.conditions.is_empty()).then(|| self.conditions.into_conditions());

        RuleUpdate {
            name: self.name,
            description,
            conditions,
            analytics_id: self.analytics.map(AnalyticsId),
        }
    }
}

pub fn run(options: &LoadOptions, command: RulesCommand) -> CommandResult {
    execute("rules", options, |config| async move {
        if let RulesCommand::List { status: Some(raw) } = &command {
            if RuleStatus::parse(raw).is_none() {
                return Err(Failure::invalid_input(format!("unknown rule status `{raw}`")));
            }
        }

        let services = Services::open(&config).await?;
        let rules = &services.rules;

        let outcome = match command {
            RulesCommand::List { status } => {
                let status = status.as_deref().and_then(RuleStatus::parse);
                rules.list(status).await.map(|listed| {
                    CommandResult::with_data(
                        "rules",
                        format!("{} rule(s)", listed.len()),
                        &listed,
                    )
                })
            }
            RulesCommand::Create(args) => rules
                .create(args.into_new_rule())
                .await
                .map(|rule| {
                    CommandResult::with_data("rules", format!("created draft {}", rule.id), &rule)
                }),
            RulesCommand::Update(args) => {
                let id = RuleId(args.id.clone());
                rules.update(&id, args.into_update()).await.map(|rule| {
                    CommandResult::with_data("rules", format!("updated {}", rule.id), &rule)
                })
            }
            RulesCommand::Confirm { id } => rules.confirm(&RuleId(id)).await.map(|rule| {
                CommandResult::with_data("rules", format!("confirmed {}", rule.id), &rule)
            }),
            RulesCommand::Archive { id } => rules.archive(&RuleId(id)).await.map(|rule| {
                CommandResult::with_data("rules", format!("archived {}", rule.id), &rule)
            }),
            RulesCommand::Delete { id } => {
                let id = RuleId(id);
                rules
                    .delete(&id)
                    .await
                    .map(|()| CommandResult::success("rules", format!("deleted {id}")))
            }
        };

        services.close().await;
        Ok::<_, Failure>(outcome?)
    })
}
