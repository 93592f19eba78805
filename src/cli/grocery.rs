use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use crate::cli::render;
use crate::cli::Session;
use crate::model::short_id;

#[derive(Args, Debug, Clone)]
pub struct GroceryArgs {
    #[command(subcommand)]
    pub command: GroceryCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum GroceryCommand {
    /// Start a new grocery list
    New(ListNameArgs),
    /// Show all grocery lists, newest first
    Lists(JsonArgs),
    /// Delete a grocery list and every item on it
    RmList(ListRefArgs),
    /// Show the items of one list
    Show(ShowArgs),
    /// Add an item to a list
    Add(ItemAddArgs),
    /// Toggle an item between checked and unchecked
    Check(ItemIdArgs),
    /// Change an item's text or quantity
    Edit(ItemEditArgs),
    /// Delete an item
    Rm(ItemIdArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ListNameArgs {
    /// List name; words are joined with spaces
    #[arg(required = true)]
    pub name: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct JsonArgs {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ListRefArgs {
    /// List name or id prefix
    pub list: String,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// List name or id prefix
    pub list: String,
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ItemAddArgs {
    /// List name or id prefix
    pub list: String,
    /// Item text; words are joined with spaces
    #[arg(required = true)]
    pub content: Vec<String>,
    /// Free-form quantity, e.g. "2 kg"
    #[arg(long)]
    pub qty: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ItemIdArgs {
    /// Item id or a unique prefix of it
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct ItemEditArgs {
    /// Item id or a unique prefix of it
    pub id: String,
    /// Replacement text
    #[arg(long)]
    pub content: Option<String>,
    /// New quantity
    #[arg(long, conflicts_with = "clear_qty")]
    pub qty: Option<String>,
    /// Remove the quantity
    #[arg(long)]
    pub clear_qty: bool,
}

pub fn handle_grocery_command(session: &Session, args: GroceryArgs) -> Result<()> {
    let output = run_grocery_command(session, args.command)?;
    print!("{output}");
    Ok(())
}

fn run_grocery_command(session: &Session, command: GroceryCommand) -> Result<String> {
    let storage = &session.storage;
    let show_ids = session.config.display.show_ids;
    match command {
        GroceryCommand::New(args) => {
            let list = storage
                .create_grocery_list(&args.name.join(" "))
                .context("creating grocery list")?;
            Ok(format!(
                "Created grocery list '{}' ({})\n",
                list.name,
                short_id(&list.id)
            ))
        }
        GroceryCommand::Lists(args) => {
            let lists = storage.fetch_grocery_lists()?;
            if args.json {
                return render::to_json(&lists);
            }
            Ok(render::grocery_lists_text(&lists, show_ids))
        }
        GroceryCommand::RmList(args) => {
            let list = storage.resolve_grocery_list(&args.list)?;
            let outcome = storage
                .delete_grocery_list(list.id)
                .with_context(|| format!("deleting grocery list '{}'", list.name))?;
            let plural = if outcome.items_removed == 1 { "" } else { "s" };
            Ok(format!(
                "Deleted grocery list '{}' (removed {} item{plural})\n",
                outcome.name, outcome.items_removed
            ))
        }
        GroceryCommand::Show(args) => {
            let list = storage.resolve_grocery_list(&args.list)?;
            let items = storage.fetch_grocery_items(list.id)?;
            if args.json {
                return render::grocery_list_json(&list, &items);
            }
            Ok(render::grocery_list_text(&list, &items, show_ids))
        }
        GroceryCommand::Add(args) => {
            let list = storage.resolve_grocery_list(&args.list)?;
            let item = storage
                .add_grocery_item(list.id, &args.content.join(" "), args.qty.as_deref())
                .with_context(|| format!("adding item to '{}'", list.name))?;
            Ok(format!(
                "Added to '{}':{}\n",
                list.name,
                render::grocery_item_line(&item, show_ids)
            ))
        }
        GroceryCommand::Check(args) => {
            let item_id = storage.resolve_grocery_item_id(&args.id)?;
            let item = storage.toggle_grocery_item(item_id)?;
            Ok(format!("{}\n", render::grocery_item_line(&item, show_ids)))
        }
        GroceryCommand::Edit(args) => {
            if args.content.is_none() && args.qty.is_none() && !args.clear_qty {
                bail!("nothing to change: pass --content, --qty or --clear-qty");
            }
            let item_id = storage.resolve_grocery_item_id(&args.id)?;
            let current = storage
                .fetch_grocery_item(item_id)?
                .with_context(|| format!("grocery item {} disappeared", args.id))?;
            let content = args.content.as_deref().unwrap_or(&current.content);
            let quantity = if args.clear_qty {
                None
            } else {
                args.qty.as_deref().or(current.quantity.as_deref())
            };
            let item = storage.edit_grocery_item(item_id, content, quantity)?;
            Ok(format!(
                "Updated:{}\n",
                render::grocery_item_line(&item, show_ids)
            ))
        }
        GroceryCommand::Rm(args) => {
            let item_id = storage.resolve_grocery_item_id(&args.id)?;
            storage
                .delete_grocery_item(item_id)
                .with_context(|| format!("deleting grocery item {}", args.id))?;
            Ok(format!("Deleted grocery item {}\n", short_id(&item_id)))
        }
    }
}
