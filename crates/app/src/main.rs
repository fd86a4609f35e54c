//! Atelier storefront CLI

use std::process;

use atelier::{
    pricing,
    records::{ProductId, VariantKey},
};
use atelier_app::{
    client::{ApiToken, StoreConfig},
    context::AppContext,
    domain::{carts::models::UserId, catalog::ApplyFailure},
};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "atelier-app", about = "Atelier storefront CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Cart(CartCommand),
    Variants(VariantsCommand),
}

#[derive(Debug, Args)]
struct CartCommand {
    #[command(subcommand)]
    command: CartSubcommand,
}

#[derive(Debug, Subcommand)]
enum CartSubcommand {
    /// Print a user's current remote cart.
    Show(ShowCartArgs),
}

#[derive(Debug, Args)]
struct ShowCartArgs {
    #[command(flatten)]
    store: StoreArgs,

    /// User whose cart to read
    #[arg(long)]
    user_id: u64,
}

#[derive(Debug, Args)]
struct VariantsCommand {
    #[command(subcommand)]
    command: VariantsSubcommand,
}

#[derive(Debug, Subcommand)]
enum VariantsSubcommand {
    /// Replace a product's variant set with the given size:color keys.
    Sync(SyncVariantsArgs),
}

#[derive(Debug, Args)]
struct SyncVariantsArgs {
    #[command(flatten)]
    store: StoreArgs,

    /// Product whose variants to replace
    #[arg(long)]
    product_id: u64,

    /// Desired variant keys, each as SIZE:COLOR; repeat for multiple
    #[arg(long = "key", value_name = "SIZE:COLOR")]
    keys: Vec<String>,
}

#[derive(Debug, Args)]
struct StoreArgs {
    /// Store API address
    #[arg(long, env = "STORE_BASE_URL")]
    base_url: String,

    /// Optional bearer token
    #[arg(long, env = "STORE_TOKEN")]
    token: Option<String>,
}

impl StoreArgs {
    fn into_context(self) -> Result<AppContext, String> {
        let config = StoreConfig {
            base_url: self.base_url,
            token: self.token.map(ApiToken::new),
        };

        AppContext::from_config(config)
            .map_err(|error| format!("failed to initialize store client: {error}"))
    }
}

#[tokio::main]
pub async fn main() {
    let _env = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(error) = run(cli).await {
        eprintln!("{error}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Cart(CartCommand {
            command: CartSubcommand::Show(args),
        }) => show_cart(args).await,
        Commands::Variants(VariantsCommand {
            command: VariantsSubcommand::Sync(args),
        }) => sync_variants(args).await,
    }
}

async fn show_cart(args: ShowCartArgs) -> Result<(), String> {
    let ctx = args.store.into_context()?;

    let view = ctx.cart_view(UserId::from_u64(args.user_id));

    let items = view
        .refresh()
        .await
        .map_err(|error| format!("failed to read cart: {error}"))?;

    if items.is_empty() {
        println!("cart is empty");
        return Ok(());
    }

    let mut priced_lines = Vec::new();

    for item in items {
        let variant = match (&item.size, &item.color) {
            (Some(size), Some(color)) => format!(" ({size}, {color})"),
            (Some(size), None) => format!(" ({size})"),
            (None, Some(color)) => format!(" ({color})"),
            (None, None) => String::new(),
        };

        // Best-effort enrichment; an unreadable product still lists.
        let (name, price) = match ctx.client.get_product(item.product_id).await {
            Ok(product) => (product.name, Some(product.price_minor)),
            Err(_) => (format!("Product #{}", item.product_id), None),
        };

        if let Some(price) = price {
            priced_lines.push((price, item.quantity));
            println!(
                "item {}: {name}{variant} x{} @ {}",
                item.cart_item_id,
                item.quantity,
                format_minor(price)
            );
        } else {
            println!("item {}: {name}{variant} x{}", item.cart_item_id, item.quantity);
        }
    }

    let subtotal = pricing::subtotal_minor(&priced_lines);

    println!("subtotal: {}", format_minor(subtotal));
    println!("shipping: {}", format_minor(pricing::shipping_fee_minor(subtotal)));
    println!("total:    {}", format_minor(pricing::total_minor(subtotal)));

    Ok(())
}

fn format_minor(amount: u64) -> String {
    format!("Rs. {}.{:02}", amount / 100, amount % 100)
}

async fn sync_variants(args: SyncVariantsArgs) -> Result<(), String> {
    let keys = args
        .keys
        .iter()
        .map(|raw| {
            raw.split_once(':')
                .map(|(size, color)| VariantKey::new(size, color))
                .ok_or_else(|| format!("invalid key {raw:?}; expected SIZE:COLOR"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let ctx = args.store.into_context()?;

    let report = ctx
        .catalog
        .replace_variants(ProductId::from_u64(args.product_id), keys)
        .await
        .map_err(|error| format!("failed to sync variants: {error}"))?;

    println!(
        "created: {}, deleted: {}, kept: {}",
        report.created, report.deleted, report.kept
    );

    if report.is_degraded() {
        for failure in &report.failures {
            match failure {
                ApplyFailure::CreateBatch { count, source } => {
                    println!("create of {count} variants failed: {source}");
                }
                ApplyFailure::Delete { remote_id, source } => {
                    println!("delete of variant {remote_id} failed: {source}");
                }
            }
        }

        return Err("some variant operations failed; re-run the sync or fix manually".to_string());
    }

    Ok(())
}
