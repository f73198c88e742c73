//! # Lucha Cart CLI
//!
//! Drives one cart instance per invocation against the configured media.
//!
//! ## Startup Sequence
//! 1. Initialize tracing (stderr, `RUST_LOG` overrides)
//! 2. Load `cart.toml` + environment overrides
//! 3. Open media and build the cart (restores the stored blob)
//! 4. Run one operation, print the resulting summary
//!
//! ```text
//! $ lucha-cart add --id t1 --name "California Taco" --price-cents 500 --qty 2
//!    2 × California Taco                     $10.00
//! 2 item(s), subtotal $10.00 (local storage)
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lucha_cart::{create_cart, Cart, CartOptions};
use lucha_core::{CartSummary, ItemInput, StorageMode};
use lucha_store::StoreConfig;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lucha-cart")]
#[command(about = "Inspect and edit the Lucha order cart", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current cart
    Show,

    /// Add an item, merging with an existing line by id
    Add {
        #[arg(long)]
        id: String,

        /// Display name (defaults to --title, then the id)
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        title: Option<String>,

        /// Unit price in cents
        #[arg(long, conflicts_with = "price")]
        price_cents: Option<i64>,

        /// Unit price in currency units, e.g. "9.99" or "$9.99"
        #[arg(long)]
        price: Option<String>,

        /// Quantity to add; negative values decrement
        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        qty: i64,

        /// Opaque JSON attached to the line
        #[arg(long)]
        meta: Option<String>,
    },

    /// Set an absolute quantity (0 removes the line)
    Update {
        id: String,

        #[arg(allow_hyphen_values = true)]
        qty: i64,
    },

    /// Remove a line
    Remove { id: String },

    /// Empty the cart
    Clear,

    /// Move the cart to another storage mode (local | session) and remember it
    Mode { mode: String },

    /// Print the effective configuration
    Config {
        /// Also write it to the config file
        #[arg(long, default_value_t = false)]
        save: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = StoreConfig::load(cli.config.clone()).context("loading cart config")?;
    debug!(mode = %config.mode(), key = %config.key(), "Config loaded");

    let summary = match cli.cmd {
        Commands::Config { save } => {
            if save {
                config.save(cli.config.clone()).context("saving cart config")?;
            }
            print!("{}", toml::to_string_pretty(&config)?);
            return Ok(());
        }
        Commands::Show => open_cart(&config).summary(),
        Commands::Add {
            id,
            name,
            title,
            price_cents,
            price,
            qty,
            meta,
        } => {
            let item = build_item(id, name, title, price_cents, price, meta)?;
            open_cart(&config).add_item(&item, qty)?
        }
        Commands::Update { id, qty } => open_cart(&config).update_qty(&id, qty),
        Commands::Remove { id } => open_cart(&config).remove_item(&id),
        Commands::Clear => open_cart(&config).clear_cart(),
        Commands::Mode { mode } => {
            let cart = open_cart(&config);
            switch_mode(&cart, &mut config, cli.config.clone(), &mode)?
        }
    };

    print_summary(&summary, cli.json)
}

/// Builds the cart for one invocation. Dropping it flushes any pending write.
fn open_cart(config: &StoreConfig) -> Cart {
    let cart = create_cart(CartOptions::from_config(config).sync_listener(false));
    if cart.storage_mode() != config.mode() {
        warn!(
            configured = %config.mode(),
            actual = %cart.storage_mode(),
            "Configured storage unavailable, changes will not be kept"
        );
    }
    cart
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,lucha=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_item(
    id: String,
    name: Option<String>,
    title: Option<String>,
    price_cents: Option<i64>,
    price: Option<String>,
    meta: Option<String>,
) -> Result<ItemInput> {
    let mut item = ItemInput::new(id);
    item.name = name;
    item.title = title;
    if let Some(cents) = price_cents {
        item = item.price_cents(cents);
    }
    if let Some(price) = price {
        item = item.price(price);
    }
    if let Some(meta) = meta {
        let value = serde_json::from_str(&meta).context("--meta must be JSON")?;
        item = item.meta(value);
    }
    Ok(item)
}

fn switch_mode(
    cart: &Cart,
    config: &mut StoreConfig,
    config_path: Option<PathBuf>,
    mode: &str,
) -> Result<CartSummary> {
    let target: StorageMode = mode.parse()?;
    let summary = cart.set_storage_mode(target)?;

    if summary.storage_mode == target {
        config.storage.mode = target;
        config.save(config_path).context("remembering storage mode")?;
        info!(mode = %target, "Storage mode saved to config");
    } else {
        warn!(mode = %target, "Storage mode unavailable, cart kept in memory");
    }
    Ok(summary)
}

fn print_summary(summary: &CartSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    if summary.is_empty() {
        println!("Cart is empty ({} storage)", summary.storage_mode);
        return Ok(());
    }

    for item in &summary.items {
        println!(
            "{:>4} × {:<30} {:>10}",
            item.qty,
            item.name,
            item.line_total().to_string()
        );
    }
    println!(
        "{} item(s), subtotal {} ({} storage)",
        summary.total_qty,
        summary.subtotal_money(),
        summary.storage_mode
    );
    Ok(())
}
