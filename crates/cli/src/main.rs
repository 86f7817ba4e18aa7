use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vmlease_bodega::{BodegaManager, BodegaProvider, PROVIDER_NAME};
use vmlease_core::{CreateOpts, OrderId, Provider, Providers, Vm, VmList};

const SECONDS_PER_HOUR: u64 = 3_600;

/// vmlease: provision and track leased machines
#[derive(Parser)]
#[command(name = "vmlease", version, about)]
struct Cli {
    /// Provider to act through.
    #[arg(short, long, global = true, default_value = PROVIDER_NAME)]
    provider: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create one machine per name and wait until they are ready.
    Create {
        #[arg(required = true)]
        names: Vec<String>,

        /// Requested lease, in hours.
        #[arg(long, default_value = "12")]
        lifetime_hours: u64,
    },
    /// List machines created through the provider.
    List,
    /// Release machines.
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Extend the lease on machines.
    Extend {
        #[arg(required = true)]
        names: Vec<String>,

        /// Hours to add.
        #[arg(long, default_value = "12")]
        hours: u64,
    },
    /// Work with Bodega orders directly.
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Print the ids of your live orders.
    Live,
    /// Print one order.
    Show { id: String },
    /// Close an order and release its machines.
    Close { id: String },
    /// Add time to an order.
    Extend {
        id: String,

        /// Hours to add.
        #[arg(long)]
        hours: u64,
    },
    /// Find the order the given machines were created under.
    Lookup {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing with RUST_LOG env filter (default: info)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut providers = Providers::new();
    let bodega = match BodegaProvider::from_default_config() {
        Ok(provider) => {
            let manager = provider.manager().clone();
            providers.register(Box::new(provider));
            Some(manager)
        }
        Err(e) => {
            warn!(error = %e, "Bodega is not available");
            None
        }
    };

    let matches = build_command(&providers).get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    if let Some(("create", create_matches)) = matches.subcommand() {
        for provider in providers.iter_mut() {
            provider
                .flags_mut()
                .apply_create_flags(create_matches)
                .with_context(|| format!("invalid flags for provider {}", provider.name()))?;
        }
    }

    match cli.command {
        Commands::Create {
            names,
            lifetime_hours,
        } => {
            let opts = CreateOpts {
                lifetime: Duration::from_secs(lifetime_hours * SECONDS_PER_HOUR),
            };
            create(select(&providers, &cli.provider)?, &names, &opts).await
        }
        Commands::List => list(select(&providers, &cli.provider)?).await,
        Commands::Delete { names } => {
            let provider = select(&providers, &cli.provider)?;
            let vms = resolve(provider, &names).await?;
            provider.delete(&vms).await.context("delete failed")
        }
        Commands::Extend { names, hours } => {
            let provider = select(&providers, &cli.provider)?;
            let vms = resolve(provider, &names).await?;
            provider
                .extend(&vms, Duration::from_secs(hours * SECONDS_PER_HOUR))
                .await
                .context("extend failed")
        }
        Commands::Orders { action } => {
            let manager = bodega
                .as_ref()
                .context("Bodega is not available; check ~/.bodega.conf.yml")?;
            orders(manager, action).await
        }
    }
}

/// The CLI command with every registered provider's create flags added.
fn build_command(providers: &Providers) -> clap::Command {
    Cli::command().mut_subcommand("create", |create| {
        providers
            .iter()
            .fold(create, |cmd, provider| provider.flags().configure_create_flags(cmd))
    })
}

fn select<'a>(providers: &'a Providers, name: &str) -> Result<&'a dyn Provider> {
    providers.get(name).with_context(|| {
        format!(
            "provider '{name}' is not available (registered: {:?})",
            providers.names()
        )
    })
}

/// Look up machines by name through the provider's listing.
async fn resolve(provider: &dyn Provider, names: &[String]) -> Result<VmList> {
    let mut vms = provider.list().await.context("failed to list machines")?;
    vms.retain_named(names);

    let found = vms.names();
    let missing: Vec<&String> = names.iter().filter(|n| !found.contains(n)).collect();
    if !missing.is_empty() {
        warn!(?missing, "some machines were not found");
    }
    Ok(vms)
}

async fn create(provider: &dyn Provider, names: &[String], opts: &CreateOpts) -> Result<()> {
    info!(
        provider = provider.name(),
        machines = ?names,
        lifetime_hours = opts.lifetime.as_secs() / SECONDS_PER_HOUR,
        "creating machines"
    );
    provider
        .create(names, opts)
        .await
        .with_context(|| format!("failed to create machines {names:?}"))?;

    let account = provider.find_active_account().await?;
    info!(account = %account, "machines are ready");
    Ok(())
}

async fn list(provider: &dyn Provider) -> Result<()> {
    let vms = provider.list().await.context("failed to list machines")?;
    if vms.is_empty() {
        info!("no machines found");
        return Ok(());
    }

    println!(
        "\n{:<24} {:<16} {:<10} {:<16} {}",
        "Name", "Public IP", "User", "Zone", "Created"
    );
    println!("{}", "-".repeat(96));
    for vm in vms.iter() {
        print_vm(vm);
    }
    println!("\n{} machines.\n", vms.len());
    Ok(())
}

fn print_vm(vm: &Vm) {
    println!(
        "{:<24} {:<16} {:<10} {:<16} {}",
        vm.name,
        vm.public_ip,
        vm.remote_user,
        vm.zone,
        vm.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );
}

async fn orders(manager: &BodegaManager, action: OrderAction) -> Result<()> {
    match action {
        OrderAction::Live => {
            let ids = manager.live_order_ids().await?;
            for id in &ids {
                println!("{id}");
            }
            info!(count = ids.len(), "live orders");
        }
        OrderAction::Show { id } => {
            let order = manager
                .get_order(&OrderId(id.clone()))
                .await
                .with_context(|| format!("unable to fetch order {id}"))?;
            println!("sid:        {}", order.sid);
            println!("status:     {}", order.status);
            println!("created:    {}", order.time_created.as_deref().unwrap_or("-"));
            println!(
                "time limit: {}",
                order.expiration_time_limit.as_deref().unwrap_or("-")
            );
            for (name, item) in order.fulfilled_items.unwrap_or_default() {
                println!("  {name:<24} {:<16} {}", item.ipv4, item.location);
            }
        }
        OrderAction::Close { id } => {
            manager
                .close_order(&OrderId(id.clone()))
                .await
                .with_context(|| format!("unable to close order {id}"))?;
        }
        OrderAction::Extend { id, hours } => {
            manager
                .extend_order(&OrderId(id.clone()), Duration::from_secs(hours * SECONDS_PER_HOUR))
                .await
                .with_context(|| format!("unable to extend order {id}"))?;
        }
        OrderAction::Lookup { names } => {
            let vms = named_machines(&names);
            let order_id = manager.order_id_of_vms(&vms).await?;
            println!("{order_id}");
        }
    }
    Ok(())
}

/// Machine records carrying only names, enough for registry lookups.
fn named_machines(names: &[String]) -> VmList {
    names
        .iter()
        .map(|name| Vm {
            name: name.clone(),
            provider: PROVIDER_NAME.to_string(),
            provider_id: PROVIDER_NAME.to_string(),
            created_at: chrono::Utc::now(),
            public_ip: String::new(),
            remote_user: String::new(),
            zone: String::new(),
        })
        .collect::<Vec<_>>()
        .into()
}
