//! # Back-office Command Line
//!
//! A thin front end over the command functions. Every subcommand prints
//! its response (data and notices) as JSON on stdout; failures print the
//! `ApiError` and an error notice as JSON on stderr and exit with status 1.
//!
//! ## Usage
//! ```bash
//! backoffice [--config PATH] dashboard
//! backoffice open-register  --as cajero1 --location "Monona, zn norte"
//! backoffice close-register --id <REGISTER_ID>
//! backoffice sell --shift <SHIFT_ID> --item <PRODUCT_ID>:3 [--item ...]
//!                 [--discount 5.00] [--payment cash|card|transfer]
//!                 [--tendered 30] [--customer "Rosa"]
//! backoffice toggle-active --as admin --employee <EMPLOYEE_ID>
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use backoffice::commands::{dashboard, employee, register, sale};
use backoffice::{init_tracing, ApiError, AppState, BackofficeConfig, Notice};
use mostrador_core::{LineItemRequest, Money, PaymentMethod, SaleRequest};

#[derive(Parser)]
#[command(name = "backoffice", about = "Mostrador back-office", version)]
struct Cli {
    /// Config file (default: platform config dir/backoffice.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stock summary and alerts
    Dashboard,

    /// Open a register and start a shift
    OpenRegister {
        #[arg(long = "as", value_name = "USER")]
        user: String,
        #[arg(long)]
        location: String,
    },

    /// Close a register and its shifts
    CloseRegister {
        #[arg(long, value_name = "REGISTER_ID")]
        id: String,
    },

    /// Record a sale
    Sell(SellArgs),

    /// Activate or deactivate an employee
    ToggleActive {
        #[arg(long = "as", value_name = "USER")]
        user: String,
        #[arg(long, value_name = "EMPLOYEE_ID")]
        employee: String,
    },
}

#[derive(Args)]
struct SellArgs {
    #[arg(long, value_name = "SHIFT_ID")]
    shift: String,

    /// A sale line; repeat for more lines
    #[arg(long = "item", value_name = "PRODUCT_ID:QTY", value_parser = parse_item)]
    items: Vec<LineItemRequest>,

    /// Discount on the whole sale, e.g. 5.00
    #[arg(long, value_parser = Money::parse, default_value = "0")]
    discount: Money,

    #[arg(long, default_value = "cash")]
    payment: PaymentMethod,

    /// Amount handed over by the customer, e.g. 30
    #[arg(long, value_parser = Money::parse)]
    tendered: Option<Money>,

    #[arg(long)]
    customer: Option<String>,
}

impl SellArgs {
    fn into_request(self) -> SaleRequest {
        SaleRequest {
            shift_id: self.shift,
            customer_name: self.customer,
            discount_cents: self.discount.cents(),
            payment_method: self.payment,
            tendered_cents: self.tendered.map(|t| t.cents()),
            line_items: self.items,
        }
    }
}

#[derive(Serialize)]
struct ErrorOutput<'a> {
    error: &'a ApiError,
    notices: Vec<Notice>,
}

fn parse_item(arg: &str) -> Result<LineItemRequest, String> {
    let (product_id, quantity) = arg
        .rsplit_once(':')
        .ok_or_else(|| format!("expected PRODUCT_ID:QTY, got {}", arg))?;
    let quantity = quantity
        .parse::<i64>()
        .map_err(|_| format!("invalid quantity in {}", arg))?;

    Ok(LineItemRequest {
        product_id: product_id.to_string(),
        quantity,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ApiError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::internal(format!("failed to serialize response: {}", e)))?;
    println!("{}", json);
    Ok(())
}

async fn run(command: Command, state: &AppState) -> Result<(), ApiError> {
    match command {
        Command::Dashboard => print_json(&dashboard::dashboard(state).await?),
        Command::OpenRegister { user, location } => {
            print_json(&register::open_register(state, &user, &location).await?)
        }
        Command::CloseRegister { id } => print_json(&register::close_register(state, &id).await?),
        Command::Sell(args) => print_json(&sale::create_sale(state, &args.into_request()).await?),
        Command::ToggleActive { user, employee } => {
            print_json(&employee::toggle_active(state, &user, &employee).await?)
        }
    }
}

async fn execute(cli: Cli) -> Result<(), ApiError> {
    let config = BackofficeConfig::load(cli.config)?;
    let state = AppState::connect(config).await?;
    info!("Running back-office command");

    let outcome = run(cli.command, &state).await;
    state.db().close().await;
    outcome
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let output = ErrorOutput {
                notices: vec![Notice::from(&err)],
                error: &err,
            };
            match serde_json::to_string_pretty(&output) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}", err),
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sell() {
        let cli = Cli::try_parse_from([
            "backoffice", "--config", "bo.toml", "sell", "--shift", "s-1", "--item", "p-1:3",
            "--item", "p-2:1", "--discount", "5.00", "--tendered", "30",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("bo.toml")));

        let Command::Sell(args) = cli.command else {
            panic!("expected sell");
        };
        let request = args.into_request();
        assert_eq!(request.shift_id, "s-1");
        assert_eq!(request.line_items.len(), 2);
        assert_eq!(request.line_items[0].quantity, 3);
        assert_eq!(request.discount_cents, 500);
        assert_eq!(request.tendered_cents, Some(3000));
        assert_eq!(request.payment_method, PaymentMethod::Cash);
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        assert!(Cli::try_parse_from(["backoffice", "sell", "--item", "p-1:3"]).is_err());
        assert!(Cli::try_parse_from([
            "backoffice", "sell", "--shift", "s-1", "--discount", "1.234"
        ])
        .is_err());
        assert!(Cli::try_parse_from([
            "backoffice", "sell", "--shift", "s-1", "--payment", "cheque"
        ])
        .is_err());
        assert!(Cli::try_parse_from(["backoffice", "open-register", "--as", "cajero1"]).is_err());
        assert!(Cli::try_parse_from(["backoffice", "refund"]).is_err());
    }

    #[test]
    fn test_parse_item() {
        let item = parse_item("0b1c:12").unwrap();
        assert_eq!(item.product_id, "0b1c");
        assert_eq!(item.quantity, 12);

        assert!(parse_item("no-quantity").is_err());
        assert!(parse_item("p:abc").is_err());
    }
}
