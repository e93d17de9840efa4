use super::{parse_account, Context};
use anyhow::Result;
use clap::Subcommand;
use commitpot_core::storage::AccountStore;
use commitpot_core::Amount;
use comfy_table::{presets::UTF8_FULL, Table};

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Credit an account on the local ledger
    Fund {
        /// Account id
        account: String,
        /// Amount in satoshis
        amount: u64,
    },
    /// Show an account balance
    Balance {
        /// Account id
        account: String,
    },
    /// List all ledger accounts
    List,
    /// Show transfers touching an account
    History {
        /// Account id
        account: String,
    },
}

pub async fn handle_account_command(cmd: AccountCommands, ctx: &Context) -> Result<()> {
    let store = AccountStore::new(ctx.storage());

    match cmd {
        AccountCommands::Fund { account, amount } => {
            let account = parse_account(&account)?;
            let balance = store.credit(&account, Amount::from_sat(amount)).await?;
            println!("Funded {} with {} sats", account, amount);
            println!("Balance: {} sats", balance.to_sat());
        }

        AccountCommands::Balance { account } => {
            let account = parse_account(&account)?;
            let balance = store.balance(&account).await?;
            println!("{}: {} sats", account, balance.to_sat());
        }

        AccountCommands::List => {
            let accounts = store.list().await?;
            if accounts.is_empty() {
                println!("No accounts");
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Account", "Balance (sats)"]);
            for entry in accounts {
                table.add_row(vec![
                    entry.account.to_string(),
                    entry.balance.to_sat().to_string(),
                ]);
            }
            println!("{}", table);
        }

        AccountCommands::History { account } => {
            let account = parse_account(&account)?;
            let records = ctx.treasury()?.history(&account).await?;
            if records.is_empty() {
                println!("No transfers for {}", account);
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Transfer", "From", "To", "Amount (sats)", "Time"]);
            for record in records {
                table.add_row(vec![
                    record.id.chars().take(8).collect::<String>(),
                    record.from.to_string(),
                    record.to.to_string(),
                    record.amount.to_sat().to_string(),
                    record.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                ]);
            }
            println!("{}", table);
        }
    }

    Ok(())
}
