use super::{parse_account, Context};
use anyhow::{bail, Context as _, Result};
use commitpot_core::storage::{EventStore, RoundStore};
use commitpot_core::{period_from_secs, Amount, Treasury};
use commitpot_game::{Commitment, CommitmentScheme, Reveal, Round, RoundParams, Sha256Commitment};
use comfy_table::{presets::UTF8_FULL, Table};
use dialoguer::Confirm;

fn secret_bytes(secret: &str, is_hex: bool) -> Result<Vec<u8>> {
    if is_hex {
        hex::decode(secret.trim_start_matches("0x")).context("Secret is not valid hex")
    } else {
        Ok(secret.as_bytes().to_vec())
    }
}

fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

pub async fn init_round(ctx: &Context, operator: &str) -> Result<()> {
    let operator = parse_account(operator)?;
    if operator == ctx.config().pot_account()? {
        bail!("The pot account '{}' cannot operate a round", operator);
    }

    if let Some(existing) = ctx.load_round().await? {
        bail!(
            "Round {} already exists (operator: {})",
            existing.id(),
            existing.operator()
        );
    }

    let round = Round::new(operator.clone());
    RoundStore::new(ctx.storage()).save(round.id(), &round).await?;

    println!("Created round slot {}", round.id());
    println!("Operator: {}", operator);
    println!("Pot account: {}", ctx.config().pot_account);
    println!();
    println!("Publish a commitment with:");
    println!("commitpot commitment <secret> <salt>");
    Ok(())
}

pub fn show_commitment(secret: &str, salt: u64, is_hex: bool) -> Result<()> {
    let secret = secret_bytes(secret, is_hex)?;
    let commitment = Sha256Commitment::commit(&secret, salt);
    println!("{}", commitment);
    Ok(())
}

pub async fn commit_round(
    ctx: &Context,
    operator: &str,
    commitment: &str,
    guess_period: Option<i64>,
    reveal_period: Option<i64>,
    min_stake: Option<u64>,
) -> Result<()> {
    let operator = parse_account(operator)?;
    let commitment: Commitment = commitment.parse()?;
    let config = ctx.config();

    let params = RoundParams::new(
        commitment,
        period_from_secs(
            guess_period.unwrap_or(config.default_guess_period_secs),
            "Guess",
        )?,
        period_from_secs(
            reveal_period.unwrap_or(config.default_reveal_period_secs),
            "Reveal",
        )?,
        min_stake
            .map(Amount::from_sat)
            .unwrap_or(config.default_min_stake),
    );

    let game = ctx.load_game().await?;
    let mut events = game.subscribe();
    let result = game.commit(&operator, params).await;
    ctx.persist(&game, &mut events).await?;
    result?;

    let info = game.info().await;
    println!("Round {} committed", info.id);
    println!("Commitment: {}", commitment);
    if let (Some(guess), Some(reveal)) = (info.guess_deadline, info.reveal_deadline) {
        println!("Guessing closes: {}", guess.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("Reveal deadline: {}", reveal.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!("Min stake: {} sats", info.min_stake.to_sat());
    Ok(())
}

pub async fn place_guess(ctx: &Context, participant: &str, value: u8, stake: u64) -> Result<()> {
    let participant = parse_account(participant)?;

    let game = ctx.load_game().await?;
    let mut events = game.subscribe();
    let result = game
        .register_guess(&participant, value, Amount::from_sat(stake))
        .await;
    ctx.persist(&game, &mut events).await?;
    result?;

    println!("{} guessed {} with {} sats", participant, value, stake);
    println!("Pot: {} sats", game.info().await.total_pot.to_sat());
    Ok(())
}

pub async fn reveal_secret(
    ctx: &Context,
    operator: &str,
    secret: &str,
    salt: u64,
    is_hex: bool,
) -> Result<()> {
    let operator = parse_account(operator)?;
    let reveal = Reveal::new(secret_bytes(secret, is_hex)?, salt);

    let game = ctx.load_game().await?;
    let mut events = game.subscribe();
    let result = game.reveal(&operator, reveal).await;
    ctx.persist(&game, &mut events).await?;
    let target = result?;

    println!("Secret accepted. Target value: {}", target);
    println!("Participants can now run: commitpot claim <participant>");
    Ok(())
}

pub async fn claim_prize(ctx: &Context, participant: &str) -> Result<()> {
    let participant = parse_account(participant)?;

    let game = ctx.load_game().await?;
    let mut events = game.subscribe();
    let result = game.claim(&participant).await;
    ctx.persist(&game, &mut events).await?;
    let amount = result?;

    if amount == Amount::ZERO {
        println!("{}'s guess did not match; entry settled with no payout", participant);
    } else {
        println!("{} won {} sats", participant, amount.to_sat());
    }
    Ok(())
}

pub async fn refund_stake(ctx: &Context, participant: &str) -> Result<()> {
    let participant = parse_account(participant)?;

    let game = ctx.load_game().await?;
    let mut events = game.subscribe();
    let result = game.refund(&participant).await;
    ctx.persist(&game, &mut events).await?;
    let amount = result?;

    println!("Refunded {} sats to {}", amount.to_sat(), participant);
    Ok(())
}

pub async fn reset_round(ctx: &Context, operator: &str, yes: bool) -> Result<()> {
    let operator = parse_account(operator)?;
    let game = ctx.load_game().await?;

    let info = game.info().await;
    let prompt = format!(
        "Reset round {} and drop {} entries?",
        info.id, info.participant_count
    );
    if !confirm(&prompt, yes)? {
        println!("Reset cancelled");
        return Ok(());
    }

    let mut events = game.subscribe();
    let result = game.reset(&operator).await;
    ctx.persist(&game, &mut events).await?;
    let cleared = result?;

    println!("Round reset, {} entries cleared", cleared);
    Ok(())
}

pub async fn withdraw(ctx: &Context, operator: &str, amount: u64, yes: bool) -> Result<()> {
    let operator = parse_account(operator)?;
    let game = ctx.load_game().await?;

    let prompt = format!("Withdraw {} sats from the pot to {}?", amount, operator);
    if !confirm(&prompt, yes)? {
        println!("Withdrawal cancelled");
        return Ok(());
    }

    let mut events = game.subscribe();
    let result = game.owner_withdraw(&operator, Amount::from_sat(amount)).await;
    ctx.persist(&game, &mut events).await?;
    let withdrawn = result?;

    println!("Withdrew {} sats to {}", withdrawn.to_sat(), operator);
    Ok(())
}

pub async fn show_status(ctx: &Context) -> Result<()> {
    let game = ctx.load_game().await?;
    let info = game.info().await;
    let treasury_balance = game.treasury().balance().await?;
    let obligations = game.outstanding_obligations().await?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Field", "Value"]);

    let format_time = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "-".to_string())
    };

    table.add_row(vec!["Round".to_string(), info.id.to_string()]);
    table.add_row(vec!["Operator".to_string(), info.operator.to_string()]);
    table.add_row(vec!["Phase".to_string(), format!("{:?}", info.phase)]);
    table.add_row(vec![
        "Commitment".to_string(),
        info.commitment
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec!["Guess deadline".to_string(), format_time(info.guess_deadline)]);
    table.add_row(vec!["Reveal deadline".to_string(), format_time(info.reveal_deadline)]);
    table.add_row(vec![
        "Min stake".to_string(),
        format!("{} sats", info.min_stake.to_sat()),
    ]);
    table.add_row(vec![
        "Total pot".to_string(),
        format!("{} sats", info.total_pot.to_sat()),
    ]);
    table.add_row(vec![
        "Target".to_string(),
        info.target_value
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec![
        "Participants".to_string(),
        info.participant_count.to_string(),
    ]);
    table.add_row(vec![
        "Treasury balance".to_string(),
        format!("{} sats", treasury_balance.to_sat()),
    ]);
    table.add_row(vec![
        "Owed to participants".to_string(),
        format!("{} sats", obligations.to_sat()),
    ]);

    println!("{}", table);

    if game.is_guessing_open().await {
        println!("Guessing is open");
    } else if game.is_refund_eligible().await {
        println!("Reveal deadline missed: participants can run 'commitpot refund <participant>'");
    } else if game.is_reveal_window_open().await {
        println!("Waiting for the operator to reveal");
    }
    Ok(())
}

pub async fn show_entries(ctx: &Context) -> Result<()> {
    let game = ctx.load_game().await?;
    let entries = game.entries().await;

    if entries.is_empty() {
        println!("No entries");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Participant", "Guess", "Stake (sats)", "Claimed"]);

    for (i, (participant, entry)) in entries.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            participant.to_string(),
            entry.guess.to_string(),
            entry.stake.to_sat().to_string(),
            if entry.claimed { "yes" } else { "no" }.to_string(),
        ]);
    }

    println!("{}", table);
    Ok(())
}

pub async fn show_events(ctx: &Context, limit: usize) -> Result<()> {
    let events = EventStore::new(ctx.storage()).list(limit).await?;

    if events.is_empty() {
        println!("No events");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Seq", "Time", "Event", "Details"]);

    for event in events {
        table.add_row(vec![
            event.seq.to_string(),
            event.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            event.kind,
            event.payload.to_string(),
        ]);
    }

    println!("{}", table);
    Ok(())
}
