use alloy_primitives::Address;
use serde_json::json;

use claimpilot_engine::payout::derive;
use claimpilot_engine::utils::{
    format_duration_ms, format_local_ms, now_ms, parse_local_datetime,
};
use claimpilot_engine::{
    ControlEditor, DerivedPayoutState, FileStore, PayoutControl, PayoutRepository, PayoutStatus,
    PayoutTicker,
};

use crate::error::CliError;

pub fn parse_wallet(input: &str) -> Result<Address, CliError> {
    input
        .parse::<Address>()
        .map_err(|_| CliError::InvalidAddress(input.to_string()))
}

/// Loads the wallet's base schedule window, which every admin action needs
/// as its anchor.
fn load_base(repo: &PayoutRepository<FileStore>, wallet: Address) -> Result<(i64, i64), CliError> {
    let schedule = repo
        .schedule(wallet)?
        .ok_or_else(|| CliError::NoSchedule(format!("{wallet:#x}")))?;
    Ok((schedule.last_approved_at, schedule.next_payout_at))
}

fn derived_now(
    repo: &PayoutRepository<FileStore>,
    wallet: Address,
    now: i64,
) -> Result<DerivedPayoutState, CliError> {
    let (last, next) = load_base(repo, wallet)?;
    let control = repo.control(wallet)?;
    Ok(derive(last, next, control.as_ref(), now, true))
}

fn print_state(state: &DerivedPayoutState) {
    println!("status:        {}", state.status);
    match state.status {
        PayoutStatus::Paused => {
            println!("remaining:     {} (frozen)", format_duration_ms(state.remaining_ms));
            println!("resumes at:    {}", format_local_ms(state.resume_at));
        }
        PayoutStatus::Ready => {
            println!("remaining:     0s (claimable now)");
        }
        PayoutStatus::Running => {
            println!("remaining:     {}", format_duration_ms(state.remaining_ms));
            println!("next payout:   {}", format_local_ms(state.next_payout_at));
        }
    }
    println!("progress:      {:.1}%", state.progress * 100.0);
    if state.is_cycle {
        let cycle = state.cycle_ms.unwrap_or_default();
        println!("cycle:         every {}", format_duration_ms(cycle));
    }
}

pub fn handle_status(
    repo: &PayoutRepository<FileStore>,
    wallet: &str,
    as_json: bool,
) -> Result<(), CliError> {
    let wallet = parse_wallet(wallet)?;
    let now = now_ms();
    let state = derived_now(repo, wallet, now)?;
    let schedule = repo
        .schedule(wallet)?
        .ok_or_else(|| CliError::NoSchedule(format!("{wallet:#x}")))?;

    if as_json {
        let payload = json!({
            "wallet": format!("{wallet:#x}"),
            "state": state,
            "tokens": schedule.tokens,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("wallet:        {wallet:#x}");
    println!("last approval: {}", format_local_ms(state.last_approved_at));
    print_state(&state);
    if !schedule.tokens.is_empty() {
        println!("tokens:");
        for token in &schedule.tokens {
            println!("  {:>8}  {}  {:#x}", token.symbol, token.chain_name, token.address);
        }
    }
    Ok(())
}

pub fn handle_list(repo: &PayoutRepository<FileStore>) -> Result<(), CliError> {
    let controls = repo.controls()?;
    if controls.is_empty() {
        println!("No wallets have admin overrides.");
        return Ok(());
    }
    let now = now_ms();
    for (wallet, control) in controls {
        let kind = if control.is_cycle() {
            "cycle"
        } else if control.is_manual() {
            "manual"
        } else {
            "paused"
        };
        match repo.schedule(wallet)? {
            Some(schedule) => {
                let state = derive(
                    schedule.last_approved_at,
                    schedule.next_payout_at,
                    Some(&control),
                    now,
                    true,
                );
                println!(
                    "{wallet:#x}  {kind:>6}  {}  remaining {}",
                    state.status,
                    format_duration_ms(state.remaining_ms)
                );
            }
            None => println!("{wallet:#x}  {kind:>6}  (no schedule)"),
        }
    }
    Ok(())
}

fn apply_and_report(
    repo: &PayoutRepository<FileStore>,
    editor: &ControlEditor,
    wallet: Address,
    prev: Option<&PayoutControl>,
    next: Option<PayoutControl>,
    now: i64,
) -> Result<(), CliError> {
    let wrote = editor.commit(repo, wallet, prev, next)?;
    if wrote {
        println!("Control updated.");
    } else {
        println!("Control unchanged.");
    }
    let state = derived_now(repo, wallet, now)?;
    print_state(&state);
    Ok(())
}

pub fn handle_pause(
    repo: &PayoutRepository<FileStore>,
    editor: &ControlEditor,
    wallet: &str,
) -> Result<(), CliError> {
    let wallet = parse_wallet(wallet)?;
    let now = now_ms();
    let (last, next) = load_base(repo, wallet)?;
    let prev = repo.control(wallet)?;
    let control = editor.pause(last, next, prev.as_ref(), now);
    apply_and_report(repo, editor, wallet, prev.as_ref(), control, now)
}

pub fn handle_resume(
    repo: &PayoutRepository<FileStore>,
    editor: &ControlEditor,
    wallet: &str,
) -> Result<(), CliError> {
    let wallet = parse_wallet(wallet)?;
    let now = now_ms();
    let (last, next) = load_base(repo, wallet)?;
    let prev = repo.control(wallet)?;
    let control = editor.resume(last, next, prev.as_ref(), now);
    apply_and_report(repo, editor, wallet, prev.as_ref(), control, now)
}

pub fn handle_shift(
    repo: &PayoutRepository<FileStore>,
    editor: &ControlEditor,
    wallet: &str,
    minutes: i64,
) -> Result<(), CliError> {
    let wallet = parse_wallet(wallet)?;
    let now = now_ms();
    let (last, next) = load_base(repo, wallet)?;
    let prev = repo.control(wallet)?;
    let control = editor.shift(last, next, prev.as_ref(), minutes * 60_000, now);
    apply_and_report(repo, editor, wallet, prev.as_ref(), control, now)
}

pub fn handle_set_time(
    repo: &PayoutRepository<FileStore>,
    editor: &ControlEditor,
    wallet: &str,
    timestamp: &str,
) -> Result<(), CliError> {
    let wallet = parse_wallet(wallet)?;
    let now = now_ms();
    let target = parse_local_datetime(timestamp)?;
    let (last, next) = load_base(repo, wallet)?;
    let prev = repo.control(wallet)?;
    let control = editor.set_absolute(last, next, prev.as_ref(), target, now)?;
    apply_and_report(repo, editor, wallet, prev.as_ref(), control, now)
}

pub fn handle_start_cycle(
    repo: &PayoutRepository<FileStore>,
    editor: &ControlEditor,
    wallet: &str,
    hours: Option<i64>,
) -> Result<(), CliError> {
    let wallet = parse_wallet(wallet)?;
    let now = now_ms();
    let (last, next) = load_base(repo, wallet)?;
    let prev = repo.control(wallet)?;
    let cycle_ms = hours.map(|h| h.max(1) * 3_600_000);
    let control = editor.start_cycle(last, next, prev.as_ref(), cycle_ms, now);
    apply_and_report(repo, editor, wallet, prev.as_ref(), control, now)
}

pub fn handle_reset(
    repo: &PayoutRepository<FileStore>,
    editor: &ControlEditor,
    wallet: &str,
) -> Result<(), CliError> {
    let wallet = parse_wallet(wallet)?;
    let now = now_ms();
    // Resetting does not need a schedule; it only clears the override.
    let prev = repo.control(wallet)?;
    let wrote = editor.commit(repo, wallet, prev.as_ref(), editor.reset())?;
    if wrote {
        println!("Control cleared; wallet follows its base schedule again.");
    } else {
        println!("No control to clear.");
    }
    match derived_now(repo, wallet, now) {
        Ok(state) => print_state(&state),
        Err(CliError::NoSchedule(_)) => {}
        Err(e) => return Err(e),
    }
    Ok(())
}

pub async fn handle_watch(
    repo: &PayoutRepository<FileStore>,
    wallet: &str,
    interval_ms: u64,
) -> Result<(), CliError> {
    let wallet = parse_wallet(wallet)?;
    // Surface a missing schedule before entering the loop.
    let _ = load_base(repo, wallet)?;
    let ticker = PayoutTicker::new(repo.clone(), interval_ms);
    println!("Watching {wallet:#x} (ctrl-c to stop)");
    ticker
        .run(wallet, |state| {
            println!(
                "{}  remaining {}  progress {:.1}%",
                state.status,
                format_duration_ms(state.remaining_ms),
                state.progress * 100.0
            );
            true
        })
        .await;
    Ok(())
}
