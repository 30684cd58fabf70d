use super::ui;
use crate::core::asset::WalletId;
use crate::core::portfolio::calculate_portfolio_value;
use crate::scheduler::{CycleUpdate, RefreshScheduler};
use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

/// Keeps the wallet attached and reprints the portfolio after every cycle.
///
/// Enter triggers a manual refresh, Ctrl-C exits.
pub async fn run(scheduler: RefreshScheduler, identity: WalletId) -> Result<()> {
    let mut cycles = scheduler.subscribe();
    scheduler.attach(identity);

    println!(
        "{}",
        ui::style_text(
            "Press Enter to refresh, Ctrl-C to quit",
            ui::StyleType::Subtle
        )
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            cycle = cycles.recv() => match cycle {
                Ok(CycleUpdate { balances, prices }) => {
                    ui::print_separator();
                    println!("{}", calculate_portfolio_value(&balances, &prices).display_as_table());
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Missed refresh cycles"),
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(_)) => {
                    let scheduler = scheduler.clone();
                    tokio::spawn(async move {
                        let outcome = scheduler.trigger().await;
                        debug!(?outcome, "Manual refresh");
                    });
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!("Failed to read from stdin: {e}");
                    stdin_open = false;
                }
            },
            _ = &mut ctrl_c => break,
        }
    }

    scheduler.detach();
    Ok(())
}
