use super::ui;
use crate::core::portfolio::PortfolioValue;
use chrono::{DateTime, Local, Utc};
use comfy_table::Cell;

fn format_time(at: Option<DateTime<Utc>>) -> String {
    at.map_or("never".to_string(), |t| {
        t.with_timezone(&Local).format("%H:%M:%S").to_string()
    })
}

impl PortfolioValue {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();

        table.set_header(vec![
            ui::header_cell("Asset"),
            ui::header_cell("Balance"),
            ui::header_cell("Price (USD)"),
            ui::header_cell("Value (USD)"),
            ui::header_cell("Weight (%)"),
        ]);

        for holding in &self.holdings {
            table.add_row(vec![
                Cell::new(holding.asset.symbol()),
                ui::number_cell(holding.amount.normalize().to_string()),
                ui::number_cell(format!("{:.4}", holding.usd_price)),
                ui::number_cell(format!("{:.2}", holding.usd_value)),
                ui::format_optional_cell(holding.weight, |w| format!("{w:.2}%")),
            ]);
        }

        let wallet = self
            .identity
            .as_ref()
            .map_or("not connected".to_string(), |id| id.to_string());
        let mut output = format!(
            "Wallet: {}\n\n",
            ui::style_text(&wallet, ui::StyleType::Title)
        );

        output.push_str(&table.to_string());

        output.push_str(&format!(
            "\n\nTotal Value ({}): {}",
            ui::style_text("USD", ui::StyleType::TotalLabel),
            ui::style_text(&format!("{:.2}", self.total_usd), ui::StyleType::TotalValue)
        ));
        output.push_str(&format!(
            "\n{}",
            ui::style_text(
                &format!(
                    "Balances updated {}, prices updated {}",
                    format_time(self.balances_at),
                    format_time(self.prices_at)
                ),
                ui::StyleType::Subtle
            )
        ));

        output
    }
}

#[cfg(test)]
mod tests {
    use crate::core::asset::{Asset, AssetBalance, BalanceSnapshot, PriceSnapshot};
    use crate::core::portfolio::calculate_portfolio_value;

    #[test]
    fn test_display_as_table() {
        let mut balances = BalanceSnapshot::empty(
            Some("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM".parse().unwrap()),
            &Asset::ALL,
        );
        balances
            .balances
            .insert(Asset::Gold, AssetBalance::new(Asset::Gold, 1_500_000));
        let prices = PriceSnapshot::empty(&Asset::ALL);

        let output = calculate_portfolio_value(&balances, &prices).display_as_table();

        assert!(output.contains("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM"));
        assert!(output.contains("GOLD"));
        assert!(output.contains("1.5"));
        assert!(output.contains("prices updated never"));
    }
}
