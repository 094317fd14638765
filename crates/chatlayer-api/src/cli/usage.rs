//! Rate-limit inspection and maintenance commands.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use crate::state::AppState;

/// Show a user's usage in the trailing window plus their stored buckets.
pub async fn show_usage(
    state: &AppState,
    user_id: &str,
    endpoint: &str,
    hours: u32,
    json: bool,
) -> Result<()> {
    let usage = state.chat_service.usage(user_id, endpoint, hours).await?;
    let buckets = state.chat_service.buckets(user_id, endpoint).await?;
    let limit = state.chat_service.settings().requests_per_hour;

    if json {
        let report = serde_json::json!({
            "user_id": user_id,
            "endpoint": endpoint,
            "hours": hours,
            "usage": usage,
            "limit": limit,
            "buckets": buckets,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    let limit_label = if limit == 0 {
        "unlimited".to_string()
    } else {
        limit.to_string()
    };
    println!(
        "  {} used {} of {} '{}' requests in the last {}h",
        style(user_id).cyan().bold(),
        style(usage).bold(),
        limit_label,
        endpoint,
        hours
    );

    if !buckets.is_empty() {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL_CONDENSED);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Hour (UTC)").fg(Color::White),
            Cell::new("Requests").fg(Color::White),
        ]);
        for bucket in &buckets {
            table.add_row(vec![
                Cell::new(bucket.period_start.format("%Y-%m-%d %H:00").to_string()),
                Cell::new(bucket.request_count.to_string()).fg(Color::Cyan),
            ]);
        }
        println!();
        println!("{table}");
    }
    println!();

    Ok(())
}

/// Purge rate-limit buckets older than `retention_hours`.
pub async fn cleanup(state: &AppState, retention_hours: Option<u32>, json: bool) -> Result<()> {
    let retention = retention_hours.unwrap_or(state.config.rate_limit.retention_hours);
    let deleted = state.chat_service.clean_old_records(retention).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({"deleted": deleted, "retention_hours": retention})
        );
    } else {
        println!(
            "  {} Removed {} bucket{} older than {}h.",
            style("✓").green().bold(),
            deleted,
            if deleted == 1 { "" } else { "s" },
            retention
        );
    }

    Ok(())
}
