//! `miroute devices` handler: one poll cycle, then the device table.

use tabled::Tabled;
use tracing::warn;

use miroute_core::convert::format_speed;
use miroute_core::{DeviceRecord, SignalBus};

use crate::cli::{DevicesArgs, GlobalOpts, OutputFormat};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Connection")]
    connection: String,
    #[tabled(rename = "Signal")]
    signal: String,
    #[tabled(rename = "Down")]
    down: String,
    #[tabled(rename = "Up")]
    up: String,
    #[tabled(rename = "Seen")]
    seen: String,
}

fn row(device: &DeviceRecord, color: bool) -> DeviceRow {
    DeviceRow {
        name: device.name.clone(),
        mac: device.mac.to_string(),
        ip: device.ip.map_or_else(|| "-".into(), |ip| ip.to_string()),
        connection: device.connection.phrase().to_string(),
        signal: device
            .signal
            .map_or_else(|| "-".into(), |s| format!("{s} dBm")),
        down: format_speed(device.down_speed),
        up: format_speed(device.up_speed),
        seen: if device.is_online {
            output::good(&format!("online {}", device.online_text()), color)
        } else {
            let stamp = device.last_seen.format("%Y-%m-%d %H:%M").to_string();
            output::dim(&stamp, color)
        },
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: &Config,
    global: &GlobalOpts,
    args: DevicesArgs,
) -> Result<(), CliError> {
    let settings = config::select_one_router(config, global)?;
    let router = settings.entry_id.clone();

    let mut updater = util::build_updater(settings, SignalBus::default())?;
    updater.restore().await;
    let cycle = updater.run_cycle().await;
    let state = updater.state();
    updater.shutdown().await;

    util::require_data(&cycle, &state, &router)?;
    if !cycle.success {
        warn!(router = %router, "poll failed, listing cached devices");
    }

    let mut devices: Vec<DeviceRecord> = state
        .devices
        .values()
        .filter(|d| args.all || d.is_online)
        .cloned()
        .collect();
    devices.sort_by(|a, b| {
        b.is_online
            .cmp(&a.is_online)
            .then_with(|| a.name.cmp(&b.name))
    });

    let color = output::should_color(&global.color);
    if devices.is_empty() && matches!(global.output, OutputFormat::Table) {
        output::print_output(&output::dim("no devices", color), global.quiet);
        return Ok(());
    }

    let out = output::render_list(&global.output, &devices, |d| row(d, color));
    output::print_output(&out, global.quiet);
    Ok(())
}
