//! `miroute status` handler: one poll cycle, then a router summary.

use miroute_core::convert::{format_duration_hms, format_speed};
use miroute_core::{PollCycle, RouterState, SignalBus};

use crate::cli::GlobalOpts;
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let settings = config::select_one_router(config, global)?;
    let router = settings.entry_id.clone();

    let mut updater = util::build_updater(settings, SignalBus::default())?;
    updater.restore().await;
    let cycle = updater.run_cycle().await;
    let state = updater.state();
    updater.shutdown().await;

    util::require_data(&cycle, &state, &router)?;

    let color = output::should_color(&global.color);
    let out = output::render_single(&global.output, &*state, |s| {
        detail(s, &router, &cycle, color)
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Detail view ─────────────────────────────────────────────────────

fn detail(state: &RouterState, router: &str, cycle: &PollCycle, color: bool) -> String {
    let mut lines = Vec::new();
    push_identity(&mut lines, state, router);
    push_vitals(&mut lines, state, color);
    push_network(&mut lines, state);
    push_poll(&mut lines, cycle, color);
    lines.join("\n")
}

fn push_identity(lines: &mut Vec<String>, state: &RouterState, router: &str) {
    lines.push(format!("Router:     {router}"));
    if let Some(ref info) = state.info {
        if let Some(ref name) = info.name {
            lines.push(format!("Name:       {name}"));
        }
        if let Some(ref model) = info.model {
            lines.push(format!("Model:      {model}"));
        }
    }
    if let Some(ref fw) = state.firmware {
        let mut line = format!("Firmware:   {}", fw.current.as_deref().unwrap_or("-"));
        let latest = fw.latest.as_deref().filter(|_| fw.update_available);
        if let Some(latest) = latest {
            line.push_str(&format!(" (update available: {latest})"));
        }
        lines.push(line);
    }
    if let Some(mode) = state.mode {
        lines.push(format!("Mode:       {}", mode.phrase()));
    }
}

fn push_vitals(lines: &mut Vec<String>, state: &RouterState, color: bool) {
    let availability = if state.available {
        output::good("available", color)
    } else {
        output::bad("unavailable", color)
    };
    let Some(ref vitals) = state.vitals else {
        lines.push(format!("Status:     {availability}"));
        return;
    };

    lines.push(format!(
        "Status:     {availability} (up {})",
        format_duration_hms(vitals.uptime_secs)
    ));
    if let Some(load) = vitals.cpu_load_pct {
        let cores = vitals
            .cpu_cores
            .map(|n| format!(" of {n} cores"))
            .unwrap_or_default();
        lines.push(format!("CPU:        {load:.0}%{cores}"));
    }
    if let Some(memory) = vitals.memory_usage_pct {
        lines.push(format!("Memory:     {memory:.0}%"));
    }
    // The stock firmware reports 0 on models without a sensor.
    if let Some(temp) = vitals.temperature.filter(|t| *t > 0.0) {
        lines.push(format!("Temp:       {temp:.1} °C"));
    }
    let mut bands = Vec::new();
    if let Some(n) = vitals.clients_2g {
        bands.push(format!("2.4G {n}"));
    }
    if let Some(n) = vitals.clients_5g {
        bands.push(format!("5G {n}"));
    }
    if let Some(n) = vitals.clients_game {
        bands.push(format!("game {n}"));
    }
    if !bands.is_empty() {
        lines.push(format!("Wireless:   {}", bands.join(", ")));
    }
    if let (Some(down), Some(up)) = (vitals.wan_down_bps, vitals.wan_up_bps) {
        lines.push(format!(
            "Speed:      down {}, up {}",
            format_speed(down),
            format_speed(up)
        ));
    }
    lines.push(format!(
        "Devices:    {} online, {} tracked",
        state.online_device_count(),
        state.device_count()
    ));
}

fn push_network(lines: &mut Vec<String>, state: &RouterState) {
    if let Some(ref wan) = state.wan {
        let verdict = if wan.up { "up" } else { "down" };
        let mut line = format!("WAN:        {verdict}");
        if wan.uptime_secs > 0 {
            line.push_str(&format!(" {}", format_duration_hms(wan.uptime_secs)));
        }
        if let Some(ip) = wan.ip {
            line.push_str(&format!(", ip {ip}"));
        }
        if let Some(ref gateway) = wan.gateway {
            line.push_str(&format!(", gateway {gateway}"));
        }
        lines.push(line);
        if !wan.dns.is_empty() {
            lines.push(format!("DNS:        {}", wan.dns.join(", ")));
        }
    }
    if let Some(ref wireless) = state.wireless {
        for radio in wireless.interfaces.iter().filter(|r| r.enabled) {
            let ssid = radio.ssid.as_deref().unwrap_or("(hidden)");
            let channel = radio
                .channel
                .map(|c| format!(" channel {c}"))
                .unwrap_or_default();
            lines.push(format!(
                "Radio:      {} {ssid}{channel}",
                radio.ifname.as_deref().unwrap_or("-")
            ));
        }
    }
    for (radio, channels) in &state.channels {
        let list = channels
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(format!("Channels:   {} {list}", radio.label()));
    }
    if let Some(signal) = state.ap_signal {
        lines.push(format!("Uplink:     {signal} dBm"));
    }
    if let Some(ref topology) = state.topology {
        lines.push(format!("Mesh:       {} nodes", topology.node_count()));
    }
    if let Some(led_on) = state.led_on {
        lines.push(format!("LED:        {}", if led_on { "on" } else { "off" }));
    }
}

fn push_poll(lines: &mut Vec<String>, cycle: &PollCycle, color: bool) {
    let verdict = if cycle.success {
        output::good("ok", color)
    } else {
        output::bad("failed, showing cached data", color)
    };
    lines.push(format!(
        "Last poll:  {verdict} ({} endpoints in {} ms)",
        cycle.succeeded.len(),
        cycle.duration_ms
    ));
}
